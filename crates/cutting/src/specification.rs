use serde::{Deserialize, Serialize};

use panelstock_core::{Area, DomainError, DomainResult, Length};

/// One requested sub-rectangle, repeated `count` times.
///
/// `length` runs along the source panel's length axis; pieces are not rotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutRequest {
    pub name: Option<String>,
    pub length: Length,
    pub width: Length,
    pub count: u32,
}

impl CutRequest {
    pub fn new(length: Length, width: Length, count: u32) -> Self {
        Self {
            name: None,
            length,
            width,
            count,
        }
    }

    pub fn named(name: impl Into<String>, length: Length, width: Length, count: u32) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(length, width, count)
        }
    }

    pub fn area(&self) -> Area {
        (self.length * self.width) * self.count
    }

    fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("cut '{name}'"),
            None => format!("cut #{}", index + 1),
        }
    }
}

/// A validated set of cuts to take from one source panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutSpecification {
    requests: Vec<CutRequest>,
}

impl CutSpecification {
    pub fn new(requests: Vec<CutRequest>) -> DomainResult<Self> {
        if requests.is_empty() {
            return Err(DomainError::invalid_cut("at least one cut is required"));
        }
        for (idx, r) in requests.iter().enumerate() {
            if !r.length.is_positive() || !r.width.is_positive() {
                return Err(DomainError::invalid_cut(format!(
                    "{} must have positive length and width (got {} x {})",
                    r.label(idx),
                    r.length,
                    r.width
                )));
            }
            if r.count == 0 {
                return Err(DomainError::invalid_cut(format!(
                    "{} must have a count of at least 1",
                    r.label(idx)
                )));
            }
        }
        Ok(Self { requests })
    }

    /// A single target rectangle.
    pub fn simple(length: Length, width: Length) -> DomainResult<Self> {
        Self::new(vec![CutRequest::new(length, width, 1)])
    }

    pub fn requests(&self) -> &[CutRequest] {
        &self.requests
    }

    pub fn required_area(&self) -> Area {
        self.requests.iter().map(CutRequest::area).sum()
    }

    /// Longest requested piece along the length axis.
    pub fn max_length(&self) -> Length {
        self.requests.iter().map(|r| r.length).max().unwrap_or(Length::ZERO)
    }

    /// Widest requested piece along the width axis.
    pub fn max_width(&self) -> Length {
        self.requests.iter().map(|r| r.width).max().unwrap_or(Length::ZERO)
    }

    pub fn piece_count(&self) -> u64 {
        self.requests.iter().map(|r| r.count as u64).sum()
    }
}
