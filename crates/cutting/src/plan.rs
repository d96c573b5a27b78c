//! Guillotine cut planning.
//!
//! Given a source panel `L x W` and a [`CutSpecification`], the planner picks the
//! bounding rectangle `(Rl, Rw)` taken from a fixed corner of the panel:
//!
//! - `Rl <= L`, `Rw <= W`, `Rl * Rw >= required`
//! - every requested piece fits on its own (`Rl >= max l`, `Rw >= max w`)
//! - waste `Rl * Rw - required` is minimal
//! - ties go to the aspect ratio closest to 1, then to the smaller `Rl`
//!
//! The rectangle is then separated with two guillotine cuts, leaving a primary strip
//! (kept on the source panel) and a secondary strip (a new panel if it clears the
//! remnant threshold). Everything here is pure.

use serde::{Deserialize, Serialize};

use panelstock_core::{Area, DomainError, DomainResult, Length};
use panelstock_inventory::Axis;

use crate::specification::CutSpecification;

/// An axis-aligned rectangle, length first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub length: Length,
    pub width: Length,
}

impl Rect {
    pub fn new(length: Length, width: Length) -> Self {
        Self { length, width }
    }

    pub fn area(&self) -> Area {
        self.length * self.width
    }

    pub fn is_empty(&self) -> bool {
        !self.length.is_positive() || !self.width.is_positive()
    }
}

/// The explicit record of which panel dimension a cut consumes, and by how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCut {
    pub axis: Axis,
    pub amount: Length,
}

/// Which guillotine strip a remnant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripRole {
    /// Remainder along the consumed axis; stays on the source panel record.
    Primary,
    /// Remainder beside the cut rectangle; becomes its own panel record.
    Secondary,
}

/// What happens to a remainder strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemnantDisposition {
    /// At or above the threshold: tracked as inventory.
    Reinserted,
    /// Below the threshold: discarded, not tracked.
    Waste,
}

/// One remainder strip left by the guillotine cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remnant {
    pub role: StripRole,
    pub rect: Rect,
    pub disposition: RemnantDisposition,
}

impl Remnant {
    pub fn area(&self) -> Area {
        self.rect.area()
    }

    pub fn is_reinserted(&self) -> bool {
        self.disposition == RemnantDisposition::Reinserted
    }
}

/// Result of planning a cut specification against one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPlan {
    pub source: Rect,
    pub required_area: Area,
    pub threshold: Area,
    /// Recommended bounding rectangle.
    pub rect: Rect,
    /// `required / (Rl * Rw) * 100`.
    pub utilization: f64,
    pub axis_cut: AxisCut,
    pub remnants: Vec<Remnant>,
}

impl CutPlan {
    /// Area inside the bounding rectangle not covered by requested pieces.
    pub fn offcut_area(&self) -> Area {
        self.rect.area() - self.required_area
    }

    /// Remainder strips below the threshold.
    pub fn waste_area(&self) -> Area {
        self.remnants
            .iter()
            .filter(|r| !r.is_reinserted())
            .map(Remnant::area)
            .sum()
    }

    /// Total remainder area, tracked or not.
    pub fn remnant_area(&self) -> Area {
        self.remnants.iter().map(Remnant::area).sum()
    }

    /// Secondary strip to insert as a new panel record, if any.
    pub fn new_panel(&self) -> Option<Rect> {
        self.remnants
            .iter()
            .find(|r| r.role == StripRole::Secondary && r.is_reinserted())
            .map(|r| r.rect)
    }
}

/// Plan `spec` against a source panel of `length x width`.
///
/// Fails with `InsufficientArea` when the pieces need more than `length * width`, and
/// with `InvalidCutSpecification` when the threshold is negative or a piece cannot fit.
pub fn compute_cut_plan(
    length: Length,
    width: Length,
    spec: &CutSpecification,
    threshold: Area,
) -> DomainResult<CutPlan> {
    if threshold.is_negative() {
        return Err(DomainError::invalid_cut("remnant threshold cannot be negative"));
    }
    if length.is_negative() || width.is_negative() {
        return Err(DomainError::invariant("source panel has negative dimensions"));
    }

    let source = Rect::new(length, width);
    let required = spec.required_area();
    let available = source.area();
    if required > available {
        return Err(DomainError::InsufficientArea { required, available });
    }

    let rect = recommend_rect(source, required, spec.max_length(), spec.max_width()).ok_or_else(|| {
        DomainError::invalid_cut(format!(
            "largest piece {} x {} does not fit panel {} x {}",
            spec.max_length(),
            spec.max_width(),
            length,
            width
        ))
    })?;

    let utilization = required.ratio_of(rect.area()) * 100.0;
    let (axis_cut, remnants) = guillotine(source, rect, threshold);

    Ok(CutPlan {
        source,
        required_area: required,
        threshold,
        rect,
        utilization,
        axis_cut,
        remnants,
    })
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    length: i128,
    width: i128,
    waste: i128,
}

impl Candidate {
    /// Whether `self` beats `other`: less waste, then squarer.
    fn better_than(&self, other: &Candidate) -> bool {
        if self.waste != other.waste {
            return self.waste < other.waste;
        }
        // max(a)/min(a) < max(b)/min(b), compared exactly by cross-multiplying.
        let (a_max, a_min) = (self.length.max(self.width), self.length.min(self.width));
        let (b_max, b_min) = (other.length.max(other.width), other.length.min(other.width));
        a_max * b_min < b_max * a_min
    }
}

fn recommend_rect(source: Rect, required: Area, min_length: Length, min_width: Length) -> Option<Rect> {
    let (l, w) = (source.length.as_mm() as i128, source.width.as_mm() as i128);
    let (min_l, min_w) = (min_length.as_mm() as i128, min_width.as_mm() as i128);
    let req = required.as_mm2();

    if min_l <= 0 || min_w <= 0 || min_l > l || min_w > w {
        return None;
    }

    // Rl below ceil(req / W) cannot reach the required area.
    let start = min_l.max(div_ceil(req, w));
    let mut best: Option<Candidate> = None;

    for rl in start..=l {
        if let Some(b) = best {
            // Waste is at least rl * min_w - req and grows with rl from here on.
            if rl * min_w - req > b.waste {
                break;
            }
        }
        let rw = div_ceil(req, rl).max(min_w);
        if rw > w {
            continue;
        }
        let candidate = Candidate {
            length: rl,
            width: rw,
            waste: rl * rw - req,
        };
        if best.is_none_or(|b| candidate.better_than(&b)) {
            best = Some(candidate);
        }
    }

    best.map(|c| Rect::new(Length::from_mm(c.length as i64), Length::from_mm(c.width as i64)))
}

fn div_ceil(a: i128, b: i128) -> i128 {
    if b <= 0 {
        return 0;
    }
    (a + b - 1) / b
}

fn guillotine(source: Rect, rect: Rect, threshold: Area) -> (AxisCut, Vec<Remnant>) {
    let length_first_secondary = Rect::new(rect.length, source.width - rect.width);
    let width_first_secondary = Rect::new(source.length - rect.length, rect.width);

    let axis = if width_first_secondary.area() < length_first_secondary.area() {
        Axis::Width
    } else {
        Axis::Length
    };

    let (primary, secondary, cut_extent, full_extent) = match axis {
        Axis::Length => (
            Rect::new(source.length - rect.length, source.width),
            length_first_secondary,
            rect.length,
            source.length,
        ),
        Axis::Width => (
            Rect::new(source.length, source.width - rect.width),
            width_first_secondary,
            rect.width,
            source.width,
        ),
    };

    let classify = |role: StripRole, strip: Rect| -> Option<Remnant> {
        if strip.is_empty() {
            return None;
        }
        let disposition = if strip.area() >= threshold {
            RemnantDisposition::Reinserted
        } else {
            RemnantDisposition::Waste
        };
        Some(Remnant {
            role,
            rect: strip,
            disposition,
        })
    };

    let primary = classify(StripRole::Primary, primary);
    let secondary = classify(StripRole::Secondary, secondary);

    // A primary strip below the threshold is scrap, so the whole axis is consumed.
    let amount = match primary {
        Some(p) if !p.is_reinserted() => full_extent,
        _ => cut_extent,
    };

    let remnants = primary.into_iter().chain(secondary).collect();
    (AxisCut { axis, amount }, remnants)
}
