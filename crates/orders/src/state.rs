//! Order lifecycle states and the transition table.
//!
//! Every legal `(from, to)` pair and its side effect lives in [`TRANSITIONS`]; nothing
//! else in the workspace decides whether a state change is allowed.

use serde::{Deserialize, Serialize};

use panelstock_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Draft,
    Pending,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl OrderState {
    pub const ALL: [OrderState; 6] = [
        OrderState::Draft,
        OrderState::Pending,
        OrderState::InProgress,
        OrderState::Paused,
        OrderState::Completed,
        OrderState::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Draft => "draft",
            OrderState::Pending => "pending",
            OrderState::InProgress => "in_progress",
            OrderState::Paused => "paused",
            OrderState::Completed => "completed",
            OrderState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Completed | OrderState::Cancelled)
    }

    /// States in which line items may still be added.
    pub fn accepts_line_items(self) -> bool {
        matches!(
            self,
            OrderState::Pending | OrderState::InProgress | OrderState::Paused
        )
    }
}

impl core::fmt::Display for OrderState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown order state: {s}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl core::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(DomainError::validation(format!("unknown priority: {other}"))),
        }
    }
}

/// Side effect the order service must run together with a state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEffect {
    None,
    /// Set `completed_at` to the transition time.
    StampCompletion,
    /// Run compensation in the same transaction.
    Compensate,
}

/// The complete set of legal transitions.
pub const TRANSITIONS: &[(OrderState, OrderState, TransitionEffect)] = &[
    (OrderState::Draft, OrderState::Pending, TransitionEffect::None),
    (OrderState::Pending, OrderState::InProgress, TransitionEffect::None),
    (OrderState::InProgress, OrderState::Paused, TransitionEffect::None),
    (OrderState::Paused, OrderState::InProgress, TransitionEffect::None),
    (OrderState::InProgress, OrderState::Completed, TransitionEffect::StampCompletion),
    (OrderState::Paused, OrderState::Completed, TransitionEffect::StampCompletion),
    (OrderState::Pending, OrderState::Cancelled, TransitionEffect::Compensate),
    (OrderState::InProgress, OrderState::Cancelled, TransitionEffect::Compensate),
    (OrderState::Paused, OrderState::Cancelled, TransitionEffect::Compensate),
];

/// Effect of moving from `from` to `to`, or `None` if the move is illegal.
pub fn transition_effect(from: OrderState, to: OrderState) -> Option<TransitionEffect> {
    TRANSITIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, effect)| *effect)
}
