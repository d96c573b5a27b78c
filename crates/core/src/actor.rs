//! Who caused a change.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Originator of a command or ledger movement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// An authenticated user acting through the request layer.
    User(UserId),
    /// A background process (e.g. `"housekeeping"`).
    System(String),
}

impl Actor {
    pub fn system(name: impl Into<String>) -> Self {
        Self::System(name.into())
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::System(name) => write!(f, "system:{name}"),
        }
    }
}

impl core::str::FromStr for Actor {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("user", id)) => Ok(Actor::User(id.parse()?)),
            Some(("system", name)) if !name.is_empty() => Ok(Actor::system(name)),
            _ => Err(crate::DomainError::invalid_id(format!("Actor: {s}"))),
        }
    }
}
