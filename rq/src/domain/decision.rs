//! Strategy outcomes

use serde::{Deserialize, Serialize};

/// Why a call was declined by its coordination mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionReason {
    /// Prevent mode: an identical call was already pending
    Duplicate,
    /// Abort mode: a newer call to the same key replaced this one
    Superseded,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate => write!(f, "duplicate"),
            Self::Superseded => write!(f, "superseded"),
        }
    }
}

/// Result of applying a coordination strategy to a new call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The call may proceed and is recorded as pending
    Admitted,
    /// The call must not proceed; it was never recorded
    Rejected(RejectionReason),
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted)
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Decision::Admitted => None,
            Decision::Rejected(reason) => Some(*reason),
        }
    }
}
