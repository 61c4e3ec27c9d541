//! Non-destructive replacement of token ranges

pub mod lookup;
pub mod range_replacer;

use crate::logging::codes;

pub use lookup::LookupStrategy;
pub use range_replacer::{
    OwnerId, RangeReplacer, ReplacementOwner, ReplacementRequest, ReplayStats,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplaceError {
    #[error("Invalid replacement range: end {end} precedes start {start}")]
    InvalidRange { start: usize, end: usize },

    #[error("Replacement range {start}..={end} exceeds stream of {len} tokens")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("Replacement owner {owner} not among {owners} registered owners")]
    UnknownOwner { owner: usize, owners: usize },
}

impl ReplaceError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            ReplaceError::InvalidRange { .. } => codes::replacement::INVALID_RANGE,
            ReplaceError::OutOfBounds { .. } => codes::replacement::RANGE_OUT_OF_BOUNDS,
            ReplaceError::UnknownOwner { .. } => codes::replacement::UNKNOWN_OWNER,
        }
    }
}
