//! # Selector Store
//!
//! Holds the configuration fragments ("selectors") from which run configurations are
//! resolved, plus the search used by the configuration admin screen.

pub mod search;
pub mod store;

use thiserror::Error;

use crate::models::FragmentId;

pub use search::{MatchingType, SearchHit, SelectorQuery};
pub use store::{AddOutcome, ConflictWarning, MatchingSnapshot, SelectorStore};

/// Errors raised by selector store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Selector fragment {0} not found")]
    FragmentNotFound(FragmentId),

    #[error("Selector fragment {0} is already obsolete")]
    AlreadyObsolete(FragmentId),

    #[error("Selector name '{name}' is already used by live fragment {existing}")]
    DuplicateName { name: String, existing: FragmentId },

    #[error("Selector fragment {0} holds default values and can only be replaced")]
    DefaultValuesRequireReplacement(FragmentId),

    #[error("Invalid selector {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl SelectorError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type SelectorResult<T> = Result<T, SelectorError>;
