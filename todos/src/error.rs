//! Error types for the todo list.

use crate::types::TodoId;
use thiserror::Error;

/// Errors raised by todo list lookups and parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// No todo has the requested id
    #[error("Todo with ID {0} not found")]
    NotFound(TodoId),

    /// A filter name outside `all`, `finished`, `unfinished`
    #[error("Unknown filter `{0}` (expected all, finished or unfinished)")]
    UnknownFilter(String),
}
