use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Identifier is empty, whitespace-padded, or contains control characters.
    InvalidItemId(String),
    /// Deserialized state violates an engine invariant.
    InvalidState(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidItemId(id) => write!(f, "invalid item id: {id:?}"),
            EngineError::InvalidState(msg) => write!(f, "invalid engine state: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

pub type Result<T> = std::result::Result<T, EngineError>;
