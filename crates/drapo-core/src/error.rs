//! Error types surfaced to callers.

use crate::registry::ObjectId;
use crate::shapes::ObjectKind;
use thiserror::Error;

/// Errors returned by construction and explicit lifecycle calls.
///
/// Input that cannot be acted upon (a press outside every subregion, a press
/// while another drag is running) is not an error; it is reported through
/// [`crate::Dispatch::Ignored`] instead.
#[derive(Debug, Error)]
pub enum DrapoError {
    /// A required canvas or subregion is missing or unusable.
    #[error("Host state error: {0}")]
    HostState(String),
    /// The object is not (or no longer) registered.
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
    /// The operation only applies to another kind of object.
    #[error("Object {id} is not a {}", .expected.name())]
    WrongKind { id: ObjectId, expected: ObjectKind },
    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for drapo operations.
pub type Result<T> = std::result::Result<T, DrapoError>;
