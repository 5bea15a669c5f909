//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when building or framing protocol messages.
///
/// Inbound parse failures are not errors: the parser always returns a
/// [`ParsedMessage`](crate::ParsedMessage), degrading to `Malformed` so the
/// caller can log and continue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An outbound command was built without a command code.
    #[error("command code must not be empty")]
    EmptyCommandCode,

    /// A line exceeded the codec's length guard and was discarded.
    #[error("line too long: maximum {max} bytes, got {actual}")]
    LineTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Length accumulated before the line was discarded.
        actual: usize,
    },
}
