//! Engine error types.
//!
//! Everything except [`EngineError::ConnectionLost`] is local-recover-and-log:
//! the engine keeps running after any single malformed or out-of-order frame.

use relaylink_protocol::{NodeId, ProtocolError};
use thiserror::Error;

/// Errors raised while applying protocol traffic to the registry or while
/// driving the transport.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A line did not match any frame shape. Non-fatal; discarded.
    #[error("malformed frame: {line:?}")]
    MalformedFrame {
        /// The offending line.
        line: String,
    },

    /// A node index was non-numeric or outside `[0, MAX_NODES)`.
    #[error("node index {0} is out of range")]
    InvalidNodeId(usize),

    /// A device-scoped update referenced a node that has not announced yet.
    #[error("no such node: {0}")]
    UnknownNode(NodeId),

    /// A recognized frame shape carried an unrecognized payload keyword.
    #[error("unrecognized status payload: {0:?}")]
    UnknownStatusKey(String),

    /// A command could not be delivered. Logged once; never retried.
    #[error("transport send failed: {0}")]
    TransportSendFailure(#[source] TransportError),

    /// The remote system reported an error. Always surfaced to the operator.
    #[error("relayer error: {0}")]
    Relayer(String),

    /// The transport signalled end-of-stream or failure. Forces a full
    /// registry reset and the `Disconnected` state.
    #[error("connection lost")]
    ConnectionLost,

    /// An outbound command violated the encoding contract.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transport operation other than send failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors reported by a [`Transport`](crate::Transport) implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No serial port was available or selected.
    #[error("no serial port found")]
    NotFound,

    /// The port was selected but could not be opened.
    #[error("unable to open port: {0}")]
    OpenFailed(String),

    /// The link is not open.
    #[error("port is not open")]
    NotOpen,

    /// An I/O error on the open link.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}
