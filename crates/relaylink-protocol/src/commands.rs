//! Outbound command encoding.
//!
//! Commands are short text frames addressed to a node and a device:
//!
//! ```text
//! C|nn|dd|CCCC[|params]
//! ```
//!
//! `nn` and `dd` are zero-padded to two digits and `CCCC` is exactly four
//! characters (truncated or space-padded). Encoding is deterministic: the
//! same command value always yields the same wire string.

use crate::constants::{COMMAND_SIZE, EOL, NO_DEVICE};
use crate::error::ProtocolError;
use crate::types::{DeviceId, NodeId};

/// An immutable outbound command, built once and handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    /// Target node, or `None` to broadcast to every node.
    node: Option<NodeId>,
    /// Target device (device `00` addresses the node itself).
    device: DeviceId,
    /// Command code, non-empty by construction.
    code: String,
    /// Optional parameter string.
    params: Option<String>,
}

impl OutboundCommand {
    /// Build a command addressed to one node.
    ///
    /// An empty `code` is an input-contract violation and is reported to the
    /// caller instead of being silently dropped.
    pub fn new(
        node: NodeId,
        device: DeviceId,
        code: &str,
        params: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        Self::build(Some(node), device, code, params)
    }

    /// Build a command broadcast to every registered node (the Relayer
    /// recognizes `--` in the node field).
    pub fn broadcast(
        device: DeviceId,
        code: &str,
        params: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        Self::build(None, device, code, params)
    }

    fn build(
        node: Option<NodeId>,
        device: DeviceId,
        code: &str,
        params: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        if code.trim().is_empty() {
            return Err(ProtocolError::EmptyCommandCode);
        }
        Ok(OutboundCommand {
            node,
            device,
            code: code.to_string(),
            params: params.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    /// Target node, if this is not a broadcast.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Target device.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Command code as given (un-padded).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Encode to the wire form, without the line terminator.
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(16 + self.params.as_ref().map_or(0, |p| p.len()));
        line.push('C');
        line.push('|');
        match self.node {
            Some(node) => line.push_str(&node.to_string()),
            None => line.push_str(NO_DEVICE),
        }
        line.push('|');
        line.push_str(&self.device.to_string());
        line.push('|');
        line.push_str(&format!("{:<width$.width$}", self.code, width = COMMAND_SIZE));
        if let Some(params) = &self.params {
            line.push('|');
            line.push_str(params);
        }
        line
    }

    /// Encode with the line terminator appended, ready for the transport.
    pub fn to_wire(&self) -> String {
        let mut line = self.encode();
        line.push_str(EOL);
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_without_params() {
        let cmd = OutboundCommand::new(NodeId::new(3), DeviceId::new(7), "SYSI", None).unwrap();
        assert_eq!(cmd.encode(), "C|03|07|SYSI");
    }

    #[test]
    fn test_encode_with_params() {
        let cmd = OutboundCommand::new(NodeId::new(3), DeviceId::new(7), "SYSI", Some("x")).unwrap();
        assert_eq!(cmd.encode(), "C|03|07|SYSI|x");
    }

    #[test]
    fn test_empty_params_produce_no_trailing_pipe() {
        let cmd = OutboundCommand::new(NodeId::new(3), DeviceId::new(7), "SYSI", Some("")).unwrap();
        assert_eq!(cmd.encode(), "C|03|07|SYSI");
    }

    #[test]
    fn test_code_is_padded_and_truncated() {
        let short = OutboundCommand::new(NodeId::new(0), DeviceId::new(0), "GO", None).unwrap();
        assert_eq!(short.encode(), "C|00|00|GO  ");

        let long = OutboundCommand::new(NodeId::new(0), DeviceId::new(0), "RESTART", None).unwrap();
        assert_eq!(long.encode(), "C|00|00|REST");
    }

    #[test]
    fn test_empty_code_is_rejected() {
        assert_eq!(
            OutboundCommand::new(NodeId::new(1), DeviceId::new(1), "", None),
            Err(ProtocolError::EmptyCommandCode)
        );
        assert_eq!(
            OutboundCommand::new(NodeId::new(1), DeviceId::new(1), "   ", None),
            Err(ProtocolError::EmptyCommandCode)
        );
    }

    #[test]
    fn test_broadcast_uses_sentinel_node() {
        let cmd = OutboundCommand::broadcast(DeviceId::new(0), "PING", None).unwrap();
        assert_eq!(cmd.encode(), "C|--|00|PING");
    }

    #[test]
    fn test_to_wire_is_terminated() {
        let cmd = OutboundCommand::new(NodeId::new(9), DeviceId::new(1), "GRAT", None).unwrap();
        assert_eq!(cmd.to_wire(), "C|09|01|GRAT\n");
    }
}
