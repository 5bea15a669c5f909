//! Inbound frame parsing.
//!
//! Every line from the Relayer decodes into exactly one [`ParsedMessage`].
//! Parsing never fails and never panics: a structurally invalid line becomes
//! [`ParsedMessage::Malformed`] so the engine can log it and keep running.
//!
//! Data-frame payloads are dispatched by structural sniffing. The numeric
//! check runs first: sensor samples dominate traffic volume and must take
//! the shortest path through the parser.

use crate::constants::*;
use crate::types::{DeviceId, DeviceRef, Flag, NodeId};

/// A decoded inbound frame.
///
/// Produced by [`ParsedMessage::parse`], never mutated, consumed exactly
/// once by the engine's dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// A numeric sensor reading: `D|nn|dd|7.25|124500`.
    NumericSample {
        /// Source node.
        node: NodeId,
        /// Source device, or `None` for a node-level reading.
        device: DeviceRef,
        /// Device-reported timestamp (usually millis since node boot).
        timestamp: u64,
        /// The sampled value.
        value: f64,
    },

    /// Node self-description: `NOINFO=name,version,mac,numDevices`.
    NodeInfo {
        /// Source node.
        node: NodeId,
        /// Node name.
        name: String,
        /// Node firmware version.
        version: String,
        /// Node MAC address string.
        mac_address: String,
        /// Number of devices the node declares it hosts.
        num_devices: u8,
    },

    /// Device self-description: `DEINFO=name,version,ipEn,ppEn,rate`.
    DeviceInfo {
        /// Source node.
        node: NodeId,
        /// Described device.
        device: DeviceId,
        /// Device name.
        name: String,
        /// Device firmware version.
        version: String,
        /// Immediate-processing state.
        ip_enabled: Flag,
        /// Periodic-processing state.
        pp_enabled: Flag,
        /// Sampling-rate descriptor (unit-less text).
        rate: String,
    },

    /// Node name acknowledgement: `NONAME=<text>`.
    NodeRename {
        /// Source node.
        node: NodeId,
        /// New name.
        name: String,
    },

    /// Device name acknowledgement: `DENAME=<text>`.
    DeviceRename {
        /// Source node.
        node: NodeId,
        /// Renamed device.
        device: DeviceId,
        /// New name.
        name: String,
    },

    /// Sampling-rate acknowledgement: `RATE=<text>`.
    RateUpdate {
        /// Source node.
        node: NodeId,
        /// Affected device.
        device: DeviceId,
        /// New rate descriptor.
        rate: String,
    },

    /// Immediate-processing toggle: `IP Enabled` / `IP Disabled`.
    IpToggle {
        /// Source node.
        node: NodeId,
        /// Affected device.
        device: DeviceId,
        /// Resulting state.
        enabled: Flag,
    },

    /// Periodic-processing toggle: `PP Enabled` / `PP Disabled`.
    PpToggle {
        /// Source node.
        node: NodeId,
        /// Affected device.
        device: DeviceId,
        /// Resulting state.
        enabled: Flag,
    },

    /// Node version reply: `NVER=<text>`.
    NodeVersion {
        /// Source node.
        node: NodeId,
        /// Version string.
        version: String,
    },

    /// Device version reply: `DVER=<text>`.
    DeviceVersion {
        /// Source node.
        node: NodeId,
        /// Described device.
        device: DeviceId,
        /// Version string.
        version: String,
    },

    /// Error reported by a node or device: `ERROR:<text>`.
    NodeErrorNotice {
        /// Source node.
        node: NodeId,
        /// Source device, if the error is device-scoped.
        device: DeviceRef,
        /// Error text.
        text: String,
    },

    /// Keep-alive reply from a silent-but-healthy node.
    Pong {
        /// Source node.
        node: NodeId,
    },

    /// File listing from a node (`FILES=`). Accepted and surfaced to the
    /// file-transfer collaborator; not interpreted here.
    FileListing {
        /// Source node.
        node: NodeId,
        /// Raw listing text after the prefix.
        raw: String,
    },

    /// File contents from a node (`FILE=`). Accepted and surfaced; not
    /// interpreted here.
    FileContents {
        /// Source node.
        node: NodeId,
        /// Raw contents text after the prefix.
        raw: String,
    },

    /// A well-shaped data frame whose payload keyword is not recognized.
    UnknownStatus {
        /// Source node.
        node: NodeId,
        /// Source device field.
        device: DeviceRef,
        /// The unrecognized payload.
        raw: String,
    },

    /// A new node attached to the Relayer: `NODE|nn`.
    NodeAnnounce {
        /// The announced node.
        node: NodeId,
    },

    /// Relayer-level error: `ERROR:<text>` with no node association.
    RelayerError {
        /// Error text.
        text: String,
    },

    /// A command frame echoed back by the Relayer for diagnostics.
    CommandEcho {
        /// Target node.
        node: NodeId,
        /// Target device field.
        device: DeviceRef,
        /// 4-character command code.
        code: String,
        /// Parameter string, if the command carried one.
        params: Option<String>,
    },

    /// A line that does not match any frame shape. Non-fatal; logged and
    /// dropped by the engine.
    Malformed {
        /// The offending line.
        line: String,
    },
}

impl ParsedMessage {
    /// Decode one line (without its terminator) into a message.
    pub fn parse(line: &str) -> ParsedMessage {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix(NODE_ANNOUNCE_PREFIX) {
            return match NodeId::from_field(rest) {
                Some(node) => ParsedMessage::NodeAnnounce { node },
                None => Self::malformed(line),
            };
        }

        if let Some(text) = line.strip_prefix(RELAYER_ERROR_PREFIX) {
            return ParsedMessage::RelayerError {
                text: text.to_string(),
            };
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 4 {
            return Self::malformed(line);
        }

        let node = match NodeId::from_field(fields[1]) {
            Some(node) => node,
            None => return Self::malformed(line),
        };
        let device = DeviceRef::from_field(fields[2]);

        match fields[0] {
            "D" => Self::parse_data_frame(line, node, device, &fields),
            "C" => ParsedMessage::CommandEcho {
                node,
                device,
                code: fields[3].to_string(),
                params: if fields.len() > 4 {
                    Some(fields[4..].join("|"))
                } else {
                    None
                },
            },
            _ => Self::malformed(line),
        }
    }

    /// Dispatch a `D` frame's payload.
    ///
    /// The timestamp is the final field when one is present and numeric;
    /// everything between the device field and the timestamp is payload
    /// (free-form error text may itself contain `|`).
    fn parse_data_frame(
        line: &str,
        node: NodeId,
        device: DeviceRef,
        fields: &[&str],
    ) -> ParsedMessage {
        let (payload, timestamp) = match fields.last().and_then(|f| f.parse::<u64>().ok()) {
            Some(ts) if fields.len() > 4 => (fields[3..fields.len() - 1].join("|"), ts),
            _ => (fields[3..].join("|"), 0),
        };

        // Hot path: sensor samples start with a digit or a minus sign.
        if payload
            .as_bytes()
            .first()
            .is_some_and(|b| b.is_ascii_digit() || *b == b'-')
        {
            if let Ok(value) = payload.parse::<f64>() {
                return ParsedMessage::NumericSample {
                    node,
                    device,
                    timestamp,
                    value,
                };
            }
            return ParsedMessage::UnknownStatus {
                node,
                device,
                raw: payload,
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_NODE_INFO) {
            return Self::parse_node_info(line, node, rest);
        }

        if let Some(rest) = payload.strip_prefix(KEY_DEVICE_INFO) {
            return match device.device() {
                Some(device) => Self::parse_device_info(line, node, device, rest),
                None => Self::malformed(line),
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_NODE_NAME) {
            return ParsedMessage::NodeRename {
                node,
                name: rest.to_string(),
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_DEVICE_NAME) {
            return match device.device() {
                Some(device) => ParsedMessage::DeviceRename {
                    node,
                    device,
                    name: rest.to_string(),
                },
                None => Self::malformed(line),
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_RATE) {
            return match device.device() {
                Some(device) => ParsedMessage::RateUpdate {
                    node,
                    device,
                    rate: rest.to_string(),
                },
                None => Self::malformed(line),
            };
        }

        if payload == KEY_IP_ENABLED || payload == KEY_IP_DISABLED {
            return match device.device() {
                Some(device) => ParsedMessage::IpToggle {
                    node,
                    device,
                    enabled: if payload == KEY_IP_ENABLED {
                        Flag::Enabled
                    } else {
                        Flag::Disabled
                    },
                },
                None => Self::malformed(line),
            };
        }

        if payload == KEY_PP_ENABLED || payload == KEY_PP_DISABLED {
            return match device.device() {
                Some(device) => ParsedMessage::PpToggle {
                    node,
                    device,
                    enabled: if payload == KEY_PP_ENABLED {
                        Flag::Enabled
                    } else {
                        Flag::Disabled
                    },
                },
                None => Self::malformed(line),
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_NODE_VERSION) {
            return ParsedMessage::NodeVersion {
                node,
                version: rest.to_string(),
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_DEVICE_VERSION) {
            return match device.device() {
                Some(device) => ParsedMessage::DeviceVersion {
                    node,
                    device,
                    version: rest.to_string(),
                },
                None => Self::malformed(line),
            };
        }

        if let Some(text) = payload.strip_prefix(KEY_ERROR) {
            return ParsedMessage::NodeErrorNotice {
                node,
                device,
                text: text.to_string(),
            };
        }

        if payload.starts_with(KEY_PONG) {
            return ParsedMessage::Pong { node };
        }

        if let Some(rest) = payload.strip_prefix(KEY_FILE_LISTING) {
            return ParsedMessage::FileListing {
                node,
                raw: rest.to_string(),
            };
        }

        if let Some(rest) = payload.strip_prefix(KEY_FILE_CONTENTS) {
            return ParsedMessage::FileContents {
                node,
                raw: rest.to_string(),
            };
        }

        ParsedMessage::UnknownStatus {
            node,
            device,
            raw: payload,
        }
    }

    /// Parse `NOINFO=name,version,mac,numDevices`.
    fn parse_node_info(line: &str, node: NodeId, rest: &str) -> ParsedMessage {
        let parts: Vec<&str> = rest.split(',').collect();
        if parts.len() < 4 {
            return Self::malformed(line);
        }
        let num_devices = match parts[3].trim().parse::<u8>() {
            Ok(n) => n,
            Err(_) => return Self::malformed(line),
        };
        ParsedMessage::NodeInfo {
            node,
            name: parts[0].to_string(),
            version: parts[1].to_string(),
            mac_address: parts[2].to_string(),
            num_devices,
        }
    }

    /// Parse `DEINFO=name,version,ipEn,ppEn,rate`.
    fn parse_device_info(line: &str, node: NodeId, device: DeviceId, rest: &str) -> ParsedMessage {
        let parts: Vec<&str> = rest.split(',').collect();
        if parts.len() < 5 {
            return Self::malformed(line);
        }
        ParsedMessage::DeviceInfo {
            node,
            device,
            name: parts[0].to_string(),
            version: parts[1].to_string(),
            ip_enabled: Flag::from_yn(parts[2]),
            pp_enabled: Flag::from_yn(parts[3]),
            rate: parts[4].to_string(),
        }
    }

    fn malformed(line: &str) -> ParsedMessage {
        ParsedMessage::Malformed {
            line: line.to_string(),
        }
    }

    /// The source node, for every variant that has one.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            ParsedMessage::NumericSample { node, .. }
            | ParsedMessage::NodeInfo { node, .. }
            | ParsedMessage::DeviceInfo { node, .. }
            | ParsedMessage::NodeRename { node, .. }
            | ParsedMessage::DeviceRename { node, .. }
            | ParsedMessage::RateUpdate { node, .. }
            | ParsedMessage::IpToggle { node, .. }
            | ParsedMessage::PpToggle { node, .. }
            | ParsedMessage::NodeVersion { node, .. }
            | ParsedMessage::DeviceVersion { node, .. }
            | ParsedMessage::NodeErrorNotice { node, .. }
            | ParsedMessage::Pong { node }
            | ParsedMessage::FileListing { node, .. }
            | ParsedMessage::FileContents { node, .. }
            | ParsedMessage::UnknownStatus { node, .. }
            | ParsedMessage::NodeAnnounce { node }
            | ParsedMessage::CommandEcho { node, .. } => Some(*node),
            ParsedMessage::RelayerError { .. } | ParsedMessage::Malformed { .. } => None,
        }
    }
}
