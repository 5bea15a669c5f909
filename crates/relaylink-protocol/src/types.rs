//! Common types used in the protocol.

use crate::constants::*;

/// A node index assigned by the Relayer (0-19 on the wire).
///
/// Range enforcement against [`MAX_NODES`] is a registry concern; the parser
/// preserves whatever index the wire carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u8);

impl NodeId {
    /// Create a new node id.
    pub fn new(index: u8) -> Self {
        NodeId(index)
    }

    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Whether this id is addressable by a Relayer.
    pub fn in_range(&self) -> bool {
        (self.0 as usize) < MAX_NODES
    }

    /// Parse a wire field (`"03"`) into a node id.
    pub(crate) fn from_field(field: &str) -> Option<Self> {
        field.trim().parse::<u8>().ok().map(NodeId)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A device index within a node (0-99 on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(u8);

impl DeviceId {
    /// Create a new device id.
    pub fn new(index: u8) -> Self {
        DeviceId(index)
    }

    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Whether this id is addressable on a node.
    pub fn in_range(&self) -> bool {
        (self.0 as usize) < MAX_DEVICES
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// The device field of a frame: either a real device index or the `--`
/// sentinel meaning the frame is node-level.
///
/// The sentinel can never be used to index device storage by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRef {
    /// A specific device on the node.
    Device(DeviceId),
    /// No associated device (the `--` sentinel).
    None,
}

impl DeviceRef {
    /// Decode a wire field. Anything that is not a decimal index (including
    /// the `--` sentinel) maps to [`DeviceRef::None`]; whether that is
    /// acceptable depends on the payload kind and is decided by the parser.
    pub fn from_field(field: &str) -> Self {
        match field.trim().parse::<u8>() {
            Ok(index) => DeviceRef::Device(DeviceId(index)),
            Err(_) => DeviceRef::None,
        }
    }

    /// Get the device id, if any.
    pub fn device(&self) -> Option<DeviceId> {
        match self {
            DeviceRef::Device(id) => Some(*id),
            DeviceRef::None => None,
        }
    }
}

impl std::fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRef::Device(id) => write!(f, "{}", id),
            DeviceRef::None => write!(f, "{}", NO_DEVICE),
        }
    }
}

/// Tri-state flag for per-device capabilities (immediate/periodic
/// processing). A device's state is unknown until it has announced itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    /// Not yet reported by the device.
    #[default]
    Unknown,
    /// Reported enabled (`Y`).
    Enabled,
    /// Reported disabled (`N`).
    Disabled,
}

impl Flag {
    /// Decode the `Y`/`N` wire form. Anything else is [`Flag::Unknown`].
    pub fn from_yn(field: &str) -> Self {
        match field.trim() {
            "Y" => Flag::Enabled,
            "N" => Flag::Disabled,
            _ => Flag::Unknown,
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flag::Unknown => write!(f, "?"),
            Flag::Enabled => write!(f, "Y"),
            Flag::Disabled => write!(f, "N"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display_is_zero_padded() {
        assert_eq!(NodeId::new(3).to_string(), "03");
        assert_eq!(NodeId::new(19).to_string(), "19");
    }

    #[test]
    fn test_node_id_range() {
        assert!(NodeId::new(0).in_range());
        assert!(NodeId::new(19).in_range());
        assert!(!NodeId::new(20).in_range());
    }

    #[test]
    fn test_device_ref_sentinel() {
        assert_eq!(DeviceRef::from_field("--"), DeviceRef::None);
        assert_eq!(
            DeviceRef::from_field("07"),
            DeviceRef::Device(DeviceId::new(7))
        );
        assert_eq!(DeviceRef::from_field("junk"), DeviceRef::None);
        assert_eq!(DeviceRef::None.to_string(), "--");
    }

    #[test]
    fn test_flag_round_trip() {
        assert_eq!(Flag::from_yn("Y"), Flag::Enabled);
        assert_eq!(Flag::from_yn("N"), Flag::Disabled);
        assert_eq!(Flag::from_yn("maybe"), Flag::Unknown);
    }
}
