//! The node/device registry.
//!
//! A fixed table of up to [`MAX_NODES`] nodes, built incrementally from
//! asynchronous announcements. The table is single-writer: all mutation goes
//! through the engine's inbound path (the heartbeat thread only flips status
//! flags via [`Registry::sweep_stale`]). Nodes are created lazily on their
//! first info announcement and are never removed except by [`Registry::reset`]
//! on transport loss.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use relaylink_protocol::{DeviceId, Flag, NodeId, MAX_NODES};

use crate::error::EngineError;

/// Liveness status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeStatus {
    /// The node has been heard from recently.
    #[default]
    Ok,
    /// No frame received within the staleness threshold.
    NonResponding,
}

/// A sensor or actuator hosted by a node.
///
/// Fields fill in as the device announces itself; partial population
/// mid-handshake is normal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Device {
    /// Device name.
    pub name: String,
    /// Device firmware version.
    pub version: String,
    /// Immediate-processing state.
    pub ip_enabled: Flag,
    /// Periodic-processing state.
    pub pp_enabled: Flag,
    /// Sampling-rate descriptor (unit-less text).
    pub rate: String,
}

/// A field node registered with the Relayer.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name.
    pub name: String,
    /// Node firmware version.
    pub version: String,
    /// Node MAC address string.
    pub mac_address: String,
    /// Device count declared by the node at announce time. Authoritative
    /// even before every device has sent its own info.
    pub num_devices: u8,
    /// Devices seen so far, keyed by device index. May hold fewer (or,
    /// transiently, other) entries than `num_devices` declares.
    pub devices: BTreeMap<DeviceId, Device>,
    /// Liveness status, maintained by touch/sweep.
    pub status: NodeStatus,
    /// Local receipt time of the last frame from this node. This is the
    /// console's clock, never a device-reported timestamp.
    pub last_message: Option<Instant>,
}

impl Node {
    fn new(profile: NodeProfile) -> Self {
        Node {
            name: profile.name,
            version: profile.version,
            mac_address: profile.mac_address,
            num_devices: profile.num_devices,
            devices: BTreeMap::new(),
            status: NodeStatus::Ok,
            last_message: None,
        }
    }
}

/// The identity fields a node reports in its info announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProfile {
    /// Node name.
    pub name: String,
    /// Node firmware version.
    pub version: String,
    /// Node MAC address string.
    pub mac_address: String,
    /// Declared device count.
    pub num_devices: u8,
}

/// A partial device update. Unset fields preserve the current value.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    /// New name, if reported.
    pub name: Option<String>,
    /// New version, if reported.
    pub version: Option<String>,
    /// New immediate-processing state, if reported.
    pub ip_enabled: Option<Flag>,
    /// New periodic-processing state, if reported.
    pub pp_enabled: Option<Flag>,
    /// New rate descriptor, if reported.
    pub rate: Option<String>,
}

/// Result of [`Registry::ensure_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The node did not exist and was created.
    Created,
    /// The node existed and at least one field changed.
    Updated,
    /// The node existed and the update was identical.
    Unchanged,
}

/// Result of [`Registry::update_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// First sighting of this device index; an entry was created.
    Created,
    /// The device existed and at least one field changed.
    Updated,
    /// The device existed and the update was identical.
    Unchanged,
}

/// Sparse store of node records, indexed by node id.
#[derive(Debug)]
pub struct Registry {
    nodes: [Option<Node>; MAX_NODES],
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry {
            nodes: std::array::from_fn(|_| None),
        }
    }

    fn slot(&self, id: NodeId) -> Result<&Option<Node>, EngineError> {
        if !id.in_range() {
            return Err(EngineError::InvalidNodeId(id.index()));
        }
        Ok(&self.nodes[id.index()])
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Option<Node>, EngineError> {
        if !id.in_range() {
            return Err(EngineError::InvalidNodeId(id.index()));
        }
        Ok(&mut self.nodes[id.index()])
    }

    /// Create the node if absent, otherwise update its identity fields in
    /// place. Idempotent: repeating an identical announcement reports
    /// [`EnsureOutcome::Unchanged`] and leaves the record untouched.
    pub fn ensure_node(
        &mut self,
        id: NodeId,
        profile: NodeProfile,
    ) -> Result<EnsureOutcome, EngineError> {
        let slot = self.slot_mut(id)?;
        match slot {
            None => {
                *slot = Some(Node::new(profile));
                Ok(EnsureOutcome::Created)
            }
            Some(node) => {
                if node.name == profile.name
                    && node.version == profile.version
                    && node.mac_address == profile.mac_address
                    && node.num_devices == profile.num_devices
                {
                    return Ok(EnsureOutcome::Unchanged);
                }
                node.name = profile.name;
                node.version = profile.version;
                node.mac_address = profile.mac_address;
                node.num_devices = profile.num_devices;
                Ok(EnsureOutcome::Updated)
            }
        }
    }

    /// Apply a partial update to a device, creating its entry on first
    /// sight. The parent node must already exist: updating a device of an
    /// unannounced node is an [`EngineError::UnknownNode`], not a crash.
    pub fn update_device(
        &mut self,
        id: NodeId,
        device: DeviceId,
        update: DeviceUpdate,
    ) -> Result<DeviceOutcome, EngineError> {
        let slot = self.slot_mut(id)?;
        let node = slot.as_mut().ok_or(EngineError::UnknownNode(id))?;

        let (entry, created) = match node.devices.entry(device) {
            std::collections::btree_map::Entry::Vacant(v) => (v.insert(Device::default()), true),
            std::collections::btree_map::Entry::Occupied(o) => (o.into_mut(), false),
        };

        let before = entry.clone();
        if let Some(name) = update.name {
            entry.name = name;
        }
        if let Some(version) = update.version {
            entry.version = version;
        }
        if let Some(ip) = update.ip_enabled {
            entry.ip_enabled = ip;
        }
        if let Some(pp) = update.pp_enabled {
            entry.pp_enabled = pp;
        }
        if let Some(rate) = update.rate {
            entry.rate = rate;
        }

        if created {
            Ok(DeviceOutcome::Created)
        } else if *entry == before {
            Ok(DeviceOutcome::Unchanged)
        } else {
            Ok(DeviceOutcome::Updated)
        }
    }

    /// Set a node's name (rename acknowledgement).
    pub fn rename_node(&mut self, id: NodeId, name: &str) -> Result<(), EngineError> {
        let slot = self.slot_mut(id)?;
        let node = slot.as_mut().ok_or(EngineError::UnknownNode(id))?;
        node.name = name.to_string();
        Ok(())
    }

    /// Set a node's firmware version.
    pub fn set_node_version(&mut self, id: NodeId, version: &str) -> Result<(), EngineError> {
        let slot = self.slot_mut(id)?;
        let node = slot.as_mut().ok_or(EngineError::UnknownNode(id))?;
        node.version = version.to_string();
        Ok(())
    }

    /// Record local receipt time for a node. Returns `Some(NodeStatus::Ok)`
    /// when this revives a non-responding node, so the caller can publish
    /// the status change. Unknown or out-of-range nodes are a no-op.
    pub fn touch(&mut self, id: NodeId, at: Instant) -> Option<NodeStatus> {
        let node = self.nodes.get_mut(id.index())?.as_mut()?;
        node.last_message = Some(at);
        if node.status == NodeStatus::NonResponding {
            node.status = NodeStatus::Ok;
            return Some(NodeStatus::Ok);
        }
        None
    }

    /// Mark every node whose last frame is older than `threshold` as
    /// non-responding. Returns the ids that transitioned on this sweep.
    /// Never removes a node.
    pub fn sweep_stale(&mut self, now: Instant, threshold: Duration) -> Vec<NodeId> {
        let mut stale = Vec::new();
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            let Some(node) = slot.as_mut() else { continue };
            if node.status != NodeStatus::Ok {
                continue;
            }
            let Some(last) = node.last_message else { continue };
            if now.saturating_duration_since(last) >= threshold {
                node.status = NodeStatus::NonResponding;
                stale.push(NodeId::new(index as u8));
            }
        }
        stale
    }

    /// Sum of the declared device counts over all known nodes. The declared
    /// count is authoritative: the total is known before every device has
    /// announced itself.
    pub fn total_device_count(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .map(|n| n.num_devices as usize)
            .sum()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slot(id).ok()?.as_ref()
    }

    /// Iterate over all known nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId::new(i as u8), n)))
    }

    /// Number of known nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Clone the full registry state. External readers get copies, never
    /// references into the live table.
    pub fn snapshot(&self) -> Vec<(NodeId, Node)> {
        self.nodes()
            .map(|(id, node)| (id, node.clone()))
            .collect()
    }

    /// Discard all state (transport loss).
    pub fn reset(&mut self) {
        for slot in self.nodes.iter_mut() {
            *slot = None;
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
