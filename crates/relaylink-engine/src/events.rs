//! Typed event publication.
//!
//! Subscribers (display widgets, the diagnostics sink, the file-transfer
//! collaborator) register callbacks on an [`EventBus`]. Delivery is
//! synchronous, in subscription order, at most once per subscriber per
//! event, so subscribers observe protocol events in exactly the order the
//! frames arrived on the wire. Unsubscribe is explicit; a subscriber whose
//! lifetime ends must remove itself or its callback leaks.

use parking_lot::Mutex;
use relaylink_protocol::{DeviceRef, NodeId};

use crate::registry::NodeStatus;

/// Raw payload of a file-transfer frame, passed through uninterpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum FilePayload {
    /// A `FILES=` listing.
    Listing(String),
    /// A `FILE=` contents frame.
    Contents(String),
}

/// Events published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A numeric sample arrived from a device.
    DeviceData {
        /// Source node.
        node: NodeId,
        /// Source device (`None` for node-level readings).
        device: DeviceRef,
        /// Device-reported timestamp.
        timestamp: u64,
        /// Sampled value.
        value: f64,
    },

    /// A node's liveness status changed.
    StatusChanged {
        /// Affected node.
        node: NodeId,
        /// New status.
        status: NodeStatus,
    },

    /// A node or device was added to the registry; tree views should
    /// rebuild from a fresh snapshot.
    TopologyChanged,

    /// A human-readable trace line for the diagnostics sink.
    LogLine {
        /// Node the line is attributed to, if any.
        node: Option<NodeId>,
        /// The trace text.
        text: String,
    },

    /// A file-transfer frame, surfaced for the out-of-scope collaborator.
    FileTransfer {
        /// Source node.
        node: NodeId,
        /// Listing or contents payload.
        payload: FilePayload,
    },
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Box<dyn Fn(&EngineEvent) + Send>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Callback)>,
}

/// Ordered, synchronous publish/subscribe channel for [`EngineEvent`]s.
///
/// Shared between the engine and the heartbeat thread. Callbacks run under
/// the bus lock and must not subscribe or unsubscribe from within a
/// delivery.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Returns the id needed to unsubscribe.
    pub fn subscribe(&self, callback: impl Fn(&EngineEvent) + Send + 'static) -> SubscriberId {
        let mut inner = self.inner.lock();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn publish(&self, event: &EngineEvent) {
        let inner = self.inner.lock();
        for (_, callback) in inner.subscribers.iter() {
            callback(event);
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
