//! The protocol engine: link state machine and per-line dispatch.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use relaylink_protocol::{
    DeviceId, NodeId, OutboundCommand, ParsedMessage, CMD_GET_DEVICE_INFO, CMD_GET_NODE_INFO,
    CMD_SYSTEM_INFO,
};

use crate::error::{EngineError, TransportError};
use crate::events::{EngineEvent, EventBus, FilePayload};
use crate::heartbeat::{HeartbeatConfig, HeartbeatMonitor};
use crate::registry::{
    DeviceOutcome, DeviceUpdate, EnsureOutcome, Node, NodeProfile, Registry,
};
use crate::transport::{SerialSettings, Transport};

/// Link state.
///
/// `Connecting` begins with port selection; `Connected` begins once the
/// transport reports the link open. Entering `Connected` resets the registry
/// and starts the heartbeat monitor; any transport failure or end-of-stream
/// forces `Disconnected`, which stops the monitor and discards all registry
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No link.
    #[default]
    Disconnected,
    /// Port selection / open in progress.
    Connecting,
    /// Link open, read loop running.
    Connected,
}

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Serial settings passed to the transport on open.
    pub serial: SerialSettings,
    /// Heartbeat scan period and staleness threshold.
    pub heartbeat: HeartbeatConfig,
}

/// Orchestrates the protocol: receives lines from the transport, applies
/// them to the registry, publishes events, and issues follow-up commands.
pub struct ProtocolEngine<T: Transport> {
    transport: T,
    config: EngineConfig,
    registry: Arc<Mutex<Registry>>,
    events: Arc<EventBus>,
    heartbeat: Option<HeartbeatMonitor>,
    state: LinkState,
}

impl<T: Transport> ProtocolEngine<T> {
    /// Create an engine around a transport.
    pub fn new(transport: T, config: EngineConfig) -> Self {
        ProtocolEngine {
            transport,
            config,
            registry: Arc::new(Mutex::new(Registry::new())),
            events: Arc::new(EventBus::new()),
            heartbeat: None,
            state: LinkState::Disconnected,
        }
    }

    /// The event bus, for subscribing and unsubscribing.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Copy of the current registry contents.
    pub fn snapshot(&self) -> Vec<(NodeId, Node)> {
        self.registry.lock().snapshot()
    }

    /// Total declared device count across all known nodes.
    pub fn total_device_count(&self) -> usize {
        self.registry.lock().total_device_count()
    }

    /// Select and open the port, then bring the link up: fresh registry,
    /// heartbeat running, state `Connected`.
    pub fn connect(&mut self) -> Result<(), EngineError> {
        self.state = LinkState::Connecting;

        if let Err(err) = self.transport.choose_port() {
            self.state = LinkState::Disconnected;
            return Err(err.into());
        }
        match self.transport.open(&self.config.serial) {
            Ok(true) => {}
            Ok(false) => {
                self.state = LinkState::Disconnected;
                return Err(TransportError::OpenFailed("port declined to open".to_string()).into());
            }
            Err(err) => {
                self.state = LinkState::Disconnected;
                return Err(err.into());
            }
        }

        self.registry.lock().reset();
        self.heartbeat = Some(HeartbeatMonitor::start(
            self.config.heartbeat,
            Arc::clone(&self.registry),
            Arc::clone(&self.events),
        ));
        self.state = LinkState::Connected;
        tracing::info!("link up, read loop may start");
        Ok(())
    }

    /// Process one complete inbound line.
    ///
    /// Numeric samples take the shortest path: touch liveness, publish
    /// `DeviceData`, return. Everything else updates the registry and is
    /// surfaced per kind. No single line can take the engine down.
    pub fn on_line(&mut self, line: &str) {
        let received_at = Instant::now();

        match ParsedMessage::parse(line) {
            ParsedMessage::NumericSample {
                node,
                device,
                timestamp,
                value,
            } => {
                if !node.in_range() {
                    tracing::debug!(node = node.index(), "sample from out-of-range node");
                    return;
                }
                self.touch(node, received_at);
                self.events.publish(&EngineEvent::DeviceData {
                    node,
                    device,
                    timestamp,
                    value,
                });
            }
            message => self.on_status_message(message, received_at),
        }
    }

    /// Handle every non-sample message kind.
    fn on_status_message(&mut self, message: ParsedMessage, received_at: Instant) {
        match message {
            ParsedMessage::Malformed { line } => {
                let err = EngineError::MalformedFrame { line };
                tracing::debug!(%err, "discarding frame");
                self.log_line(None, err.to_string());
            }

            ParsedMessage::NodeAnnounce { node } => {
                if !node.in_range() {
                    tracing::warn!(node = node.index(), "announce for out-of-range node");
                    return;
                }
                self.log_line(Some(node), format!("Node {node} connected to Relayer"));
                // Seed the registry: request node info, then device info,
                // in that order.
                let _ = self.send_command(node, DeviceId::new(0), CMD_GET_NODE_INFO, None);
                let _ = self.send_command(node, DeviceId::new(0), CMD_GET_DEVICE_INFO, None);
                self.touch(node, received_at);
            }

            ParsedMessage::NodeInfo {
                node,
                name,
                version,
                mac_address,
                num_devices,
            } => {
                let profile = NodeProfile {
                    name,
                    version,
                    mac_address,
                    num_devices,
                };
                let outcome = self.registry.lock().ensure_node(node, profile);
                match outcome {
                    Ok(EnsureOutcome::Created) => {
                        self.events.publish(&EngineEvent::TopologyChanged);
                        self.log_line(Some(node), format!("Node {node} registered"));
                    }
                    Ok(EnsureOutcome::Updated) => {
                        self.events.publish(&EngineEvent::TopologyChanged);
                    }
                    Ok(EnsureOutcome::Unchanged) => {}
                    Err(err) => self.report(node, err),
                }
                self.touch(node, received_at);
            }

            ParsedMessage::DeviceInfo {
                node,
                device,
                name,
                version,
                ip_enabled,
                pp_enabled,
                rate,
            } => {
                let update = DeviceUpdate {
                    name: Some(name),
                    version: Some(version),
                    ip_enabled: Some(ip_enabled),
                    pp_enabled: Some(pp_enabled),
                    rate: Some(rate),
                };
                self.apply_device_update(node, device, update, received_at);
            }

            ParsedMessage::NodeRename { node, name } => {
                let result = self.registry.lock().rename_node(node, &name);
                if let Err(err) = result {
                    self.report(node, err);
                }
                self.touch(node, received_at);
            }

            ParsedMessage::DeviceRename { node, device, name } => {
                let update = DeviceUpdate {
                    name: Some(name),
                    ..Default::default()
                };
                self.apply_device_update(node, device, update, received_at);
            }

            ParsedMessage::RateUpdate { node, device, rate } => {
                let update = DeviceUpdate {
                    rate: Some(rate),
                    ..Default::default()
                };
                self.apply_device_update(node, device, update, received_at);
            }

            ParsedMessage::IpToggle {
                node,
                device,
                enabled,
            } => {
                let update = DeviceUpdate {
                    ip_enabled: Some(enabled),
                    ..Default::default()
                };
                self.apply_device_update(node, device, update, received_at);
            }

            ParsedMessage::PpToggle {
                node,
                device,
                enabled,
            } => {
                let update = DeviceUpdate {
                    pp_enabled: Some(enabled),
                    ..Default::default()
                };
                self.apply_device_update(node, device, update, received_at);
            }

            ParsedMessage::NodeVersion { node, version } => {
                let result = self.registry.lock().set_node_version(node, &version);
                if let Err(err) = result {
                    self.report(node, err);
                }
                self.touch(node, received_at);
            }

            ParsedMessage::DeviceVersion {
                node,
                device,
                version,
            } => {
                let update = DeviceUpdate {
                    version: Some(version),
                    ..Default::default()
                };
                self.apply_device_update(node, device, update, received_at);
            }

            ParsedMessage::NodeErrorNotice { node, device, text } => {
                // Node/device errors are always surfaced, never filtered.
                tracing::warn!(node = node.index(), %device, %text, "node error");
                self.log_line(Some(node), text);
                self.touch(node, received_at);
            }

            ParsedMessage::RelayerError { text } => {
                let err = EngineError::Relayer(text);
                tracing::warn!(%err);
                self.log_line(None, err.to_string());
            }

            ParsedMessage::Pong { node } => {
                self.log_line(Some(node), "PONG received".to_string());
                self.touch(node, received_at);
            }

            ParsedMessage::FileListing { node, raw } => {
                self.events.publish(&EngineEvent::FileTransfer {
                    node,
                    payload: FilePayload::Listing(raw),
                });
                self.touch(node, received_at);
            }

            ParsedMessage::FileContents { node, raw } => {
                self.events.publish(&EngineEvent::FileTransfer {
                    node,
                    payload: FilePayload::Contents(raw),
                });
                self.touch(node, received_at);
            }

            ParsedMessage::UnknownStatus { node, device, raw } => {
                let err = EngineError::UnknownStatusKey(raw);
                tracing::debug!(node = node.index(), %device, %err);
                self.log_line(Some(node), err.to_string());
                self.touch(node, received_at);
            }

            ParsedMessage::CommandEcho {
                node,
                device,
                code,
                params,
            } => {
                let text = match params {
                    Some(params) => format!("Command echo: {code} {params}"),
                    None => format!("Command echo: {code}"),
                };
                tracing::debug!(node = node.index(), %device, %text);
                self.log_line(Some(node), text);
                self.touch(node, received_at);
            }

            // Samples never land here; on_line intercepts them first.
            ParsedMessage::NumericSample { .. } => {}
        }
    }

    fn apply_device_update(
        &mut self,
        node: NodeId,
        device: DeviceId,
        update: DeviceUpdate,
        received_at: Instant,
    ) {
        // Release the registry before publishing: subscribers may take
        // snapshots from their callbacks.
        let outcome = self.registry.lock().update_device(node, device, update);
        match outcome {
            Ok(DeviceOutcome::Created) => self.events.publish(&EngineEvent::TopologyChanged),
            Ok(DeviceOutcome::Updated) | Ok(DeviceOutcome::Unchanged) => {}
            Err(err) => self.report(node, err),
        }
        self.touch(node, received_at);
    }

    /// Record receipt time; publish the revival transition if there is one.
    fn touch(&mut self, node: NodeId, at: Instant) {
        let revived = self.registry.lock().touch(node, at);
        if let Some(status) = revived {
            tracing::info!(node = node.index(), "node responding again");
            self.events
                .publish(&EngineEvent::StatusChanged { node, status });
        }
    }

    fn report(&self, node: NodeId, err: EngineError) {
        tracing::warn!(node = node.index(), %err, "registry update rejected");
        self.log_line(Some(node), err.to_string());
    }

    fn log_line(&self, node: Option<NodeId>, text: String) {
        self.events.publish(&EngineEvent::LogLine { node, text });
    }

    /// Build and send a command. Contract violations (empty command code)
    /// are reported to the caller; a failed send is logged once and the
    /// command abandoned. Replies, if any, arrive as ordinary inbound
    /// frames.
    pub fn send_command(
        &mut self,
        node: NodeId,
        device: DeviceId,
        code: &str,
        params: Option<&str>,
    ) -> Result<(), EngineError> {
        let command = OutboundCommand::new(node, device, code, params)?;
        self.send(&command)
    }

    /// Request full system info from the Relayer (it answers by issuing the
    /// info handshake to every registered node).
    pub fn request_system_info(&mut self) -> Result<(), EngineError> {
        let command = OutboundCommand::new(NodeId::new(0), DeviceId::new(0), CMD_SYSTEM_INFO, None)?;
        self.send(&command)
    }

    fn send(&mut self, command: &OutboundCommand) -> Result<(), EngineError> {
        if let Err(err) = self.transport.send(&command.to_wire()) {
            tracing::warn!(%err, encoded = %command.encode(), "command send failed");
            return Err(EngineError::TransportSendFailure(err));
        }
        Ok(())
    }

    /// Stop the heartbeat and discard all registry state. Used on every
    /// `Connected -> Disconnected` transition; no process restart needed.
    pub fn reset(&mut self) {
        if let Some(monitor) = self.heartbeat.take() {
            monitor.stop();
        }
        self.registry.lock().reset();
    }

    /// The transport reported end-of-stream or failure: surface it, then
    /// tear the link down.
    pub fn connection_lost(&mut self) {
        tracing::warn!("relayer disconnected");
        self.log_line(None, EngineError::ConnectionLost.to_string());
        self.disconnect();
    }

    /// Orderly shutdown: stop the heartbeat, discard registry state,
    /// release the transport. Completes synchronously; there are no
    /// partially-cancelled states.
    pub fn disconnect(&mut self) {
        self.reset();
        self.transport.close();
        self.state = LinkState::Disconnected;
    }
}
