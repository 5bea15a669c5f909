//! End-to-end engine tests against an in-memory transport.
//!
//! These drive the engine exactly the way the read loop does, one complete
//! line at a time, and assert on the outbound wire traffic, the published
//! events, and the registry snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relaylink_engine::{
    EngineConfig, EngineEvent, HeartbeatConfig, LinkState, NodeStatus, ProtocolEngine,
    SerialSettings, Transport, TransportError,
};
use relaylink_protocol::{DeviceId, DeviceRef, NodeId};

/// Transport double that records every line handed to it.
#[derive(Clone, Default)]
struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    open: Arc<AtomicBool>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

impl Transport for MockTransport {
    fn choose_port(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn open(&mut self, _settings: &SerialSettings) -> Result<bool, TransportError> {
        self.open.store(true, Ordering::SeqCst);
        Ok(true)
    }

    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        self.sent.lock().push(line.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Engine plus handles for inspecting traffic and events.
struct Harness {
    engine: ProtocolEngine<MockTransport>,
    transport: MockTransport,
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

fn harness_with(config: EngineConfig) -> Harness {
    let transport = MockTransport::new();
    let engine = ProtocolEngine::new(transport.clone(), config);

    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder = events.clone();
    engine.events().subscribe(move |event| {
        recorder.lock().push(event.clone());
    });

    Harness {
        engine,
        transport,
        events,
    }
}

impl Harness {
    fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    fn seed_node_3(&mut self) {
        self.engine
            .on_line("D|03|00|NOINFO=Pump1,1.2.0,AA:BB:CC:DD:EE:FF,4|123456");
    }
}

#[test]
fn test_node_announce_triggers_info_handshake_in_order() {
    let mut h = harness();
    h.engine.on_line("NODE|03");

    assert_eq!(
        h.transport.sent_lines(),
        vec!["C|03|00|GNOI\n".to_string(), "C|03|00|GDEI\n".to_string()]
    );
}

#[test]
fn test_out_of_range_announce_sends_nothing() {
    let mut h = harness();
    h.engine.on_line("NODE|20");
    assert!(h.transport.sent_lines().is_empty());
}

#[test]
fn test_node_info_creates_registry_entry() {
    let mut h = harness();
    h.seed_node_3();

    let snapshot = h.engine.snapshot();
    assert_eq!(snapshot.len(), 1);
    let (id, node) = &snapshot[0];
    assert_eq!(*id, NodeId::new(3));
    assert_eq!(node.name, "Pump1");
    assert_eq!(node.version, "1.2.0");
    assert_eq!(node.mac_address, "AA:BB:CC:DD:EE:FF");
    assert_eq!(node.num_devices, 4);
    assert!(node.devices.is_empty());
    assert!(node.last_message.is_some());

    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::TopologyChanged)));
}

#[test]
fn test_repeated_node_info_is_idempotent() {
    let mut h = harness();
    h.seed_node_3();
    let first = h.engine.snapshot();
    let topology_events = h
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::TopologyChanged))
        .count();

    h.seed_node_3();
    let second = h.engine.snapshot();

    // Only the liveness clock moves; identity and devices are untouched.
    assert_eq!(first[0].1.name, second[0].1.name);
    assert_eq!(first[0].1.devices, second[0].1.devices);
    assert_eq!(first[0].1.num_devices, second[0].1.num_devices);
    assert_eq!(
        h.events()
            .iter()
            .filter(|e| matches!(e, EngineEvent::TopologyChanged))
            .count(),
        topology_events
    );
}

#[test]
fn test_device_info_populates_device() {
    let mut h = harness();
    h.seed_node_3();
    h.engine.on_line("D|03|02|DEINFO=Flow,1.0,Y,N,10|123999");

    let snapshot = h.engine.snapshot();
    let device = &snapshot[0].1.devices[&DeviceId::new(2)];
    assert_eq!(device.name, "Flow");
    assert_eq!(device.version, "1.0");
    assert_eq!(device.rate, "10");

    assert_eq!(h.engine.total_device_count(), 4);
}

#[test]
fn test_device_info_for_unknown_node_is_rejected_not_fatal() {
    let mut h = harness();
    h.engine.on_line("D|09|02|DEINFO=Flow,1.0,Y,N,10|123999");

    assert!(h.engine.snapshot().is_empty());
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::LogLine { .. })));

    // The engine keeps running.
    h.seed_node_3();
    assert_eq!(h.engine.snapshot().len(), 1);
}

#[test]
fn test_numeric_sample_publishes_device_data() {
    let mut h = harness();
    h.seed_node_3();
    h.engine.on_line("D|03|02|7.25|124500");

    let data: Vec<_> = h
        .events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::DeviceData { .. }))
        .collect();
    assert_eq!(
        data,
        vec![EngineEvent::DeviceData {
            node: NodeId::new(3),
            device: DeviceRef::Device(DeviceId::new(2)),
            timestamp: 124500,
            value: 7.25,
        }]
    );

    // Liveness uses the console's clock, not the 124500 on the wire.
    let snapshot = h.engine.snapshot();
    assert!(snapshot[0].1.last_message.is_some());
}

#[test]
fn test_field_updates_preserve_other_fields() {
    let mut h = harness();
    h.seed_node_3();
    h.engine.on_line("D|03|02|DEINFO=Flow,1.0,Y,N,10|123999");

    h.engine.on_line("D|03|02|RATE=120|124100");
    h.engine.on_line("D|03|02|IP Disabled|124200");
    h.engine.on_line("D|03|02|DENAME=FlowMeter|124300");

    let snapshot = h.engine.snapshot();
    let device = &snapshot[0].1.devices[&DeviceId::new(2)];
    assert_eq!(device.rate, "120");
    assert_eq!(device.name, "FlowMeter");
    assert_eq!(device.version, "1.0");
}

#[test]
fn test_relayer_error_is_always_surfaced() {
    let mut h = harness();
    h.engine.on_line("ERROR:Unable to send Command String: 12");

    assert!(h.events().iter().any(|e| matches!(
        e,
        EngineEvent::LogLine { node: None, text } if text.contains("Unable to send")
    )));
}

#[test]
fn test_file_frames_are_surfaced_not_rejected() {
    let mut h = harness();
    h.seed_node_3();
    h.engine.on_line("D|03|--|FILES=a.txt,b.txt|200");
    h.engine.on_line("D|03|--|FILE=hello|201");

    let files = h
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::FileTransfer { .. }))
        .count();
    assert_eq!(files, 2);
}

#[test]
fn test_malformed_flood_does_not_stop_the_engine() {
    let mut h = harness();
    for line in [
        "",
        "garbage",
        "D|xx|02|7.25|1",
        "D|03|02",
        "X|03|02|1|2",
        "NODE|junk",
    ] {
        h.engine.on_line(line);
    }

    // Still fully functional afterwards.
    h.seed_node_3();
    h.engine.on_line("D|03|02|7.25|124500");
    assert_eq!(h.engine.snapshot().len(), 1);
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::DeviceData { .. })));
}

#[test]
fn test_connect_starts_clean_and_disconnect_resets() {
    let mut h = harness();

    // State left over from a previous session...
    h.seed_node_3();
    assert_eq!(h.engine.snapshot().len(), 1);

    // ...is discarded when the link comes up.
    h.engine.connect().unwrap();
    assert_eq!(h.engine.state(), LinkState::Connected);
    assert!(h.transport.is_open());
    assert!(h.engine.snapshot().is_empty());

    h.seed_node_3();
    assert_eq!(h.engine.snapshot().len(), 1);

    // Disconnect tears everything down synchronously.
    h.engine.disconnect();
    assert_eq!(h.engine.state(), LinkState::Disconnected);
    assert!(!h.transport.is_open());
    assert!(h.engine.snapshot().is_empty());
}

#[test]
fn test_stale_node_flagged_then_revived_by_next_frame() {
    let mut h = harness_with(EngineConfig {
        serial: SerialSettings::default(),
        heartbeat: HeartbeatConfig {
            period: Duration::from_millis(50),
            staleness: Duration::from_millis(150),
        },
    });

    h.engine.connect().unwrap();
    h.seed_node_3();

    // Let the monitor observe well over the staleness threshold.
    std::thread::sleep(Duration::from_millis(500));

    assert!(h.events().iter().any(|e| matches!(
        e,
        EngineEvent::StatusChanged {
            node,
            status: NodeStatus::NonResponding,
        } if *node == NodeId::new(3)
    )));

    // The very next frame revives the node, without waiting for a sweep.
    h.engine.on_line("D|03|02|7.25|999999");
    assert!(h.events().iter().any(|e| matches!(
        e,
        EngineEvent::StatusChanged {
            node,
            status: NodeStatus::Ok,
        } if *node == NodeId::new(3)
    )));

    h.engine.disconnect();
}

#[test]
fn test_empty_command_code_is_reported_to_caller() {
    let mut h = harness();
    let err = h
        .engine
        .send_command(NodeId::new(1), DeviceId::new(0), "", None)
        .unwrap_err();
    assert!(err.to_string().contains("command code"));
    assert!(h.transport.sent_lines().is_empty());
}

#[test]
fn test_request_system_info_wire_form() {
    let mut h = harness();
    h.engine.request_system_info().unwrap();
    assert_eq!(h.transport.sent_lines(), vec!["C|00|00|SYSI\n".to_string()]);
}
