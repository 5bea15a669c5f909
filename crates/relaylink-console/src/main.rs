//! Serial console for a Relayer field network.
//!
//! Opens the serial link, runs the read loop on a background thread, and
//! feeds complete lines into the protocol engine one at a time. Engine
//! events are rendered to stdout; diagnostics go through `tracing`
//! (`RUST_LOG=debug` shows discarded frames and unknown payloads).

mod config;
mod serial;

use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{bounded, RecvTimeoutError};
use relaylink_engine::{EngineConfig, EngineEvent, NodeStatus, ProtocolEngine};
use relaylink_protocol::LineCodec;

use crate::config::ConsoleConfig;
use crate::serial::SerialTransport;

#[derive(Parser, Debug)]
#[command(name = "relaylink", about = "Serial console for a Relayer field network")]
struct Args {
    /// Serial port path (first detected port when omitted).
    #[arg(long)]
    port: Option<String>,

    /// Baud rate override.
    #[arg(long)]
    baud: Option<u32>,

    /// YAML config file with serial/heartbeat overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// List detected serial ports and exit.
    #[arg(long)]
    list_ports: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if args.list_ports {
        list_ports();
        return;
    }

    let mut engine_config = match &args.config {
        Some(path) => match ConsoleConfig::load(path) {
            Ok(config) => config.engine_config(),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(baud) = args.baud {
        engine_config.serial.baud_rate = baud;
    }

    let transport = SerialTransport::new(args.port);
    let mut engine = ProtocolEngine::new(transport.clone(), engine_config);
    engine.events().subscribe(render_event);

    if let Err(e) = engine.connect() {
        eprintln!("Unable to connect to Relayer: {}", e);
        std::process::exit(1);
    }
    println!(
        "Connected to Relayer on {}",
        transport.port_name().unwrap_or_default()
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!(%e, "unable to install ctrl-c handler");
    }

    // Read loop: raw chunks -> line codec -> channel. Dropping the sender
    // signals end-of-stream to the main loop.
    let (line_tx, line_rx) = bounded::<String>(256);
    let mut reader = match transport.reader() {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Unable to start read loop: {}", e);
            std::process::exit(1);
        }
    };
    let reader_running = running.clone();
    let read_thread = thread::spawn(move || {
        let mut codec = LineCodec::new();
        let mut chunk = [0u8; 1024];
        while reader_running.load(Ordering::SeqCst) {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    codec.push(&chunk[..n]);
                    while let Some(line) = codec.next_line() {
                        if line_tx.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    tracing::warn!(%e, "serial read failed");
                    break;
                }
            }
        }
    });

    // The Relayer needs a moment after link-up before it will answer; then
    // ask for the full system picture.
    thread::sleep(Duration::from_secs(1));
    if let Err(e) = engine.request_system_info() {
        tracing::warn!(%e, "system info request failed");
    }

    // One line fully processed before the next is taken.
    while running.load(Ordering::SeqCst) {
        match line_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => engine.on_line(&line),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                engine.connection_lost();
                running.store(false, Ordering::SeqCst);
            }
        }
    }

    engine.disconnect();
    let _ = read_thread.join();
    println!("Disconnected.");
}

fn list_ports() {
    match serialport::available_ports() {
        Ok(ports) if !ports.is_empty() => {
            for port in ports {
                println!("{}", port.port_name);
            }
        }
        Ok(_) => println!("No serial ports detected."),
        Err(e) => eprintln!("Unable to enumerate serial ports: {}", e),
    }
}

fn render_event(event: &EngineEvent) {
    match event {
        EngineEvent::DeviceData {
            node,
            device,
            timestamp,
            value,
        } => {
            println!("node {} dev {}  {}  (t={})", node, device, value, timestamp);
        }
        EngineEvent::StatusChanged { node, status } => match status {
            NodeStatus::Ok => println!("node {} is responding again", node),
            NodeStatus::NonResponding => println!("node {} is NOT responding", node),
        },
        EngineEvent::TopologyChanged => {
            println!("topology changed");
        }
        EngineEvent::LogLine { node, text } => match node {
            Some(node) => println!("[{}] {}", node, text),
            None => println!("[--] {}", text),
        },
        EngineEvent::FileTransfer { node, .. } => {
            println!("[{}] file transfer frame received", node);
        }
    }
}
