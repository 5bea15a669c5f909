//! Serial transport over the `serialport` crate.
//!
//! The inner port handle is shared so the read loop can run on its own
//! thread (a cloned handle) while the engine keeps the writing side.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relaylink_engine::{FlowControl, Parity, SerialSettings, Transport, TransportError};
use serialport::SerialPort;

/// Poll timeout for the reader thread; reads return regularly so the
/// process can notice shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

struct Inner {
    port_name: Option<String>,
    port: Option<Box<dyn SerialPort>>,
}

/// A [`Transport`] over a physical serial port.
#[derive(Clone)]
pub struct SerialTransport {
    inner: Arc<Mutex<Inner>>,
}

impl SerialTransport {
    /// Create a transport. With `port_name` unset, [`Transport::choose_port`]
    /// picks the first detected port.
    pub fn new(port_name: Option<String>) -> Self {
        SerialTransport {
            inner: Arc::new(Mutex::new(Inner {
                port_name,
                port: None,
            })),
        }
    }

    /// The selected port name, if any.
    pub fn port_name(&self) -> Option<String> {
        self.inner.lock().port_name.clone()
    }

    /// Clone the open port handle for a reader thread.
    pub fn reader(&self) -> Result<Box<dyn SerialPort>, TransportError> {
        let inner = self.inner.lock();
        let port = inner.port.as_ref().ok_or(TransportError::NotOpen)?;
        port.try_clone()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))
    }
}

fn map_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn map_flow_control(flow: FlowControl) -> serialport::FlowControl {
    match flow {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::Software => serialport::FlowControl::Software,
        FlowControl::Hardware => serialport::FlowControl::Hardware,
    }
}

fn map_data_bits(bits: u8) -> serialport::DataBits {
    match bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    }
}

fn map_stop_bits(bits: u8) -> serialport::StopBits {
    match bits {
        2 => serialport::StopBits::Two,
        _ => serialport::StopBits::One,
    }
}

impl Transport for SerialTransport {
    fn choose_port(&mut self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.port_name.is_some() {
            return Ok(());
        }

        let ports = serialport::available_ports().map_err(|_| TransportError::NotFound)?;
        let first = ports.first().ok_or(TransportError::NotFound)?;
        tracing::info!(port = %first.port_name, "auto-selected serial port");
        inner.port_name = Some(first.port_name.clone());
        Ok(())
    }

    fn open(&mut self, settings: &SerialSettings) -> Result<bool, TransportError> {
        let mut inner = self.inner.lock();
        let name = inner.port_name.clone().ok_or(TransportError::NotFound)?;

        let mut port = serialport::new(&name, settings.baud_rate)
            .data_bits(map_data_bits(settings.data_bits))
            .stop_bits(map_stop_bits(settings.stop_bits))
            .parity(map_parity(settings.parity))
            .flow_control(map_flow_control(settings.flow_control))
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?;

        // Some adapters hold the remote side in reset until DTR is raised.
        let _ = port.write_data_terminal_ready(true);

        inner.port = Some(port);
        Ok(true)
    }

    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        let port = inner.port.as_mut().ok_or(TransportError::NotOpen)?;
        port.write_all(line.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().port = None;
    }

    fn is_open(&self) -> bool {
        self.inner.lock().port.is_some()
    }
}
