//! The transport collaborator contract.
//!
//! The engine never owns the physical link. A [`Transport`] implementation
//! selects and opens the port, writes terminated lines, and runs a read
//! loop that hands each complete inbound line to
//! [`ProtocolEngine::on_line`](crate::ProtocolEngine::on_line). Line
//! reassembly from raw chunks belongs to the transport side (see
//! `relaylink_protocol::LineCodec`).

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Serial port parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Serial port flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// XON/XOFF software flow control.
    Software,
    /// RTS/CTS hardware flow control.
    Hardware,
}

/// Port configuration handed to [`Transport::open`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits per character.
    pub data_bits: u8,
    /// Stop bits.
    pub stop_bits: u8,
    /// Parity mode.
    pub parity: Parity,
    /// Receive buffer size in bytes.
    pub buffer_size: usize,
    /// Flow control mode.
    pub flow_control: FlowControl,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            buffer_size: 1024,
            flow_control: FlowControl::None,
        }
    }
}

/// The serial-link collaborator consumed by the engine.
pub trait Transport: Send {
    /// Select the port to use. [`TransportError::NotFound`] when none is
    /// available.
    fn choose_port(&mut self) -> Result<(), TransportError>;

    /// Open the selected port. `Ok(false)` means the port declined to open
    /// without a hard error.
    fn open(&mut self, settings: &SerialSettings) -> Result<bool, TransportError>;

    /// Write one already-terminated line to the link.
    fn send(&mut self, line: &str) -> Result<(), TransportError>;

    /// Close the link. Idempotent.
    fn close(&mut self);

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_link_defaults() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.data_bits, 8);
        assert_eq!(settings.stop_bits, 1);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.buffer_size, 1024);
        assert_eq!(settings.flow_control, FlowControl::None);
    }
}
