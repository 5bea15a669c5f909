//! Relayer serial-link wire protocol.
//!
//! A console talks to a Relayer gateway over a serial line. The Relayer fans
//! messages out to up to [`MAX_NODES`] field nodes, each hosting up to
//! [`MAX_DEVICES`] devices. All traffic is newline-terminated text with
//! `|`-separated fields:
//!
//! ```text
//! NODE|nn                          node announce (Relayer-originated)
//! ERROR:<text>                     relayer-level error
//! D|nn|dd|<payload>|<timestamp>    data frame (node/device -> console)
//! C|nn|dd|CCCC[|params]            command frame (console -> node/device)
//! ```
//!
//! Inbound lines decode into a [`ParsedMessage`]; outbound commands are built
//! as [`OutboundCommand`] values and encoded deterministically. The
//! [`LineCodec`] turns raw serial chunks into complete lines.
//!
//! # Example
//!
//! ```rust
//! use relaylink_protocol::{NodeId, DeviceId, OutboundCommand, ParsedMessage};
//!
//! let cmd = OutboundCommand::new(NodeId::new(3), DeviceId::new(0), "GNOI", None).unwrap();
//! assert_eq!(cmd.encode(), "C|03|00|GNOI");
//!
//! let msg = ParsedMessage::parse("D|03|02|7.25|124500");
//! assert!(matches!(msg, ParsedMessage::NumericSample { .. }));
//! ```

mod codec;
mod commands;
mod constants;
mod error;
mod messages;
mod types;

pub use codec::*;
pub use commands::*;
pub use constants::*;
pub use error::*;
pub use messages::*;
pub use types::*;
