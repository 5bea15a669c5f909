//! Protocol constants
//!
//! Frame geometry, capacity limits, and the 4-character command codes
//! understood by Relayer, Node, and Device firmware.

// ============================================================================
// Capacities and frame geometry
// ============================================================================

/// Maximum number of nodes a Relayer can register.
pub const MAX_NODES: usize = 20;
/// Maximum number of devices a single node can host.
pub const MAX_DEVICES: usize = 100;
/// Command codes are exactly this many characters on the wire.
pub const COMMAND_SIZE: usize = 4;
/// Device-index sentinel meaning "no associated device".
pub const NO_DEVICE: &str = "--";
/// Line terminator appended to outbound frames.
pub const EOL: &str = "\n";
/// Longest line the codec will accumulate before discarding as garbage.
pub const MAX_LINE_LENGTH: usize = 256;
/// Shortest well-formed command frame: `C|nn|dd|CCCC`.
pub const MIN_COMMAND_LENGTH: usize = 12;

/// Prefix of a node-announce line.
pub const NODE_ANNOUNCE_PREFIX: &str = "NODE|";
/// Prefix of a relayer-level error line.
pub const RELAYER_ERROR_PREFIX: &str = "ERROR:";

// ============================================================================
// Node command codes (console → node)
// ============================================================================

/// Get node info; node replies `NOINFO=name,version,mac,numDevices`.
pub const CMD_GET_NODE_INFO: &str = "GNOI";
/// Get device info; node replies one `DEINFO=...` frame per device.
pub const CMD_GET_DEVICE_INFO: &str = "GDEI";
/// Get node firmware version; node replies `NVER=<text>`.
pub const CMD_GET_NODE_VERSION: &str = "GNVR";
/// Set node name; node acknowledges with `NONAME=<text>`.
pub const CMD_SET_NODE_NAME: &str = "SNNA";
/// Liveness probe; node replies `PONG`.
pub const CMD_PING: &str = "PING";
/// Restart the node.
pub const CMD_RESET_NODE: &str = "RSET";
/// Blink the node's status LED (physical identification).
pub const CMD_BLINK: &str = "BLIN";

// ============================================================================
// Device command codes (console → device)
// ============================================================================

/// Get device name; device replies `DENAME=<text>`.
pub const CMD_GET_DEVICE_NAME: &str = "GDNA";
/// Set device name; device acknowledges with `DENAME=<text>`.
pub const CMD_SET_DEVICE_NAME: &str = "SDNA";
/// Get device firmware version; device replies `DVER=<text>`.
pub const CMD_GET_DEVICE_VERSION: &str = "GDVR";
/// Enable immediate processing; acknowledged with `IP Enabled`.
pub const CMD_ENABLE_IMMEDIATE: &str = "ENIP";
/// Disable immediate processing; acknowledged with `IP Disabled`.
pub const CMD_DISABLE_IMMEDIATE: &str = "DIIP";
/// Run the immediate process once.
pub const CMD_DO_IMMEDIATE: &str = "DOIP";
/// Enable periodic processing; acknowledged with `PP Enabled`.
pub const CMD_ENABLE_PERIODIC: &str = "ENPP";
/// Disable periodic processing; acknowledged with `PP Disabled`.
pub const CMD_DISABLE_PERIODIC: &str = "DIPP";
/// Run the periodic process once.
pub const CMD_DO_PERIODIC: &str = "DOPP";
/// Get the periodic sampling rate; device replies `RATE=<text>`.
pub const CMD_GET_RATE: &str = "GRAT";
/// Set the periodic sampling rate; acknowledged with `RATE=<text>`.
pub const CMD_SET_RATE: &str = "SRAT";

// ============================================================================
// Relayer command codes (console → relayer)
// ============================================================================

/// Request full system info: the Relayer issues GNOI + GDEI to every
/// registered node.
pub const CMD_SYSTEM_INFO: &str = "SYSI";
/// Request the Relayer's MAC address.
pub const CMD_GET_MAC: &str = "GMAC";

// ============================================================================
// Payload keywords (node/device → console)
// ============================================================================

/// Node info reply prefix (comma-delimited fields follow).
pub const KEY_NODE_INFO: &str = "NOINFO=";
/// Device info reply prefix (comma-delimited fields follow).
pub const KEY_DEVICE_INFO: &str = "DEINFO=";
/// Node name acknowledgement prefix.
pub const KEY_NODE_NAME: &str = "NONAME=";
/// Device name acknowledgement prefix.
pub const KEY_DEVICE_NAME: &str = "DENAME=";
/// Sampling-rate acknowledgement prefix.
pub const KEY_RATE: &str = "RATE=";
/// Node version reply prefix.
pub const KEY_NODE_VERSION: &str = "NVER=";
/// Device version reply prefix.
pub const KEY_DEVICE_VERSION: &str = "DVER=";
/// Node/device error notice prefix.
pub const KEY_ERROR: &str = "ERROR:";
/// Keep-alive reply.
pub const KEY_PONG: &str = "PONG";
/// File-listing reply prefix (file transfer collaborator).
pub const KEY_FILE_LISTING: &str = "FILES=";
/// File-contents reply prefix (file transfer collaborator).
pub const KEY_FILE_CONTENTS: &str = "FILE=";
/// Immediate-processing toggle acknowledgements.
pub const KEY_IP_ENABLED: &str = "IP Enabled";
pub const KEY_IP_DISABLED: &str = "IP Disabled";
/// Periodic-processing toggle acknowledgements.
pub const KEY_PP_ENABLED: &str = "PP Enabled";
pub const KEY_PP_DISABLED: &str = "PP Disabled";
