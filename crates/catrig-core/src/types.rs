//! Serial line types shared by transports, connectors and sessions.
//!
//! These are plain descriptions of how a port should be opened; the
//! `catrig-transport` crate maps them onto `tokio-serial`.

use std::fmt;
use std::time::Duration;

/// Serial port line configuration.
///
/// Defaults match the factory CAT settings of most Yaesu rigs:
/// - 38400 baud
/// - 8 data bits
/// - 1 stop bit
/// - No parity
/// - No flow control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate (e.g., 4800, 9600, 19200, 38400)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Flow control (typically None)
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 38_400,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

/// Everything a session needs to (re)open its link.
///
/// Stored by the session on the first connect attempt; later reconnects
/// reuse it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Serial port path (e.g. "/dev/ttyUSB0" on Linux, "COM3" on Windows).
    pub port: String,
    /// Line configuration.
    pub serial: SerialConfig,
    /// Upper bound on waiting for a complete reply.
    pub read_timeout: Duration,
    /// Upper bound on writing and flushing one command.
    pub write_timeout: Duration,
}

impl ConnectParams {
    /// Parameters for `port` at `baud_rate` with default line settings and
    /// one-second read and write timeouts.
    pub fn new(port: &str, baud_rate: u32) -> Self {
        ConnectParams {
            port: port.to_string(),
            serial: SerialConfig {
                baud_rate,
                ..Default::default()
            },
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
        }
    }
}

impl fmt::Display for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.port, self.serial.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_default() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 38_400);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_connect_params_new() {
        let params = ConnectParams::new("/dev/ttyUSB0", 9600);
        assert_eq!(params.serial.baud_rate, 9600);
        assert_eq!(params.read_timeout, Duration::from_secs(1));
        assert_eq!(params.to_string(), "/dev/ttyUSB0@9600");
    }
}
