//! Serial port transport for CAT communication.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for USB virtual COM ports and physical RS-232 serial connections,
//! and [`SerialConnector`], which opens one on demand for a session.
//!
//! Yaesu rigs using the CAT-3 dialect ship with 4800 baud and accept up to
//! 38400; the rate is chosen in the rig's menu and must match the port.
//!
//! # Example
//!
//! ```no_run
//! use catrig_transport::SerialTransport;
//! use catrig_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> catrig_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 38400).await?;
//!
//! // Ask for VFO-A frequency
//! transport.send(b"FA;").await?;
//!
//! // Receive response with 1 second timeout
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use catrig_core::error::{Error, Result};
use catrig_core::transport::{Connector, Transport};
use catrig_core::types::{DataBits, FlowControl, Parity, SerialConfig, StopBits};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

fn data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn stop_bits(bits: StopBits) -> tokio_serial::StopBits {
    match bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected
    {
        Error::Transport(format!("connection lost: {e}"))
    } else {
        Error::Io(e)
    }
}

/// Serial port transport for rig communication.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging/debugging
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate and default settings
    /// (8N1, no flow control).
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, &config).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(port: &str, config: &SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "Opening serial port"
        );

        let mut serial_stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(data_bits(config.data_bits))
            .stop_bits(stop_bits(config.stop_bits))
            .parity(parity(config.parity))
            .flow_control(flow_control(config.flow_control))
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        // Yaesu and Kenwood USB interfaces can wire DTR/RTS to PTT or the CW
        // key; keep both de-asserted so opening the port never keys the rig.
        if let Err(e) = serial_stream.write_data_terminal_ready(false) {
            tracing::warn!(port = %port, error = %e, "Failed to de-assert DTR");
        }
        if let Err(e) = serial_stream.write_request_to_send(false) {
            tracing::warn!(port = %port, error = %e, "Failed to de-assert RTS");
        }

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = %String::from_utf8_lossy(data),
            "Sending data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            map_io_error(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = %String::from_utf8_lossy(&buf[..n]),
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(Error::ReadTimeout)
            }
        }
    }

    async fn discard_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        port.clear(ClearBuffer::Input).map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to clear input buffer");
            Error::Transport(format!("failed to clear input on {}: {e}", self.port_name))
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}

/// [`Connector`] that opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

#[async_trait]
impl Connector for SerialConnector {
    async fn open(&self, port: &str, config: &SerialConfig) -> Result<Box<dyn Transport>> {
        let transport = SerialTransport::open_with_config(port, config).await?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bits_conversion() {
        assert_eq!(data_bits(DataBits::Five), tokio_serial::DataBits::Five);
        assert_eq!(data_bits(DataBits::Eight), tokio_serial::DataBits::Eight);
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert_eq!(stop_bits(StopBits::One), tokio_serial::StopBits::One);
        assert_eq!(stop_bits(StopBits::Two), tokio_serial::StopBits::Two);
    }

    #[test]
    fn test_parity_conversion() {
        assert_eq!(parity(Parity::None), tokio_serial::Parity::None);
        assert_eq!(parity(Parity::Odd), tokio_serial::Parity::Odd);
        assert_eq!(parity(Parity::Even), tokio_serial::Parity::Even);
    }

    #[test]
    fn test_flow_control_conversion() {
        assert_eq!(
            flow_control(FlowControl::None),
            tokio_serial::FlowControl::None
        );
        assert_eq!(
            flow_control(FlowControl::Hardware),
            tokio_serial::FlowControl::Hardware
        );
    }

    #[test]
    fn broken_pipe_maps_to_transport_error() {
        let e = map_io_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(e, Error::Transport(_)));
        let e = map_io_error(std::io::Error::other("odd"));
        assert!(matches!(e, Error::Io(_)));
    }

    #[tokio::test]
    async fn open_missing_port_is_transport_error() {
        let result = SerialTransport::open("/dev/catrig-does-not-exist", 38400).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
