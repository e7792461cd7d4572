//! Serial port discovery.
//!
//! Lists the serial devices the operating system currently exposes, with
//! whatever USB metadata is available. The CAT engine only uses the device
//! path; the rest is for showing the user which port is which rig.

use std::fmt;

use catrig_core::error::{Error, Result};
use tokio_serial::SerialPortType;

/// One serial device reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path to pass to `connect` (e.g. "/dev/ttyUSB0", "COM3").
    pub path: String,
    /// USB product string, if known.
    pub product: Option<String>,
    /// USB manufacturer string, if known.
    pub manufacturer: Option<String>,
    /// USB serial number, if known.
    pub serial_number: Option<String>,
    /// USB vendor and product id, if this is a USB device.
    pub usb_id: Option<(u16, u16)>,
}

impl PortInfo {
    fn from_serialport(info: tokio_serial::SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                path: info.port_name,
                product: usb.product,
                manufacturer: usb.manufacturer,
                serial_number: usb.serial_number,
                usb_id: Some((usb.vid, usb.pid)),
            },
            _ => PortInfo {
                path: info.port_name,
                product: None,
                manufacturer: None,
                serial_number: None,
                usb_id: None,
            },
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.path,
            self.product.as_deref().unwrap_or("n/a"),
            self.manufacturer.as_deref().unwrap_or("n/a")
        )?;
        if let Some((vid, pid)) = self.usb_id {
            write!(f, " [{vid:04X}:{pid:04X}]")?;
        }
        Ok(())
    }
}

/// Enumerate the serial ports currently available.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports().map_err(|e| {
        tracing::error!(error = %e, "Failed to enumerate serial ports");
        Error::Transport(format!("failed to enumerate serial ports: {e}"))
    })?;

    if ports.is_empty() {
        tracing::warn!("No serial ports available");
    }

    Ok(ports.into_iter().map(PortInfo::from_serialport).collect())
}
