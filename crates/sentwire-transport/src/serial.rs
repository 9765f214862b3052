use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::{timeout_as_empty, ByteSource};

/// Serial port settings for the interface box.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. Default: 115200.
    pub baud: u32,
    /// Read timeout; an expired read yields an empty chunk.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: 115_200,
            timeout: Duration::from_millis(200),
        }
    }
}

/// Serial link to the interface box.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open `port` (e.g. `/dev/ttyUSB0`, `COM7`) with 8N1 framing.
    pub fn open(port: &str, config: &SerialConfig) -> Result<Self> {
        let handle = serialport::new(port, config.baud)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;

        info!(port, baud = config.baud, "opened serial port");
        Ok(Self {
            port: handle,
            name: port.to_string(),
        })
    }

    /// The port name this transport was opened with.
    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl ByteSource for SerialTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        timeout_as_empty(self.port.read(buf))
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.name)
            .finish()
    }
}
