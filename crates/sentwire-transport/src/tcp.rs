use std::io::{Read, Write};
use std::net::{Ipv6Addr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{timeout_as_empty, ByteSource};

/// Port the interface box listens on when none is given.
pub const DEFAULT_TCP_PORT: u16 = 8000;

/// TCP connection settings.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Read timeout; an expired read yields an empty chunk.
    pub read_timeout: Duration,
    /// Connect timeout per resolved address.
    pub connect_timeout: Duration,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Split `host[:port]` into its parts, defaulting the port to 8000.
///
/// IPv6 hosts go in brackets (`[::1]:8000`). A bare IPv6 address is taken
/// as a host without a port.
pub fn parse_endpoint(input: &str) -> Result<(String, u16)> {
    let input = input.trim();
    let invalid = || TransportError::InvalidEndpoint(input.to_string());
    if input.is_empty() {
        return Err(invalid());
    }

    if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        if host.parse::<Ipv6Addr>().is_err() {
            return Err(invalid());
        }
        let port = match tail {
            "" => DEFAULT_TCP_PORT,
            _ => tail
                .strip_prefix(':')
                .and_then(|port| port.parse::<u16>().ok())
                .ok_or_else(invalid)?,
        };
        return Ok((host.to_string(), port));
    }

    if input.parse::<Ipv6Addr>().is_ok() {
        return Ok((input.to_string(), DEFAULT_TCP_PORT));
    }

    match input.split_once(':') {
        None => Ok((input.to_string(), DEFAULT_TCP_PORT)),
        Some((host, port)) => {
            if host.is_empty() || port.contains(':') {
                return Err(invalid());
            }
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            Ok((host.to_string(), port))
        }
    }
}

/// TCP link to the interface box.
pub struct TcpTransport {
    stream: TcpStream,
    endpoint: String,
}

impl TcpTransport {
    /// Connect to `host:port` (blocking).
    pub fn connect(host: &str, port: u16, config: &TcpConfig) -> Result<Self> {
        let endpoint = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "endpoint resolved to no addresses",
        );
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, config.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(config.read_timeout))?;
                    stream.set_nodelay(true)?;
                    info!(%endpoint, "connected to interface box over tcp");
                    return Ok(Self { stream, endpoint });
                }
                Err(err) => {
                    debug!(%addr, error = %err, "tcp connect attempt failed");
                    last_err = err;
                }
            }
        }

        Err(TransportError::Connect {
            endpoint,
            source: last_err,
        })
    }

    /// The `host:port` this transport is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ByteSource for TcpTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // A zero-length read on a connected socket that did not time out is EOF.
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            other => timeout_as_empty(other),
        }
    }

    fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
