//! Serial port transport implementation.
//!
//! Wraps a [`tokio_serial::SerialStream`] in a
//! [`Framed`] with the AT line codec, so reads yield whole lines and
//! writes carry the CRLF discipline automatically.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use asr650x_protocol::AtLineCodec;

use crate::{Result, Transport, TransportError};

fn default_baud_rate() -> u32 {
    115_200
}

fn default_write_timeout_ms() -> u64 {
    2_000
}

/// Serial port settings.
///
/// The ASR650x UART is fixed at 8 data bits, no parity, one stop bit and
/// no flow control, so only the port path and baud rate are configurable.
///
/// # Example
///
/// ```
/// use asr650x_transport::SerialConfig;
///
/// let config: SerialConfig = serde_json::from_str(
///     r#"{ "port": "/dev/ttyUSB0" }"#,
/// ).unwrap();
/// assert_eq!(config.baud_rate, 115_200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0`.
    pub port: String,

    /// Baud rate; the module ships configured for 115200.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Timeout for writing a single line.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl SerialConfig {
    /// Create a configuration with default baud rate and write timeout.
    pub fn new(port: impl Into<String>) -> Self {
        SerialConfig {
            port: port.into(),
            baud_rate: default_baud_rate(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

/// UART transport to a physical module.
pub struct SerialTransport {
    /// Framed serial stream with the AT line codec.
    framed: Framed<SerialStream, AtLineCodec>,

    /// Device path, kept for logging.
    port: String,

    /// Timeout applied to every line write.
    write_timeout: Duration,
}

impl SerialTransport {
    /// Open the serial port described by `config`.
    ///
    /// # Errors
    /// Returns [`TransportError::Open`] if the port does not exist or
    /// cannot be configured.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "Opening serial port"
        );

        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        debug!(port = %config.port, "Serial port open");

        Ok(SerialTransport {
            framed: Framed::new(stream, AtLineCodec::new()),
            port: config.port.clone(),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
        })
    }

    /// Get the device path this transport is bound to.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }
}

impl Transport for SerialTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!(port = %self.port, %line, "TX");

        match tokio::time::timeout(self.write_timeout, self.framed.send(line)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(port = %self.port, error = %e, "Write failed");
                Err(TransportError::Frame(e))
            }
            Err(_) => {
                warn!(
                    port = %self.port,
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "Write timeout"
                );
                Err(TransportError::WriteTimeout(
                    self.write_timeout.as_millis() as u64,
                ))
            }
        }
    }

    async fn read_line(&mut self, deadline: Duration) -> Result<String> {
        read_framed_line(&mut self.framed, &self.port, deadline).await
    }
}

/// Read one complete line from a framed stream, waiting at most `deadline`.
///
/// A line that only half-arrived by the deadline is stale: whatever reply
/// it belonged to has already been written off by the caller, so the
/// buffered partial bytes are dropped rather than left to prefix the next
/// line.
async fn read_framed_line<S>(
    framed: &mut Framed<S, AtLineCodec>,
    port: &str,
    deadline: Duration,
) -> Result<String>
where
    S: AsyncRead + Unpin,
{
    match tokio::time::timeout(deadline, framed.next()).await {
        Ok(Some(Ok(line))) => {
            trace!(%port, %line, "RX");
            Ok(line)
        }
        Ok(Some(Err(e))) => {
            warn!(%port, error = %e, "Framing error on read");
            Err(TransportError::Frame(e))
        }
        Ok(None) => {
            warn!(%port, "Serial stream closed");
            Err(TransportError::Closed)
        }
        Err(_) => {
            let pending = framed.read_buffer().len();
            if pending > 0 {
                debug!(%port, pending, "Discarding partial line at read deadline");
                framed.read_buffer_mut().clear();
            }
            Err(TransportError::ReadTimeout(deadline.as_millis() as u64))
        }
    }
}
