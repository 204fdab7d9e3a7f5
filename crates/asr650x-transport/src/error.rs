//! Error types for transport operations.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while moving lines over the serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serial port could not be opened.
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// No line arrived within the deadline.
    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    /// The line could not be written within the write timeout.
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// The underlying stream ended; the port was unplugged or closed.
    #[error("Serial stream closed")]
    Closed,

    /// Line-level error from the codec, including overlong lines.
    #[error("Framing error: {0}")]
    Frame(#[from] asr650x_core::Error),

    /// Low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Returns `true` if the error is a read deadline expiry.
    ///
    /// The modem layer treats read timeouts as expected during reply
    /// polling, unlike every other transport failure.
    #[must_use]
    pub fn is_read_timeout(&self) -> bool {
        matches!(self, TransportError::ReadTimeout(_))
    }
}
