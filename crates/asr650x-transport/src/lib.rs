//! Line transport for the ASR650x AT link.
//!
//! This crate moves whole AT lines between the driver and the module and
//! nothing more: no classification, no command semantics. The [`Transport`]
//! trait is the seam between the modem layer and the wire, with two
//! implementations:
//!
//! - [`SerialTransport`]: the real UART, framed by
//!   [`AtLineCodec`](asr650x_protocol::AtLineCodec)
//! - [`MockTransport`]: a scripted double for tests and development
//!   without hardware
//!
//! All I/O is asynchronous using native `async fn` in traits (Rust 1.90 +
//! Edition 2024 RPITIT). The trait is not object-safe; the modem layer is
//! generic over it.
//!
//! # Timeout model
//!
//! Reads carry an explicit per-call deadline because the caller knows how
//! long a reply can legitimately take: a set command answers within the
//! command timeout, while a join outcome may be minutes away. Writes use
//! the transport's own timeout, since writing a short line should never
//! block for long on a healthy UART.

#![allow(async_fn_in_trait)]

pub mod error;
pub mod mock;
pub mod serial;

pub use error::{Result, TransportError};
pub use mock::{MockTransport, MockTransportHandle};
pub use serial::{SerialConfig, SerialTransport};

use std::time::Duration;

/// Bidirectional line transport to the module.
///
/// Implementations own the line discipline: `write_line` takes the bare
/// command text and appends the terminator itself, and `read_line` yields
/// complete lines with the terminator stripped and blank lines skipped.
pub trait Transport: Send {
    /// Write one command line to the module.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Read the next line from the module, waiting at most `deadline`.
    ///
    /// # Errors
    /// Returns [`TransportError::ReadTimeout`] if no complete line arrives
    /// in time, or [`TransportError::Closed`] if the stream ended.
    async fn read_line(&mut self, deadline: Duration) -> Result<String>;
}
