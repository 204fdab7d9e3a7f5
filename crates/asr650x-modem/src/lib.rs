//! Driver facade for ASR650x LoRaWAN modules.
//!
//! This crate ties the pure protocol layer to a line transport and adds
//! the stateful pieces a host application needs: command sequencing with
//! per-operation deadlines, host-side session tracking, downlink
//! dispatch, and a record of the last wire-level failure for diagnostics.
//!
//! The entry point is [`Modem`], generic over any [`asr650x_transport::Transport`],
//! so the same driver runs against a serial port in production and a
//! scripted mock in tests.

pub mod dispatcher;
pub mod error;
pub mod modem;
pub mod session;

pub use dispatcher::{DownlinkCallback, DownlinkDispatcher};
pub use error::{AtErrorKind, LastAtError, ModemError, Result};
pub use modem::Modem;
pub use session::{SessionState, SessionTracker, SessionTransition};
