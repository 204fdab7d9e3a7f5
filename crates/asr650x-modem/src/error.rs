//! Error types for modem operations, plus the last-AT-error record.
//!
//! Two kinds of failure flow through here. Validation failures happen
//! before any byte is written and wrap [`asr650x_core::Error`]; they are
//! never recorded in [`LastAtError`]. Everything else happened on the
//! wire: a rejection, a send failure, a timeout, or a reply the driver
//! could not make sense of. Those record a [`LastAtError`] naming the
//! command that was in flight, which persists until the next wire failure
//! overwrites it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use asr650x_protocol::AtCommand;
use asr650x_transport::TransportError;

/// Result type alias for modem operations.
pub type Result<T> = std::result::Result<T, ModemError>;

/// How a command failed on the wire, named after the line shape that
/// reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtErrorKind {
    /// `+CME ERROR:<n>`: the module rejected the command.
    Cme,
    /// `ERR+SEND`: the uplink could not be transmitted.
    SendFailed,
    /// `ERR+SENT`: the uplink was transmitted but retries were exhausted.
    SentFailed,
    /// No reply arrived within the command's deadline.
    Timeout,
    /// A reply arrived but could not be interpreted.
    Parse,
}

impl fmt::Display for AtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AtErrorKind::Cme => "CME ERROR",
            AtErrorKind::SendFailed => "ERR+SEND",
            AtErrorKind::SentFailed => "ERR+SENT",
            AtErrorKind::Timeout => "TIMEOUT",
            AtErrorKind::Parse => "PARSE",
        };
        write!(f, "{text}")
    }
}

/// Record of the most recent wire-level command failure.
///
/// Mirrors what the module itself would tell a debugging session: which
/// command, what shape of failure, and the numeric subtype if the wire
/// carried one (only CME rejections do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAtError {
    /// The command that was in flight.
    pub at_cmd: AtCommand,
    /// The failure shape.
    pub kind: AtErrorKind,
    /// Numeric subtype, present for CME rejections.
    pub code: Option<u16>,
}

impl fmt::Display for LastAtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}: {} {}", self.at_cmd, self.kind, code),
            None => write!(f, "{}: {}", self.at_cmd, self.kind),
        }
    }
}

/// Errors that can occur during modem operations.
#[derive(Debug, Error)]
pub enum ModemError {
    /// Pre-flight validation failure; nothing was written to the module.
    #[error("Validation failed: {0}")]
    Validation(#[from] asr650x_core::Error),

    /// The module rejected a command with `+CME ERROR:<code>`.
    #[error("{command} rejected by module: CME ERROR {code}")]
    Command { command: AtCommand, code: u16 },

    /// The module reported an uplink failure event.
    #[error("Uplink failed during {command}: {failure}")]
    Send {
        command: AtCommand,
        failure: AtErrorKind,
    },

    /// No conclusive reply arrived within the operation's deadline.
    #[error("{command} timed out after {ms}ms")]
    Timeout { command: AtCommand, ms: u64 },

    /// A reply line could not be interpreted.
    #[error("Unparseable reply to {command}: {line:?}")]
    Parse { command: AtCommand, line: String },

    /// The transport failed below the command layer.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The CGMI probe reported a manufacturer other than ASR.
    #[error("Unsupported module: manufacturer {manufacturer:?}, expected ASR")]
    UnsupportedModule { manufacturer: String },

    /// The data rate is under ADR control and cannot be set manually.
    #[error("Data rate is managed by ADR; disable ADR before setting it")]
    AdrActive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_at_error_display() {
        let record = LastAtError {
            at_cmd: AtCommand::CJoin,
            kind: AtErrorKind::Cme,
            code: Some(1),
        };
        assert_eq!(record.to_string(), "CJOIN: CME ERROR 1");

        let record = LastAtError {
            at_cmd: AtCommand::Dtrx,
            kind: AtErrorKind::Timeout,
            code: None,
        };
        assert_eq!(record.to_string(), "DTRX: TIMEOUT");
    }

    #[test]
    fn test_command_error_display() {
        let error = ModemError::Command {
            command: AtCommand::CJoin,
            code: 1,
        };
        assert_eq!(error.to_string(), "CJOIN rejected by module: CME ERROR 1");
    }

    #[test]
    fn test_validation_wraps_core_error() {
        let error = ModemError::from(asr650x_core::Error::out_of_range("app port", 0, 1, 223));
        assert!(matches!(error, ModemError::Validation(_)));
    }

    #[test]
    fn test_transport_wraps_transport_error() {
        let error = ModemError::from(TransportError::ReadTimeout(2000));
        assert!(matches!(error, ModemError::Transport(_)));
    }
}
