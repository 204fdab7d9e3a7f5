//! Classification of lines arriving from the module.
//!
//! The ASR650x multiplexes everything onto one serial stream: command
//! replies, unsolicited downlink notifications, error events, its own
//! console noise. A reply to the command just written is therefore never
//! guaranteed to be the next line read. Every received line is classified
//! into one of four shapes before the command layer interprets it:
//!
//! ```text
//! OK                          Reply    (set-command acknowledgment)
//! +CSTATUS:04                 Reply    (inquiry value)
//! +CJOIN:OK                   Reply    (join outcome)
//! OK+SEND:14                  Reply    (uplink progress)
//! OK+RECV:0,5,2,ABCD          Downlink (type,port,len,payload)
//! AT+CSTATUS?                 ModuleLog (command echo)
//! ASR6501:~#                  ModuleLog (console prompt)
//! +CME ERROR:1                Notice   (command rejected)
//! ERR+SEND:2                  Notice   (uplink could not be sent)
//! ERR+SENT:8                  Notice   (uplink retries exhausted)
//! ```
//!
//! Classification is per line, in arrival order, with no lookahead. The
//! driver silences the module console at initialization but tolerates
//! stray noise regardless; noise classifies as [`ResponseLine::ModuleLog`]
//! and is dropped by the caller.

use asr650x_core::constants::{
    CME_ERROR_PREFIX, COMMAND_PREFIX, DOWNLINK_PREFIX, PROMPT_SUFFIX, SEND_FAILED_PREFIX,
    SENT_FAILED_PREFIX,
};
use asr650x_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-reported downlink message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DownlinkKind {
    Unconfirmed = 0,
    Confirmed = 1,
    Multicast = 2,
    Proprietary = 3,
}

impl DownlinkKind {
    /// Create a downlink kind from its wire code.
    ///
    /// # Errors
    /// Returns `Error::UnknownCode` if the value is outside 0..=3.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DownlinkKind::Unconfirmed),
            1 => Ok(DownlinkKind::Confirmed),
            2 => Ok(DownlinkKind::Multicast),
            3 => Ok(DownlinkKind::Proprietary),
            _ => Err(Error::UnknownCode {
                name: "downlink type",
                code: value,
            }),
        }
    }

    /// Convert the kind to its wire code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A downlink delivered by the network, as reported in an `OK+RECV` line.
///
/// The payload is kept as the hex text the module printed; `length` is the
/// length the module reported, not derived from the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownlinkEvent {
    pub kind: DownlinkKind,
    pub port: u8,
    pub length: usize,
    pub payload: String,
}

impl DownlinkEvent {
    /// Decode the hex payload into bytes.
    ///
    /// Returns `None` if the payload text is not well-formed hex with an
    /// even character count.
    #[must_use]
    pub fn payload_bytes(&self) -> Option<Vec<u8>> {
        let text = self.payload.as_bytes();
        if text.len() % 2 != 0 {
            return None;
        }
        let mut out = Vec::with_capacity(text.len() / 2);
        for pair in text.chunks(2) {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            out.push((hi * 16 + lo) as u8);
        }
        Some(out)
    }
}

impl fmt::Display for DownlinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "downlink type {} port {} len {} payload {}",
            self.kind.to_u8(),
            self.port,
            self.length,
            self.payload
        )
    }
}

/// Error events the module reports on the reply stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorNotice {
    /// `+CME ERROR:<n>`: the command was rejected. The firmware reports
    /// subtype 1 for every cause it has been observed to hit.
    Cme(u16),
    /// `ERR+SEND…`: the uplink could not be transmitted.
    SendFailed,
    /// `ERR+SENT…`: the uplink was transmitted but retries were exhausted.
    SentFailed,
    /// A line matched a structured shape but its fields did not parse.
    Malformed,
}

/// One received line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLine {
    /// A line the command layer matches against its expected reply shape.
    Reply(String),
    /// An unsolicited downlink notification.
    Downlink(DownlinkEvent),
    /// Module console noise: command echo or prompt. Dropped.
    ModuleLog,
    /// An error event.
    Notice(ErrorNotice),
}

/// Stateless classifier for received lines.
pub struct ResponseParser;

impl ResponseParser {
    /// Classify one line.
    ///
    /// The codec has already stripped the CR/LF terminator and discarded
    /// blank lines.
    #[must_use]
    pub fn classify(line: &str) -> ResponseLine {
        if let Some(rest) = line.strip_prefix(DOWNLINK_PREFIX) {
            return Self::parse_downlink(rest);
        }

        // The leading '+' is firmware-revision dependent, so match on the
        // CME text itself. The subtype follows the colon.
        if let Some(idx) = line.find(CME_ERROR_PREFIX) {
            let code = line[idx + CME_ERROR_PREFIX.len()..]
                .trim()
                .parse()
                .unwrap_or(0);
            return ResponseLine::Notice(ErrorNotice::Cme(code));
        }

        if line.starts_with(SEND_FAILED_PREFIX) {
            return ResponseLine::Notice(ErrorNotice::SendFailed);
        }
        if line.starts_with(SENT_FAILED_PREFIX) {
            return ResponseLine::Notice(ErrorNotice::SentFailed);
        }

        if line.starts_with(COMMAND_PREFIX) || line.ends_with(PROMPT_SUFFIX) {
            return ResponseLine::ModuleLog;
        }

        ResponseLine::Reply(line.to_string())
    }

    /// Parse the field list of an `OK+RECV:` line.
    ///
    /// The payload is the fourth field onward, so hex text can never be
    /// split even if it contained a comma.
    fn parse_downlink(rest: &str) -> ResponseLine {
        let mut parts = rest.splitn(4, ',');
        let (Some(kind), Some(port), Some(length), Some(payload)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return ResponseLine::Notice(ErrorNotice::Malformed);
        };

        let Ok(kind_code) = kind.trim().parse::<u8>() else {
            return ResponseLine::Notice(ErrorNotice::Malformed);
        };
        let Ok(kind) = DownlinkKind::from_u8(kind_code) else {
            return ResponseLine::Notice(ErrorNotice::Malformed);
        };
        let Ok(port) = port.trim().parse::<u8>() else {
            return ResponseLine::Notice(ErrorNotice::Malformed);
        };
        let Ok(length) = length.trim().parse::<usize>() else {
            return ResponseLine::Notice(ErrorNotice::Malformed);
        };

        ResponseLine::Downlink(DownlinkEvent {
            kind,
            port,
            length,
            payload: payload.to_string(),
        })
    }
}

/// Extract the value part of an inquiry reply line.
///
/// The device writes `+<NAME>:<value>` for most inquiries and
/// `<NAME>=<value>` for the identification commands, so the value is
/// whatever follows the last `:` or `=`.
///
/// # Example
/// ```
/// use asr650x_protocol::inquiry_value;
///
/// assert_eq!(inquiry_value("+CSTATUS:04"), Some("04"));
/// assert_eq!(inquiry_value("+CGMI=ASR"), Some("ASR"));
/// assert_eq!(inquiry_value("OK"), None);
/// ```
#[must_use]
pub fn inquiry_value(line: &str) -> Option<&str> {
    line.rsplit_once([':', '=']).map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("OK")]
    #[case("+CJOIN:OK")]
    #[case("+CJOIN:FAIL")]
    #[case("OK+SEND:14")]
    #[case("OK+SENT:8")]
    #[case("+CSTATUS:04")]
    #[case("ASR")]
    fn test_reply_lines(#[case] line: &str) {
        assert_eq!(
            ResponseParser::classify(line),
            ResponseLine::Reply(line.to_string())
        );
    }

    #[rstest]
    #[case("AT+CSTATUS?")]
    #[case("AT+CJOIN=1,0,8,8")]
    #[case("ASR6501:~#")]
    fn test_module_log_lines(#[case] line: &str) {
        assert_eq!(ResponseParser::classify(line), ResponseLine::ModuleLog);
    }

    #[test]
    fn test_downlink_line() {
        let classified = ResponseParser::classify("OK+RECV:0,5,2,ABCD");
        let ResponseLine::Downlink(event) = classified else {
            panic!("expected downlink, got {classified:?}");
        };
        assert_eq!(event.kind, DownlinkKind::Unconfirmed);
        assert_eq!(event.port, 5);
        assert_eq!(event.length, 2);
        assert_eq!(event.payload, "ABCD");
        assert_eq!(event.payload_bytes(), Some(vec![0xAB, 0xCD]));
    }

    #[test]
    fn test_downlink_empty_payload() {
        let classified = ResponseParser::classify("OK+RECV:2,0,0,");
        let ResponseLine::Downlink(event) = classified else {
            panic!("expected downlink, got {classified:?}");
        };
        assert_eq!(event.kind, DownlinkKind::Multicast);
        assert_eq!(event.length, 0);
        assert_eq!(event.payload, "");
        assert_eq!(event.payload_bytes(), Some(vec![]));
    }

    #[rstest]
    #[case("OK+RECV:0,5,2")] // three fields
    #[case("OK+RECV:")] // none
    #[case("OK+RECV:x,5,2,ABCD")] // non-numeric type
    #[case("OK+RECV:0,port,2,ABCD")] // non-numeric port
    #[case("OK+RECV:0,5,len,ABCD")] // non-numeric length
    #[case("OK+RECV:9,5,2,ABCD")] // unknown type code
    fn test_downlink_malformed(#[case] line: &str) {
        assert_eq!(
            ResponseParser::classify(line),
            ResponseLine::Notice(ErrorNotice::Malformed)
        );
    }

    #[rstest]
    #[case("+CME ERROR:1", 1)]
    #[case("CME ERROR:1", 1)]
    #[case("+CME ERROR:23", 23)]
    #[case("+CME ERROR:", 0)]
    fn test_cme_lines(#[case] line: &str, #[case] code: u16) {
        assert_eq!(
            ResponseParser::classify(line),
            ResponseLine::Notice(ErrorNotice::Cme(code))
        );
    }

    #[test]
    fn test_send_failure_lines() {
        // trailing digits from older firmware are tolerated and ignored
        assert_eq!(
            ResponseParser::classify("ERR+SEND:2"),
            ResponseLine::Notice(ErrorNotice::SendFailed)
        );
        assert_eq!(
            ResponseParser::classify("ERR+SEND"),
            ResponseLine::Notice(ErrorNotice::SendFailed)
        );
        assert_eq!(
            ResponseParser::classify("ERR+SENT:8"),
            ResponseLine::Notice(ErrorNotice::SentFailed)
        );
    }

    #[test]
    fn test_payload_bytes_rejects_bad_hex() {
        let event = DownlinkEvent {
            kind: DownlinkKind::Unconfirmed,
            port: 1,
            length: 1,
            payload: "A".to_string(),
        };
        assert_eq!(event.payload_bytes(), None);

        let event = DownlinkEvent {
            payload: "ZZ".to_string(),
            ..event
        };
        assert_eq!(event.payload_bytes(), None);
    }

    #[rstest]
    #[case("+CSTATUS:04", Some("04"))]
    #[case("+CGMI=ASR", Some("ASR"))]
    #[case("+CRXP:0,3,869525000", Some("0,3,869525000"))]
    #[case("+DRX:4,AABBCCDD", Some("4,AABBCCDD"))]
    #[case("+CJOINMODE:0", Some("0"))]
    #[case("OK", None)]
    #[case("", None)]
    fn test_inquiry_value(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(inquiry_value(line), expected);
    }
}
