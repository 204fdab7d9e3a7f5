//! Tokio codec for the AT line discipline.
//!
//! The module frames everything as CRLF-terminated ASCII lines. This codec
//! turns the raw serial byte stream into one decoded [`String`] per
//! complete line and appends the CRLF terminator when encoding commands,
//! so the layers above never handle raw bytes.
//!
//! # Line handling
//!
//! - A line ends at `\n`; a trailing `\r` is stripped.
//! - Blank lines (the module pads replies with them) are skipped inside
//!   the decoder and never surface.
//! - Invalid UTF-8 is replaced rather than rejected: the module emits
//!   binary garbage on the line during power-up, and a replacement
//!   character in an unclassifiable line is dropped harmlessly upstream.
//! - A line longer than the configured limit is an error; the decoder
//!   then discards input until the next terminator so one runaway line
//!   cannot wedge the stream.
//! - A partial line at stream end is discarded, matching the transport's
//!   timeout semantics.
//!
//! # Usage
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::{Decoder, Encoder};
//! use asr650x_protocol::AtLineCodec;
//!
//! let mut codec = AtLineCodec::new();
//!
//! let mut out = BytesMut::new();
//! codec.encode("AT+CSTATUS?", &mut out).unwrap();
//! assert_eq!(&out[..], b"AT+CSTATUS?\r\n");
//!
//! let mut incoming = BytesMut::from(&b"+CSTATUS:04\r\nOK\r\n"[..]);
//! assert_eq!(codec.decode(&mut incoming).unwrap(), Some("+CSTATUS:04".to_string()));
//! assert_eq!(codec.decode(&mut incoming).unwrap(), Some("OK".to_string()));
//! ```

use bytes::{Buf, BufMut, BytesMut};
use std::cmp;
use tokio_util::codec::{Decoder, Encoder};

use asr650x_core::{Error, Result};

/// Default maximum line length in bytes.
///
/// The longest legitimate line is a DTRX carrying a 222-byte payload as
/// 444 hex characters plus framing, so 1 KB leaves ample slack while
/// bounding memory against a stream gone wrong.
const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Newline-delimited codec for AT command traffic.
///
/// Decodes CRLF- or LF-terminated lines into `String`s and encodes
/// command text by appending CRLF.
#[derive(Debug)]
pub struct AtLineCodec {
    /// Index into the buffer where the next scan for `\n` resumes, so
    /// already-scanned bytes are not re-examined on partial reads.
    next_index: usize,

    /// Maximum allowed line length in bytes.
    max_line_length: usize,

    /// Set after an overlong line until its terminator is found.
    discarding: bool,
}

impl AtLineCodec {
    /// Create a codec with the default line length limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            discarding: false,
        }
    }

    /// Create a codec with a custom line length limit.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            next_index: 0,
            max_line_length,
            discarding: false,
        }
    }

    /// Get the configured line length limit.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Default for AtLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AtLineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        // The transport may discard the buffer between calls (a partial
        // line at a read deadline). The buffer never shrinks otherwise, so
        // a resume index past the end means the scan state is stale.
        if src.len() < self.next_index {
            self.next_index = 0;
        }

        loop {
            // Scan at most one byte past the limit so an overlong line is
            // detected without buffering it whole.
            let read_to = cmp::min(self.max_line_length.saturating_add(1), src.len());
            let newline_offset = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline_offset) {
                (true, Some(offset)) => {
                    src.advance(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = self.next_index + offset;
                    self.next_index = 0;

                    let mut line = src.split_to(newline_index + 1);
                    line.truncate(line.len() - 1);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }

                    // Blank lines never surface.
                    if line.is_empty() {
                        continue;
                    }

                    return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
                }
                (false, None) if src.len() > self.max_line_length => {
                    self.discarding = true;
                    return Err(Error::LineTooLong {
                        length: src.len(),
                        max: self.max_line_length,
                    });
                }
                (false, None) => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let line = self.decode(src)?;
        if line.is_none() {
            // Whatever is left never got its terminator.
            src.clear();
            self.next_index = 0;
        }
        Ok(line)
    }
}

impl<T: AsRef<str>> Encoder<T> for AtLineCodec {
    type Error = Error;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<()> {
        let line = line.as_ref();
        dst.reserve(line.len() + 2);
        dst.put(line.as_bytes());
        dst.put_u8(b'\r');
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut AtLineCodec, buffer: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(line)) = codec.decode(buffer) {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_decode_crlf_line() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"OK\r\n"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some("OK".to_string()));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_bare_lf_line() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"+CJOIN:OK\n"[..]);

        assert_eq!(
            codec.decode(&mut buffer).unwrap(),
            Some("+CJOIN:OK".to_string())
        );
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"\r\n\r\nOK\r\n\r\n"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some("OK".to_string()));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_partial_line_waits() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"+CSTA"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"TUS:04\r\nOK\r\n");
        assert_eq!(
            codec.decode(&mut buffer).unwrap(),
            Some("+CSTATUS:04".to_string())
        );
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some("OK".to_string()));
    }

    #[test]
    fn test_decode_multiple_lines() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"AT+CJOIN=1,0,8,8\r\nOK\r\n+CJOIN:OK\r\n"[..]);

        let lines = decode_all(&mut codec, &mut buffer);
        assert_eq!(lines, vec!["AT+CJOIN=1,0,8,8", "OK", "+CJOIN:OK"]);
    }

    #[test]
    fn test_decode_line_too_long_then_recovers() {
        let mut codec = AtLineCodec::with_max_line_length(8);
        let mut buffer = BytesMut::from(&b"AAAAAAAAAAAAAAAA\r\nOK\r\n"[..]);

        let err = codec.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, Error::LineTooLong { max: 8, .. }));

        // the overlong line is discarded up to its terminator
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some("OK".to_string()));
    }

    #[test]
    fn test_decode_survives_buffer_cleared_mid_line() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"+CSTA"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), None);

        // The transport dropped the partial line at a read deadline.
        buffer.clear();
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"OK\r\n");
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some("OK".to_string()));
    }

    #[test]
    fn test_decode_eof_discards_partial() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"OK\r\n+CSTAT"[..]);

        assert_eq!(
            codec.decode_eof(&mut buffer).unwrap(),
            Some("OK".to_string())
        );
        assert_eq!(codec.decode_eof(&mut buffer).unwrap(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_tolerates_boot_garbage() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::from(&b"\xff\xfe\x01garbage\r\nOK\r\n"[..]);

        let first = codec.decode(&mut buffer).unwrap().unwrap();
        assert!(first.contains("garbage"));
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some("OK".to_string()));
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = AtLineCodec::new();
        let mut buffer = BytesMut::new();

        codec.encode("AT+CSTATUS?", &mut buffer).unwrap();
        assert_eq!(&buffer[..], b"AT+CSTATUS?\r\n");

        codec.encode("AT+CSAVE".to_string(), &mut buffer).unwrap();
        assert_eq!(&buffer[..], b"AT+CSTATUS?\r\nAT+CSAVE\r\n");
    }

    #[test]
    fn test_codec_limits() {
        assert_eq!(AtLineCodec::new().max_line_length(), 1024);
        assert_eq!(AtLineCodec::with_max_line_length(64).max_line_length(), 64);
    }
}
