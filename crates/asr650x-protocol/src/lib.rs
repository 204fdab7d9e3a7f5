//! AT wire protocol for the ASR650x LoRaWAN module.
//!
//! Three layers, bottom up:
//!
//! - [`codec`]: CRLF line framing over the raw serial byte stream
//! - [`response`]: classification of received lines (replies, downlinks,
//!   error notices, module console noise)
//! - [`commands`]: the AT command vocabulary and request-line builders
//!
//! Everything here is pure: no IO, no timing, no session state. The
//! transport and modem layers compose these pieces.

pub mod codec;
pub mod commands;
pub mod response;

pub use codec::AtLineCodec;
pub use commands::{
    AtCommand, format_join, format_nb_trials, format_receive_window, format_uplink, to_hex_upper,
};
pub use response::{
    DownlinkEvent, DownlinkKind, ErrorNotice, ResponseLine, ResponseParser, inquiry_value,
};
