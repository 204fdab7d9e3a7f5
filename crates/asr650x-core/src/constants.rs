//! Protocol constants for the ASR650x AT-command interface.
//!
//! The ASR650x family exposes its LoRaWAN MAC through a line-oriented AT
//! protocol on the module UART. Every host request is a single line:
//!
//! ```text
//! AT+<NAME>=<ARGS><CR><LF>     set command
//! AT+<NAME>?<CR><LF>           inquiry command
//! AT+<NAME><CR><LF>            bare command (CSAVE, CRESTORE)
//! ```
//!
//! Replies and unsolicited events arrive on the same stream, one per line:
//!
//! ```text
//! OK                           set command accepted
//! +<NAME>:<VALUE>              inquiry value, followed by OK
//! +CJOIN:OK / +CJOIN:FAIL      join outcome
//! OK+SEND:<n> / OK+SENT:<n>    uplink progress
//! OK+RECV:<t>,<p>,<l>,<msg>    downlink notification
//! +CME ERROR:<n>               command rejected
//! ERR+SEND / ERR+SENT          uplink failure events
//! ```
//!
//! The constants in this module pin down those wire shapes plus the numeric
//! limits the device documents for its parameters. Limits are taken from the
//! ASR650x AT command summary; changing them will desynchronize validation
//! from what the firmware actually accepts.

// ============================================================================
// Wire Framing
// ============================================================================

/// Prefix of every host-to-module command line.
///
/// # Examples
///
/// ```
/// use asr650x_core::constants::COMMAND_PREFIX;
///
/// let line = format!("{}CJOIN=1,0,8,8", COMMAND_PREFIX);
/// assert_eq!(line, "AT+CJOIN=1,0,8,8");
/// ```
pub const COMMAND_PREFIX: &str = "AT+";

/// Suffix turning a command into an inquiry (`AT+CSTATUS?`).
pub const INQUIRY_SUFFIX: char = '?';

/// Line terminator the module expects on commands and emits on replies.
pub const LINE_TERMINATOR: &str = "\r\n";

// ============================================================================
// Reply Shapes
// ============================================================================

/// Positive acknowledgment terminating a set command or an inquiry reply.
pub const REPLY_OK: &str = "OK";

/// Prefix of a downlink notification line.
///
/// The remainder is `<mtype>,<port>,<len>,<msg>` where `mtype`, `port` and
/// `len` are decimal integers and `msg` is the payload as the device encodes
/// it (treated as opaque text by the driver).
///
/// # Examples
///
/// ```
/// use asr650x_core::constants::DOWNLINK_PREFIX;
///
/// let line = "OK+RECV:1,5,3,AABBCC";
/// assert_eq!(&line[..DOWNLINK_PREFIX.len()], DOWNLINK_PREFIX);
/// assert_eq!(&line[DOWNLINK_PREFIX.len()..], "1,5,3,AABBCC");
/// ```
pub const DOWNLINK_PREFIX: &str = "OK+RECV:";

/// Prefix reporting that an uplink was queued for transmission.
pub const SEND_ACCEPTED_PREFIX: &str = "OK+SEND:";

/// Prefix reporting that an uplink transmission completed.
pub const SEND_COMPLETE_PREFIX: &str = "OK+SENT:";

/// Prefix of a command rejection, optionally preceded by `+` on the wire.
///
/// The numeric subtype follows the colon. The firmware has only ever been
/// observed to report subtype 1 regardless of the actual fault.
pub const CME_ERROR_PREFIX: &str = "CME ERROR:";

/// Prefix of the unsolicited "uplink could not be sent" event.
pub const SEND_FAILED_PREFIX: &str = "ERR+SEND";

/// Prefix of the unsolicited "uplink retries exhausted" event.
pub const SENT_FAILED_PREFIX: &str = "ERR+SENT";

/// Unsolicited join success line.
pub const JOIN_OK_REPLY: &str = "+CJOIN:OK";

/// Unsolicited join failure line.
pub const JOIN_FAIL_REPLY: &str = "+CJOIN:FAIL";

/// Suffix of the module console prompt (`ASR6501:~#`), emitted as noise
/// between replies on some firmware revisions.
pub const PROMPT_SUFFIX: &str = ":~#";

/// Manufacturer identifier the CGMI probe must return.
pub const EXPECTED_MANUFACTURER: &str = "ASR";

// ============================================================================
// Credential Shapes
// ============================================================================

/// Device EUI length in hex characters (8 bytes).
pub const DEV_EUI_HEX_LEN: usize = 16;

/// Application EUI length in hex characters (8 bytes).
pub const APP_EUI_HEX_LEN: usize = 16;

/// Application key length in hex characters (16 bytes).
pub const APP_KEY_HEX_LEN: usize = 32;

// ============================================================================
// Data Rate and Bandwidth Tables
// ============================================================================

/// Highest data rate index the driver accepts anywhere (join, RX2, uplink).
///
/// # Examples
///
/// ```
/// use asr650x_core::constants::MAX_DATA_RATE;
///
/// fn valid_data_rate(dr: u8) -> bool {
///     dr <= MAX_DATA_RATE
/// }
///
/// assert!(valid_data_rate(6));
/// assert!(!valid_data_rate(7));
/// ```
pub const MAX_DATA_RATE: u8 = 6;

/// Number of entries in the (spreading factor, bandwidth index) table — one
/// per data rate 0..=[`MAX_DATA_RATE`].
pub const DATA_RATE_COUNT: usize = 7;

/// Number of entries in the fixed bandwidth table.
///
/// Bandwidth indices referenced by the data-rate table must be below this.
pub const BANDWIDTH_TABLE_LEN: usize = 10;

/// Maximum application payload bytes per data rate (EU868, index = DR).
///
/// These are the repeater-compatible `N` values from the LoRaWAN regional
/// parameters; the device rejects oversize uplinks with an unspecific error,
/// so the driver checks against this table before transmitting.
pub const MAX_PAYLOAD_BY_DATA_RATE: [usize; DATA_RATE_COUNT] = [51, 51, 51, 115, 222, 222, 222];

/// LoRaWAN framing overhead added to every uplink, in bytes.
///
/// MHDR(1) + DevAddr(4) + FCtrl(1) + FCnt(2) + FPort(1) + MIC(4). Used when
/// converting an application payload length into the PHY payload length the
/// airtime formula operates on.
pub const LORAWAN_FRAME_OVERHEAD: usize = 13;

// ============================================================================
// Parameter Ranges
// ============================================================================

/// Number of discrete transmit power levels (indices `0..TX_POWER_LEVELS`).
pub const TX_POWER_LEVELS: u8 = 7;

/// Minimum join retry count accepted by CJOIN.
pub const MIN_JOIN_RETRIES: u16 = 1;

/// Maximum join retry count accepted by CJOIN.
pub const MAX_JOIN_RETRIES: u16 = 256;

/// Minimum join retry interval in seconds.
pub const MIN_JOIN_INTERVAL_S: u16 = 1;

/// Maximum join retry interval in seconds.
pub const MAX_JOIN_INTERVAL_S: u16 = 255;

/// Minimum CNBTRIALS send/join trial count.
pub const MIN_NB_TRIALS: u8 = 1;

/// Maximum CNBTRIALS send/join trial count.
///
/// The ASR AT command summary caps this at 15 despite the underlying
/// LoRaMac stack advertising a wider range.
pub const MAX_NB_TRIALS: u8 = 15;

/// Lowest application port usable for uplinks; ports outside
/// [`MIN_APP_PORT`]..=[`MAX_APP_PORT`] are reserved by LoRaWAN.
pub const MIN_APP_PORT: u8 = 1;

/// Highest application port usable for uplinks.
pub const MAX_APP_PORT: u8 = 223;

/// Lowest RX2 frequency the device accepts, in Hz.
pub const MIN_RX2_FREQUENCY_HZ: u32 = 433_000_000;

/// Highest RX2 frequency the device accepts, in Hz.
pub const MAX_RX2_FREQUENCY_HZ: u32 = 999_000_000;

/// Maximum RX1 delay in seconds. The RX1 window opens 5 s after an uplink,
/// so larger values would miss it.
pub const MAX_RX1_DELAY_S: u8 = 5;

/// Maximum RX1 data-rate offset.
pub const MAX_RX1_DR_OFFSET: u8 = 5;

/// Maximum module log verbosity accepted by ILOGLVL (0 disables logging).
pub const MAX_MODULE_LOG_LEVEL: u8 = 5;

// ============================================================================
// Timing Defaults
// ============================================================================

/// Default deadline for a command's immediate reply (milliseconds).
///
/// Set commands answer `OK` or `+CME ERROR:<n>` well within this on a healthy
/// link; the budget exists so a wedged module surfaces as a timeout instead
/// of a hang.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;

/// Factory default join retry interval in seconds.
pub const DEFAULT_JOIN_INTERVAL_S: u16 = 8;

/// Factory default join retry count.
pub const DEFAULT_JOIN_RETRIES: u16 = 8;

/// Factory default RX1 delay in seconds (EU868).
pub const DEFAULT_RX1_DELAY_S: u8 = 5;

/// Extra time granted past the RX1 delay for the RX2 window and module
/// chatter when draining uplink progress replies (milliseconds).
pub const RX_WINDOW_GRACE_MS: u64 = 2000;
