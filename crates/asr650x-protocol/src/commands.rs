//! AT command vocabulary for the ASR650x module.
//!
//! This module defines every AT command the driver issues, together with
//! the request-line builders that turn validated parameters into wire
//! text. Commands take one of three request shapes:
//!
//! ```text
//! AT+CJOIN=1,0,8,8      set command (name, '=', comma-separated arguments)
//! AT+CSTATUS?           inquiry command (name, '?')
//! AT+CSAVE              bare command (name only)
//! ```
//!
//! The builders produce the bare command text only; the line codec owns
//! the CRLF discipline.
//!
//! # Command Categories
//!
//! ## Identification
//! - `Cgmi` (CGMI): manufacturer identifier, must report `ASR`
//! - `Cgmr` (CGMR): firmware revision
//! - `Cgsn` (CGSN): serial number
//!
//! ## Credentials
//! - `CDevEui` / `CAppEui` / `CAppKey`: OTAA identity
//! - `CDevAddr` / `CNwkSKey` / `CAppSKey`: ABP session keys
//!
//! ## Radio and MAC parameters
//! - `CJoinMode` (CJOINMODE): OTAA (0) or ABP (1)
//! - `CUlDlMode` (CULDLMODE): downlink frequency scheme
//! - `CWorkMode` (CWORKMODE): always 2 (normal) on this firmware
//! - `CClass` (CCLASS): device class A/B/C
//! - `CAppPort` (CAPPPORT): uplink fPort 1..=223
//! - `CDataRate` (CDATARATE): DR index; ADR must be off to change it
//! - `CNbTrials` (CNBTRIALS): per-message-type trial count
//! - `CTxp` (CTXP): transmit power index
//! - `CAdr` (CADR): adaptive data rate on/off
//! - `CRxp` (CRXP): RX1 offset, RX2 data rate, RX2 frequency
//! - `CRx1Delay` (CRX1DELAY): RX1 window delay in seconds
//!
//! ## Session
//! - `CStatus` (CSTATUS): module activity code 0..=8
//! - `CJoin` (CJOIN): start or abort the join procedure
//!
//! ## Data transfer
//! - `Dtrx` (DTRX): send an uplink (hex payload)
//! - `Drx` (DRX): poll the receive buffer
//!
//! ## Module control
//! - `CSave` / `CRestore` (CSAVE/CRESTORE): persist or reload MAC config
//! - `IReboot` (IREBOOT): reboot, optionally to the bootloader
//! - `ILogLvl` (ILOGLVL): module console verbosity, 0 silences it
//!
//! # Usage Examples
//!
//! ```
//! use asr650x_protocol::AtCommand;
//!
//! assert_eq!(AtCommand::CStatus.inquire(), "AT+CSTATUS?");
//! assert_eq!(AtCommand::CTxp.set(0), "AT+CTXP=0");
//! assert_eq!(AtCommand::CSave.bare(), "AT+CSAVE");
//!
//! let parsed = AtCommand::parse("CJOIN").unwrap();
//! assert_eq!(parsed, AtCommand::CJoin);
//! ```

use asr650x_core::{Error, FrequencyPlan, JoinRequest, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// AT commands understood by the ASR650x firmware.
///
/// Each variant corresponds to one command name as it appears on the wire
/// (without the `AT+` prefix).
///
/// # Examples
///
/// ```
/// use asr650x_protocol::AtCommand;
///
/// let cmd = AtCommand::CJoin;
/// assert_eq!(cmd.as_str(), "CJOIN");
///
/// let parsed = AtCommand::parse("DTRX").unwrap();
/// assert_eq!(parsed, AtCommand::Dtrx);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtCommand {
    // Identification
    Cgmi, // CGMI
    Cgmr, // CGMR
    Cgsn, // CGSN

    // Credentials
    CDevEui,  // CDEVEUI
    CAppEui,  // CAPPEUI
    CAppKey,  // CAPPKEY
    CDevAddr, // CDEVADDR
    CNwkSKey, // CNWKSKEY
    CAppSKey, // CAPPSKEY

    // Radio and MAC parameters
    CJoinMode, // CJOINMODE
    CUlDlMode, // CULDLMODE
    CWorkMode, // CWORKMODE
    CClass,    // CCLASS
    CAppPort,  // CAPPPORT
    CDataRate, // CDATARATE
    CNbTrials, // CNBTRIALS
    CTxp,      // CTXP
    CAdr,      // CADR
    CRxp,      // CRXP
    CRx1Delay, // CRX1DELAY

    // Session
    CStatus, // CSTATUS
    CJoin,   // CJOIN

    // Data transfer
    Dtrx, // DTRX
    Drx,  // DRX

    // Module control
    CSave,    // CSAVE
    CRestore, // CRESTORE
    IReboot,  // IREBOOT
    ILogLvl,  // ILOGLVL
}

impl AtCommand {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "CGMI" => Ok(AtCommand::Cgmi),
            "CGMR" => Ok(AtCommand::Cgmr),
            "CGSN" => Ok(AtCommand::Cgsn),
            "CDEVEUI" => Ok(AtCommand::CDevEui),
            "CAPPEUI" => Ok(AtCommand::CAppEui),
            "CAPPKEY" => Ok(AtCommand::CAppKey),
            "CDEVADDR" => Ok(AtCommand::CDevAddr),
            "CNWKSKEY" => Ok(AtCommand::CNwkSKey),
            "CAPPSKEY" => Ok(AtCommand::CAppSKey),
            "CJOINMODE" => Ok(AtCommand::CJoinMode),
            "CULDLMODE" => Ok(AtCommand::CUlDlMode),
            "CWORKMODE" => Ok(AtCommand::CWorkMode),
            "CCLASS" => Ok(AtCommand::CClass),
            "CAPPPORT" => Ok(AtCommand::CAppPort),
            "CDATARATE" => Ok(AtCommand::CDataRate),
            "CNBTRIALS" => Ok(AtCommand::CNbTrials),
            "CTXP" => Ok(AtCommand::CTxp),
            "CADR" => Ok(AtCommand::CAdr),
            "CRXP" => Ok(AtCommand::CRxp),
            "CRX1DELAY" => Ok(AtCommand::CRx1Delay),
            "CSTATUS" => Ok(AtCommand::CStatus),
            "CJOIN" => Ok(AtCommand::CJoin),
            "DTRX" => Ok(AtCommand::Dtrx),
            "DRX" => Ok(AtCommand::Drx),
            "CSAVE" => Ok(AtCommand::CSave),
            "CRESTORE" => Ok(AtCommand::CRestore),
            "IREBOOT" => Ok(AtCommand::IReboot),
            "ILOGLVL" => Ok(AtCommand::ILogLvl),
            _ => Err(Error::UnknownCommand(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AtCommand::Cgmi => "CGMI",
            AtCommand::Cgmr => "CGMR",
            AtCommand::Cgsn => "CGSN",
            AtCommand::CDevEui => "CDEVEUI",
            AtCommand::CAppEui => "CAPPEUI",
            AtCommand::CAppKey => "CAPPKEY",
            AtCommand::CDevAddr => "CDEVADDR",
            AtCommand::CNwkSKey => "CNWKSKEY",
            AtCommand::CAppSKey => "CAPPSKEY",
            AtCommand::CJoinMode => "CJOINMODE",
            AtCommand::CUlDlMode => "CULDLMODE",
            AtCommand::CWorkMode => "CWORKMODE",
            AtCommand::CClass => "CCLASS",
            AtCommand::CAppPort => "CAPPPORT",
            AtCommand::CDataRate => "CDATARATE",
            AtCommand::CNbTrials => "CNBTRIALS",
            AtCommand::CTxp => "CTXP",
            AtCommand::CAdr => "CADR",
            AtCommand::CRxp => "CRXP",
            AtCommand::CRx1Delay => "CRX1DELAY",
            AtCommand::CStatus => "CSTATUS",
            AtCommand::CJoin => "CJOIN",
            AtCommand::Dtrx => "DTRX",
            AtCommand::Drx => "DRX",
            AtCommand::CSave => "CSAVE",
            AtCommand::CRestore => "CRESTORE",
            AtCommand::IReboot => "IREBOOT",
            AtCommand::ILogLvl => "ILOGLVL",
        }
    }

    /// Build a set-command line: `AT+<NAME>=<args>`.
    ///
    /// The argument is rendered via `Display`, so single numeric values can
    /// be passed directly and compound argument lists as preformatted text.
    ///
    /// # Example
    /// ```
    /// use asr650x_protocol::AtCommand;
    ///
    /// assert_eq!(AtCommand::CDataRate.set(3), "AT+CDATARATE=3");
    /// assert_eq!(AtCommand::CNbTrials.set("0,8"), "AT+CNBTRIALS=0,8");
    /// ```
    #[must_use]
    pub fn set(self, args: impl fmt::Display) -> String {
        format!("AT+{}={args}", self.as_str())
    }

    /// Build an inquiry line: `AT+<NAME>?`.
    #[must_use]
    pub fn inquire(self) -> String {
        format!("AT+{}?", self.as_str())
    }

    /// Build a bare command line: `AT+<NAME>`.
    #[must_use]
    pub fn bare(self) -> String {
        format!("AT+{}", self.as_str())
    }

    /// Returns `true` if this command reports module identity.
    #[inline]
    pub fn is_identification(&self) -> bool {
        matches!(self, Self::Cgmi | Self::Cgmr | Self::Cgsn)
    }

    /// Returns `true` if this command carries activation credentials.
    #[inline]
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            Self::CDevEui
                | Self::CAppEui
                | Self::CAppKey
                | Self::CDevAddr
                | Self::CNwkSKey
                | Self::CAppSKey
        )
    }

    /// Returns `true` if this command configures a radio or MAC parameter.
    #[inline]
    pub fn is_radio_parameter(&self) -> bool {
        matches!(
            self,
            Self::CJoinMode
                | Self::CUlDlMode
                | Self::CWorkMode
                | Self::CClass
                | Self::CAppPort
                | Self::CDataRate
                | Self::CNbTrials
                | Self::CTxp
                | Self::CAdr
                | Self::CRxp
                | Self::CRx1Delay
        )
    }

    /// Returns `true` if this command drives or observes the join session.
    #[inline]
    pub fn is_session(&self) -> bool {
        matches!(self, Self::CStatus | Self::CJoin)
    }

    /// Returns `true` if this command moves application data.
    #[inline]
    pub fn is_data_transfer(&self) -> bool {
        matches!(self, Self::Dtrx | Self::Drx)
    }

    /// Returns `true` if this command controls module persistence or state.
    #[inline]
    pub fn is_module_control(&self) -> bool {
        matches!(
            self,
            Self::CSave | Self::CRestore | Self::IReboot | Self::ILogLvl
        )
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encode bytes as uppercase hex, the form DTRX expects.
///
/// # Example
/// ```
/// use asr650x_protocol::to_hex_upper;
///
/// assert_eq!(to_hex_upper(b"\x01\xab"), "01AB");
/// ```
#[must_use]
pub fn to_hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // infallible for String
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Build the CJOIN line for a validated join request.
///
/// The wire shape is `AT+CJOIN=<start>,<autojoin>,<interval>,<retries>`
/// for start and abort alike.
#[must_use]
pub fn format_join(req: &JoinRequest) -> String {
    AtCommand::CJoin.set(format_args!(
        "{},{},{},{}",
        u8::from(req.is_start()),
        u8::from(req.auto_join()),
        req.interval_s(),
        req.retries()
    ))
}

/// Build the DTRX line for an uplink payload.
///
/// The length field counts hex characters, not payload bytes.
///
/// # Example
/// ```
/// use asr650x_protocol::format_uplink;
///
/// let line = format_uplink(false, 1, b"\x01\x02");
/// assert_eq!(line, "AT+DTRX=0,1,4,0102");
/// ```
#[must_use]
pub fn format_uplink(confirmed: bool, nb_trials: u8, payload: &[u8]) -> String {
    let hex = to_hex_upper(payload);
    AtCommand::Dtrx.set(format_args!(
        "{},{nb_trials},{},{hex}",
        u8::from(confirmed),
        hex.len()
    ))
}

/// Build the CRXP line carrying the plan's receive-window parameters.
#[must_use]
pub fn format_receive_window(plan: &FrequencyPlan) -> String {
    AtCommand::CRxp.set(format_args!(
        "{},{},{}",
        plan.rx1_dr_offset, plan.rx2_data_rate, plan.rx2_frequency_hz
    ))
}

/// Build the CNBTRIALS line for the given message type.
#[must_use]
pub fn format_nb_trials(confirmed: bool, trials: u8) -> String {
    AtCommand::CNbTrials.set(format_args!("{},{trials}", u8::from(confirmed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns every command for exhaustive table tests.
    ///
    /// Keep in sync with the enum; the count assertion below catches a
    /// variant added without updating this helper.
    fn all_commands() -> Vec<AtCommand> {
        vec![
            AtCommand::Cgmi,
            AtCommand::Cgmr,
            AtCommand::Cgsn,
            AtCommand::CDevEui,
            AtCommand::CAppEui,
            AtCommand::CAppKey,
            AtCommand::CDevAddr,
            AtCommand::CNwkSKey,
            AtCommand::CAppSKey,
            AtCommand::CJoinMode,
            AtCommand::CUlDlMode,
            AtCommand::CWorkMode,
            AtCommand::CClass,
            AtCommand::CAppPort,
            AtCommand::CDataRate,
            AtCommand::CNbTrials,
            AtCommand::CTxp,
            AtCommand::CAdr,
            AtCommand::CRxp,
            AtCommand::CRx1Delay,
            AtCommand::CStatus,
            AtCommand::CJoin,
            AtCommand::Dtrx,
            AtCommand::Drx,
            AtCommand::CSave,
            AtCommand::CRestore,
            AtCommand::IReboot,
            AtCommand::ILogLvl,
        ]
    }

    #[test]
    fn test_all_commands_is_complete() {
        let commands = all_commands();
        assert_eq!(
            commands.len(),
            28,
            "all_commands() must include every AtCommand variant"
        );

        let mut seen = std::collections::HashSet::new();
        for cmd in commands {
            assert!(seen.insert(cmd), "duplicate in all_commands(): {cmd:?}");
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for cmd in all_commands() {
            let parsed = AtCommand::parse(cmd.as_str()).unwrap();
            assert_eq!(parsed, cmd);
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(AtCommand::parse("CRSSI").is_err());
        assert!(AtCommand::parse("cjoin").is_err());
        assert!(AtCommand::parse("").is_err());
    }

    #[test]
    fn test_display_matches_as_str() {
        for cmd in all_commands() {
            assert_eq!(format!("{cmd}"), cmd.as_str());
        }
    }

    #[test]
    fn test_request_shapes() {
        assert_eq!(AtCommand::CStatus.inquire(), "AT+CSTATUS?");
        assert_eq!(AtCommand::CSave.bare(), "AT+CSAVE");
        assert_eq!(AtCommand::ILogLvl.set(0), "AT+ILOGLVL=0");
        assert_eq!(AtCommand::CDevEui.set("70B3D57ED0051234"), "AT+CDEVEUI=70B3D57ED0051234");
    }

    #[test]
    fn test_categories_are_mutually_exclusive() {
        for cmd in all_commands() {
            let categories = [
                cmd.is_identification(),
                cmd.is_credential(),
                cmd.is_radio_parameter(),
                cmd.is_session(),
                cmd.is_data_transfer(),
                cmd.is_module_control(),
            ];
            let count = categories.iter().filter(|&&c| c).count();
            assert_eq!(count, 1, "{cmd:?} belongs to {count} categories");
        }
    }

    #[test]
    fn test_to_hex_upper() {
        assert_eq!(to_hex_upper(b""), "");
        assert_eq!(to_hex_upper(b"\x00\xff"), "00FF");
        assert_eq!(to_hex_upper(b"HELLO 1"), "48454C4C4F2031");
    }

    #[test]
    fn test_format_join_attempt_and_abort() {
        let attempt = JoinRequest::attempt(false, 8, 8).unwrap();
        assert_eq!(format_join(&attempt), "AT+CJOIN=1,0,8,8");

        let auto = JoinRequest::attempt(true, 10, 256).unwrap();
        assert_eq!(format_join(&auto), "AT+CJOIN=1,1,10,256");

        assert_eq!(format_join(&JoinRequest::abort()), "AT+CJOIN=0,0,8,8");
    }

    #[test]
    fn test_format_uplink_counts_hex_chars() {
        let line = format_uplink(true, 8, b"HELLO 1");
        assert_eq!(line, "AT+DTRX=1,8,14,48454C4C4F2031");

        let empty = format_uplink(false, 1, b"");
        assert_eq!(empty, "AT+DTRX=0,1,0,");
    }

    #[test]
    fn test_format_receive_window() {
        let plan = FrequencyPlan::eu868();
        assert_eq!(format_receive_window(&plan), "AT+CRXP=0,3,869525000");
    }

    #[test]
    fn test_format_nb_trials() {
        assert_eq!(format_nb_trials(false, 1), "AT+CNBTRIALS=0,1");
        assert_eq!(format_nb_trials(true, 8), "AT+CNBTRIALS=1,8");
    }
}
