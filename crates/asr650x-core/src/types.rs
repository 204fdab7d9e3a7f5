use crate::{
    Result,
    constants::{
        APP_EUI_HEX_LEN, APP_KEY_HEX_LEN, BANDWIDTH_TABLE_LEN, DATA_RATE_COUNT, DEV_EUI_HEX_LEN,
        MAX_DATA_RATE, MAX_JOIN_INTERVAL_S, MAX_JOIN_RETRIES, MAX_NB_TRIALS, MAX_PAYLOAD_BY_DATA_RATE,
        MAX_RX1_DELAY_S, MAX_RX1_DR_OFFSET, MAX_RX2_FREQUENCY_HZ, MIN_JOIN_INTERVAL_S,
        MIN_JOIN_RETRIES, MIN_NB_TRIALS, MIN_RX2_FREQUENCY_HZ, TX_POWER_LEVELS,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network activation procedure (CJOINMODE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum JoinMode {
    /// Over-the-air activation: the device negotiates session keys by joining.
    Otaa = 0,
    /// Activation by personalization: session keys are provisioned directly.
    Abp = 1,
}

impl JoinMode {
    /// Create a join mode from its wire code.
    ///
    /// # Errors
    /// Returns `Error::UnknownCode` if the value is not 0 or 1.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(JoinMode::Otaa),
            1 => Ok(JoinMode::Abp),
            _ => Err(Error::UnknownCode {
                name: "join mode",
                code: value,
            }),
        }
    }

    /// Convert the join mode to its wire code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` if the mode is over-the-air activation.
    #[inline]
    #[must_use]
    pub fn is_otaa(self) -> bool {
        matches!(self, JoinMode::Otaa)
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JoinMode::Otaa => write!(f, "OTAA"),
            JoinMode::Abp => write!(f, "ABP"),
        }
    }
}

/// LoRaWAN device class (CCLASS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LoraClass {
    /// Class A: two short receive windows after each uplink.
    A = 0,
    /// Class B: scheduled receive slots (not supported by all firmware).
    B = 1,
    /// Class C: continuously open receive window.
    C = 2,
}

impl LoraClass {
    /// Create a device class from its wire code.
    ///
    /// # Errors
    /// Returns `Error::UnknownCode` if the value is not 0, 1, or 2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LoraClass::A),
            1 => Ok(LoraClass::B),
            2 => Ok(LoraClass::C),
            _ => Err(Error::UnknownCode {
                name: "device class",
                code: value,
            }),
        }
    }

    /// Convert the device class to its wire code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LoraClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoraClass::A => write!(f, "A"),
            LoraClass::B => write!(f, "B"),
            LoraClass::C => write!(f, "C"),
        }
    }
}

/// Uplink/downlink frequency relationship (CULDLMODE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum UlDlMode {
    /// Downlinks arrive on the uplink frequency.
    SameFrequency = 1,
    /// Downlinks arrive on a separate frequency (EU868 and most plans).
    DifferentFrequency = 2,
}

impl UlDlMode {
    /// Create a mode from its wire code.
    ///
    /// # Errors
    /// Returns `Error::UnknownCode` if the value is not 1 or 2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(UlDlMode::SameFrequency),
            2 => Ok(UlDlMode::DifferentFrequency),
            _ => Err(Error::UnknownCode {
                name: "uplink/downlink mode",
                code: value,
            }),
        }
    }

    /// Convert the mode to its wire code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Module activity reported by a CSTATUS inquiry.
///
/// The join codes only appear during the first join procedure after a
/// reset; once joined the module reverts to the data-operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModuleStatus {
    /// No data operation in progress.
    Idle = 0,
    /// Uplink transmission in progress.
    Sending = 1,
    /// Uplink transmission failed.
    SendFailed = 2,
    /// Uplink transmission succeeded.
    SendOk = 3,
    /// Network join succeeded.
    JoinOk = 4,
    /// Network join failed.
    JoinFailed = 5,
    /// Link check reported a possibly abnormal network.
    NetworkAbnormal = 6,
    /// Uplink succeeded with no downlink in the receive windows.
    SentNoDownlink = 7,
    /// Uplink succeeded and a downlink was received.
    SentWithDownlink = 8,
}

impl ModuleStatus {
    /// Create a status from its wire code.
    ///
    /// # Errors
    /// Returns `Error::UnknownCode` if the value is outside 0..=8.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ModuleStatus::Idle),
            1 => Ok(ModuleStatus::Sending),
            2 => Ok(ModuleStatus::SendFailed),
            3 => Ok(ModuleStatus::SendOk),
            4 => Ok(ModuleStatus::JoinOk),
            5 => Ok(ModuleStatus::JoinFailed),
            6 => Ok(ModuleStatus::NetworkAbnormal),
            7 => Ok(ModuleStatus::SentNoDownlink),
            8 => Ok(ModuleStatus::SentWithDownlink),
            _ => Err(Error::UnknownCode {
                name: "module status",
                code: value,
            }),
        }
    }

    /// Convert the status to its wire code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` if the status reports a successful join.
    #[inline]
    #[must_use]
    pub fn is_join_ok(self) -> bool {
        matches!(self, ModuleStatus::JoinOk)
    }

    /// Returns `true` if the status reports a failed join.
    #[inline]
    #[must_use]
    pub fn is_join_failed(self) -> bool {
        matches!(self, ModuleStatus::JoinFailed)
    }

    /// Returns `true` if an uplink is still being transmitted.
    #[inline]
    #[must_use]
    pub fn is_sending(self) -> bool {
        matches!(self, ModuleStatus::Sending)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            ModuleStatus::Idle => "idle",
            ModuleStatus::Sending => "sending",
            ModuleStatus::SendFailed => "send failed",
            ModuleStatus::SendOk => "send ok",
            ModuleStatus::JoinOk => "join ok",
            ModuleStatus::JoinFailed => "join failed",
            ModuleStatus::NetworkAbnormal => "network abnormal",
            ModuleStatus::SentNoDownlink => "sent, no downlink",
            ModuleStatus::SentWithDownlink => "sent, downlink received",
        };
        write!(f, "{text}")
    }
}

/// Transmit power level (CTXP).
///
/// The module takes an index, not a dBm value. Index 0 is the highest
/// power; each step down drops 2 dBm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxPower {
    Dbm17 = 0,
    Dbm15 = 1,
    Dbm13 = 2,
    Dbm11 = 3,
    Dbm9 = 4,
    Dbm7 = 5,
    Dbm5 = 6,
}

impl TxPower {
    /// Create a transmit power from its index.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` if the index is not below
    /// [`TX_POWER_LEVELS`].
    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(TxPower::Dbm17),
            1 => Ok(TxPower::Dbm15),
            2 => Ok(TxPower::Dbm13),
            3 => Ok(TxPower::Dbm11),
            4 => Ok(TxPower::Dbm9),
            5 => Ok(TxPower::Dbm7),
            6 => Ok(TxPower::Dbm5),
            _ => Err(Error::out_of_range(
                "tx power index",
                u32::from(index),
                0,
                u32::from(TX_POWER_LEVELS - 1),
            )),
        }
    }

    /// Get the wire index sent to the module.
    #[inline]
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Get the nominal output power in dBm.
    #[must_use]
    pub fn dbm(self) -> i8 {
        17 - 2 * (self as i8)
    }
}

impl fmt::Display for TxPower {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} dBm", self.dbm())
    }
}

/// LoRaWAN data rate index (CDATARATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRate(u8);

impl DataRate {
    /// Create a data rate with validation.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` if the index exceeds [`MAX_DATA_RATE`].
    pub fn new(index: u8) -> Result<Self> {
        if index > MAX_DATA_RATE {
            return Err(Error::out_of_range(
                "data rate",
                u32::from(index),
                0,
                u32::from(MAX_DATA_RATE),
            ));
        }
        Ok(DataRate(index))
    }

    /// Get the raw index as u8.
    #[inline]
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Maximum application payload in bytes at this data rate (EU868).
    #[must_use]
    pub fn max_payload(self) -> usize {
        MAX_PAYLOAD_BY_DATA_RATE[self.0 as usize]
    }
}

impl Default for DataRate {
    /// DR0, the most conservative rate and the module's post-reset state.
    fn default() -> Self {
        DataRate(0)
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DR{}", self.0)
    }
}

/// Validate, trim and uppercase a hex credential field.
fn normalized_hex(field: &'static str, value: &str, expected: usize) -> Result<String> {
    let value = value.trim().to_uppercase();

    if value.len() != expected {
        return Err(Error::InvalidHexLength {
            field,
            expected,
            actual: value.len(),
        });
    }

    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidHexDigit { field, value });
    }

    Ok(value)
}

/// Over-the-air activation credentials (DevEUI, AppEUI/JoinEUI, AppKey).
///
/// Values are normalized to uppercase hex at construction so the module
/// always sees a canonical form. An all-zero value is accepted; some
/// network servers hand those out for test devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaaCredentials {
    dev_eui: String,
    app_eui: String,
    app_key: String,
}

impl OtaaCredentials {
    /// Create OTAA credentials with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidHexLength` if a field is not exactly 16/16/32
    /// hex characters, or `Error::InvalidHexDigit` if a field contains a
    /// non-hex character.
    pub fn new(dev_eui: &str, app_eui: &str, app_key: &str) -> Result<Self> {
        Ok(OtaaCredentials {
            dev_eui: normalized_hex("DevEUI", dev_eui, DEV_EUI_HEX_LEN)?,
            app_eui: normalized_hex("AppEUI", app_eui, APP_EUI_HEX_LEN)?,
            app_key: normalized_hex("AppKey", app_key, APP_KEY_HEX_LEN)?,
        })
    }

    /// Get the device EUI as uppercase hex.
    #[must_use]
    pub fn dev_eui(&self) -> &str {
        &self.dev_eui
    }

    /// Get the application EUI (JoinEUI) as uppercase hex.
    #[must_use]
    pub fn app_eui(&self) -> &str {
        &self.app_eui
    }

    /// Get the application key as uppercase hex.
    #[must_use]
    pub fn app_key(&self) -> &str {
        &self.app_key
    }
}

/// Activation-by-personalization credentials (DevAddr, NwkSKey, AppSKey).
///
/// Fields are trimmed and uppercased but only checked for non-emptiness;
/// firmware revisions differ on the address widths they accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbpCredentials {
    dev_addr: String,
    nwk_skey: String,
    app_skey: String,
}

impl AbpCredentials {
    /// Create ABP credentials with validation.
    ///
    /// # Errors
    /// Returns `Error::EmptyField` if any field is empty after trimming.
    pub fn new(dev_addr: &str, nwk_skey: &str, app_skey: &str) -> Result<Self> {
        let dev_addr = dev_addr.trim().to_uppercase();
        let nwk_skey = nwk_skey.trim().to_uppercase();
        let app_skey = app_skey.trim().to_uppercase();

        if dev_addr.is_empty() {
            return Err(Error::EmptyField { field: "DevAddr" });
        }
        if nwk_skey.is_empty() {
            return Err(Error::EmptyField { field: "NwkSKey" });
        }
        if app_skey.is_empty() {
            return Err(Error::EmptyField { field: "AppSKey" });
        }

        Ok(AbpCredentials {
            dev_addr,
            nwk_skey,
            app_skey,
        })
    }

    /// Get the device address as uppercase hex.
    #[must_use]
    pub fn dev_addr(&self) -> &str {
        &self.dev_addr
    }

    /// Get the network session key as uppercase hex.
    #[must_use]
    pub fn nwk_skey(&self) -> &str {
        &self.nwk_skey
    }

    /// Get the application session key as uppercase hex.
    #[must_use]
    pub fn app_skey(&self) -> &str {
        &self.app_skey
    }
}

/// General network behavior applied before joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Activation procedure.
    pub join_mode: JoinMode,
    /// Device class.
    pub class: LoraClass,
    /// Transmit power level.
    pub tx_power: TxPower,
    /// Unconfirmed-uplink trial count (CNBTRIALS), 1..=15.
    pub nb_trials: u8,
}

impl NetworkConfig {
    /// Check field ranges not enforced by the type system.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` if `nb_trials` is outside 1..=15.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_NB_TRIALS..=MAX_NB_TRIALS).contains(&self.nb_trials) {
            return Err(Error::out_of_range(
                "nb trials",
                u32::from(self.nb_trials),
                u32::from(MIN_NB_TRIALS),
                u32::from(MAX_NB_TRIALS),
            ));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            join_mode: JoinMode::Otaa,
            class: LoraClass::A,
            tx_power: TxPower::Dbm17,
            nb_trials: 1,
        }
    }
}

/// Regional frequency-plan parameters.
///
/// `data_rates` maps each data rate index to a `(spreading factor,
/// bandwidth table index)` pair, and `bandwidths_khz` is the fixed
/// bandwidth table those indices point into. The receive-window fields
/// are pushed to the module via CRX1DELAY and CRXP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPlan {
    /// Seconds between the end of an uplink and the RX1 window.
    pub rx1_delay_s: u8,
    /// Data rate used for join requests.
    pub join_data_rate: u8,
    /// RX1 data-rate offset.
    pub rx1_dr_offset: u8,
    /// Fixed data rate of the RX2 window.
    pub rx2_data_rate: u8,
    /// Fixed frequency of the RX2 window in Hz.
    pub rx2_frequency_hz: u32,
    /// Bandwidth table in kHz, indexed by the second element of `data_rates`.
    pub bandwidths_khz: [f64; BANDWIDTH_TABLE_LEN],
    /// `(spreading factor, bandwidth index)` per data rate index.
    pub data_rates: [(u8, u8); DATA_RATE_COUNT],
}

impl FrequencyPlan {
    /// The EU868 plan as The Things Network deploys it: RX1 after 5 s,
    /// RX2 at 869.525 MHz on DR3 (SF9), joins at DR0 for maximum range.
    #[must_use]
    pub fn eu868() -> Self {
        FrequencyPlan {
            rx1_delay_s: 5,
            join_data_rate: 0,
            rx1_dr_offset: 0,
            rx2_data_rate: 3,
            rx2_frequency_hz: 869_525_000,
            bandwidths_khz: [
                7.8, 10.4, 15.6, 20.8, 31.25, 41.7, 62.5, 125.0, 250.0, 500.0,
            ],
            data_rates: [(12, 7), (11, 7), (10, 7), (9, 7), (8, 7), (7, 7), (7, 8)],
        }
    }

    /// Check every field against the ranges the module accepts.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` for a field outside its documented range,
    /// or `Error::InvalidBandwidthIndex` if a data-rate entry points past the
    /// bandwidth table.
    pub fn validate(&self) -> Result<()> {
        if self.rx1_delay_s > MAX_RX1_DELAY_S {
            return Err(Error::out_of_range(
                "RX1 delay",
                u32::from(self.rx1_delay_s),
                0,
                u32::from(MAX_RX1_DELAY_S),
            ));
        }
        if self.join_data_rate > MAX_DATA_RATE {
            return Err(Error::out_of_range(
                "join data rate",
                u32::from(self.join_data_rate),
                0,
                u32::from(MAX_DATA_RATE),
            ));
        }
        if self.rx1_dr_offset > MAX_RX1_DR_OFFSET {
            return Err(Error::out_of_range(
                "RX1 DR offset",
                u32::from(self.rx1_dr_offset),
                0,
                u32::from(MAX_RX1_DR_OFFSET),
            ));
        }
        if self.rx2_data_rate > MAX_DATA_RATE {
            return Err(Error::out_of_range(
                "RX2 data rate",
                u32::from(self.rx2_data_rate),
                0,
                u32::from(MAX_DATA_RATE),
            ));
        }
        if !(MIN_RX2_FREQUENCY_HZ..=MAX_RX2_FREQUENCY_HZ).contains(&self.rx2_frequency_hz) {
            return Err(Error::out_of_range(
                "RX2 frequency",
                self.rx2_frequency_hz,
                MIN_RX2_FREQUENCY_HZ,
                MAX_RX2_FREQUENCY_HZ,
            ));
        }
        for (dr, &(_, bw_index)) in self.data_rates.iter().enumerate() {
            if usize::from(bw_index) >= BANDWIDTH_TABLE_LEN {
                return Err(Error::InvalidBandwidthIndex {
                    data_rate: dr as u8,
                    index: bw_index,
                });
            }
        }
        Ok(())
    }

    /// Spreading factor used at the given data rate.
    #[must_use]
    pub fn spreading_factor(&self, dr: DataRate) -> u8 {
        self.data_rates[dr.as_u8() as usize].0
    }

    /// Bandwidth in kHz used at the given data rate.
    ///
    /// # Errors
    /// Returns `Error::InvalidBandwidthIndex` if the plan entry points past
    /// the bandwidth table.
    pub fn bandwidth_khz(&self, dr: DataRate) -> Result<f64> {
        let (_, bw_index) = self.data_rates[dr.as_u8() as usize];
        self.bandwidths_khz
            .get(usize::from(bw_index))
            .copied()
            .ok_or(Error::InvalidBandwidthIndex {
                data_rate: dr.as_u8(),
                index: bw_index,
            })
    }

    /// Bandwidth in Hz used at the given data rate.
    ///
    /// # Errors
    /// Returns `Error::InvalidBandwidthIndex` if the plan entry points past
    /// the bandwidth table.
    pub fn bandwidth_hz(&self, dr: DataRate) -> Result<f64> {
        Ok(self.bandwidth_khz(dr)? * 1000.0)
    }
}

/// Parameters for starting or aborting a network join (CJOIN).
///
/// The wire format always carries all four fields, so an abort still
/// includes the factory interval and retry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    start: bool,
    auto_join: bool,
    interval_s: u16,
    retries: u16,
}

impl JoinRequest {
    /// Create a join attempt with validation.
    ///
    /// `auto_join` makes the module re-join by itself after a power cycle.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` if `interval_s` is outside 1..=255 or
    /// `retries` is outside 1..=256.
    pub fn attempt(auto_join: bool, interval_s: u16, retries: u16) -> Result<Self> {
        if !(MIN_JOIN_INTERVAL_S..=MAX_JOIN_INTERVAL_S).contains(&interval_s) {
            return Err(Error::out_of_range(
                "join interval",
                u32::from(interval_s),
                u32::from(MIN_JOIN_INTERVAL_S),
                u32::from(MAX_JOIN_INTERVAL_S),
            ));
        }
        if !(MIN_JOIN_RETRIES..=MAX_JOIN_RETRIES).contains(&retries) {
            return Err(Error::out_of_range(
                "join retries",
                u32::from(retries),
                u32::from(MIN_JOIN_RETRIES),
                u32::from(MAX_JOIN_RETRIES),
            ));
        }
        Ok(JoinRequest {
            start: true,
            auto_join,
            interval_s,
            retries,
        })
    }

    /// Create a request that aborts an in-progress join.
    #[must_use]
    pub fn abort() -> Self {
        JoinRequest {
            start: false,
            auto_join: false,
            interval_s: crate::constants::DEFAULT_JOIN_INTERVAL_S,
            retries: crate::constants::DEFAULT_JOIN_RETRIES,
        }
    }

    /// Returns `true` if this request starts a join.
    #[inline]
    #[must_use]
    pub fn is_start(self) -> bool {
        self.start
    }

    /// Returns `true` if auto-join after power cycle is requested.
    #[inline]
    #[must_use]
    pub fn auto_join(self) -> bool {
        self.auto_join
    }

    /// Seconds between join retries.
    #[inline]
    #[must_use]
    pub fn interval_s(self) -> u16 {
        self.interval_s
    }

    /// Maximum number of join retries.
    #[inline]
    #[must_use]
    pub fn retries(self) -> u16 {
        self.retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, JoinMode::Otaa)]
    #[case(1, JoinMode::Abp)]
    fn test_join_mode_roundtrip(#[case] code: u8, #[case] expected: JoinMode) {
        let mode = JoinMode::from_u8(code).unwrap();
        assert_eq!(mode, expected);
        assert_eq!(mode.to_u8(), code);
    }

    #[test]
    fn test_join_mode_invalid() {
        assert!(JoinMode::from_u8(2).is_err());
    }

    #[test]
    fn test_module_status_codes() {
        assert_eq!(ModuleStatus::from_u8(4).unwrap(), ModuleStatus::JoinOk);
        assert_eq!(ModuleStatus::from_u8(5).unwrap(), ModuleStatus::JoinFailed);
        assert_eq!(
            ModuleStatus::from_u8(8).unwrap(),
            ModuleStatus::SentWithDownlink
        );
        assert!(ModuleStatus::from_u8(9).is_err());

        assert!(ModuleStatus::JoinOk.is_join_ok());
        assert!(!ModuleStatus::JoinOk.is_join_failed());
        assert!(ModuleStatus::Sending.is_sending());
    }

    #[rstest]
    #[case(TxPower::Dbm17, 0, 17)]
    #[case(TxPower::Dbm13, 2, 13)]
    #[case(TxPower::Dbm5, 6, 5)]
    fn test_tx_power_mapping(#[case] power: TxPower, #[case] index: u8, #[case] dbm: i8) {
        assert_eq!(TxPower::from_index(index).unwrap(), power);
        assert_eq!(power.index(), index);
        assert_eq!(power.dbm(), dbm);
    }

    #[test]
    fn test_tx_power_invalid_index() {
        assert!(TxPower::from_index(7).is_err());
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(6)]
    fn test_data_rate_valid(#[case] index: u8) {
        let dr = DataRate::new(index).unwrap();
        assert_eq!(dr.as_u8(), index);
    }

    #[test]
    fn test_data_rate_invalid() {
        assert!(DataRate::new(7).is_err());
    }

    #[test]
    fn test_data_rate_max_payload() {
        assert_eq!(DataRate::new(0).unwrap().max_payload(), 51);
        assert_eq!(DataRate::new(3).unwrap().max_payload(), 115);
        assert_eq!(DataRate::new(6).unwrap().max_payload(), 222);
    }

    #[test]
    fn test_otaa_credentials_normalized() {
        let creds = OtaaCredentials::new(
            " 70b3d57ed0051234 ",
            "0000000000000000",
            "8a1b2c3d4e5f60718293a4b5c6d7e8f9",
        )
        .unwrap();
        assert_eq!(creds.dev_eui(), "70B3D57ED0051234");
        assert_eq!(creds.app_eui(), "0000000000000000");
        assert_eq!(creds.app_key(), "8A1B2C3D4E5F60718293A4B5C6D7E8F9");
    }

    #[test]
    fn test_otaa_credentials_all_zero_accepted() {
        let creds = OtaaCredentials::new(
            "0000000000000000",
            "0000000000000000",
            "00000000000000000000000000000000",
        );
        assert!(creds.is_ok());
    }

    #[rstest]
    #[case("70B3D57ED005123", "0000000000000000", "8A1B2C3D4E5F60718293A4B5C6D7E8F9")] // DevEUI 15 chars
    #[case("70B3D57ED0051234", "00000000000000000", "8A1B2C3D4E5F60718293A4B5C6D7E8F9")] // AppEUI 17 chars
    #[case("70B3D57ED0051234", "0000000000000000", "8A1B2C3D4E5F60718293A4B5C6D7E8FG")] // non-hex
    fn test_otaa_credentials_invalid(
        #[case] dev_eui: &str,
        #[case] app_eui: &str,
        #[case] app_key: &str,
    ) {
        assert!(OtaaCredentials::new(dev_eui, app_eui, app_key).is_err());
    }

    #[test]
    fn test_abp_credentials_require_non_empty() {
        assert!(AbpCredentials::new("260B1234", "a".repeat(32).as_str(), "").is_err());
        let creds =
            AbpCredentials::new("260b1234", &"ab".repeat(16), &"cd".repeat(16)).unwrap();
        assert_eq!(creds.dev_addr(), "260B1234");
    }

    #[test]
    fn test_network_config_validation() {
        let mut config = NetworkConfig::default();
        assert!(config.validate().is_ok());

        config.nb_trials = 0;
        assert!(config.validate().is_err());
        config.nb_trials = 16;
        assert!(config.validate().is_err());
        config.nb_trials = 15;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_eu868_plan_is_valid() {
        let plan = FrequencyPlan::eu868();
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_eu868_lookups() {
        let plan = FrequencyPlan::eu868();
        let dr0 = DataRate::new(0).unwrap();
        let dr5 = DataRate::new(5).unwrap();
        let dr6 = DataRate::new(6).unwrap();

        assert_eq!(plan.spreading_factor(dr0), 12);
        assert_eq!(plan.spreading_factor(dr5), 7);
        assert_eq!(plan.spreading_factor(dr6), 7);
        assert_eq!(plan.bandwidth_khz(dr5).unwrap(), 125.0);
        assert_eq!(plan.bandwidth_khz(dr6).unwrap(), 250.0);
        assert_eq!(plan.bandwidth_hz(dr0).unwrap(), 125_000.0);
    }

    #[rstest]
    #[case(|p: &mut FrequencyPlan| p.rx1_delay_s = 6)]
    #[case(|p: &mut FrequencyPlan| p.join_data_rate = 7)]
    #[case(|p: &mut FrequencyPlan| p.rx1_dr_offset = 6)]
    #[case(|p: &mut FrequencyPlan| p.rx2_data_rate = 7)]
    #[case(|p: &mut FrequencyPlan| p.rx2_frequency_hz = 1_000_000_000)]
    #[case(|p: &mut FrequencyPlan| p.data_rates[6].1 = 10)]
    fn test_plan_rejects_out_of_range(#[case] mutate: fn(&mut FrequencyPlan)) {
        let mut plan = FrequencyPlan::eu868();
        mutate(&mut plan);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_join_request_bounds() {
        assert!(JoinRequest::attempt(false, 8, 8).is_ok());
        assert!(JoinRequest::attempt(false, 0, 8).is_err());
        assert!(JoinRequest::attempt(false, 256, 8).is_err());
        assert!(JoinRequest::attempt(false, 8, 0).is_err());
        assert!(JoinRequest::attempt(false, 8, 257).is_err());

        let abort = JoinRequest::abort();
        assert!(!abort.is_start());
    }
}
