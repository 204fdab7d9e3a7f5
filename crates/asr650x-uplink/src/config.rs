//! JSON configuration for the periodic-uplink demo.
//!
//! Credentials are kept as plain strings here and validated through the
//! core constructors when the driver is configured, so a typo in the file
//! fails with the same error a caller of the library would see.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use asr650x_core::{FrequencyPlan, JoinMode, LoraClass, NetworkConfig, TxPower};
use asr650x_transport::SerialConfig;

/// Top-level configuration file shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Serial port settings.
    pub serial: SerialConfig,

    /// Network behavior applied before joining.
    #[serde(default)]
    pub network: NetworkSettings,

    /// Regional frequency plan; EU868 unless overridden.
    #[serde(default = "FrequencyPlan::eu868")]
    pub frequency_plan: FrequencyPlan,

    /// Activation credentials, OTAA or ABP.
    pub activation: Activation,

    /// Join attempt parameters.
    #[serde(default)]
    pub join: JoinSettings,

    /// Periodic uplink parameters.
    #[serde(default)]
    pub uplink: UplinkSettings,
}

impl AppConfig {
    /// Load and parse the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

/// Network section, kept as primitives and converted with validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    /// Device class letter: "A", "B" or "C".
    #[serde(default = "default_class")]
    pub class: String,

    /// Transmit power index 0..=6 (0 is 17 dBm, each step drops 2 dBm).
    #[serde(default)]
    pub tx_power_index: u8,

    /// Unconfirmed-uplink trial count, 1..=15.
    #[serde(default = "default_nb_trials")]
    pub nb_trials: u8,
}

fn default_class() -> String {
    "A".to_string()
}

fn default_nb_trials() -> u8 {
    1
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            class: default_class(),
            tx_power_index: 0,
            nb_trials: default_nb_trials(),
        }
    }
}

impl NetworkSettings {
    /// Convert to a validated [`NetworkConfig`] for the given activation.
    pub fn to_network_config(&self, join_mode: JoinMode) -> Result<NetworkConfig> {
        let class = match self.class.as_str() {
            "A" | "a" => LoraClass::A,
            "B" | "b" => LoraClass::B,
            "C" | "c" => LoraClass::C,
            other => bail!("unknown device class {other:?}, expected A, B or C"),
        };
        let config = NetworkConfig {
            join_mode,
            class,
            tx_power: TxPower::from_index(self.tx_power_index)?,
            nb_trials: self.nb_trials,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Activation credentials, as written in the file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Otaa {
        dev_eui: String,
        app_eui: String,
        app_key: String,
    },
    Abp {
        dev_addr: String,
        nwk_skey: String,
        app_skey: String,
    },
}

impl Activation {
    /// Join mode implied by the credential kind.
    pub fn join_mode(&self) -> JoinMode {
        match self {
            Activation::Otaa { .. } => JoinMode::Otaa,
            Activation::Abp { .. } => JoinMode::Abp,
        }
    }
}

/// Join attempt parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSettings {
    /// Ask the module to re-join by itself after a power cycle.
    #[serde(default)]
    pub auto_join: bool,

    /// Seconds between join retries.
    #[serde(default = "default_join_interval")]
    pub interval_s: u16,

    /// Maximum join retries per attempt.
    #[serde(default = "default_join_retries")]
    pub retries: u16,
}

fn default_join_interval() -> u16 {
    8
}

fn default_join_retries() -> u16 {
    8
}

impl Default for JoinSettings {
    fn default() -> Self {
        JoinSettings {
            auto_join: false,
            interval_s: default_join_interval(),
            retries: default_join_retries(),
        }
    }
}

/// Periodic uplink parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UplinkSettings {
    /// Application port, 1..=223.
    #[serde(default = "default_port")]
    pub port: u8,

    /// Request network confirmation for each uplink.
    #[serde(default)]
    pub confirmed: bool,

    /// Floor between uplinks in seconds; the duty-cycle pause is applied
    /// on top when it is longer.
    #[serde(default = "default_min_interval")]
    pub min_interval_s: u64,
}

fn default_port() -> u8 {
    2
}

fn default_min_interval() -> u64 {
    60
}

impl Default for UplinkSettings {
    fn default() -> Self {
        UplinkSettings {
            port: default_port(),
            confirmed: false,
            min_interval_s: default_min_interval(),
        }
    }
}
