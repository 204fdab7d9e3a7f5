//! Periodic-uplink demo for ASR650x modules.
//!
//! Joins the configured network over a serial port, then sends a counter
//! uplink forever, pacing transmissions to stay inside the EU868 1% duty
//! cycle and logging every downlink the network delivers.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use asr650x_core::airtime::uplink_airtime;
use asr650x_core::{AbpCredentials, JoinRequest, OtaaCredentials};
use asr650x_modem::Modem;
use asr650x_transport::{SerialTransport, Transport};

use config::{Activation, AppConfig};

/// EU868 limits each sub-band to 1% duty cycle, so every transmission
/// earns a silence of 99 times its airtime.
const DUTY_CYCLE_OFF_FACTOR: f64 = 99.0;

#[derive(Debug, Parser)]
#[command(name = "asr650x-uplink", about = "Periodic LoRaWAN uplink demo")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "uplink.json")]
    config: PathBuf,

    /// Serial port, overriding the configuration file.
    #[arg(short, long)]
    port: Option<String>,

    /// Log filter, e.g. "info" or "asr650x_modem=trace".
    #[arg(short, long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log).context("invalid log filter")?)
        .with_target(false)
        .init();

    let mut config = AppConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }

    let transport = SerialTransport::open(&config.serial)?;
    let mut modem = Modem::new(transport);

    run(&mut modem, &config).await
}

async fn run<T: Transport>(modem: &mut Modem<T>, config: &AppConfig) -> Result<()> {
    modem.initialize().await?;
    let firmware = modem.model_revision().await?;
    let serial_number = modem.serial_number().await?;
    info!(%firmware, %serial_number, "Module identified");

    modem.restore_mac_configuration().await?;
    modem.set_frequency_plan(&config.frequency_plan).await?;

    let network = config
        .network
        .to_network_config(config.activation.join_mode())?;
    modem.set_network_config(&network).await?;

    match &config.activation {
        Activation::Otaa {
            dev_eui,
            app_eui,
            app_key,
        } => {
            let credentials = OtaaCredentials::new(dev_eui, app_eui, app_key)?;
            modem.configure_otaa(&credentials).await?;
        }
        Activation::Abp {
            dev_addr,
            nwk_skey,
            app_skey,
        } => {
            let credentials = AbpCredentials::new(dev_addr, nwk_skey, app_skey)?;
            modem.configure_abp(&credentials).await?;
        }
    }

    modem.set_downlink_callback(|event| {
        info!(
            port = event.port,
            length = event.length,
            payload = %event.payload,
            "Downlink received"
        );
    });

    let request = JoinRequest::attempt(
        config.join.auto_join,
        config.join.interval_s,
        config.join.retries,
    )?;
    info!(
        interval_s = config.join.interval_s,
        retries = config.join.retries,
        "Joining network"
    );
    if !modem.join(&request).await? {
        bail!("network join failed after {} retries", config.join.retries);
    }
    modem.save_mac_configuration().await?;

    uplink_loop(modem, config).await
}

/// Send counter uplinks forever, pacing to the duty cycle.
async fn uplink_loop<T: Transport>(modem: &mut Modem<T>, config: &AppConfig) -> Result<()> {
    let plan = &config.frequency_plan;
    let mut counter: u32 = 0;

    loop {
        modem.check_for_downlink().await?;

        let payload = counter.to_be_bytes();
        let data_rate = modem.cached_data_rate();
        let spreading_factor = plan.spreading_factor(data_rate);
        let bandwidth_hz = plan.bandwidth_hz(data_rate)?;
        let time_on_air = uplink_airtime(payload.len(), spreading_factor, bandwidth_hz);

        match modem
            .send_uplink(config.uplink.port, &payload, config.uplink.confirmed)
            .await
        {
            Ok(()) => info!(
                counter,
                port = config.uplink.port,
                airtime_ms = time_on_air * 1000.0,
                "Uplink sent"
            ),
            // A lost uplink is routine on a busy network; keep the loop
            // alive and let the next interval retry.
            Err(e) => warn!(counter, error = %e, "Uplink failed"),
        }
        counter = counter.wrapping_add(1);

        let duty_pause = time_on_air * DUTY_CYCLE_OFF_FACTOR;
        let pause = duty_pause.max(config.uplink.min_interval_s as f64);
        info!(pause_s = pause, "Sleeping until next uplink");
        tokio::time::sleep(Duration::from_secs_f64(pause)).await;
    }
}
