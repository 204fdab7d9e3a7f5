//! Command facade over a line transport.
//!
//! [`Modem`] sequences AT commands, classifies every received line, and
//! keeps the host-side caches (session state, data rate, RX1 delay,
//! application port) that give later calls their validation context.
//!
//! # Read discipline
//!
//! The module multiplexes replies, downlinks and console noise onto one
//! stream, so every operation reads in a loop and classifies each line:
//! module logs are skipped, downlinks dispatch synchronously to the
//! registered callback, error notices terminate the operation with a
//! typed error, and reply lines are matched against the operation's
//! expected shape. Unrecognized replies are traced and skipped; the
//! device interleaves status chatter freely.
//!
//! All methods take `&mut self`: one command is in flight at a time and
//! the link is half-duplex by construction.
//!
//! # Example
//!
//! ```no_run
//! use asr650x_core::{JoinRequest, OtaaCredentials};
//! use asr650x_modem::Modem;
//! use asr650x_transport::{SerialConfig, SerialTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SerialTransport::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//! let mut modem = Modem::new(transport);
//!
//! modem.initialize().await?;
//! modem.configure_otaa(&OtaaCredentials::new(
//!     "70B3D57ED0051234",
//!     "0000000000000000",
//!     "8A1B2C3D4E5F60718293A4B5C6D7E8F9",
//! )?).await?;
//!
//! if modem.join(&JoinRequest::attempt(false, 8, 8)?).await? {
//!     modem.send_uplink(2, b"\x01\x02", false).await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use asr650x_core::constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_RX1_DELAY_S, EXPECTED_MANUFACTURER, JOIN_FAIL_REPLY,
    JOIN_OK_REPLY, MAX_APP_PORT, MAX_MODULE_LOG_LEVEL, MIN_APP_PORT, REPLY_OK,
    RX_WINDOW_GRACE_MS, SEND_ACCEPTED_PREFIX, SEND_COMPLETE_PREFIX,
};
use asr650x_core::{
    AbpCredentials, DataRate, Error as CoreError, FrequencyPlan, JoinMode, JoinRequest,
    ModuleStatus, NetworkConfig, OtaaCredentials, TxPower, UlDlMode,
};
use asr650x_protocol::{
    AtCommand, DownlinkEvent, ErrorNotice, ResponseLine, ResponseParser, format_join,
    format_nb_trials, format_receive_window, format_uplink, inquiry_value,
};
use asr650x_transport::Transport;

use crate::dispatcher::DownlinkDispatcher;
use crate::error::{AtErrorKind, LastAtError, ModemError, Result};
use crate::session::{SessionState, SessionTracker};

/// Driver facade for one ASR650x module.
pub struct Modem<T> {
    /// Line transport to the module.
    transport: T,

    /// Downlink delivery.
    dispatcher: DownlinkDispatcher,

    /// Host-side join session.
    session: SessionTracker,

    /// Most recent wire-level command failure.
    last_at_error: Option<LastAtError>,

    /// Deadline for a command's immediate reply.
    command_timeout: Duration,

    /// Downlinks observed on the read path, whether or not a callback
    /// consumed them.
    observed_downlinks: u64,

    // Caches mirroring module state, refreshed by the setters and
    // inquiries that touch them.
    join_mode: Option<JoinMode>,
    data_rate: DataRate,
    rx1_delay_s: u8,
    app_port: Option<u8>,
    tx_power: Option<TxPower>,
    nb_trials: u8,
}

impl<T: Transport> Modem<T> {
    /// Create a driver with the default command timeout.
    pub fn new(transport: T) -> Self {
        Self::with_command_timeout(transport, Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS))
    }

    /// Create a driver with a custom command timeout.
    pub fn with_command_timeout(transport: T, command_timeout: Duration) -> Self {
        Modem {
            transport,
            dispatcher: DownlinkDispatcher::new(),
            session: SessionTracker::new(),
            last_at_error: None,
            command_timeout,
            observed_downlinks: 0,
            join_mode: None,
            data_rate: DataRate::default(),
            rx1_delay_s: DEFAULT_RX1_DELAY_S,
            app_port: None,
            tx_power: None,
            nb_trials: 1,
        }
    }

    /// Get the session tracker.
    #[must_use]
    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// Get the most recent wire-level command failure, if any.
    ///
    /// The record persists until the next failure overwrites it; a
    /// successful command does not clear it.
    #[must_use]
    pub fn last_at_error(&self) -> Option<&LastAtError> {
        self.last_at_error.as_ref()
    }

    /// Data rate the driver currently believes the module uses.
    #[must_use]
    pub fn cached_data_rate(&self) -> DataRate {
        self.data_rate
    }

    /// Register the downlink callback, replacing any previous one.
    pub fn set_downlink_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&DownlinkEvent) + Send + 'static,
    {
        self.dispatcher.set(Box::new(callback));
    }

    /// Remove the downlink callback; further downlinks are logged and
    /// dropped.
    pub fn clear_downlink_callback(&mut self) {
        self.dispatcher.clear();
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Probe and prepare the module.
    ///
    /// Verifies the manufacturer via CGMI (anything but `ASR` is
    /// [`ModemError::UnsupportedModule`]), silences the module console
    /// with `ILOGLVL=0`, and syncs the cached join mode from the module.
    pub async fn initialize(&mut self) -> Result<()> {
        let manufacturer = self.execute_inquiry(AtCommand::Cgmi).await?;
        if manufacturer != EXPECTED_MANUFACTURER {
            warn!(%manufacturer, "Manufacturer probe mismatch");
            return Err(ModemError::UnsupportedModule { manufacturer });
        }

        self.execute_set(AtCommand::ILogLvl, 0).await?;

        let mode_text = self.execute_inquiry(AtCommand::CJoinMode).await?;
        let code: u8 = self.parse_number(AtCommand::CJoinMode, &mode_text)?;
        let mode = JoinMode::from_u8(code)
            .map_err(|_| self.parse_error(AtCommand::CJoinMode, &mode_text))?;
        self.join_mode = Some(mode);

        info!(join_mode = %mode, "Module initialized");
        Ok(())
    }

    /// Reboot the module.
    ///
    /// Mode 0 is a plain reboot, mode 1 reboots after persisting state,
    /// mode 7 drops to the bootloader. The acknowledgment tears down a
    /// joined session, and boot chatter is drained before returning.
    pub async fn reboot(&mut self, mode: u8) -> Result<()> {
        if !matches!(mode, 0 | 1 | 7) {
            return Err(CoreError::UnknownCode {
                name: "reboot mode",
                code: mode,
            }
            .into());
        }

        self.execute_set(AtCommand::IReboot, mode).await?;

        if self.session.is_joined() {
            self.session.transition_to(SessionState::NotJoined)?;
        }

        // The module prints its banner and console noise while booting;
        // drain until the line goes quiet.
        let deadline = Instant::now() + Duration::from_millis(RX_WINDOW_GRACE_MS);
        loop {
            let Some(remaining) = Self::remaining(deadline) else {
                break;
            };
            match self.transport.read_line(remaining).await {
                Ok(line) => trace!(%line, "Boot chatter"),
                Err(e) if e.is_read_timeout() => break,
                Err(e) => return Err(e.into()),
            }
        }

        info!(mode, "Module rebooted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Program OTAA credentials and select OTAA activation.
    pub async fn configure_otaa(&mut self, credentials: &OtaaCredentials) -> Result<()> {
        self.execute_set(AtCommand::CJoinMode, JoinMode::Otaa.to_u8())
            .await?;
        self.execute_set(AtCommand::CDevEui, credentials.dev_eui())
            .await?;
        self.execute_set(AtCommand::CAppEui, credentials.app_eui())
            .await?;
        self.execute_set(AtCommand::CAppKey, credentials.app_key())
            .await?;
        self.join_mode = Some(JoinMode::Otaa);

        debug!(dev_eui = credentials.dev_eui(), "OTAA credentials programmed");
        Ok(())
    }

    /// Program ABP session keys and select ABP activation.
    pub async fn configure_abp(&mut self, credentials: &AbpCredentials) -> Result<()> {
        self.execute_set(AtCommand::CJoinMode, JoinMode::Abp.to_u8())
            .await?;
        self.execute_set(AtCommand::CDevAddr, credentials.dev_addr())
            .await?;
        self.execute_set(AtCommand::CNwkSKey, credentials.nwk_skey())
            .await?;
        self.execute_set(AtCommand::CAppSKey, credentials.app_skey())
            .await?;
        self.join_mode = Some(JoinMode::Abp);

        debug!(dev_addr = credentials.dev_addr(), "ABP credentials programmed");
        Ok(())
    }

    /// Push a regional frequency plan to the module.
    ///
    /// Programs the downlink scheme, RX1 delay, join data rate (forcing
    /// ADR off for the write and restoring it afterwards, since the
    /// module rejects CDATARATE while ADR is on) and the receive-window
    /// parameters. Caches the RX1 delay and data rate for later uplink
    /// budgeting.
    pub async fn set_frequency_plan(&mut self, plan: &FrequencyPlan) -> Result<()> {
        plan.validate()?;

        self.execute_set(AtCommand::CUlDlMode, UlDlMode::DifferentFrequency.to_u8())
            .await?;
        self.execute_set(AtCommand::CRx1Delay, plan.rx1_delay_s)
            .await?;

        let adr_was_on = self.adr_enabled().await?;
        if adr_was_on {
            self.execute_set(AtCommand::CAdr, 0).await?;
        }
        self.execute_set(AtCommand::CDataRate, plan.join_data_rate)
            .await?;
        if adr_was_on {
            self.execute_set(AtCommand::CAdr, 1).await?;
        }

        let line = format_receive_window(plan);
        self.send_command(AtCommand::CRxp, &line).await?;

        self.rx1_delay_s = plan.rx1_delay_s;
        self.data_rate = DataRate::new(plan.join_data_rate)?;

        debug!(
            rx1_delay_s = plan.rx1_delay_s,
            join_data_rate = plan.join_data_rate,
            "Frequency plan programmed"
        );
        Ok(())
    }

    /// Apply general network behavior: activation mode, class, work
    /// mode, transmit power and trial count.
    pub async fn set_network_config(&mut self, config: &NetworkConfig) -> Result<()> {
        config.validate()?;

        self.execute_set(AtCommand::CJoinMode, config.join_mode.to_u8())
            .await?;
        self.execute_set(AtCommand::CClass, config.class.to_u8())
            .await?;
        // CWORKMODE only accepts 2 (normal) on this firmware.
        self.execute_set(AtCommand::CWorkMode, 2).await?;
        self.execute_set(AtCommand::CTxp, config.tx_power.index())
            .await?;
        let line = format_nb_trials(false, config.nb_trials);
        self.send_command(AtCommand::CNbTrials, &line).await?;

        self.join_mode = Some(config.join_mode);
        self.tx_power = Some(config.tx_power);
        self.nb_trials = config.nb_trials;
        Ok(())
    }

    /// Persist the current MAC configuration to module flash.
    pub async fn save_mac_configuration(&mut self) -> Result<()> {
        let line = AtCommand::CSave.bare();
        self.send_command(AtCommand::CSave, &line).await
    }

    /// Reload the MAC configuration from module flash.
    pub async fn restore_mac_configuration(&mut self) -> Result<()> {
        let line = AtCommand::CRestore.bare();
        self.send_command(AtCommand::CRestore, &line).await
    }

    // ------------------------------------------------------------------
    // Join
    // ------------------------------------------------------------------

    /// Start or abort a network join. Returns `true` only when an
    /// attempt ends with the module joined.
    ///
    /// An abort request is meaningful only while a join is in progress;
    /// from any other state it is a no-op with no I/O. An attempt while
    /// already joined warns and returns `false` without touching the
    /// module.
    ///
    /// An attempt acknowledges CJOIN under the command timeout, then
    /// polls CSTATUS up to `retries` times with the retry interval as
    /// each poll's deadline. Join evidence is the unsolicited
    /// `+CJOIN:OK` line or a `JoinOk` status; `+CJOIN:FAIL` and
    /// `JoinFailed` statuses keep polling, since the module may still be
    /// retrying internally. Exhausted retries report `false`, not an
    /// error.
    pub async fn join(&mut self, request: &JoinRequest) -> Result<bool> {
        if !request.is_start() {
            if self.session.current() != SessionState::Joining {
                debug!(state = %self.session.current(), "Join abort ignored: no join in progress");
                return Ok(false);
            }
            let line = format_join(request);
            self.send_command(AtCommand::CJoin, &line).await?;
            self.session.transition_to(SessionState::NotJoined)?;
            info!("Join aborted");
            return Ok(false);
        }

        if self.session.is_joined() {
            warn!("Join requested while already joined");
            return Ok(false);
        }

        self.session.transition_to(SessionState::Joining)?;

        let line = format_join(request);
        if let Err(e) = self.send_command(AtCommand::CJoin, &line).await {
            self.session.transition_to(SessionState::JoinFailed)?;
            return Err(e);
        }

        let interval = Duration::from_secs(u64::from(request.interval_s()));
        for attempt in 1..=request.retries() {
            trace!(attempt, retries = request.retries(), "Join poll");
            match self.poll_join_once(interval).await {
                Ok(true) => {
                    self.session.transition_to(SessionState::Joined)?;
                    info!(attempt, "Network joined");
                    return Ok(true);
                }
                Ok(false) => continue,
                Err(e) => {
                    self.session.transition_to(SessionState::JoinFailed)?;
                    return Err(e);
                }
            }
        }

        self.session.transition_to(SessionState::JoinFailed)?;
        warn!(retries = request.retries(), "Join retries exhausted");
        Ok(false)
    }

    /// One join poll: a CSTATUS inquiry awaited for up to `deadline`.
    ///
    /// `Ok(true)` on join evidence, `Ok(false)` when the deadline expires
    /// or only failure evidence arrived (the next attempt re-polls).
    async fn poll_join_once(&mut self, deadline: Duration) -> Result<bool> {
        self.transport
            .write_line(&AtCommand::CStatus.inquire())
            .await?;

        let poll_end = Instant::now() + deadline;
        loop {
            let Some(remaining) = Self::remaining(poll_end) else {
                return Ok(false);
            };
            let line = match self.transport.read_line(remaining).await {
                Ok(line) => line,
                Err(e) if e.is_read_timeout() => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            match ResponseParser::classify(&line) {
                ResponseLine::Reply(text) if text == JOIN_OK_REPLY => return Ok(true),
                ResponseLine::Reply(text) if text == JOIN_FAIL_REPLY => {
                    debug!("Join attempt reported FAIL; module may retry");
                }
                ResponseLine::Reply(text) if text.starts_with("+CSTATUS") => {
                    match self.parse_status(&text) {
                        Some(status) if status.is_join_ok() => return Ok(true),
                        Some(status) if status.is_join_failed() => {
                            debug!(%status, "Status reports join failure; continuing to poll");
                        }
                        Some(status) => trace!(%status, "Join poll status"),
                        None => trace!(%text, "Unparseable status line skipped"),
                    }
                }
                ResponseLine::Reply(text) => {
                    trace!(reply = %text, "Skipping interleaved reply during join")
                }
                ResponseLine::ModuleLog => {}
                ResponseLine::Downlink(event) => self.handle_downlink(&event),
                ResponseLine::Notice(notice) => {
                    return Err(self.notice_error(AtCommand::CJoin, notice, &line));
                }
            }
        }
    }

    /// Current module activity.
    pub async fn status(&mut self) -> Result<ModuleStatus> {
        let value = self.execute_inquiry(AtCommand::CStatus).await?;
        let code: u8 = self.parse_number(AtCommand::CStatus, &value)?;
        ModuleStatus::from_u8(code).map_err(|_| self.parse_error(AtCommand::CStatus, &value))
    }

    // ------------------------------------------------------------------
    // Data transfer
    // ------------------------------------------------------------------

    /// Send an application uplink.
    ///
    /// Pre-flight validation (port range, payload against the cached
    /// data rate's maximum) happens before any write. After DTRX is
    /// acknowledged the receive window is absorbed: progress lines are
    /// traced, downlinks dispatch, and failure events become
    /// [`ModemError::Send`]. Success requires `OK+SENT` before the
    /// window closes.
    pub async fn send_uplink(&mut self, port: u8, payload: &[u8], confirmed: bool) -> Result<()> {
        if !(MIN_APP_PORT..=MAX_APP_PORT).contains(&port) {
            return Err(CoreError::out_of_range(
                "app port",
                u32::from(port),
                u32::from(MIN_APP_PORT),
                u32::from(MAX_APP_PORT),
            )
            .into());
        }
        let max = self.data_rate.max_payload();
        if payload.len() > max {
            return Err(CoreError::PayloadTooLarge {
                data_rate: self.data_rate.as_u8(),
                size: payload.len(),
                max,
            }
            .into());
        }

        if self.app_port != Some(port) {
            self.execute_set(AtCommand::CAppPort, port).await?;
            self.app_port = Some(port);
        }

        let line = format_uplink(confirmed, self.nb_trials, payload);
        self.transport.write_line(&line).await?;
        let mut sent = self.await_uplink_ack().await?;

        // Absorb the receive window: the module reports progress and any
        // downlink here, at its own pace.
        let window = Duration::from_secs(u64::from(self.rx1_delay_s))
            + Duration::from_millis(RX_WINDOW_GRACE_MS);
        let window_end = Instant::now() + window;
        loop {
            let Some(remaining) = Self::remaining(window_end) else {
                break;
            };
            let line = match self.transport.read_line(remaining).await {
                Ok(line) => line,
                Err(e) if e.is_read_timeout() => break,
                Err(e) => return Err(e.into()),
            };
            match ResponseParser::classify(&line) {
                ResponseLine::Reply(text) if text.starts_with(SEND_COMPLETE_PREFIX) => {
                    trace!(reply = %text, "Uplink transmission complete");
                    sent = true;
                }
                ResponseLine::Reply(text) if text.starts_with(SEND_ACCEPTED_PREFIX) => {
                    trace!(reply = %text, "Uplink queued");
                }
                ResponseLine::Reply(text) => {
                    trace!(reply = %text, "Skipping interleaved reply during send");
                }
                ResponseLine::ModuleLog => {}
                ResponseLine::Downlink(event) => self.handle_downlink(&event),
                ResponseLine::Notice(notice) => {
                    return Err(self.notice_error(AtCommand::Dtrx, notice, &line));
                }
            }
        }

        if sent {
            debug!(port, len = payload.len(), confirmed, "Uplink sent");
            Ok(())
        } else {
            Err(self.timeout_error(AtCommand::Dtrx, window))
        }
    }

    /// Await the immediate DTRX acknowledgment.
    ///
    /// Firmware revisions differ: some answer a plain `OK`, some go
    /// straight to `OK+SEND`. Returns whether `OK+SENT` was already
    /// observed during the ack phase.
    async fn await_uplink_ack(&mut self) -> Result<bool> {
        let deadline = Instant::now() + self.command_timeout;
        loop {
            let Some(remaining) = Self::remaining(deadline) else {
                return Err(self.timeout_error(AtCommand::Dtrx, self.command_timeout));
            };
            let line = match self.transport.read_line(remaining).await {
                Ok(line) => line,
                Err(e) if e.is_read_timeout() => {
                    return Err(self.timeout_error(AtCommand::Dtrx, self.command_timeout));
                }
                Err(e) => return Err(e.into()),
            };
            match ResponseParser::classify(&line) {
                ResponseLine::Reply(text) if text == REPLY_OK => return Ok(false),
                ResponseLine::Reply(text) if text.starts_with(SEND_COMPLETE_PREFIX) => {
                    return Ok(true);
                }
                ResponseLine::Reply(text) if text.starts_with(SEND_ACCEPTED_PREFIX) => {
                    return Ok(false);
                }
                ResponseLine::Reply(text) => {
                    trace!(reply = %text, "Skipping interleaved reply awaiting DTRX ack");
                }
                ResponseLine::ModuleLog => {}
                ResponseLine::Downlink(event) => self.handle_downlink(&event),
                ResponseLine::Notice(notice) => {
                    return Err(self.notice_error(AtCommand::Dtrx, notice, &line));
                }
            }
        }
    }

    /// Poll the module's receive buffer.
    ///
    /// Issues the DRX inquiry; any downlink notification that interleaves
    /// with the reply dispatches through the normal path. Returns whether
    /// a downlink arrived during this call, whether or not a callback was
    /// registered to consume it.
    pub async fn check_for_downlink(&mut self) -> Result<bool> {
        let before = self.observed_downlinks;

        self.transport
            .write_line(&AtCommand::Drx.inquire())
            .await?;

        let deadline = Instant::now() + self.command_timeout;
        loop {
            let Some(remaining) = Self::remaining(deadline) else {
                return Err(self.timeout_error(AtCommand::Drx, self.command_timeout));
            };
            let line = match self.transport.read_line(remaining).await {
                Ok(line) => line,
                Err(e) if e.is_read_timeout() => {
                    return Err(self.timeout_error(AtCommand::Drx, self.command_timeout));
                }
                Err(e) => return Err(e.into()),
            };
            match ResponseParser::classify(&line) {
                ResponseLine::Reply(text) if text == REPLY_OK => break,
                ResponseLine::Reply(text) => {
                    trace!(reply = %text, "Receive buffer inquiry value");
                }
                ResponseLine::ModuleLog => {}
                ResponseLine::Downlink(event) => self.handle_downlink(&event),
                ResponseLine::Notice(notice) => {
                    return Err(self.notice_error(AtCommand::Drx, notice, &line));
                }
            }
        }

        Ok(self.observed_downlinks > before)
    }

    // ------------------------------------------------------------------
    // Parameter inquiries and setters
    // ------------------------------------------------------------------

    /// Manufacturer identifier (CGMI).
    pub async fn manufacturer_id(&mut self) -> Result<String> {
        self.execute_inquiry(AtCommand::Cgmi).await
    }

    /// Firmware revision (CGMR).
    pub async fn model_revision(&mut self) -> Result<String> {
        self.execute_inquiry(AtCommand::Cgmr).await
    }

    /// Module serial number (CGSN).
    pub async fn serial_number(&mut self) -> Result<String> {
        self.execute_inquiry(AtCommand::Cgsn).await
    }

    /// Current data rate, refreshed from the module.
    pub async fn data_rate(&mut self) -> Result<DataRate> {
        let value = self.execute_inquiry(AtCommand::CDataRate).await?;
        let index: u8 = self.parse_number(AtCommand::CDataRate, &value)?;
        let dr = DataRate::new(index)?;
        self.data_rate = dr;
        Ok(dr)
    }

    /// Set the data rate. Fails with [`ModemError::AdrActive`] while ADR
    /// controls it.
    pub async fn set_data_rate(&mut self, dr: DataRate) -> Result<()> {
        if self.adr_enabled().await? {
            return Err(ModemError::AdrActive);
        }
        self.execute_set(AtCommand::CDataRate, dr.as_u8()).await?;
        self.data_rate = dr;
        Ok(())
    }

    /// Whether adaptive data rate is enabled.
    pub async fn adr_enabled(&mut self) -> Result<bool> {
        let value = self.execute_inquiry(AtCommand::CAdr).await?;
        match value.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(self.parse_error(AtCommand::CAdr, &value)),
        }
    }

    /// Enable or disable adaptive data rate.
    pub async fn set_adr(&mut self, enabled: bool) -> Result<()> {
        self.execute_set(AtCommand::CAdr, u8::from(enabled)).await
    }

    /// RX1 delay in seconds, refreshed from the module.
    pub async fn rx1_delay(&mut self) -> Result<u8> {
        let value = self.execute_inquiry(AtCommand::CRx1Delay).await?;
        let delay: u8 = self.parse_number(AtCommand::CRx1Delay, &value)?;
        self.rx1_delay_s = delay;
        Ok(delay)
    }

    /// Current transmit power, refreshed from the module.
    pub async fn tx_power(&mut self) -> Result<TxPower> {
        let value = self.execute_inquiry(AtCommand::CTxp).await?;
        let index: u8 = self.parse_number(AtCommand::CTxp, &value)?;
        let power = TxPower::from_index(index)?;
        self.tx_power = Some(power);
        Ok(power)
    }

    /// Set the transmit power.
    pub async fn set_tx_power(&mut self, power: TxPower) -> Result<()> {
        self.execute_set(AtCommand::CTxp, power.index()).await?;
        self.tx_power = Some(power);
        Ok(())
    }

    /// Set the uplink application port (1..=223).
    pub async fn set_application_port(&mut self, port: u8) -> Result<()> {
        if !(MIN_APP_PORT..=MAX_APP_PORT).contains(&port) {
            return Err(CoreError::out_of_range(
                "app port",
                u32::from(port),
                u32::from(MIN_APP_PORT),
                u32::from(MAX_APP_PORT),
            )
            .into());
        }
        self.execute_set(AtCommand::CAppPort, port).await?;
        self.app_port = Some(port);
        Ok(())
    }

    /// Set the module console verbosity (0 silences it, up to 5).
    pub async fn set_log_level(&mut self, level: u8) -> Result<()> {
        if level > MAX_MODULE_LOG_LEVEL {
            return Err(CoreError::out_of_range(
                "module log level",
                u32::from(level),
                0,
                u32::from(MAX_MODULE_LOG_LEVEL),
            )
            .into());
        }
        self.execute_set(AtCommand::ILogLvl, level).await
    }

    // ------------------------------------------------------------------
    // Command plumbing
    // ------------------------------------------------------------------

    /// Write a set command and await its `OK`.
    async fn execute_set(&mut self, command: AtCommand, args: impl fmt::Display) -> Result<()> {
        let line = command.set(args);
        self.send_command(command, &line).await
    }

    /// Write a preformatted command line and await its `OK`.
    async fn send_command(&mut self, command: AtCommand, line: &str) -> Result<()> {
        self.transport.write_line(line).await?;
        self.await_ok(command).await
    }

    /// Read until the command's `OK`, handling interleaved traffic.
    async fn await_ok(&mut self, command: AtCommand) -> Result<()> {
        let deadline = Instant::now() + self.command_timeout;
        loop {
            let Some(remaining) = Self::remaining(deadline) else {
                return Err(self.timeout_error(command, self.command_timeout));
            };
            let line = match self.transport.read_line(remaining).await {
                Ok(line) => line,
                Err(e) if e.is_read_timeout() => {
                    return Err(self.timeout_error(command, self.command_timeout));
                }
                Err(e) => return Err(e.into()),
            };
            match ResponseParser::classify(&line) {
                ResponseLine::Reply(text) if text == REPLY_OK => return Ok(()),
                ResponseLine::Reply(text) => {
                    trace!(command = %command, reply = %text, "Skipping interleaved reply");
                }
                ResponseLine::ModuleLog => {}
                ResponseLine::Downlink(event) => self.handle_downlink(&event),
                ResponseLine::Notice(notice) => {
                    return Err(self.notice_error(command, notice, &line));
                }
            }
        }
    }

    /// Write an inquiry and return the extracted value from its reply.
    ///
    /// The value is whatever follows the last `:` or `=` in the last
    /// non-noise line before `OK`.
    async fn execute_inquiry(&mut self, command: AtCommand) -> Result<String> {
        self.transport.write_line(&command.inquire()).await?;

        let deadline = Instant::now() + self.command_timeout;
        let mut captured: Option<String> = None;
        loop {
            let Some(remaining) = Self::remaining(deadline) else {
                return Err(self.timeout_error(command, self.command_timeout));
            };
            let line = match self.transport.read_line(remaining).await {
                Ok(line) => line,
                Err(e) if e.is_read_timeout() => {
                    return Err(self.timeout_error(command, self.command_timeout));
                }
                Err(e) => return Err(e.into()),
            };
            match ResponseParser::classify(&line) {
                ResponseLine::Reply(text) if text == REPLY_OK => {
                    let Some(value_line) = captured else {
                        return Err(self.parse_error(command, REPLY_OK));
                    };
                    let value = inquiry_value(&value_line).map(str::to_string);
                    return value.ok_or_else(|| self.parse_error(command, &value_line));
                }
                ResponseLine::Reply(text) => captured = Some(text),
                ResponseLine::ModuleLog => {}
                ResponseLine::Downlink(event) => self.handle_downlink(&event),
                ResponseLine::Notice(notice) => {
                    return Err(self.notice_error(command, notice, &line));
                }
            }
        }
    }

    /// Forward a downlink to the dispatcher.
    ///
    /// Counts the event either way; a downlink arriving with no callback
    /// registered is still a downlink found.
    fn handle_downlink(&mut self, event: &DownlinkEvent) {
        self.dispatcher.dispatch(event);
        self.observed_downlinks += 1;
    }

    /// Parse a status inquiry value like `04` out of a `+CSTATUS:` line.
    fn parse_status(&self, line: &str) -> Option<ModuleStatus> {
        let value = inquiry_value(line)?;
        let code = value.parse::<u8>().ok()?;
        ModuleStatus::from_u8(code).ok()
    }

    /// Parse a numeric inquiry value, recording a parse failure.
    fn parse_number<N: std::str::FromStr>(
        &mut self,
        command: AtCommand,
        value: &str,
    ) -> Result<N> {
        value
            .trim()
            .parse()
            .map_err(|_| self.parse_error(command, value))
    }

    /// Record and build a timeout error.
    fn timeout_error(&mut self, command: AtCommand, budget: Duration) -> ModemError {
        self.last_at_error = Some(LastAtError {
            at_cmd: command,
            kind: AtErrorKind::Timeout,
            code: None,
        });
        ModemError::Timeout {
            command,
            ms: budget.as_millis() as u64,
        }
    }

    /// Record and build a parse error.
    fn parse_error(&mut self, command: AtCommand, line: &str) -> ModemError {
        self.last_at_error = Some(LastAtError {
            at_cmd: command,
            kind: AtErrorKind::Parse,
            code: None,
        });
        ModemError::Parse {
            command,
            line: line.to_string(),
        }
    }

    /// Record and translate an error notice from the module.
    fn notice_error(&mut self, command: AtCommand, notice: ErrorNotice, line: &str) -> ModemError {
        match notice {
            ErrorNotice::Cme(code) => {
                self.last_at_error = Some(LastAtError {
                    at_cmd: command,
                    kind: AtErrorKind::Cme,
                    code: Some(code),
                });
                ModemError::Command { command, code }
            }
            ErrorNotice::SendFailed => {
                self.last_at_error = Some(LastAtError {
                    at_cmd: command,
                    kind: AtErrorKind::SendFailed,
                    code: None,
                });
                ModemError::Send {
                    command,
                    failure: AtErrorKind::SendFailed,
                }
            }
            ErrorNotice::SentFailed => {
                self.last_at_error = Some(LastAtError {
                    at_cmd: command,
                    kind: AtErrorKind::SentFailed,
                    code: None,
                });
                ModemError::Send {
                    command,
                    failure: AtErrorKind::SentFailed,
                }
            }
            ErrorNotice::Malformed => self.parse_error(command, line),
        }
    }

    /// Time left before `deadline`, or `None` once it has passed.
    fn remaining(deadline: Instant) -> Option<Duration> {
        let now = Instant::now();
        if now >= deadline {
            None
        } else {
            Some(deadline - now)
        }
    }
}
