//! LoRa airtime calculation.
//!
//! The module firmware gives no airtime feedback, yet EU868 imposes a 1%
//! duty cycle and The Things Network a fair-use allowance on top of it.
//! These functions let a caller pace uplinks without an external
//! calculator. The arithmetic follows the Semtech LoRa modem designer's
//! guide (AN1200.13) and agrees with the published online calculators.

use crate::constants::LORAWAN_FRAME_OVERHEAD;

/// Number of preamble symbols LoRaWAN uses on all public networks.
pub const DEFAULT_PREAMBLE_SYMBOLS: u16 = 8;

/// Default coding rate numerator offset (CR 1 = 4/5).
pub const DEFAULT_CODING_RATE: u8 = 1;

/// Time on air of a single LoRa packet, in seconds.
///
/// `payload_len` is the PHY payload length in bytes. For a LoRaWAN uplink
/// that includes the MAC framing; use [`uplink_airtime`] to work from the
/// application payload instead. `coding_rate` is the CR index 1..=4
/// (4/5..4/8). `header_enabled` selects the explicit header LoRaWAN
/// always uses; `low_data_rate_optimize` must match the DE flag the
/// transmitter applies (SF11/SF12 at 125 kHz).
///
/// The result is exact for spreading factors 7..=12; values outside that
/// range are not meaningful LoRa configurations.
#[must_use]
pub fn airtime(
    payload_len: usize,
    spreading_factor: u8,
    bandwidth_hz: f64,
    coding_rate: u8,
    preamble_symbols: u16,
    header_enabled: bool,
    low_data_rate_optimize: bool,
) -> f64 {
    let sf = f64::from(spreading_factor);
    let h = if header_enabled { 0.0 } else { 1.0 };
    let de = if low_data_rate_optimize { 1.0 } else { 0.0 };

    let symbol_s = (2f64).powf(sf) / bandwidth_hz;

    let preamble_s = (f64::from(preamble_symbols) + 4.25) * symbol_s;

    let numerator = 8.0 * payload_len as f64 - 4.0 * sf + 28.0 + 16.0 - 20.0 * h;
    let denominator = 4.0 * (sf - 2.0 * de);
    let payload_symbols =
        8.0 + ((numerator / denominator).ceil() * f64::from(coding_rate + 4)).max(0.0);

    preamble_s + payload_symbols * symbol_s
}

/// Time on air of a LoRaWAN uplink carrying `app_payload_len` application
/// bytes, in seconds.
///
/// Adds the 13-byte MAC overhead (MHDR, DevAddr, FCtrl, FCnt, FPort, MIC),
/// assumes the standard 8-symbol preamble, CR 4/5 and an explicit header,
/// and applies low-data-rate optimization automatically for SF11/SF12 at
/// 125 kHz or below.
///
/// # Examples
///
/// ```
/// use asr650x_core::airtime::uplink_airtime;
///
/// // 4 application bytes at SF7/125 kHz: 51.456 ms on air.
/// let t = uplink_airtime(4, 7, 125_000.0);
/// assert!((t - 0.051456).abs() < 1e-9);
/// ```
#[must_use]
pub fn uplink_airtime(app_payload_len: usize, spreading_factor: u8, bandwidth_hz: f64) -> f64 {
    let low_data_rate_optimize = spreading_factor >= 11 && bandwidth_hz <= 125_000.0;
    airtime(
        app_payload_len + LORAWAN_FRAME_OVERHEAD,
        spreading_factor,
        bandwidth_hz,
        DEFAULT_CODING_RATE,
        DEFAULT_PREAMBLE_SYMBOLS,
        true,
        low_data_rate_optimize,
    )
}
