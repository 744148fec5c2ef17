//! Wiring and firmware constants.
//!
//! Pin roles on the dev board:
//! - GPIO2  pickup coil, squared by the external conditioning stage
//! - GPIO14 shift sensor
//! - GPIO0  boot button, manual shift override (active low)
//! - GPIO15 ignition-cut SSR, low = ignition enabled

/// Period of the signal-loss / telemetry poll task.
pub(crate) const MONITOR_TICK_MS: u64 = 20;
/// Telemetry line cadence, in monitor ticks (50 * 20ms = 1s).
pub(crate) const TELEMETRY_EVERY_TICKS: u32 = 50;

pub(crate) const SHIFT_REPORT_QUEUE_DEPTH: usize = 8;

// Flash record holding the engine configuration, last sector of flash.
pub(crate) const CONFIG_STORE_MAGIC: u32 = 0x5153_4346; // "QSCF"
pub(crate) const CONFIG_STORE_VERSION: u8 = 1;
pub(crate) const CONFIG_STORE_RECORD_LEN: usize = 36;
