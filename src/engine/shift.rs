//! Shift-sensor debounce and RPM gating.

use crate::engine::config::EngineConfig;

/// Outcome of one shift-sensor trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftDecision {
    /// Trigger qualifies: cut ignition for this long.
    Cut { duration_ms: u16 },
    /// Trigger arrived inside the debounce window of the previous one.
    Debounced,
    /// RPM below the configured threshold and no manual override.
    RpmTooLow,
}

/// Debounce state for the shift sensor. A trigger that fails debounce
/// changes nothing; a trigger that passes re-arms the window even when the
/// RPM gate then discards it.
#[derive(Clone, Copy, Debug)]
pub struct ShiftGate {
    last_shift_us: Option<u64>,
}

impl ShiftGate {
    pub const fn new() -> Self {
        Self { last_shift_us: None }
    }

    /// Judge one rising edge of the shift sensor at `now_us`.
    ///
    /// `manual_override` (debug button path) bypasses the RPM gate but not
    /// the debounce.
    pub fn on_trigger(
        &mut self,
        now_us: u64,
        rpm: u16,
        manual_override: bool,
        config: &EngineConfig,
    ) -> ShiftDecision {
        let debounce_us = config.debounce_time_ms as u64 * 1_000;
        if let Some(last) = self.last_shift_us {
            if now_us.wrapping_sub(last) < debounce_us {
                return ShiftDecision::Debounced;
            }
        }
        self.last_shift_us = Some(now_us);

        if rpm < config.min_rpm_threshold && !manual_override {
            return ShiftDecision::RpmTooLow;
        }

        ShiftDecision::Cut {
            duration_ms: config.cut_time_map.duration_ms(rpm),
        }
    }
}

impl Default for ShiftGate {
    fn default() -> Self {
        Self::new()
    }
}
