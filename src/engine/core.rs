//! Engine composition: pulse filter, shift gate, cut lifecycle and
//! signal-loss detection behind one state owner.

use crate::engine::config::EngineConfig;
use crate::engine::filter::{PulseEvent, PulseFilter};
use crate::engine::shift::{ShiftDecision, ShiftGate};

/// No pulses for this long means the engine is off or stalled.
pub const SIGNAL_TIMEOUT_US: u64 = 1_000_000;

/// Edge reported by the periodic signal poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalTransition {
    /// Pickup signal went silent; RPM was forced to zero.
    Lost { last_rpm: u16 },
    /// Pulses are coming in again.
    Acquired,
}

/// The real-time ignition-cut engine.
///
/// One instance exists per physical device, created at boot and never torn
/// down. The instance itself is context-free: the interrupt binding calls
/// `on_pickup_pulse` / `on_shift_trigger` from interrupt context,
/// `on_cut_timer_expired` from the deadline-timer context, and `update` plus
/// the queries from task context under a critical section.
pub struct IgnitionCutEngine {
    config: EngineConfig,
    filter: PulseFilter,
    gate: ShiftGate,
    current_rpm: u16,
    cut_active: bool,
    signal_active: bool,
}

impl IgnitionCutEngine {
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            filter: PulseFilter::new(),
            gate: ShiftGate::new(),
            current_rpm: 0,
            cut_active: false,
            signal_active: false,
        }
    }

    /// Replace the whole configuration. Infallible; takes effect for the
    /// next shift trigger.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Pickup-coil rising edge at `now_us`.
    pub fn on_pickup_pulse(&mut self, now_us: u64) -> PulseEvent {
        let event = self.filter.on_pulse(now_us, self.cut_active);
        if let PulseEvent::Accepted { rpm, .. } = event {
            self.current_rpm = rpm;
        }
        event
    }

    /// Shift-sensor rising edge at `now_us`. On `Cut` the caller must drive
    /// the ignition output to the cut level and (re)schedule the deadline
    /// timer with the returned duration; scheduling replaces any in-flight
    /// deadline, so a re-trigger while active extends rather than stacks.
    pub fn on_shift_trigger(&mut self, now_us: u64, manual_override: bool) -> ShiftDecision {
        let decision = self
            .gate
            .on_trigger(now_us, self.current_rpm, manual_override, &self.config);
        if matches!(decision, ShiftDecision::Cut { .. }) {
            self.cut_active = true;
        }
        decision
    }

    /// Deadline-timer expiry: the cut is over. The caller restores the
    /// ignition output to the enabled level.
    pub fn on_cut_timer_expired(&mut self) {
        self.cut_active = false;
    }

    /// Periodic signal-loss poll. The pulse interrupt cannot observe "no
    /// more pulses are coming", so this is the only path that clears RPM
    /// outside the interrupt. Edge-triggered: acts once per transition.
    pub fn update(&mut self, now_us: u64) -> Option<SignalTransition> {
        let alive = match self.filter.last_pulse_us() {
            Some(last) => now_us.wrapping_sub(last) < SIGNAL_TIMEOUT_US,
            None => false,
        };

        match (self.signal_active, alive) {
            (true, false) => {
                self.signal_active = false;
                let last_rpm = self.current_rpm;
                self.current_rpm = 0;
                Some(SignalTransition::Lost { last_rpm })
            }
            (false, true) => {
                self.signal_active = true;
                Some(SignalTransition::Acquired)
            }
            _ => None,
        }
    }

    pub fn current_rpm(&self) -> u16 {
        self.current_rpm
    }

    pub fn is_signal_active(&self) -> bool {
        self.signal_active
    }

    pub fn is_cut_active(&self) -> bool {
        self.cut_active
    }
}

impl Default for IgnitionCutEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
