//! Pickup-coil pulse filtering.
//!
//! Pickup coils on combustion engines double-trigger and drop edges under
//! vibration, so a single-sample RPM estimate is unusable for a timing
//! actuator. Two rejection layers run on every pulse: an absolute sanity
//! bound (intervals shorter than any physically plausible RPM) and a
//! relative filter against the previous accepted interval.

/// Intervals below this are beyond ~20,000 RPM and treated as noise.
pub const MIN_PLAUSIBLE_INTERVAL_US: u64 = 3_000;
/// A gap longer than this means the engine stalled or just started turning;
/// the filter re-baselines instead of computing an interval.
pub const BASELINE_GAP_US: u64 = 100_000;

/// Microseconds per minute; one pulse per revolution.
const US_PER_MINUTE: u64 = 60_000_000;

/// Why a pulse was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Interval under [`MIN_PLAUSIBLE_INTERVAL_US`]: physically implausible.
    TooShort,
    /// Interval deviates more than 40% from the last accepted interval.
    Deviates,
}

/// Outcome of feeding one pulse edge to the filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseEvent {
    /// Pulse recorded as a new baseline; no RPM produced. Happens on the
    /// first pulse ever, after a stall gap, and while a cut is active.
    Baseline,
    Accepted { interval_us: u64, rpm: u16 },
    /// Pulse discarded; no state was touched.
    Rejected(RejectReason),
}

/// Pure accept/reject decision for one measured interval.
///
/// `last_valid_us == 0` means no baseline is established yet and only the
/// absolute bound applies. The 40% band is inclusive on accept.
pub fn classify_interval(current_us: u64, last_valid_us: u64) -> Result<(), RejectReason> {
    if current_us < MIN_PLAUSIBLE_INTERVAL_US {
        return Err(RejectReason::TooShort);
    }
    if last_valid_us > 0 {
        let deviation = current_us.abs_diff(last_valid_us);
        if deviation > last_valid_us * 4 / 10 {
            return Err(RejectReason::Deviates);
        }
    }
    Ok(())
}

pub fn rpm_from_interval(interval_us: u64) -> u16 {
    // Caller guarantees interval_us >= MIN_PLAUSIBLE_INTERVAL_US, so the
    // quotient fits u16 comfortably; the min() is belt and braces.
    (US_PER_MINUTE / interval_us).min(u16::MAX as u64) as u16
}

/// Filter state. Mutated only on the pickup-pulse path; a rejected pulse
/// leaves every field untouched so the next interval is measured from the
/// last accepted pulse.
#[derive(Clone, Copy, Debug)]
pub struct PulseFilter {
    last_pulse_us: Option<u64>,
    last_valid_interval_us: u64,
}

impl PulseFilter {
    pub const fn new() -> Self {
        Self {
            last_pulse_us: None,
            last_valid_interval_us: 0,
        }
    }

    /// Timestamp of the last recorded pulse (accepted or baseline), if any.
    pub fn last_pulse_us(&self) -> Option<u64> {
        self.last_pulse_us
    }

    /// Feed one rising edge observed at `now_us`.
    ///
    /// While a cut is active the pickup signal carries no usable timing, so
    /// the pulse only refreshes the baseline timestamp. Wrapping subtraction
    /// keeps a clock wraparound from showing up as a giant interval.
    pub fn on_pulse(&mut self, now_us: u64, cut_active: bool) -> PulseEvent {
        let Some(last) = self.last_pulse_us else {
            self.rebaseline(now_us);
            return PulseEvent::Baseline;
        };

        let interval_us = now_us.wrapping_sub(last);
        if cut_active || interval_us > BASELINE_GAP_US {
            self.rebaseline(now_us);
            return PulseEvent::Baseline;
        }

        match classify_interval(interval_us, self.last_valid_interval_us) {
            Ok(()) => {
                self.last_valid_interval_us = interval_us;
                self.last_pulse_us = Some(now_us);
                PulseEvent::Accepted {
                    interval_us,
                    rpm: rpm_from_interval(interval_us),
                }
            }
            Err(reason) => PulseEvent::Rejected(reason),
        }
    }

    fn rebaseline(&mut self, now_us: u64) {
        self.last_pulse_us = Some(now_us);
        self.last_valid_interval_us = 0;
    }
}

impl Default for PulseFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted_rpm(event: PulseEvent) -> u16 {
        match event {
            PulseEvent::Accepted { rpm, .. } => rpm,
            other => panic!("expected accepted pulse, got {other:?}"),
        }
    }

    #[test]
    fn first_pulse_establishes_baseline_without_rpm() {
        let mut filter = PulseFilter::new();
        assert_eq!(filter.on_pulse(1_000, false), PulseEvent::Baseline);
        assert_eq!(filter.last_pulse_us(), Some(1_000));
    }

    #[test]
    fn second_pulse_computes_rpm_by_integer_division() {
        let mut filter = PulseFilter::new();
        filter.on_pulse(0, false);
        let event = filter.on_pulse(5_000, false);
        assert_eq!(accepted_rpm(event), 12_000);

        // Check the formula across the accepted interval range.
        for interval in [3_000u64, 4_567, 50_000, 99_999] {
            let mut filter = PulseFilter::new();
            filter.on_pulse(0, false);
            let event = filter.on_pulse(interval, false);
            assert_eq!(accepted_rpm(event), (60_000_000 / interval) as u16);
        }
    }

    #[test]
    fn interval_below_sanity_bound_is_rejected_without_state_change() {
        let mut filter = PulseFilter::new();
        filter.on_pulse(0, false);
        let event = filter.on_pulse(2_000, false);
        assert_eq!(event, PulseEvent::Rejected(RejectReason::TooShort));
        // Timestamp did not advance: next interval measures from pulse 0.
        assert_eq!(filter.last_pulse_us(), Some(0));
    }

    #[test]
    fn relative_filter_rejects_past_forty_percent_inclusive_accept() {
        // Establish baseline interval of 5000us.
        let mut filter = PulseFilter::new();
        filter.on_pulse(0, false);
        filter.on_pulse(5_000, false);

        // 40% of 5000 is 2000: 7000 is the inclusive accept boundary.
        let event = filter.on_pulse(12_000, false);
        assert!(matches!(event, PulseEvent::Accepted { interval_us: 7_000, .. }));

        // Baseline is now 7000, so the accept band is 4200..=9800.
        // One microsecond short of the band: interval 4199, rejected.
        let event = filter.on_pulse(16_199, false);
        assert_eq!(event, PulseEvent::Rejected(RejectReason::Deviates));

        // One microsecond past the band: interval 9801, rejected. The
        // previous rejection left the timestamp at 12000.
        let event = filter.on_pulse(21_801, false);
        assert_eq!(event, PulseEvent::Rejected(RejectReason::Deviates));

        // Inclusive on the short side too: interval 4200 is accepted.
        let event = filter.on_pulse(16_200, false);
        assert!(matches!(event, PulseEvent::Accepted { interval_us: 4_200, .. }));
    }

    #[test]
    fn rejected_pulse_does_not_corrupt_the_baseline() {
        // Bench trace: steady 5000us pulses, one noise spike at +2000us,
        // then the train continues.
        let mut filter = PulseFilter::new();
        filter.on_pulse(0, false);
        let event = filter.on_pulse(5_000, false);
        assert_eq!(accepted_rpm(event), 12_000);

        // Noise edge 2000us after the last good pulse.
        let event = filter.on_pulse(7_000, false);
        assert_eq!(event, PulseEvent::Rejected(RejectReason::TooShort));

        // Next real edge: 5100us from the last *accepted* pulse, not from
        // the noise edge. Accepted, and RPM follows the true interval.
        let event = filter.on_pulse(10_100, false);
        assert_eq!(accepted_rpm(event), (60_000_000u64 / 5_100) as u16);
    }

    #[test]
    fn stall_gap_rebaselines_and_discards_filter_history() {
        let mut filter = PulseFilter::new();
        filter.on_pulse(0, false);
        filter.on_pulse(5_000, false);

        // >100ms of silence: engine stalled. Next pulse is baseline only.
        let event = filter.on_pulse(5_000 + 150_000, false);
        assert_eq!(event, PulseEvent::Baseline);

        // The interval history is gone, so the following pulse is judged by
        // the absolute bound alone even though it differs wildly from the
        // pre-stall cadence.
        let event = filter.on_pulse(5_000 + 150_000 + 20_000, false);
        assert!(matches!(event, PulseEvent::Accepted { interval_us: 20_000, .. }));
    }

    #[test]
    fn pulses_during_cut_only_refresh_the_baseline() {
        let mut filter = PulseFilter::new();
        filter.on_pulse(0, false);
        filter.on_pulse(5_000, false);

        assert_eq!(filter.on_pulse(10_000, true), PulseEvent::Baseline);
        assert_eq!(filter.last_pulse_us(), Some(10_000));

        // First pulse after the cut re-establishes an interval normally.
        let event = filter.on_pulse(15_000, false);
        assert!(matches!(event, PulseEvent::Accepted { interval_us: 5_000, .. }));
    }

    #[test]
    fn clock_wraparound_yields_a_sane_interval() {
        let mut filter = PulseFilter::new();
        filter.on_pulse(u64::MAX - 2_000, false);
        // 5000us later, past the wrap point.
        let event = filter.on_pulse(2_999, false);
        assert!(matches!(event, PulseEvent::Accepted { interval_us: 5_000, .. }));
    }

    #[test]
    fn steady_train_tracks_rpm() {
        // 10 pulses at 5000us, 12000 RPM at the end.
        let mut filter = PulseFilter::new();
        let mut last_rpm = 0;
        for i in 0..10u64 {
            if let PulseEvent::Accepted { rpm, .. } = filter.on_pulse(i * 5_000, false) {
                last_rpm = rpm;
            }
        }
        assert_eq!(last_rpm, 12_000);
    }
}
