//! Periodic update task: signal-loss polling and telemetry logging.
//!
//! Interrupt handlers never touch the console; they push shift outcomes
//! into a channel and this task turns them into log lines.

use embassy_time::{Duration, Ticker};
use esp_println::println;
use quickshifter::engine::{ShiftDecision, SignalTransition};

use super::{
    config::{MONITOR_TICK_MS, TELEMETRY_EVERY_TICKS},
    irq::{self, ShiftReport},
};

#[embassy_executor::task]
pub(crate) async fn monitor_task() {
    let mut ticker = Ticker::every(Duration::from_millis(MONITOR_TICK_MS));
    let mut tick: u32 = 0;

    loop {
        ticker.next().await;

        match irq::run_update() {
            Some(SignalTransition::Lost { last_rpm }) => {
                println!("[qs] pickup signal lost, last rpm {last_rpm}");
            }
            Some(SignalTransition::Acquired) => {
                println!("[qs] pickup signal acquired");
            }
            None => {}
        }

        while let Ok(report) = irq::SHIFT_REPORTS.try_receive() {
            log_shift(&report);
        }

        tick = tick.wrapping_add(1);
        if tick % TELEMETRY_EVERY_TICKS == 0 && irq::is_signal_active() {
            println!(
                "[qs] rpm {} cut_active {}",
                irq::current_rpm(),
                irq::is_cut_active()
            );
        }
    }
}

fn log_shift(report: &ShiftReport) {
    let source = if report.manual { "button" } else { "sensor" };
    match report.decision {
        ShiftDecision::Cut { duration_ms } => {
            println!(
                "[qs] shift ({source}) rpm {} -> cut {duration_ms}ms",
                report.rpm
            );
        }
        ShiftDecision::Debounced => {
            println!("[qs] shift ({source}) rpm {} -> debounced", report.rpm);
        }
        ShiftDecision::RpmTooLow => {
            println!(
                "[qs] shift ({source}) rpm {} below threshold {} -> ignored",
                report.rpm, report.threshold
            );
        }
    }
}
