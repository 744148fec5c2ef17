//! Interrupt binding for the ignition-cut engine.
//!
//! The engine itself is hardware-free; this module owns the pins, the cut
//! deadline timer and the engine instance, and routes edge interrupts into
//! it. All shared state lives in `critical_section` mutexes; every access
//! from task context is a single short critical section.

use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use esp_hal::{
    gpio::{Event, Input, Io, Output},
    handler,
    time::{Duration, Instant},
    timer::OneShotTimer,
    Blocking,
};
use quickshifter::engine::{
    EngineConfig, IgnitionCutEngine, ShiftDecision, SignalTransition,
};

use super::config::SHIFT_REPORT_QUEUE_DEPTH;

/// One shift-sensor outcome, reported from interrupt context and logged by
/// the monitor task.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ShiftReport {
    pub rpm: u16,
    pub threshold: u16,
    pub manual: bool,
    pub decision: ShiftDecision,
}

pub(crate) static SHIFT_REPORTS: Channel<
    CriticalSectionRawMutex,
    ShiftReport,
    SHIFT_REPORT_QUEUE_DEPTH,
> = Channel::new();

struct CutHardware {
    /// Ignition output. Low = ignition enabled, high = cut.
    output: Output<'static>,
    timer: OneShotTimer<'static, Blocking>,
}

static ENGINE: Mutex<RefCell<Option<IgnitionCutEngine>>> = Mutex::new(RefCell::new(None));
static PICKUP: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static SHIFT: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static OVERRIDE_BTN: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static CUT: Mutex<RefCell<Option<CutHardware>>> = Mutex::new(RefCell::new(None));

pub(crate) struct IrqResources {
    pub pickup: Input<'static>,
    pub shift: Input<'static>,
    pub override_btn: Input<'static>,
    pub cut_output: Output<'static>,
    pub cut_timer: OneShotTimer<'static, Blocking>,
}

/// Move the engine and its hardware into the interrupt statics and enable
/// edge delivery. Resources are consumed, so there is exactly one
/// installation per boot.
pub(crate) fn install(mut io: Io<'static>, mut resources: IrqResources, engine: IgnitionCutEngine) {
    // Ignition enabled until a qualifying shift says otherwise.
    resources.cut_output.set_low();
    resources.cut_timer.set_interrupt_handler(cut_deadline_handler);
    resources.cut_timer.enable_interrupt(true);

    critical_section::with(|cs| {
        ENGINE.borrow_ref_mut(cs).replace(engine);
        CUT.borrow_ref_mut(cs).replace(CutHardware {
            output: resources.cut_output,
            timer: resources.cut_timer,
        });
        PICKUP.borrow_ref_mut(cs).replace(resources.pickup);
        SHIFT.borrow_ref_mut(cs).replace(resources.shift);
        OVERRIDE_BTN.borrow_ref_mut(cs).replace(resources.override_btn);

        io.set_interrupt_handler(gpio_edge_handler);

        // Listen only after every static is populated, so the first edge
        // finds its state in place.
        if let Some(pickup) = PICKUP.borrow_ref_mut(cs).as_mut() {
            pickup.listen(Event::RisingEdge);
        }
        if let Some(shift) = SHIFT.borrow_ref_mut(cs).as_mut() {
            shift.listen(Event::RisingEdge);
        }
        if let Some(btn) = OVERRIDE_BTN.borrow_ref_mut(cs).as_mut() {
            // Boot button is active low.
            btn.listen(Event::FallingEdge);
        }
    });
}

fn now_us() -> u64 {
    Instant::now().duration_since_epoch().as_micros()
}

#[handler]
fn gpio_edge_handler() {
    let now = now_us();
    critical_section::with(|cs| {
        let mut engine = ENGINE.borrow_ref_mut(cs);
        let Some(engine) = engine.as_mut() else {
            return;
        };

        if let Some(pickup) = PICKUP.borrow_ref_mut(cs).as_mut() {
            if pickup.is_interrupt_set() {
                pickup.clear_interrupt();
                engine.on_pickup_pulse(now);
            }
        }
        if let Some(shift) = SHIFT.borrow_ref_mut(cs).as_mut() {
            if shift.is_interrupt_set() {
                shift.clear_interrupt();
                handle_shift(cs, engine, now, false);
            }
        }
        if let Some(btn) = OVERRIDE_BTN.borrow_ref_mut(cs).as_mut() {
            if btn.is_interrupt_set() {
                btn.clear_interrupt();
                handle_shift(cs, engine, now, true);
            }
        }
    });
}

fn handle_shift(cs: CriticalSection, engine: &mut IgnitionCutEngine, now_us: u64, manual: bool) {
    let rpm = engine.current_rpm();
    let threshold = engine.config().min_rpm_threshold;
    let decision = engine.on_shift_trigger(now_us, manual);

    if let ShiftDecision::Cut { duration_ms } = decision {
        start_cut(cs, engine, duration_ms);
    }

    // Drop-on-full: losing a log line beats blocking an interrupt.
    let _ = SHIFT_REPORTS.try_send(ShiftReport {
        rpm,
        threshold,
        manual,
        decision,
    });
}

fn start_cut(cs: CriticalSection, engine: &mut IgnitionCutEngine, duration_ms: u16) {
    let Some(cut) = CUT.borrow_ref_mut(cs).as_mut() else {
        return;
    };
    cut.output.set_high();
    // Scheduling while armed replaces the previous deadline, so a
    // re-trigger extends the cut instead of stacking callbacks.
    if cut
        .timer
        .schedule(Duration::from_millis(duration_ms as u64))
        .is_err()
    {
        // Without a deadline the output must not stay in the cut state.
        cut.output.set_low();
        engine.on_cut_timer_expired();
    }
}

#[handler]
fn cut_deadline_handler() {
    critical_section::with(|cs| {
        if let Some(cut) = CUT.borrow_ref_mut(cs).as_mut() {
            cut.timer.clear_interrupt();
            cut.output.set_low();
        }
        if let Some(engine) = ENGINE.borrow_ref_mut(cs).as_mut() {
            engine.on_cut_timer_expired();
        }
    });
}

/// Run the engine's signal-loss poll with the current timestamp.
pub(crate) fn run_update() -> Option<SignalTransition> {
    let now = now_us();
    critical_section::with(|cs| {
        ENGINE
            .borrow_ref_mut(cs)
            .as_mut()
            .and_then(|engine| engine.update(now))
    })
}

pub(crate) fn set_config(config: EngineConfig) {
    critical_section::with(|cs| {
        if let Some(engine) = ENGINE.borrow_ref_mut(cs).as_mut() {
            engine.set_config(config);
        }
    });
}

pub(crate) fn engine_config() -> Option<EngineConfig> {
    critical_section::with(|cs| ENGINE.borrow_ref(cs).as_ref().map(|e| e.config()))
}

pub(crate) fn current_rpm() -> u16 {
    critical_section::with(|cs| {
        ENGINE
            .borrow_ref(cs)
            .as_ref()
            .map(|e| e.current_rpm())
            .unwrap_or(0)
    })
}

pub(crate) fn is_signal_active() -> bool {
    critical_section::with(|cs| {
        ENGINE
            .borrow_ref(cs)
            .as_ref()
            .map(|e| e.is_signal_active())
            .unwrap_or(false)
    })
}

pub(crate) fn is_cut_active() -> bool {
    critical_section::with(|cs| {
        ENGINE
            .borrow_ref(cs)
            .as_ref()
            .map(|e| e.is_cut_active())
            .unwrap_or(false)
    })
}
