//! Real-time ignition-cut engine.
//!
//! Everything in this module is hardware-free: operations take explicit
//! microsecond timestamps and return decisions. The interrupt binding in the
//! firmware binary owns the pins and the deadline timer and applies the
//! decisions it gets back. Interval arithmetic is wrapping, so a timer
//! wraparound never produces a spuriously huge interval.

pub mod config;
pub mod core;
pub mod filter;
pub mod shift;

pub use self::config::{CutTimeMap, EngineConfig};
pub use self::core::{IgnitionCutEngine, SignalTransition, SIGNAL_TIMEOUT_US};
pub use self::filter::{PulseEvent, PulseFilter, RejectReason};
pub use self::shift::{ShiftDecision, ShiftGate};
