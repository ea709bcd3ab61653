//! Frame timing instrumentation.
//!
//! Reports composite timings through `tracing::debug!` when enabled. Output
//! is sampled: only every 60th frame is reported.
//!
//! The on/off switch is process-wide, like a log filter. Frame numbers are
//! not: each compositor passes its own count, so coexisting engines sample
//! independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Report every Nth frame.
const SAMPLE_EVERY: u64 = 60;

pub fn enable() {
    ENABLED.store(true, Ordering::Relaxed);
}

pub fn disable() {
    ENABLED.store(false, Ordering::Relaxed);
}

#[inline]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

#[inline]
fn is_sample_frame(frame: u64) -> bool {
    frame % SAMPLE_EVERY == 0
}

#[inline]
fn sampled(frame: u64) -> bool {
    is_enabled() && is_sample_frame(frame)
}

/// Run `f` and report how long it took on sampled frames.
#[inline]
pub fn measure<T>(label: &'static str, frame: u64, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    if sampled(frame) {
        tracing::debug!("[frame {}] {}: {:.2?}", frame, label, start.elapsed());
    }
    result
}

/// Report a counter on sampled frames.
#[inline]
pub fn stat(label: &'static str, frame: u64, value: impl std::fmt::Display) {
    if sampled(frame) {
        tracing::debug!("[frame {}] {}: {}", frame, label, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable() {
        disable();
        assert!(!is_enabled());
        enable();
        assert!(is_enabled());
        disable();
        assert!(!is_enabled());
    }

    #[test]
    fn test_sampling_cadence() {
        assert!(is_sample_frame(0));
        assert!(!is_sample_frame(1));
        assert!(!is_sample_frame(59));
        assert!(is_sample_frame(120));
    }

    #[test]
    fn test_measure_returns_value() {
        assert_eq!(measure("test", 0, || 42), 42);
    }

    #[test]
    fn test_stat_does_not_panic() {
        stat("test", 0, "value");
        stat("test", 60, 3.5);
    }
}
