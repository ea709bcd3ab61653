//! Redraw scheduling.
//!
//! Two independent limits decide when a requested redraw may run:
//!
//! - **Throttle**: at most one draw per `frame_interval_ms`.
//! - **Debounce**: a debounced request only becomes due after
//!   `debounce_ms` without another debounced request (trailing edge).
//!
//! Any number of requests made before the draw runs collapse into it. Time
//! is passed in as milliseconds, so the scheduler itself never reads a
//! clock.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub frame_interval_ms: f64,
    pub debounce_ms: f64,
    /// Caret blink period.
    pub blink_interval_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16.67,
            debounce_ms: 16.0,
            blink_interval_ms: 500.0,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("scheduler.frame_interval_ms", self.frame_interval_ms),
            ("scheduler.debounce_ms", self.debounce_ms),
            ("scheduler.blink_interval_ms", self.blink_interval_ms),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be a non-negative duration, got {value}"),
                });
            }
        }
        if self.blink_interval_ms == 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.blink_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// How a redraw request should be timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Next frame slot.
    Immediate,
    /// After the debounce quiet period.
    Debounced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub requests: u64,
    pub draws: u64,
    /// Requests that folded into an already pending draw.
    pub coalesced: u64,
}

#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    config: SchedulerConfig,
    pending: bool,
    immediate: bool,
    debounce_deadline: Option<f64>,
    last_draw: Option<f64>,
    stats: SchedulerStats,
}

impl RedrawScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            pending: false,
            immediate: false,
            debounce_deadline: None,
            last_draw: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn request_draw(&mut self, now: f64, urgency: Urgency) {
        self.stats.requests += 1;
        if self.pending {
            self.stats.coalesced += 1;
        }
        self.pending = true;
        match urgency {
            Urgency::Immediate => self.immediate = true,
            Urgency::Debounced => self.debounce_deadline = Some(now + self.config.debounce_ms),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Earliest time the pending draw may run, or `None` if nothing is
    /// pending.
    pub fn due_at(&self) -> Option<f64> {
        if !self.pending {
            return None;
        }
        let throttle = self
            .last_draw
            .map(|t| t + self.config.frame_interval_ms)
            .unwrap_or(f64::NEG_INFINITY);
        let ready = match (self.immediate, self.debounce_deadline) {
            (false, Some(deadline)) => throttle.max(deadline),
            _ => throttle,
        };
        Some(ready)
    }

    /// Returns `true` if a draw should run now, and records it.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.due_at() {
            Some(due) if due <= now => {
                self.pending = false;
                self.immediate = false;
                self.debounce_deadline = None;
                self.last_draw = Some(now);
                self.stats.draws += 1;
                true
            }
            _ => false,
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> RedrawScheduler {
        RedrawScheduler::new(SchedulerConfig::default())
    }

    #[test]
    fn nothing_pending_never_fires() {
        let mut s = scheduler();
        assert_eq!(s.due_at(), None);
        assert!(!s.poll(1000.0));
    }

    #[test]
    fn first_immediate_request_fires_at_once() {
        let mut s = scheduler();
        s.request_draw(0.0, Urgency::Immediate);
        assert!(s.poll(0.0));
        assert!(!s.is_pending());
    }

    #[test]
    fn throttle_spaces_draws() {
        let mut s = scheduler();
        s.request_draw(0.0, Urgency::Immediate);
        assert!(s.poll(0.0));
        s.request_draw(1.0, Urgency::Immediate);
        assert!(!s.poll(10.0));
        assert!(s.poll(16.67));
    }

    #[test]
    fn debounce_waits_for_quiet() {
        let mut s = scheduler();
        s.request_draw(0.0, Urgency::Debounced);
        s.request_draw(10.0, Urgency::Debounced);
        s.request_draw(20.0, Urgency::Debounced);
        assert!(!s.poll(30.0));
        assert_eq!(s.due_at(), Some(36.0));
        assert!(s.poll(36.0));
        let stats = s.stats();
        assert_eq!((stats.requests, stats.draws, stats.coalesced), (3, 1, 2));
    }

    #[test]
    fn immediate_overrides_debounce() {
        let mut s = scheduler();
        s.request_draw(0.0, Urgency::Debounced);
        s.request_draw(1.0, Urgency::Immediate);
        assert!(s.poll(1.0));
    }

    #[test]
    fn invalid_durations() {
        let config = SchedulerConfig {
            debounce_ms: -1.0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
        let config = SchedulerConfig {
            blink_interval_ms: 0.0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
