//! Off-screen driver for a grid engine.
//!
//! Replays a script of input events against an engine on a tokio timer
//! loop: between events the driver sleeps until the engine's next wakeup
//! (redraw slot, debounce deadline or caret blink) and ticks it, the same
//! way a windowed host would from its event loop.

use serde::{Deserialize, Serialize};
use tessel_render::{
    Clock, CompositeStatus, EngineConfig, EngineEvent, EventOutcome, GridEngine, RasterBuffer, RenderError,
};
use tokio::time::{Duration, Instant};

/// Milliseconds on the tokio clock, so paused test time drives the engine.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// First whole microsecond strictly after `ms`, so a deadline compared
    /// in float milliseconds has always passed once the sleep returns.
    fn instant_at(&self, ms: f64) -> Instant {
        let micros = (ms.max(0.0) * 1000.0).ceil() as u64 + 1;
        self.origin + Duration::from_micros(micros)
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// One scripted input: wait `after_ms` after the previous step, then deliver
/// `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub after_ms: f64,
    pub event: EngineEvent,
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>, serde_json::Error> {
    serde_json::from_str(json)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Ticks that ran a composite slice.
    pub frames: u64,
    /// Slices that ran out of op budget.
    pub yields: u64,
    pub outcomes: Vec<EventOutcome>,
}

pub struct FrameDriver {
    engine: GridEngine,
    clock: TokioClock,
    target: RasterBuffer,
    report: RunReport,
}

impl FrameDriver {
    /// Build an engine that reads the driver's clock.
    pub fn new(config: EngineConfig) -> Result<Self, RenderError> {
        let clock = TokioClock::new();
        let target = RasterBuffer::new(config.viewport_width.ceil() as u32, config.viewport_height.ceil() as u32);
        let rasterizer = GridEngine::rasterizer_for(&config)?;
        let engine = GridEngine::with_parts(config, rasterizer, Box::new(clock))?;
        Ok(Self {
            engine,
            clock,
            target,
            report: RunReport::default(),
        })
    }

    pub fn engine(&self) -> &GridEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GridEngine {
        &mut self.engine
    }

    pub fn target(&self) -> &RasterBuffer {
        &self.target
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_engine(self) -> GridEngine {
        self.engine
    }

    /// Deliver every step, keep ticking for `settle_ms` after the last one,
    /// then paint whatever is still dirty.
    pub async fn run(&mut self, script: Vec<ScriptStep>, settle_ms: f64) -> Result<&RunReport, RenderError> {
        let mut at = self.clock.now_ms();
        for step in script {
            at += step.after_ms.max(0.0);
            self.pump_until(at).await?;
            tracing::debug!("t={:.1}ms event {:?}", self.clock.now_ms(), step.event);
            let outcome = self.engine.handle_event(step.event);
            self.report.outcomes.push(outcome);
        }
        self.pump_until(at + settle_ms.max(0.0)).await?;
        self.engine.render(&mut self.target)?;
        Ok(&self.report)
    }

    /// Tick the engine at each wakeup it asks for until `deadline_ms`.
    pub async fn pump_until(&mut self, deadline_ms: f64) -> Result<(), RenderError> {
        loop {
            let now = self.clock.now_ms();
            let wake = self.engine.next_wakeup().unwrap_or(deadline_ms).clamp(now, deadline_ms);
            if wake > now {
                tokio::time::sleep_until(self.clock.instant_at(wake)).await;
            }
            self.tick()?;
            if self.clock.now_ms() >= deadline_ms {
                return Ok(());
            }
        }
    }

    fn tick(&mut self) -> Result<(), RenderError> {
        match self.engine.tick(&mut self.target)? {
            Some(CompositeStatus::Complete) => self.report.frames += 1,
            Some(CompositeStatus::Yielded { .. }) => {
                self.report.frames += 1;
                self.report.yields += 1;
            }
            None => {}
        }
        Ok(())
    }
}
