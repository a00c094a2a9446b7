//! The main loop: run every `Execute` handler, then apply deferred commands

use crate::builtin::TimeModulator;
use crate::config::MainLoopConfig;
use kiln_ecs::function::{Execute, OnTerminate};
use kiln_ecs::{CommandReport, World};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop request for the main loop.
///
/// Inserted into the world as a resource while the loop runs, so handlers
/// can ask it to stop; the binary also sets it from the Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after the current tick
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The underlying flag, for signal handlers
    pub fn handle(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

/// Timing of the tick in progress, available as a world resource
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    /// Ticks started so far, counting this one
    pub frame: u64,
    /// Delta passed to `Execute` this tick, after clamping and scaling
    pub delta_seconds: f32,
    /// Clamped wall-clock delta, before scaling
    pub real_delta_seconds: f32,
    /// Scale applied this tick
    pub time_scale: f32,
    /// Sum of all scaled deltas so far
    pub elapsed_seconds: f64,
}

/// Drives the world until termination is requested
pub struct MainLoop {
    max_delta: f32,
    time_scale: f32,
    tick_interval: Option<Duration>,
    termination: TerminationFlag,
    frame: FrameInfo,
}

impl MainLoop {
    pub fn new(config: &MainLoopConfig) -> Self {
        Self {
            max_delta: config.max_delta_seconds,
            time_scale: config.time_scale,
            tick_interval: config
                .target_tick_rate
                .filter(|rate| *rate > 0)
                .map(|rate| Duration::from_secs_f64(1.0 / rate as f64)),
            termination: TerminationFlag::new(),
            frame: FrameInfo::default(),
        }
    }

    /// Flag that stops [`run`](Self::run)
    pub fn termination_flag(&self) -> TerminationFlag {
        self.termination.clone()
    }

    /// Timing of the last tick
    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    /// Base time scale, before [`TimeModulator`] factors
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale;
    }

    /// Scale for the coming tick: the base scale times every modulator
    /// factor. A negative or non-finite result pauses game time.
    fn effective_time_scale(&self, world: &World) -> f32 {
        let scale = world
            .query::<&TimeModulator>()
            .iter()
            .fold(self.time_scale, |scale, (_, modulator)| scale * modulator.factor);
        if scale.is_finite() && scale >= 0.0 {
            scale
        } else {
            log::warn!("Invalid time scale {}, pausing game time", scale);
            0.0
        }
    }

    /// One iteration: every `Execute` handler in query order with `dt`
    /// (clamped to the configured maximum, then time-scaled), then the
    /// command queue.
    pub fn tick(&mut self, world: &mut World, dt: f32) -> CommandReport {
        let real_dt = dt.clamp(0.0, self.max_delta);
        let time_scale = self.effective_time_scale(world);
        let dt = real_dt * time_scale;
        self.frame.frame += 1;
        self.frame.delta_seconds = dt;
        self.frame.real_delta_seconds = real_dt;
        self.frame.time_scale = time_scale;
        self.frame.elapsed_seconds += dt as f64;
        world.insert_resource(self.frame);

        let invoked = world.dispatch::<Execute>(|execute, world| execute.call(world, dt));
        let report = world.apply_commands();
        log::trace!(
            "Frame {}: {} handlers, {} commands applied",
            self.frame.frame,
            invoked,
            report.applied
        );
        report
    }

    /// Tick until the termination flag is set.
    ///
    /// The flag is checked before each tick, so a request made by a handler
    /// takes effect once that tick's commands have been applied.
    pub fn run(&mut self, world: &mut World) {
        world.insert_resource(self.termination.clone());
        log::info!("Main loop started");

        let mut last = Instant::now();
        while !self.termination.is_requested() {
            let tick_start = Instant::now();
            let dt = tick_start.duration_since(last).as_secs_f32();
            last = tick_start;

            self.tick(world, dt);

            if let Some(interval) = self.tick_interval {
                let spent = tick_start.elapsed();
                if spent < interval {
                    std::thread::sleep(interval - spent);
                }
            }
        }

        log::info!("Main loop stopped after {} frames", self.frame.frame);
    }

    /// Dispatch `OnTerminate` once, then apply what the handlers queued.
    /// Returns the number of handlers invoked.
    pub fn shutdown(&mut self, world: &mut World) -> usize {
        let invoked = world.dispatch::<OnTerminate>(|on_terminate, world| on_terminate.call(world));
        let report = world.apply_commands();
        if !report.is_clean() {
            log::warn!("{} commands failed during shutdown", report.failed.len());
        }
        log::info!("Shutdown complete ({} terminate handlers)", invoked);
        invoked
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new(&MainLoopConfig::default())
    }
}
