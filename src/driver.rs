//! Frame loop: tick the state machine, pull a frame, filter it and present it.
//!
//! The [`Avatar`] composes the three independently testable components and is
//! the only place that starts the transition glitch, at most once per tick.

use crate::filters::FilterPipeline;
use crate::log_debug;
use crate::rules::RuleRegistry;
use crate::state::StateMachine;
use crate::video::{ClipSource, Frame, VideoPlayer};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Output surface for filtered frames.
pub trait Presenter {
    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Called instead of `present` on ticks that produced no frame.
    fn idle(&mut self) -> Result<()> {
        Ok(())
    }

    /// Polled once per tick.
    fn exit_requested(&self) -> bool {
        false
    }
}

pub struct Avatar<S: ClipSource> {
    machine: StateMachine,
    player: VideoPlayer<S>,
    filters: FilterPipeline,
    rules: RuleRegistry,
}

impl<S: ClipSource> Avatar<S> {
    pub fn new(
        machine: StateMachine,
        player: VideoPlayer<S>,
        filters: FilterPipeline,
        rules: RuleRegistry,
    ) -> Self {
        Self {
            machine,
            player,
            filters,
            rules,
        }
    }

    /// Open the first clip for the initial state.
    pub fn start(&mut self) {
        log_debug(&format!("Starting in state: {}", self.machine.current_name()));
        self.player.select(self.machine.selection());
    }

    /// One iteration: rules, state switch, frame, filters.
    ///
    /// Returns `None` when no clip is playing; the caller simply skips
    /// presentation for this tick.
    pub fn tick(&mut self, now: Instant) -> Option<Frame> {
        let switched = match self.machine.tick(&self.rules, now) {
            Some(selection) => {
                self.player.select(selection);
                true
            }
            None => false,
        };
        let raw = self.player.next_frame();
        let handed_off = self.player.take_transition_cue();
        if switched || handed_off {
            self.filters.start_transition();
        }
        raw.map(|frame| self.filters.apply(&frame))
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn player(&self) -> &VideoPlayer<S> {
        &self.player
    }

    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }
}

/// Fixed-rate pacing against a monotonic deadline, so slow ticks do not
/// accumulate drift.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    deadline: Instant,
}

impl FramePacer {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            deadline: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long to wait at `now`, advancing to the next deadline. A tick that
    /// overran its slot waits nothing and the schedule restarts from `now`.
    pub fn advance(&mut self, now: Instant) -> Duration {
        let wait = self.deadline.saturating_duration_since(now);
        self.deadline = if wait.is_zero() {
            now + self.interval
        } else {
            self.deadline + self.interval
        };
        wait
    }

    pub fn wait(&mut self) {
        let wait = self.advance(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}

/// Drive `avatar` until `cancel` is set or the presenter asks to exit.
///
/// Presentation errors are logged and the loop continues. Returns the number
/// of frames presented.
pub fn run_loop<S, P>(
    avatar: &mut Avatar<S>,
    presenter: &mut P,
    interval: Duration,
    cancel: &AtomicBool,
) -> u64
where
    S: ClipSource,
    P: Presenter + ?Sized,
{
    let mut pacer = FramePacer::new(interval, Instant::now());
    let mut presented = 0u64;
    while !cancel.load(Ordering::Relaxed) && !presenter.exit_requested() {
        let result = match avatar.tick(Instant::now()) {
            Some(frame) => presenter.present(&frame).map(|()| presented += 1),
            None => presenter.idle(),
        };
        if let Err(err) = result {
            log_debug(&format!("present failed: {err:#}"));
            tracing::warn!(error = %format!("{err:#}"), "present failed");
        }
        pacer.wait();
    }
    log_debug(&format!("frame loop stopped after {presented} frame(s)"));
    presented
}
