use super::{GuardSlot, Rule, RuleKind, RuleSettings};
use crate::audio::{LoudnessMeter, LoudnessMonitor};
use crate::lock_or_recover;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Which side of the threshold counts as "crossed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    #[serde(alias = "positive", alias = "POSITIVE", alias = "Above")]
    Above,
    #[serde(alias = "negative", alias = "NEGATIVE", alias = "Below")]
    Below,
}

impl Polarity {
    pub fn crossed(self, level: f32, threshold: f32) -> bool {
        match self {
            Polarity::Above => level >= threshold,
            Polarity::Below => level <= threshold,
        }
    }
}

/// Static configuration of one loudness transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessCondition {
    pub threshold: f32,
    pub min_duration: Duration,
    pub polarity: Polarity,
}

impl LoudnessCondition {
    pub fn new(threshold: f32, min_duration_secs: f64, polarity: Polarity) -> Self {
        Self {
            threshold,
            min_duration: Duration::from_secs_f64(min_duration_secs.max(0.0)),
            polarity,
        }
    }
}

/// Onsets of the uninterrupted crossings in progress, one per loudness
/// transition of the state being evaluated.
#[derive(Debug, Default)]
struct TriggerState {
    state: Option<usize>,
    onsets: HashMap<GuardSlot, Instant>,
}

/// Fires once the sampled loudness has stayed across a threshold long enough.
///
/// Every loudness transition keeps its own run, so a state may list several
/// thresholds without one resetting another.
pub struct LoudnessRule {
    meter: LoudnessMeter,
    trigger: Arc<Mutex<TriggerState>>,
    monitor: Option<LoudnessMonitor>,
}

impl LoudnessRule {
    pub fn new(meter: LoudnessMeter) -> Self {
        Self {
            meter,
            trigger: Arc::new(Mutex::new(TriggerState::default())),
            monitor: None,
        }
    }

    /// Forget every run when evaluation moves to another state.
    pub fn enter_state(&self, state: usize) {
        let mut trigger = lock_or_recover(&self.trigger, "loudness trigger");
        if trigger.state != Some(state) {
            trigger.onsets.clear();
            trigger.state = Some(state);
        }
    }

    /// Check the latest loudness against the transition at `slot` at time `now`.
    ///
    /// The first crossing tick only records the onset. Any tick that is not
    /// crossed discards the run; firing resets it so one run fires once.
    pub fn check(&self, slot: GuardSlot, condition: &LoudnessCondition, now: Instant) -> bool {
        let level = self.meter.level();
        let crossed = condition.polarity.crossed(level, condition.threshold);
        let mut trigger = lock_or_recover(&self.trigger, "loudness trigger");
        if !crossed {
            trigger.onsets.remove(&slot);
            return false;
        }
        match trigger.onsets.get(&slot).copied() {
            None => {
                trigger.onsets.insert(slot, now);
                false
            }
            Some(start) if now.saturating_duration_since(start) >= condition.min_duration => {
                trigger.onsets.remove(&slot);
                true
            }
            Some(_) => false,
        }
    }

    pub fn in_progress(&self, slot: GuardSlot) -> bool {
        lock_or_recover(&self.trigger, "loudness trigger")
            .onsets
            .contains_key(&slot)
    }
}

impl Rule for LoudnessRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Loudness
    }

    fn init(&mut self, settings: &RuleSettings) -> Result<()> {
        if self.monitor.is_some() {
            return Ok(());
        }
        let monitor = LoudnessMonitor::start(settings.input_device.as_deref(), self.meter.clone())?;
        crate::log_debug(&format!("loudness rule sampling '{}'", monitor.device_name()));
        self.monitor = Some(monitor);
        Ok(())
    }
}
