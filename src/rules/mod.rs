//! Transition rules: the predicates that decide when the avatar changes state.
//!
//! Each rule is resolved once, when the state table is loaded, from its
//! configured name into a typed [`Guard`]. The [`RuleRegistry`] owns exactly one
//! handler per rule kind and evaluates guards against it every tick.

mod command;
mod inactivity;
mod loudness;

pub use command::{parse_command, CommandListener, CommandQueue, CommandRule, COMMAND_BUFFER_BYTES};
pub use inactivity::{ClipEndSignal, InactivityRule};
pub use loudness::{LoudnessCondition, LoudnessRule, Polarity};

use crate::audio::LoudnessMeter;
use crate::log_debug;
use anyhow::Result;
use std::time::Instant;

/// Every rule the state table can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Loudness,
    Inactivity,
    Command,
}

impl RuleKind {
    pub const ALL: [RuleKind; 3] = [RuleKind::Loudness, RuleKind::Inactivity, RuleKind::Command];

    /// Canonical name used in state tables and logs.
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Loudness => "MIC",
            RuleKind::Inactivity => "Inactivity",
            RuleKind::Command => "MIDI",
        }
    }

    /// Resolve a configured rule name, accepting a few descriptive aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mic" | "loudness" => Some(RuleKind::Loudness),
            "inactivity" | "clip_end" => Some(RuleKind::Inactivity),
            "midi" | "command" => Some(RuleKind::Command),
            _ => None,
        }
    }
}

/// A rule reference with its static configuration, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Loudness(LoudnessCondition),
    Inactivity,
    Command,
}

impl Guard {
    pub fn kind(&self) -> RuleKind {
        match self {
            Guard::Loudness(_) => RuleKind::Loudness,
            Guard::Inactivity => RuleKind::Inactivity,
            Guard::Command => RuleKind::Command,
        }
    }
}

/// Position of a guard in the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardSlot {
    pub state: usize,
    pub transition: usize,
}

impl GuardSlot {
    pub fn new(state: usize, transition: usize) -> Self {
        Self { state, transition }
    }
}

/// Result of evaluating one guard for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Idle,
    Fired,
    /// Fired and carried an external video request.
    Requested(String),
}

impl RuleOutcome {
    pub fn fired(&self) -> bool {
        !matches!(self, RuleOutcome::Idle)
    }
}

/// Resources the rule initializers may acquire.
#[derive(Debug, Clone, Default)]
pub struct RuleSettings {
    pub input_device: Option<String>,
    pub listen_addr: String,
}

/// Startup hook shared by every rule handler.
pub trait Rule {
    fn kind(&self) -> RuleKind;

    /// Acquire devices or sockets and start background sampling.
    fn init(&mut self, settings: &RuleSettings) -> Result<()>;
}

/// One handler per rule kind, evaluated from the frame loop thread.
pub struct RuleRegistry {
    loudness: LoudnessRule,
    inactivity: InactivityRule,
    command: CommandRule,
}

impl RuleRegistry {
    pub fn new(meter: LoudnessMeter, clip_end: ClipEndSignal, queue: CommandQueue) -> Self {
        Self {
            loudness: LoudnessRule::new(meter),
            inactivity: InactivityRule::new(clip_end),
            command: CommandRule::new(queue),
        }
    }

    fn rule_mut(&mut self, kind: RuleKind) -> &mut dyn Rule {
        match kind {
            RuleKind::Loudness => &mut self.loudness,
            RuleKind::Inactivity => &mut self.inactivity,
            RuleKind::Command => &mut self.command,
        }
    }

    /// Run the initializer of every listed rule once.
    ///
    /// An unavailable device or port is reported and leaves that rule unable to
    /// fire; it never aborts startup. Returns the kinds that failed.
    pub fn initialize(&mut self, kinds: &[RuleKind], settings: &RuleSettings) -> Vec<RuleKind> {
        let mut failed = Vec::new();
        for &kind in kinds {
            if let Err(err) = self.rule_mut(kind).init(settings) {
                log_debug(&format!("rule {} unavailable: {err:#}", kind.name()));
                tracing::warn!(rule = kind.name(), error = %format!("{err:#}"), "rule init failed");
                eprintln!("Warning: rule {} unavailable: {err:#}", kind.name());
                failed.push(kind);
            }
        }
        failed
    }

    /// Called before evaluating the transitions of `state` for a tick.
    pub fn enter_state(&self, state: usize) {
        self.loudness.enter_state(state);
    }

    /// Evaluate the guard at `slot`; the matching handler may update its own
    /// tracking state.
    pub fn evaluate(&self, slot: GuardSlot, guard: &Guard, now: Instant) -> RuleOutcome {
        match guard {
            Guard::Loudness(condition) => {
                if self.loudness.check(slot, condition, now) {
                    RuleOutcome::Fired
                } else {
                    RuleOutcome::Idle
                }
            }
            Guard::Inactivity => {
                if self.inactivity.check() {
                    RuleOutcome::Fired
                } else {
                    RuleOutcome::Idle
                }
            }
            Guard::Command => match self.command.check() {
                Some(token) => RuleOutcome::Requested(token),
                None => RuleOutcome::Idle,
            },
        }
    }

    pub fn command_listener(&self) -> Option<&CommandListener> {
        self.command.listener()
    }
}
