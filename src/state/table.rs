//! State definitions: built-in table and YAML loading.

use crate::config::LoudnessPresets;
use crate::log_debug;
use crate::rules::{Guard, LoudnessCondition, Polarity, RuleKind};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// How a state picks the clip it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPolicy {
    /// Uniformly from the state's own asset directory.
    #[default]
    Random,
    /// The clip named by the last external request.
    Specific,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub target: String,
    pub guard: Guard,
}

impl Transition {
    pub fn new(target: impl Into<String>, guard: Guard) -> Self {
        Self {
            target: target.into(),
            guard,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateDef {
    pub name: String,
    pub policy: VideoPolicy,
    /// Candidate clips, filled by the asset scan.
    pub assets: Vec<PathBuf>,
    /// Evaluated in declaration order.
    pub transitions: Vec<Transition>,
}

impl StateDef {
    pub fn new(name: impl Into<String>, policy: VideoPolicy, transitions: Vec<Transition>) -> Self {
        Self {
            name: name.into(),
            policy,
            assets: Vec::new(),
            transitions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateTable {
    states: Vec<StateDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    states: Vec<RawState>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawState {
    name: String,
    #[serde(default)]
    policy: VideoPolicy,
    #[serde(default)]
    transitions: Vec<RawTransition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTransition {
    target: String,
    rule: String,
    #[serde(default)]
    config: Option<RawCondition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCondition {
    threshold: f32,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    polarity: Polarity,
}

impl RawTransition {
    fn resolve(self, state: &str) -> Result<Transition> {
        let kind = RuleKind::from_name(&self.rule).ok_or_else(|| {
            anyhow!(
                "state '{state}': unknown rule '{}' (expected MIC, Inactivity or MIDI)",
                self.rule
            )
        })?;
        let guard = match kind {
            RuleKind::Loudness => {
                let Some(cfg) = self.config else {
                    bail!(
                        "state '{state}': {} transition to '{}' needs a config with a threshold",
                        kind.name(),
                        self.target
                    );
                };
                if !cfg.threshold.is_finite() || cfg.threshold < 0.0 {
                    bail!("state '{state}': loudness threshold must be a non-negative number");
                }
                if !cfg.duration.is_finite() || cfg.duration < 0.0 {
                    bail!("state '{state}': loudness duration must be a non-negative number");
                }
                Guard::Loudness(LoudnessCondition::new(cfg.threshold, cfg.duration, cfg.polarity))
            }
            RuleKind::Inactivity | RuleKind::Command => {
                if self.config.is_some() {
                    log_debug(&format!(
                        "state '{state}': ignoring config on {} transition",
                        kind.name()
                    ));
                }
                if kind == RuleKind::Inactivity {
                    Guard::Inactivity
                } else {
                    Guard::Command
                }
            }
        };
        Ok(Transition::new(self.target, guard))
    }
}

impl StateTable {
    /// Idle / Talking / Emotes: talk on noise, fall silent back to idle, and play
    /// requested emotes until they finish.
    pub fn builtin(presets: &LoudnessPresets) -> Self {
        let noise = LoudnessCondition::new(
            presets.noise_threshold,
            presets.noise_duration_secs,
            Polarity::Above,
        );
        let silence = LoudnessCondition::new(
            presets.silence_threshold,
            presets.silence_duration_secs,
            Polarity::Below,
        );
        Self {
            states: vec![
                StateDef::new(
                    "Idle",
                    VideoPolicy::Random,
                    vec![
                        Transition::new("Talking", Guard::Loudness(noise)),
                        Transition::new("Emotes", Guard::Command),
                    ],
                ),
                StateDef::new(
                    "Talking",
                    VideoPolicy::Random,
                    vec![Transition::new("Idle", Guard::Loudness(silence))],
                ),
                StateDef::new(
                    "Emotes",
                    VideoPolicy::Specific,
                    vec![Transition::new("Idle", Guard::Inactivity)],
                ),
            ],
        }
    }

    /// Build a table from already-resolved states.
    ///
    /// Names must be unique and non-empty. Transitions to unknown states are kept
    /// and resolved through the fallback state when they fire.
    pub fn from_states(states: Vec<StateDef>) -> Result<Self> {
        if states.is_empty() {
            bail!("state table defines no states");
        }
        let mut seen = HashSet::new();
        for state in &states {
            if state.name.trim().is_empty() {
                bail!("state table contains a state without a name");
            }
            if !seen.insert(state.name.as_str()) {
                bail!("state '{}' is defined more than once", state.name);
            }
        }
        for state in &states {
            for transition in &state.transitions {
                if !seen.contains(transition.target.as_str()) {
                    log_debug(&format!(
                        "state '{}' has a transition to unknown state '{}'",
                        state.name, transition.target
                    ));
                    tracing::warn!(
                        state = %state.name,
                        target = %transition.target,
                        "transition targets unknown state"
                    );
                }
            }
        }
        Ok(Self { states })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let raw: RawTable = serde_yaml::from_str(text).context("invalid state table")?;
        let states = raw
            .states
            .into_iter()
            .map(|state| {
                let transitions = state
                    .transitions
                    .into_iter()
                    .map(|transition| transition.resolve(&state.name))
                    .collect::<Result<Vec<_>>>()?;
                Ok(StateDef::new(state.name, state.policy, transitions))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_states(states)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read state table {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("failed to load state table {}", path.display()))
    }

    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut [StateDef] {
        &mut self.states
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|state| state.name == name)
    }

    /// Rule kinds referenced by any transition, in registry order.
    pub fn rule_kinds(&self) -> Vec<RuleKind> {
        RuleKind::ALL
            .into_iter()
            .filter(|kind| {
                self.states
                    .iter()
                    .flat_map(|state| &state.transitions)
                    .any(|transition| transition.guard.kind() == *kind)
            })
            .collect()
    }
}
