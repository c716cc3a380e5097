use super::assets::resolve_request;
use super::{StateDef, StateTable, VideoPolicy};
use crate::log_debug;
use crate::rules::{GuardSlot, RuleOutcome, RuleRegistry};
use crate::video::Selection;
use anyhow::{anyhow, Result};
use std::time::Instant;

/// Current state plus the pending external video request.
#[derive(Debug)]
pub struct StateMachine {
    table: StateTable,
    current: usize,
    fallback: usize,
    requested: Option<String>,
}

impl StateMachine {
    pub fn new(table: StateTable, initial: &str, fallback: &str) -> Result<Self> {
        let current = table
            .index_of(initial)
            .ok_or_else(|| anyhow!("initial state '{initial}' is not defined"))?;
        let fallback = table
            .index_of(fallback)
            .ok_or_else(|| anyhow!("fallback state '{fallback}' is not defined"))?;
        Ok(Self {
            table,
            current,
            fallback,
            requested: None,
        })
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    pub fn current(&self) -> &StateDef {
        &self.table.states()[self.current]
    }

    pub fn current_name(&self) -> &str {
        &self.current().name
    }

    /// Store a clip token for the next specific-policy state. Playback is not
    /// affected until such a state is entered.
    pub fn request_video(&mut self, token: impl Into<String>) {
        let token = token.into();
        log_debug(&format!("video requested: {token}"));
        self.requested = Some(token);
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// What the current state wants the player to play.
    pub fn selection(&self) -> Selection {
        let state = self.current();
        match state.policy {
            VideoPolicy::Random => Selection::Random(state.assets.clone()),
            VideoPolicy::Specific => match &self.requested {
                Some(token) => Selection::Specific(resolve_request(&state.assets, token)),
                None => {
                    log_debug(&format!("state '{}' has no requested video", state.name));
                    Selection::Nothing
                }
            },
        }
    }

    /// Evaluate the current state's transitions in order.
    ///
    /// The first transition whose rule fires wins and the rest are skipped for
    /// this tick. Returns the new state's selection when a switch happened.
    pub fn tick(&mut self, rules: &RuleRegistry, now: Instant) -> Option<Selection> {
        let mut fired = None;
        rules.enter_state(self.current);
        for (idx, transition) in self.table.states()[self.current].transitions.iter().enumerate() {
            match rules.evaluate(GuardSlot::new(self.current, idx), &transition.guard, now) {
                RuleOutcome::Idle => continue,
                RuleOutcome::Fired => {
                    fired = Some((transition.target.clone(), None));
                }
                RuleOutcome::Requested(token) => {
                    fired = Some((transition.target.clone(), Some(token)));
                }
            }
            break;
        }

        let (target, token) = fired?;
        if let Some(token) = token {
            self.request_video(token);
        }
        Some(self.switch_state(&target))
    }

    /// Enter `name` and return what to play there.
    ///
    /// Unknown names fall back to the fallback state with a random pick from its
    /// clips, whatever its own policy.
    pub fn switch_state(&mut self, name: &str) -> Selection {
        let from = self.current().name.clone();
        match self.table.index_of(name) {
            Some(idx) => {
                self.current = idx;
                log_debug(&format!("Switching to state: {name}"));
                tracing::info!(from = %from, to = %name, "state switch");
                self.selection()
            }
            None => {
                self.current = self.fallback;
                let state = self.current();
                log_debug(&format!(
                    "Unknown state '{name}', falling back to '{}'",
                    state.name
                ));
                tracing::warn!(from = %from, requested = %name, to = %state.name, "unknown state, using fallback");
                Selection::Random(state.assets.clone())
            }
        }
    }
}
