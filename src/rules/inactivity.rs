use super::{Rule, RuleKind, RuleSettings};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-shot "a clip finished" flag raised by the player and consumed by the rule.
#[derive(Clone, Debug, Default)]
pub struct ClipEndSignal {
    raised: Arc<AtomicBool>,
}

impl ClipEndSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Read and clear the flag in one step.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

pub struct InactivityRule {
    signal: ClipEndSignal,
}

impl InactivityRule {
    pub fn new(signal: ClipEndSignal) -> Self {
        Self { signal }
    }

    /// Fires once per end-of-clip event.
    pub fn check(&self) -> bool {
        self.signal.take()
    }
}

impl Rule for InactivityRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Inactivity
    }

    fn init(&mut self, _settings: &RuleSettings) -> Result<()> {
        Ok(())
    }
}
