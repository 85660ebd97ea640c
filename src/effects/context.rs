//! Effect execution context.
//!
//! The mode is fixed when a context is built: `execution` contexts fail on
//! anything unresolved, `discovery` contexts stop at the first unresolved
//! choice or unbound name and report it. There is no way to switch a
//! context between modes after construction.

use std::collections::BTreeMap;

use crate::core::{KernelConfig, PlayerId, Value};
use crate::def::ValidatedGameDef;

static NO_DECISIONS: BTreeMap<String, Value> = BTreeMap::new();

/// How the interpreter treats unresolved decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectMode {
    /// Apply for real; an unresolved decision is an error.
    Execution,
    /// Probe on a scratch state; an unresolved decision suspends the run.
    Discovery,
}

/// Everything an effect program reads besides the state it mutates.
#[derive(Clone, Copy)]
pub struct EffectContext<'a> {
    def: &'a ValidatedGameDef,
    config: &'a KernelConfig,
    mode: EffectMode,
    actor: PlayerId,
    executor: PlayerId,
    decisions: &'a BTreeMap<String, Value>,
    interactive: bool,
}

impl<'a> EffectContext<'a> {
    /// Context for applying an action with its decisions filled in.
    #[must_use]
    pub fn execution(
        def: &'a ValidatedGameDef,
        config: &'a KernelConfig,
        actor: PlayerId,
        executor: PlayerId,
        decisions: &'a BTreeMap<String, Value>,
    ) -> Self {
        Self {
            def,
            config,
            mode: EffectMode::Execution,
            actor,
            executor,
            decisions,
            interactive: true,
        }
    }

    /// Context for probing an action with a partial set of decisions.
    #[must_use]
    pub fn discovery(
        def: &'a ValidatedGameDef,
        config: &'a KernelConfig,
        actor: PlayerId,
        executor: PlayerId,
        decisions: &'a BTreeMap<String, Value>,
    ) -> Self {
        Self {
            mode: EffectMode::Discovery,
            ..Self::execution(def, config, actor, executor, decisions)
        }
    }

    /// Execution context for setup, phase hooks and triggers. Choices are
    /// rejected.
    #[must_use]
    pub fn automatic(def: &'a ValidatedGameDef, config: &'a KernelConfig, actor: PlayerId) -> Self {
        Self {
            interactive: false,
            ..Self::execution(def, config, actor, actor, &NO_DECISIONS)
        }
    }

    #[must_use]
    pub fn def(&self) -> &'a ValidatedGameDef {
        self.def
    }

    #[must_use]
    pub fn config(&self) -> &'a KernelConfig {
        self.config
    }

    #[must_use]
    pub fn mode(&self) -> EffectMode {
        self.mode
    }

    #[must_use]
    pub fn is_discovery(&self) -> bool {
        self.mode == EffectMode::Discovery
    }

    #[must_use]
    pub fn actor(&self) -> PlayerId {
        self.actor
    }

    #[must_use]
    pub fn executor(&self) -> PlayerId {
        self.executor
    }

    /// Whether choice nodes may run.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// The value supplied for a decision key, if any.
    #[must_use]
    pub fn decision(&self, key: &str) -> Option<&'a Value> {
        self.decisions.get(key)
    }
}
