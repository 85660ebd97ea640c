//! Evaluation context.

use im::OrdMap;

use crate::core::{GameState, PlayerId, Value};
use crate::def::ValidatedGameDef;

/// Names bound by parameters, choices and iteration. Persistent, so nested
/// scopes extend a parent in O(log n) without copying it.
pub type Bindings = OrdMap<String, Value>;

/// Everything a pure evaluation reads.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub def: &'a ValidatedGameDef,
    pub state: &'a GameState,
    /// The player taking the action (the active player outside actions).
    pub actor: PlayerId,
    /// The player the action's effects run as.
    pub executor: PlayerId,
    pub bindings: &'a Bindings,
    pub max_query_results: usize,
}

impl<'a> EvalContext<'a> {
    /// Context with actor and executor set to the active player.
    #[must_use]
    pub fn new(
        def: &'a ValidatedGameDef,
        state: &'a GameState,
        bindings: &'a Bindings,
        max_query_results: usize,
    ) -> Self {
        Self {
            def,
            state,
            actor: state.active_player(),
            executor: state.active_player(),
            bindings,
            max_query_results,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor: PlayerId, executor: PlayerId) -> Self {
        self.actor = actor;
        self.executor = executor;
        self
    }

    /// The same context reading a different binding scope.
    #[must_use]
    pub fn with_bindings<'b>(&self, bindings: &'b Bindings) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            def: self.def,
            state: self.state,
            actor: self.actor,
            executor: self.executor,
            bindings,
            max_query_results: self.max_query_results,
        }
    }
}
