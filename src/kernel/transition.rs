//! Accumulator threaded through one kernel transition.
//!
//! Move application, phase advance and trigger dispatch all work on a
//! `Transition`: the state being built plus the trigger log, warnings and
//! effect trace collected on the way.

use crate::ast::Effect;
use crate::core::{GameState, KernelConfig, KernelError, KernelWarning, PlayerId};
use crate::def::ValidatedGameDef;
use crate::effects::{apply_effects, EffectContext, EffectTraceEntry, OpBudget};
use crate::eval::Bindings;
use crate::hash::ZobristTable;
use crate::triggers::{TriggerEvent, TriggerLogEntry};

use super::{verify_state_hash, ApplyResult};

pub(crate) struct Transition<'d> {
    pub(crate) def: &'d ValidatedGameDef,
    pub(crate) config: &'d KernelConfig,
    pub(crate) state: GameState,
    pub(crate) log: Vec<TriggerLogEntry>,
    pub(crate) warnings: Vec<KernelWarning>,
    pub(crate) trace: Vec<EffectTraceEntry>,
}

impl<'d> Transition<'d> {
    pub(crate) fn new(def: &'d ValidatedGameDef, config: &'d KernelConfig, state: GameState) -> Self {
        Self {
            def,
            config,
            state,
            log: Vec::new(),
            warnings: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub(crate) fn table(&self) -> &'d ZobristTable {
        self.def.zobrist()
    }

    /// Run a non-interactive program as `actor`, then dispatch what it
    /// emitted. The program and its trigger cascade share one budget.
    pub(crate) fn run_automatic(
        &mut self,
        effects: &[Effect],
        actor: PlayerId,
        bindings: Bindings,
    ) -> Result<(), KernelError> {
        if effects.is_empty() {
            return Ok(());
        }
        let ctx = EffectContext::automatic(self.def, self.config, actor);
        let mut budget = OpBudget::new(self.config.max_effect_ops);
        let run = apply_effects(&ctx, self.state.clone(), effects, bindings, &mut budget)?;
        self.state = run.state;
        self.trace.extend(run.trace);
        self.dispatch(run.events, 0, &mut budget)
    }

    /// Dispatch one kernel-raised event with a fresh budget.
    pub(crate) fn emit(&mut self, event: TriggerEvent) -> Result<(), KernelError> {
        let mut budget = OpBudget::new(self.config.max_effect_ops);
        self.dispatch(vec![event], 0, &mut budget)
    }

    pub(crate) fn warn(&mut self, warning: KernelWarning) {
        tracing::warn!(code = warning.code(), ?warning, "kernel budget warning");
        self.warnings.push(warning);
    }

    /// Check the incremental hash (when configured) and hand back the result.
    pub(crate) fn finish(self) -> Result<ApplyResult, KernelError> {
        if self.config.verify_incremental_hash {
            verify_state_hash(self.def, &self.state)?;
        }
        Ok(ApplyResult {
            state: self.state,
            trigger_firings: self.log,
            warnings: self.warnings,
            trace: self.trace,
        })
    }
}
