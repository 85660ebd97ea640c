//! Depth-bounded trigger dispatch.

use serde::Serialize;
use tracing::debug;

use crate::core::{GameState, KernelConfig, KernelError, KernelWarning, TriggerId};
use crate::def::ValidatedGameDef;
use crate::effects::{apply_effects, EffectContext, OpBudget};
use crate::eval::{eval_condition, EvalContext};
use crate::kernel::Transition;

use super::event::TriggerEvent;

/// One entry of the trigger log, in firing order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerLogEntry {
    Fired {
        trigger: TriggerId,
        event: TriggerEvent,
        depth: usize,
    },
    /// Matching triggers were not run because the cascade hit the depth limit.
    Truncated { event: TriggerEvent, depth: usize },
}

/// Outcome of a stand-alone dispatch.
#[derive(Clone, Debug)]
pub struct DispatchResult {
    pub state: GameState,
    pub log: Vec<TriggerLogEntry>,
    pub warnings: Vec<KernelWarning>,
}

/// Fire every trigger listening for `event`, cascading depth-first.
pub fn dispatch_triggers(
    def: &ValidatedGameDef,
    state: &GameState,
    event: TriggerEvent,
) -> Result<DispatchResult, KernelError> {
    dispatch_triggers_with_config(def, state, event, &KernelConfig::default())
}

pub fn dispatch_triggers_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    event: TriggerEvent,
    config: &KernelConfig,
) -> Result<DispatchResult, KernelError> {
    let mut tx = Transition::new(def, config, state.clone());
    tx.emit(event)?;
    Ok(DispatchResult {
        state: tx.state,
        log: tx.log,
        warnings: tx.warnings,
    })
}

impl Transition<'_> {
    /// Run triggers for `events` in order. Effects a trigger emits are
    /// dispatched one level deeper before the next trigger runs.
    pub(crate) fn dispatch(
        &mut self,
        events: Vec<TriggerEvent>,
        depth: usize,
        budget: &mut OpBudget,
    ) -> Result<(), KernelError> {
        let def = self.def;
        for event in events {
            let mut listeners = def.triggers.iter().filter(|t| event.matches(&t.on)).peekable();
            if listeners.peek().is_none() {
                continue;
            }
            if depth >= self.config.max_trigger_depth {
                self.log.push(TriggerLogEntry::Truncated {
                    event: event.clone(),
                    depth,
                });
                self.warn(KernelWarning::TriggerDepthExceeded {
                    depth,
                    event: event.to_string(),
                });
                continue;
            }

            for trigger in listeners {
                let bindings = event.bindings();
                let actor = self.state.active_player();
                if let Some(when) = &trigger.when {
                    let ctx = EvalContext::new(def, &self.state, &bindings, self.config.max_query_results);
                    if !eval_condition(&ctx, when)? {
                        continue;
                    }
                }
                debug!(trigger = %trigger.id, %event, depth, "trigger fired");
                self.log.push(TriggerLogEntry::Fired {
                    trigger: trigger.id.clone(),
                    event: event.clone(),
                    depth,
                });
                let ctx = EffectContext::automatic(def, self.config, actor);
                let run = apply_effects(&ctx, self.state.clone(), &trigger.effects, bindings, budget)?;
                self.state = run.state;
                self.trace.extend(run.trace);
                self.dispatch(run.events, depth + 1, budget)?;
            }
        }
        Ok(())
    }
}
