//! Move application and auto-advance to the next decision point.

use tracing::debug;

use crate::core::{
    EffectError, GameState, IllegalMove, IllegalMoveReason, KernelConfig, KernelError, KernelWarning, Move,
    PlayerId, UsageCounts,
};
use crate::def::ValidatedGameDef;
use crate::effects::{apply_action_effects, EffectContext, EffectOutcome, OpBudget};
use crate::moves::{admit, bind_params, effect_rejection, has_legal_move, precondition, Precondition};
use crate::triggers::TriggerEvent;
use crate::turn::{check_monsoon_caps, decision_player, SimultaneousRuntime, TurnOrderRuntime};

use super::terminal::terminal_result_with_config;
use super::{ApplyResult, Transition};

/// Apply a complete move for the player the kernel is waiting on.
///
/// Fails with `ILLEGAL_MOVE` (and leaves nothing changed) when any gate
/// rejects the move. On success the phase is advanced until some player has
/// a legal move or the game is over.
pub fn apply_move(def: &ValidatedGameDef, state: &GameState, mv: &Move) -> Result<ApplyResult, KernelError> {
    apply_move_with_config(def, state, mv, &KernelConfig::default())
}

pub fn apply_move_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    mv: &Move,
    config: &KernelConfig,
) -> Result<ApplyResult, KernelError> {
    if terminal_result_with_config(def, state, config)?.is_some() {
        return Err(IllegalMove::new(mv.action.clone(), IllegalMoveReason::GameOver).into());
    }
    let player = decision_player(state);
    debug!(%mv, %player, turn = state.turn_count(), "applying move");

    let mut tx = Transition::new(def, config, state.clone());
    if state.turn_order().as_simultaneous().is_some() {
        tx.submit(mv, player)?;
    } else {
        tx.run_move(mv, player)?;
    }
    tx.advance_to_decision_point()?;
    tx.finish()
}

/// Advance phases until the decision player has a legal move or the game
/// is over.
pub fn advance_to_decision_point(def: &ValidatedGameDef, state: &GameState) -> Result<ApplyResult, KernelError> {
    advance_to_decision_point_with_config(def, state, &KernelConfig::default())
}

pub fn advance_to_decision_point_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    config: &KernelConfig,
) -> Result<ApplyResult, KernelError> {
    let mut tx = Transition::new(def, config, state.clone());
    tx.advance_to_decision_point()?;
    tx.finish()
}

fn illegal(mv: &Move, reason: IllegalMoveReason) -> KernelError {
    IllegalMove::new(mv.action.clone(), reason).into()
}

impl Transition<'_> {
    /// Validate and execute one move as `actor`: gates, usage, cost and
    /// effects, triggers, then the turn-flow bookkeeping.
    pub(crate) fn run_move(&mut self, mv: &Move, actor: PlayerId) -> Result<(), KernelError> {
        let def = self.def;
        let config = self.config;
        let before = self.state.clone();

        let action = def
            .action(&mv.action)
            .ok_or_else(|| illegal(mv, IllegalMoveReason::UnknownAction))?;
        let executor = admit(def, &before, action, actor, config).map_err(|r| illegal(mv, r))?;
        let bindings = bind_params(def, &before, action, actor, executor, &mv.params, config)
            .map_err(|r| r.into_error(&action.id))?;
        check_monsoon_caps(def, &before, action, &mv.params).map_err(|r| illegal(mv, r))?;
        let deferred = match precondition(def, &before, action, actor, executor, &bindings, config)? {
            Precondition::Holds => false,
            Precondition::Fails => return Err(illegal(mv, IllegalMoveReason::PredicateFailed)),
            Precondition::Deferred(_) => true,
        };

        let table = self.table();
        let usage = before.usage(&action.id);
        self.state.set_usage(
            table,
            &action.id,
            UsageCounts {
                turn: usage.turn + 1,
                phase: usage.phase + 1,
                game: usage.game + 1,
            },
        );

        let ctx = EffectContext::execution(def, config, actor, executor, &mv.params);
        let mut budget = OpBudget::new(config.max_effect_ops);
        let run = match apply_action_effects(&ctx, self.state.clone(), action, bindings, &mut budget) {
            Ok(run) => run,
            Err(err @ EffectError::BudgetExceeded { .. }) => return Err(err.into()),
            Err(err) => return Err(illegal(mv, effect_rejection(err))),
        };
        match &run.outcome {
            EffectOutcome::Completed => {}
            EffectOutcome::Pending(choice) => {
                return Err(illegal(
                    mv,
                    IllegalMoveReason::IncompleteParams {
                        missing: choice.decision.clone(),
                    },
                ))
            }
            EffectOutcome::Deferred { binding } => {
                return Err(illegal(
                    mv,
                    IllegalMoveReason::IncompleteParams {
                        missing: binding.clone(),
                    },
                ))
            }
        }
        if deferred {
            match precondition(def, &before, action, actor, executor, &run.bindings, config)? {
                Precondition::Holds => {}
                Precondition::Fails => return Err(illegal(mv, IllegalMoveReason::PredicateFailed)),
                Precondition::Deferred(missing) => {
                    return Err(illegal(mv, IllegalMoveReason::IncompleteParams { missing }))
                }
            }
        }

        self.state = run.state;
        self.trace.extend(run.trace);
        self.dispatch(run.events, 0, &mut budget)?;
        debug!(action = %action.id, %actor, ops = budget.used(), "move resolved");
        self.emit(TriggerEvent::ActionResolved {
            action: action.id.clone(),
            actor,
        })?;
        self.on_action_resolved(action, actor)
    }

    /// Buffer a simultaneous submission after checking it against the
    /// current state. Once every seat has submitted, the buffer resolves.
    fn submit(&mut self, mv: &Move, player: PlayerId) -> Result<(), KernelError> {
        let Some(mut rt) = self.state.turn_order().as_simultaneous().cloned() else {
            return self.run_move(mv, player);
        };
        if rt.has_submitted(player) {
            return Err(illegal(mv, IllegalMoveReason::AlreadySubmitted));
        }
        let mut probe = Transition::new(self.def, self.config, self.state.clone());
        probe.run_move(mv, player)?;

        rt.submitted |= player.bit();
        rt.pending.push((player, mv.clone()));
        debug!(%player, %mv, "move submitted");
        self.record_submission(rt)
    }

    /// Mark a seat with nothing to submit as done.
    fn skip_submission(&mut self, player: PlayerId) -> Result<(), KernelError> {
        let Some(mut rt) = self.state.turn_order().as_simultaneous().cloned() else {
            return Ok(());
        };
        rt.submitted |= player.bit();
        debug!(%player, "seat has no legal move, submission skipped");
        self.record_submission(rt)
    }

    /// Store the buffer and hand the seat to the next submitter, or resolve
    /// once nobody is left.
    fn record_submission(&mut self, rt: SimultaneousRuntime) -> Result<(), KernelError> {
        let next = rt.next_to_submit(self.state.player_count());
        let table = self.table();
        self.state.set_turn_order(table, TurnOrderRuntime::Simultaneous(rt));
        match next {
            Some(seat) => {
                self.state.set_active_player(table, seat);
                Ok(())
            }
            None => self.resolve_submissions(),
        }
    }

    /// Run buffered submissions in seat order, dropping any that stopped
    /// being legal, then advance the phase.
    fn resolve_submissions(&mut self) -> Result<(), KernelError> {
        let mut pending = self
            .state
            .turn_order()
            .as_simultaneous()
            .map(|rt| rt.pending.clone())
            .unwrap_or_default();
        pending.sort_by_key(|(player, _)| *player);

        for (player, mv) in pending {
            let snapshot = self.state.clone();
            let (log, warnings, trace) = (self.log.len(), self.warnings.len(), self.trace.len());
            let table = self.table();
            self.state.set_active_player(table, player);
            if let Err(err) = self.run_move(&mv, player) {
                self.state = snapshot;
                self.log.truncate(log);
                self.warnings.truncate(warnings);
                self.trace.truncate(trace);
                let code = err.illegal_reason().map_or_else(|| err.code(), |r| r.code());
                self.warn(KernelWarning::SubmissionDropped {
                    player,
                    action: mv.action.clone(),
                    code,
                });
            }
        }
        self.advance_phase()
    }

    pub(crate) fn advance_to_decision_point(&mut self) -> Result<(), KernelError> {
        let limit = self.config.max_auto_advances;
        let mut advances = 0;
        loop {
            if terminal_result_with_config(self.def, &self.state, self.config)?.is_some() {
                debug!(turn = self.state.turn_count(), "game over");
                return Ok(());
            }
            if has_legal_move(self.def, &self.state, self.config) {
                return Ok(());
            }
            if advances == limit {
                self.warn(KernelWarning::AutoAdvanceBudget { limit });
                return Ok(());
            }
            advances += 1;

            let pending_seat = self
                .state
                .turn_order()
                .as_simultaneous()
                .and_then(|rt| rt.next_to_submit(self.state.player_count()));
            match pending_seat {
                Some(player) => self.skip_submission(player)?,
                None => self.advance_phase()?,
            }
        }
    }
}
