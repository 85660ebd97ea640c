//! Kernel entry points: initial state, move application, phase auto-advance
//! and terminal detection.
//!
//! Every entry point is a pure function of its inputs. The state passed in
//! is never modified; a new state comes back in an [`ApplyResult`] together
//! with the trigger log and any budget warnings raised on the way.

mod apply;
mod init;
mod terminal;
mod transition;

pub use apply::{
    advance_to_decision_point, advance_to_decision_point_with_config, apply_move, apply_move_with_config,
};
pub use init::{initial_state, initial_state_with_config};
pub use terminal::{terminal_result, terminal_result_with_config, TerminalResult};

pub(crate) use transition::Transition;

use crate::core::{GameState, KernelError, KernelWarning};
use crate::def::ValidatedGameDef;
use crate::effects::EffectTraceEntry;
use crate::hash::compute_full_hash;
use crate::triggers::TriggerLogEntry;

/// The outcome of a state transition.
#[derive(Clone, Debug)]
pub struct ApplyResult {
    pub state: GameState,
    /// Triggers fired, in firing order.
    pub trigger_firings: Vec<TriggerLogEntry>,
    pub warnings: Vec<KernelWarning>,
    /// Executed effects, when `collect_effect_trace` is on.
    pub trace: Vec<EffectTraceEntry>,
}

/// Recompute the state hash from scratch and compare it with the
/// incrementally maintained one.
pub fn verify_state_hash(def: &ValidatedGameDef, state: &GameState) -> Result<(), KernelError> {
    let full = compute_full_hash(def.zobrist(), state);
    let incremental = state.state_hash();
    if full != incremental {
        return Err(KernelError::HashMismatch { incremental, full });
    }
    Ok(())
}
