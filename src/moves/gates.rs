//! Admission checks shared by enumeration, decision probing and apply.

use std::collections::BTreeMap;

use crate::core::{
    ActionId, EffectError, EvalError, GameState, IllegalMove, IllegalMoveReason, KernelConfig, KernelError,
    LimitScope, PlayerId, Value,
};
use crate::def::{ActionDef, ValidatedGameDef};
use crate::eval::{eval_condition, eval_query, resolve_player, resolve_players, values_equal, Bindings, EvalContext};
use crate::turn::check_card_gates;

/// Why a move did not get past a gate.
#[derive(Debug)]
pub(crate) enum Rejection {
    Illegal(IllegalMoveReason),
    Eval(EvalError),
}

impl From<IllegalMoveReason> for Rejection {
    fn from(reason: IllegalMoveReason) -> Self {
        Rejection::Illegal(reason)
    }
}

impl From<EvalError> for Rejection {
    fn from(err: EvalError) -> Self {
        Rejection::Eval(err)
    }
}

impl Rejection {
    pub(crate) fn into_error(self, action: &ActionId) -> KernelError {
        match self {
            Rejection::Illegal(reason) => IllegalMove::new(action.clone(), reason).into(),
            Rejection::Eval(err) => err.into(),
        }
    }
}

/// Outcome of a precondition check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Precondition {
    Holds,
    Fails,
    /// The condition read a name that is not bound yet.
    Deferred(String),
}

/// Phase, actor, executor, usage-limit and turn-flow gates. Returns the
/// executor on success.
pub(crate) fn admit(
    def: &ValidatedGameDef,
    state: &GameState,
    action: &ActionDef,
    actor: PlayerId,
    config: &KernelConfig,
) -> Result<PlayerId, IllegalMoveReason> {
    if !action.phases.is_empty() && !action.phases.contains(state.current_phase()) {
        return Err(IllegalMoveReason::PhaseMismatch {
            phase: state.current_phase().clone(),
        });
    }

    let bindings = Bindings::new();
    let ctx = EvalContext::new(def, state, &bindings, config.max_query_results).with_actor(actor, actor);
    let allowed = resolve_players(&ctx, &action.actor).map_or(false, |players| players.contains(&actor));
    if !allowed {
        return Err(IllegalMoveReason::ActorNotAllowed);
    }
    let executor = match &action.executor {
        Some(sel) => resolve_player(&ctx, sel).map_err(|_| IllegalMoveReason::ActorNotAllowed)?,
        None => actor,
    };

    let usage = state.usage(&action.id);
    for limit in &action.limits {
        let used = match limit.scope {
            LimitScope::Turn => usage.turn,
            LimitScope::Phase => usage.phase,
            LimitScope::Game => usage.game,
        };
        if used >= limit.max {
            return Err(IllegalMoveReason::UsageLimitExceeded { scope: limit.scope });
        }
    }

    check_card_gates(def, state, action, actor)?;
    Ok(executor)
}

/// Check declared parameters against their domains, in declaration order,
/// and bind them. Each domain sees the parameters declared before it.
pub(crate) fn bind_params(
    def: &ValidatedGameDef,
    state: &GameState,
    action: &ActionDef,
    actor: PlayerId,
    executor: PlayerId,
    params: &BTreeMap<String, Value>,
    config: &KernelConfig,
) -> Result<Bindings, Rejection> {
    let mut bindings = Bindings::new();
    for param in &action.params {
        let Some(value) = params.get(&param.name) else {
            return Err(IllegalMoveReason::IncompleteParams {
                missing: param.name.clone(),
            }
            .into());
        };
        let ctx = EvalContext::new(def, state, &bindings, config.max_query_results).with_actor(actor, executor);
        let domain = eval_query(&ctx, &param.domain)?;
        let Some(canonical) = domain.into_iter().find(|d| values_equal(d, value)) else {
            return Err(IllegalMoveReason::ParamOutOfDomain {
                param: param.name.clone(),
            }
            .into());
        };
        bindings.insert(param.name.clone(), canonical);
    }
    Ok(bindings)
}

pub(crate) fn precondition(
    def: &ValidatedGameDef,
    state: &GameState,
    action: &ActionDef,
    actor: PlayerId,
    executor: PlayerId,
    bindings: &Bindings,
    config: &KernelConfig,
) -> Result<Precondition, EvalError> {
    let Some(pre) = &action.pre else {
        return Ok(Precondition::Holds);
    };
    let ctx = EvalContext::new(def, state, bindings, config.max_query_results).with_actor(actor, executor);
    match eval_condition(&ctx, pre) {
        Ok(true) => Ok(Precondition::Holds),
        Ok(false) => Ok(Precondition::Fails),
        Err(EvalError::MissingBinding { name }) => Ok(Precondition::Deferred(name)),
        Err(err) => Err(err),
    }
}

/// The legality reason an effect failure surfaces as.
pub(crate) fn effect_rejection(err: EffectError) -> IllegalMoveReason {
    match err {
        EffectError::InvalidChoice { decision, .. } => IllegalMoveReason::InvalidChoice { decision },
        EffectError::UnresolvedChoice { decision } => IllegalMoveReason::IncompleteParams { missing: decision },
        other => IllegalMoveReason::EffectFailed {
            code: other.code(),
            detail: other.to_string(),
        },
    }
}
