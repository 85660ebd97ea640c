//! Incremental decision resolution.
//!
//! A move's program may ask questions (`chooseOne`, `chooseN`) whose answers
//! go into `Move::params` under the choice's decision key. `legal_choices`
//! reports the next unanswered question with each option labelled; the
//! sequence helpers answer questions one at a time until the move is
//! complete or shown illegal.

use tracing::debug;

use crate::core::{GameState, IllegalMoveReason, KernelConfig, KernelError, KernelWarning, Move, Rng, Value};
use crate::def::ValidatedGameDef;
use crate::effects::{ChoiceKind, PendingChoice};
use crate::kernel::terminal_result_with_config;
use crate::moves::{Probe, Prober, Rejection};

/// Where a partial move stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChoiceRequest {
    /// The next decision to answer.
    Pending(PendingChoice),
    /// Every decision is answered and the move is legal.
    Complete(Move),
    Illegal(IllegalMoveReason),
    /// Every decision is answered, but the deferral budget ran out before
    /// the precondition was rechecked. A `DeferredPredicateBudget` warning
    /// accompanies it.
    Unsettled(Move),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceReport {
    pub request: ChoiceRequest,
    pub warnings: Vec<KernelWarning>,
}

/// The result of driving a move through its decisions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionResolution {
    /// `Complete` with the filled-in move, `Illegal`, or the last `Pending`
    /// request when the step budget ran out.
    pub request: ChoiceRequest,
    /// Choice requests issued.
    pub steps: usize,
    pub warnings: Vec<KernelWarning>,
}

/// Report the next decision of a partial move.
pub fn legal_choices(def: &ValidatedGameDef, state: &GameState, partial: &Move) -> Result<ChoiceReport, KernelError> {
    legal_choices_with_config(def, state, partial, &KernelConfig::default())
}

pub fn legal_choices_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    partial: &Move,
    config: &KernelConfig,
) -> Result<ChoiceReport, KernelError> {
    let mut prober = Prober::new(def, config);
    let request = next_request(&mut prober, def, state, partial, config)?;
    Ok(ChoiceReport {
        request,
        warnings: prober.warnings,
    })
}

fn next_request(
    prober: &mut Prober<'_>,
    def: &ValidatedGameDef,
    state: &GameState,
    partial: &Move,
    config: &KernelConfig,
) -> Result<ChoiceRequest, KernelError> {
    if terminal_result_with_config(def, state, config)?.is_some() {
        return Ok(ChoiceRequest::Illegal(IllegalMoveReason::GameOver));
    }
    let cand = match prober.prepare(state, partial) {
        Ok(cand) => cand,
        Err(Rejection::Illegal(reason)) => return Ok(ChoiceRequest::Illegal(reason)),
        Err(Rejection::Eval(err)) => return Err(err.into()),
    };
    Ok(match prober.probe(state, &cand, &partial.params)? {
        Probe::Illegal(reason) => ChoiceRequest::Illegal(reason),
        Probe::Complete => ChoiceRequest::Complete(partial.clone()),
        Probe::Unsettled => ChoiceRequest::Unsettled(partial.clone()),
        Probe::Pending(choice) => ChoiceRequest::Pending(prober.annotate(state, &cand, &partial.params, choice)),
    })
}

/// Answer decisions with `choose` until the move completes or fails.
///
/// A `None` from `choose` rejects the move with `InvalidChoice`. Past
/// `max_decision_probe_steps` requests the last pending request is returned
/// with a `DecisionProbeBudget` warning.
pub fn resolve_move_decision_sequence<F>(
    def: &ValidatedGameDef,
    state: &GameState,
    base: &Move,
    choose: F,
) -> Result<DecisionResolution, KernelError>
where
    F: FnMut(&PendingChoice) -> Option<Value>,
{
    resolve_move_decision_sequence_with_config(def, state, base, choose, &KernelConfig::default())
}

pub fn resolve_move_decision_sequence_with_config<F>(
    def: &ValidatedGameDef,
    state: &GameState,
    base: &Move,
    mut choose: F,
    config: &KernelConfig,
) -> Result<DecisionResolution, KernelError>
where
    F: FnMut(&PendingChoice) -> Option<Value>,
{
    let mut prober = Prober::new(def, config);
    let mut mv = base.clone();
    let mut steps = 0;
    let mut last = None;

    let request = loop {
        if steps >= config.max_decision_probe_steps {
            prober.warnings.push(KernelWarning::DecisionProbeBudget {
                action: mv.action.clone(),
                limit: config.max_decision_probe_steps,
            });
            match last {
                Some(pending) => break pending,
                None => {
                    break ChoiceRequest::Illegal(IllegalMoveReason::IncompleteParams {
                        missing: mv.action.to_string(),
                    })
                }
            }
        }
        steps += 1;
        let choice = match next_request(&mut prober, def, state, &mv, config)? {
            ChoiceRequest::Pending(choice) => choice,
            done => break done,
        };
        let Some(answer) = choose(&choice) else {
            break ChoiceRequest::Illegal(IllegalMoveReason::InvalidChoice {
                decision: choice.decision,
            });
        };
        debug!(decision = %choice.decision, %answer, "decision answered");
        mv.params.insert(choice.decision.clone(), answer);
        last = Some(ChoiceRequest::Pending(choice));
    };

    Ok(DecisionResolution {
        request,
        steps,
        warnings: prober.warnings,
    })
}

/// The first viable answer: the first option for `chooseOne`, the first
/// `min` options for `chooseN`.
#[must_use]
pub fn default_choice(choice: &PendingChoice) -> Option<Value> {
    let mut viable = choice.viable_options().map(|o| o.value.clone());
    match choice.kind {
        ChoiceKind::ChooseOne => viable.next(),
        ChoiceKind::ChooseN { min, .. } => {
            let picked: Vec<Value> = viable.take(min).collect();
            (picked.len() == min).then_some(Value::List(picked))
        }
    }
}

/// Fill in a template move with random viable answers.
///
/// Returns the resolution and the advanced generator.
pub fn complete_template_move(
    def: &ValidatedGameDef,
    state: &GameState,
    template: &Move,
    rng: Rng,
) -> Result<(DecisionResolution, Rng), KernelError> {
    complete_template_move_with_config(def, state, template, rng, &KernelConfig::default())
}

pub fn complete_template_move_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    template: &Move,
    rng: Rng,
    config: &KernelConfig,
) -> Result<(DecisionResolution, Rng), KernelError> {
    let mut rng = rng;
    let resolution = resolve_move_decision_sequence_with_config(
        def,
        state,
        template,
        |choice| {
            let (answer, next) = random_choice(choice, rng)?;
            rng = next;
            Some(answer)
        },
        config,
    )?;
    Ok((resolution, rng))
}

fn random_choice(choice: &PendingChoice, rng: Rng) -> Option<(Value, Rng)> {
    let mut viable: Vec<Value> = choice.viable_options().map(|o| o.value.clone()).collect();
    match choice.kind {
        ChoiceKind::ChooseOne => {
            if viable.is_empty() {
                return None;
            }
            let (index, rng) = rng.next_int(0, viable.len() as i64 - 1).ok()?;
            Some((viable.swap_remove(index as usize), rng))
        }
        ChoiceKind::ChooseN { min, max } => {
            if viable.len() < min {
                return None;
            }
            let upper = max.min(viable.len());
            let (size, rng) = rng.next_int(min as i64, upper as i64).ok()?;
            let rng = rng.shuffle(&mut viable);
            viable.truncate(size as usize);
            Some((Value::List(viable), rng))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, Effect, Query, ValueExpr};
    use crate::core::{PhaseId, VarValue};
    use crate::def::{validate_game_def, ActionDef, GameDef, VarDef};
    use crate::effects::OptionLegality;
    use crate::turn::TurnOrderRuntime;

    fn fixture() -> (ValidatedGameDef, GameState) {
        let mut def = GameDef::new("decisions", 2, 2);
        def.global_vars = vec![VarDef::int("aid", 0)];
        def.actions = vec![ActionDef::new("levy").with_effects(vec![
            Effect::choose_one("$kind", Query::enums(["gold", "men"])),
            Effect::ChooseN {
                bind: "$towns".into(),
                decision_id: None,
                options: Query::range(1, 4),
                min: ValueExpr::int(1),
                max: ValueExpr::int(2),
            },
            Effect::add_global("aid", 1),
        ])];
        let def = validate_game_def(def).unwrap();
        let table = *def.zobrist();
        let mut state = GameState::new(&table, 2, PhaseId::new("main"), TurnOrderRuntime::RoundRobin, Rng::new(9));
        state.set_global_var(&table, "aid", VarValue::Int(0));
        (def, state)
    }

    #[test]
    fn test_legal_choices_reports_first_decision() {
        let (def, state) = fixture();
        let report = legal_choices(&def, &state, &Move::new("levy")).unwrap();
        let ChoiceRequest::Pending(choice) = report.request else {
            panic!("expected a pending choice");
        };
        assert_eq!(choice.decision, "$kind");
        assert!(choice.options.iter().all(|o| o.legality == OptionLegality::Legal));
    }

    #[test]
    fn test_default_sequence_completes() {
        let (def, state) = fixture();
        let resolution = resolve_move_decision_sequence(&def, &state, &Move::new("levy"), default_choice).unwrap();
        let expected = Move::new("levy")
            .with_param("$kind", Value::from("gold"))
            .with_param("$towns", Value::List(vec![Value::Int(1)]));
        assert_eq!(resolution.request, ChoiceRequest::Complete(expected));
        assert_eq!(resolution.steps, 3);
    }

    #[test]
    fn test_declined_choice_is_illegal() {
        let (def, state) = fixture();
        let resolution = resolve_move_decision_sequence(&def, &state, &Move::new("levy"), |_| None).unwrap();
        assert_eq!(
            resolution.request,
            ChoiceRequest::Illegal(IllegalMoveReason::InvalidChoice {
                decision: "$kind".into()
            })
        );
    }

    #[test]
    fn test_step_budget_returns_last_pending() {
        let (def, state) = fixture();
        let config = KernelConfig::default().with_max_decision_probe_steps(1);
        let resolution =
            resolve_move_decision_sequence_with_config(&def, &state, &Move::new("levy"), default_choice, &config)
                .unwrap();
        assert!(matches!(resolution.request, ChoiceRequest::Pending(_)));
        assert_eq!(resolution.warnings[0].code(), "BUDGET_DECISION_PROBE_STEPS");
    }

    #[test]
    fn test_spent_deferral_budget_leaves_move_unsettled() {
        let mut def = GameDef::new("odds", 2, 2);
        def.actions = vec![ActionDef::new("pick")
            .with_pre(Condition::eq(ValueExpr::binding("$n"), ValueExpr::int(2)))
            .with_effects(vec![Effect::choose_one("$n", Query::range(1, 3))])];
        let def = validate_game_def(def).unwrap();
        let table = *def.zobrist();
        let state = GameState::new(&table, 2, PhaseId::new("main"), TurnOrderRuntime::RoundRobin, Rng::new(1));
        let odd = Move::new("pick").with_param("$n", Value::Int(3));

        let report = legal_choices(&def, &state, &odd).unwrap();
        assert_eq!(report.request, ChoiceRequest::Illegal(IllegalMoveReason::PredicateFailed));

        let config = KernelConfig::default().with_max_deferred_predicates(0);
        let report = legal_choices_with_config(&def, &state, &odd, &config).unwrap();
        assert_eq!(report.request, ChoiceRequest::Unsettled(odd));
        assert_eq!(report.warnings[0].code(), "BUDGET_DEFERRED_PREDICATES");
    }

    #[test]
    fn test_random_completion_is_deterministic() {
        let (def, state) = fixture();
        let (a, rng_a) = complete_template_move(&def, &state, &Move::new("levy"), Rng::new(4)).unwrap();
        let (b, rng_b) = complete_template_move(&def, &state, &Move::new("levy"), Rng::new(4)).unwrap();
        assert_eq!(a, b);
        assert_eq!(rng_a, rng_b);
        let ChoiceRequest::Complete(mv) = a.request else {
            panic!("expected completion");
        };
        let Some(Value::List(towns)) = mv.param("$towns") else {
            panic!("expected a list of towns");
        };
        assert!((1..=2).contains(&towns.len()));
    }
}
