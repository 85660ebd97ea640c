//! Discovery probing: run a move's program on a scratch state to learn
//! whether it completes, fails, or stops at an unanswered decision.

use std::collections::BTreeMap;

use crate::core::{
    EvalError, GameState, IllegalMoveReason, KernelConfig, KernelWarning, Move, PlayerId, Value,
};
use crate::def::{ActionDef, ValidatedGameDef};
use crate::effects::{
    apply_action_effects, ChoiceKind, EffectContext, EffectOutcome, OpBudget, OptionLegality, PendingChoice,
};
use crate::eval::Bindings;
use crate::turn::{check_monsoon_caps, decision_player};

use super::gates::{admit, bind_params, effect_rejection, precondition, Precondition, Rejection};

/// A move that passed admission, with its declared parameters bound.
pub(crate) struct Candidate<'d> {
    pub(crate) action: &'d ActionDef,
    pub(crate) actor: PlayerId,
    pub(crate) executor: PlayerId,
    pub(crate) bindings: Bindings,
}

#[derive(Debug)]
pub(crate) enum Probe {
    Illegal(IllegalMoveReason),
    Complete,
    Pending(PendingChoice),
    /// Completed, but the deferral budget was spent before the precondition
    /// could be rechecked.
    Unsettled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Satisfiable {
    Yes,
    No,
    /// Ran out of probe steps before settling it.
    Unknown,
}

pub(crate) struct Prober<'d> {
    def: &'d ValidatedGameDef,
    config: &'d KernelConfig,
    deferred_evaluations: usize,
    exhausted: bool,
    pub(crate) warnings: Vec<KernelWarning>,
}

impl<'d> Prober<'d> {
    pub(crate) fn new(def: &'d ValidatedGameDef, config: &'d KernelConfig) -> Self {
        Self {
            def,
            config,
            deferred_evaluations: 0,
            exhausted: false,
            warnings: Vec::new(),
        }
    }

    /// Look the action up, run the admission gates for the player the
    /// kernel is waiting on, and bind declared parameters.
    pub(crate) fn prepare(&self, state: &GameState, mv: &Move) -> Result<Candidate<'d>, Rejection> {
        let action = self
            .def
            .action(&mv.action)
            .ok_or(IllegalMoveReason::UnknownAction)?;
        let actor = decision_player(state);
        let executor = admit(self.def, state, action, actor, self.config)?;
        let bindings = bind_params(self.def, state, action, actor, executor, &mv.params, self.config)?;
        Ok(Candidate {
            action,
            actor,
            executor,
            bindings,
        })
    }

    /// One discovery run with `params` as the supplied decisions.
    pub(crate) fn probe(
        &mut self,
        state: &GameState,
        cand: &Candidate<'_>,
        params: &BTreeMap<String, Value>,
    ) -> Result<Probe, EvalError> {
        if let Err(reason) = check_monsoon_caps(self.def, state, cand.action, params) {
            return Ok(Probe::Illegal(reason));
        }
        let deferred = match self.check_pre(state, cand, &cand.bindings)? {
            Precondition::Holds => false,
            Precondition::Fails => return Ok(Probe::Illegal(IllegalMoveReason::PredicateFailed)),
            Precondition::Deferred(_) => true,
        };

        let ctx = EffectContext::discovery(self.def, self.config, cand.actor, cand.executor, params);
        let mut budget = OpBudget::new(self.config.max_effect_ops);
        let run = match apply_action_effects(&ctx, state.clone(), cand.action, cand.bindings.clone(), &mut budget) {
            Ok(run) => run,
            Err(err) => return Ok(Probe::Illegal(effect_rejection(err))),
        };

        match run.outcome {
            EffectOutcome::Pending(choice) => Ok(Probe::Pending(choice)),
            EffectOutcome::Deferred { binding } => Ok(Probe::Illegal(IllegalMoveReason::IncompleteParams {
                missing: binding,
            })),
            EffectOutcome::Completed if !deferred => Ok(Probe::Complete),
            EffectOutcome::Completed => {
                if !self.charge_deferral(cand.action) {
                    return Ok(Probe::Unsettled);
                }
                Ok(match self.check_pre(state, cand, &run.bindings)? {
                    Precondition::Holds => Probe::Complete,
                    Precondition::Fails => Probe::Illegal(IllegalMoveReason::PredicateFailed),
                    Precondition::Deferred(missing) => Probe::Illegal(IllegalMoveReason::IncompleteParams { missing }),
                })
            }
        }
    }

    fn check_pre(
        &self,
        state: &GameState,
        cand: &Candidate<'_>,
        bindings: &Bindings,
    ) -> Result<Precondition, EvalError> {
        precondition(self.def, state, cand.action, cand.actor, cand.executor, bindings, self.config)
    }

    /// Whether the deferral budget has run out.
    pub(crate) fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Count one deferred re-evaluation. Past the budget nothing is
    /// rechecked.
    fn charge_deferral(&mut self, action: &ActionDef) -> bool {
        if self.deferred_evaluations < self.config.max_deferred_predicates {
            self.deferred_evaluations += 1;
            return true;
        }
        if !self.exhausted {
            self.exhausted = true;
            self.warnings.push(KernelWarning::DeferredPredicateBudget {
                action: action.id.clone(),
                limit: self.config.max_deferred_predicates,
            });
        }
        false
    }

    /// Whether some sequence of answers completes the move. Each probe costs
    /// one step.
    pub(crate) fn satisfiable(
        &mut self,
        state: &GameState,
        cand: &Candidate<'_>,
        params: &mut BTreeMap<String, Value>,
        steps: &mut usize,
    ) -> Result<Satisfiable, EvalError> {
        if *steps == 0 {
            return Ok(Satisfiable::Unknown);
        }
        *steps -= 1;

        let choice = match self.probe(state, cand, params)? {
            Probe::Illegal(_) => return Ok(Satisfiable::No),
            Probe::Complete => return Ok(Satisfiable::Yes),
            Probe::Unsettled => return Ok(Satisfiable::Unknown),
            Probe::Pending(choice) => choice,
        };

        let attempts: Vec<Value> = match choice.kind {
            ChoiceKind::ChooseOne => choice.options.into_iter().map(|o| o.value).collect(),
            ChoiceKind::ChooseN { min, .. } => {
                vec![Value::List(choice.options.into_iter().take(min).map(|o| o.value).collect())]
            }
        };
        // A single ChooseN subset says nothing about the others.
        let exhaustive = matches!(choice.kind, ChoiceKind::ChooseOne);

        let mut verdict = Satisfiable::No;
        for answer in attempts {
            params.insert(choice.decision.clone(), answer);
            let result = self.satisfiable(state, cand, params, steps);
            params.remove(&choice.decision);
            match result? {
                Satisfiable::Yes => return Ok(Satisfiable::Yes),
                Satisfiable::Unknown => verdict = Satisfiable::Unknown,
                Satisfiable::No if !exhaustive => verdict = Satisfiable::Unknown,
                Satisfiable::No => {}
            }
        }
        Ok(verdict)
    }

    /// Label each option of a pending choice. Legal and Illegal are only
    /// reported when a probe proved them.
    pub(crate) fn annotate(
        &mut self,
        state: &GameState,
        cand: &Candidate<'_>,
        params: &BTreeMap<String, Value>,
        mut choice: PendingChoice,
    ) -> PendingChoice {
        let mut steps = self.config.max_decision_probe_steps;
        let mut scratch = params.clone();
        for option in &mut choice.options {
            let answer = match choice.kind {
                ChoiceKind::ChooseOne => option.value.clone(),
                ChoiceKind::ChooseN { min, max } if min <= 1 && max >= 1 => Value::List(vec![option.value.clone()]),
                ChoiceKind::ChooseN { .. } => {
                    option.legality = OptionLegality::Unknown;
                    continue;
                }
            };
            scratch.insert(choice.decision.clone(), answer);
            let verdict = self.satisfiable(state, cand, &mut scratch, &mut steps);
            scratch.remove(&choice.decision);
            option.legality = match (choice.kind, verdict) {
                (_, Ok(Satisfiable::Yes)) => OptionLegality::Legal,
                (ChoiceKind::ChooseOne, Ok(Satisfiable::No)) => OptionLegality::Illegal,
                _ => OptionLegality::Unknown,
            };
        }
        choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, Effect, Query, ValueExpr};
    use crate::core::{PhaseId, Rng, VarValue};
    use crate::def::{validate_game_def, GameDef, VarDef};
    use crate::turn::TurnOrderRuntime;

    /// `pick` chooses a number; only 2 satisfies the follow-up predicate.
    fn fixture() -> (ValidatedGameDef, GameState) {
        let mut def = GameDef::new("probe", 2, 2);
        def.global_vars = vec![VarDef::int("aid", 0)];
        def.actions = vec![
            ActionDef::new("pick")
                .with_pre(Condition::eq(ValueExpr::binding("$n"), ValueExpr::int(2)))
                .with_effects(vec![
                    Effect::choose_one("$n", Query::range(1, 3)),
                    Effect::set_global("aid", ValueExpr::binding("$n")),
                ]),
            ActionDef::new("nest").with_effects(vec![
                Effect::choose_one("$a", Query::range(0, 1)),
                Effect::If {
                    when: Condition::eq(ValueExpr::binding("$a"), ValueExpr::int(1)),
                    then: vec![Effect::choose_one("$b", Query::Literal(vec![]))],
                    otherwise: vec![],
                },
            ]),
        ];
        let def = validate_game_def(def).unwrap();
        let table = *def.zobrist();
        let mut state = GameState::new(&table, 2, PhaseId::new("main"), TurnOrderRuntime::RoundRobin, Rng::new(1));
        state.set_global_var(&table, "aid", VarValue::Int(0));
        (def, state)
    }

    #[test]
    fn test_probe_stops_at_choice() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let mut prober = Prober::new(&def, &config);
        let mv = Move::new("pick");
        let cand = prober.prepare(&state, &mv).unwrap();
        let probe = prober.probe(&state, &cand, &mv.params).unwrap();
        let Probe::Pending(choice) = probe else {
            panic!("expected a pending choice, got {probe:?}");
        };
        assert_eq!(choice.decision, "$n");
        assert_eq!(choice.options.len(), 3);
    }

    #[test]
    fn test_deferred_predicate_checked_after_completion() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let mut prober = Prober::new(&def, &config);
        let mv = Move::new("pick").with_param("$n", Value::Int(3));
        let cand = prober.prepare(&state, &mv).unwrap();
        assert!(matches!(
            prober.probe(&state, &cand, &mv.params).unwrap(),
            Probe::Illegal(IllegalMoveReason::PredicateFailed)
        ));
        let mv = Move::new("pick").with_param("$n", Value::Int(2));
        assert!(matches!(prober.probe(&state, &cand, &mv.params).unwrap(), Probe::Complete));
    }

    #[test]
    fn test_annotate_labels_options() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let mut prober = Prober::new(&def, &config);
        let mv = Move::new("nest");
        let cand = prober.prepare(&state, &mv).unwrap();
        let Probe::Pending(choice) = prober.probe(&state, &cand, &mv.params).unwrap() else {
            panic!("expected a pending choice");
        };
        let choice = prober.annotate(&state, &cand, &mv.params, choice);
        let labels: Vec<_> = choice.options.iter().map(|o| o.legality).collect();
        assert_eq!(labels, vec![OptionLegality::Legal, OptionLegality::Illegal]);
    }

    #[test]
    fn test_deferral_budget_warns_once() {
        let (def, state) = fixture();
        let config = KernelConfig::default().with_max_deferred_predicates(0);
        let mut prober = Prober::new(&def, &config);
        let mv = Move::new("pick").with_param("$n", Value::Int(3));
        let cand = prober.prepare(&state, &mv).unwrap();
        assert!(matches!(prober.probe(&state, &cand, &mv.params).unwrap(), Probe::Unsettled));
        assert!(matches!(prober.probe(&state, &cand, &mv.params).unwrap(), Probe::Unsettled));
        assert!(prober.exhausted());
        assert_eq!(prober.warnings.len(), 1);
        assert_eq!(prober.warnings[0].code(), "BUDGET_DEFERRED_PREDICATES");
    }

    #[test]
    fn test_satisfiable_runs_out_of_steps() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let mut prober = Prober::new(&def, &config);
        let mut params = BTreeMap::new();
        let cand = prober.prepare(&state, &Move::new("pick")).unwrap();

        let mut steps = 1;
        assert_eq!(
            prober.satisfiable(&state, &cand, &mut params, &mut steps).unwrap(),
            Satisfiable::Unknown
        );
        let mut steps = 16;
        assert_eq!(
            prober.satisfiable(&state, &cand, &mut params, &mut steps).unwrap(),
            Satisfiable::Yes
        );
    }
}
