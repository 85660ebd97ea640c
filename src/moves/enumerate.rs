//! Legal-move enumeration.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::core::{GameState, KernelConfig, KernelError, KernelWarning, Move, PlayerId, Value};
use crate::def::{ActionDef, ValidatedGameDef};
use crate::eval::{eval_query, values_equal, Bindings, EvalContext};
use crate::kernel::terminal_result_with_config;
use crate::turn::decision_player;

use super::gates::admit;
use super::probe::{Candidate, Prober, Satisfiable};

/// Moves available to the player the kernel is waiting on, plus any budget
/// warnings raised while finding them.
///
/// Moves may still carry unresolved in-program decisions; use
/// `legal_choices` or `complete_template_move` to fill them in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalMoves {
    pub moves: Vec<Move>,
    pub warnings: Vec<KernelWarning>,
}

/// Enumerate legal moves with the default configuration.
pub fn legal_moves(def: &ValidatedGameDef, state: &GameState) -> Result<LegalMoves, KernelError> {
    legal_moves_with_config(def, state, &KernelConfig::default())
}

/// Enumerate legal moves.
///
/// Actions are visited in declaration order and parameter values in domain
/// order, so the result is deterministic. A terminal state has no moves.
pub fn legal_moves_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    config: &KernelConfig,
) -> Result<LegalMoves, KernelError> {
    if terminal_result_with_config(def, state, config)?.is_some() {
        return Ok(LegalMoves::default());
    }
    let mut enumerator = Enumerator::new(def, config, false);
    enumerator.run(state);
    debug!(
        count = enumerator.moves.len(),
        expansions = enumerator.expansions,
        "enumerated legal moves"
    );
    let mut warnings = enumerator.warnings;
    warnings.extend(enumerator.prober.warnings);
    Ok(LegalMoves {
        moves: enumerator.moves,
        warnings,
    })
}

/// Whether the decision player has at least one legal move. Stops at the
/// first one found. A search cut short by a budget counts as a yes, so the
/// seat is not skipped on a guess.
pub(crate) fn has_legal_move(def: &ValidatedGameDef, state: &GameState, config: &KernelConfig) -> bool {
    let mut enumerator = Enumerator::new(def, config, true);
    enumerator.run(state);
    !enumerator.moves.is_empty() || enumerator.truncated
}

struct Enumerator<'d> {
    def: &'d ValidatedGameDef,
    config: &'d KernelConfig,
    prober: Prober<'d>,
    first_only: bool,
    expansions: usize,
    truncated: bool,
    moves: Vec<Move>,
    warnings: Vec<KernelWarning>,
}

impl<'d> Enumerator<'d> {
    fn new(def: &'d ValidatedGameDef, config: &'d KernelConfig, first_only: bool) -> Self {
        Self {
            def,
            config,
            prober: Prober::new(def, config),
            first_only,
            expansions: 0,
            truncated: false,
            moves: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn done(&self) -> bool {
        self.truncated || (self.first_only && !self.moves.is_empty())
    }

    fn run(&mut self, state: &GameState) {
        let actor = decision_player(state);
        let def = self.def;
        for action in &def.actions {
            if self.done() {
                break;
            }
            let executor = match admit(def, state, action, actor, self.config) {
                Ok(executor) => executor,
                Err(reason) => {
                    trace!(action = %action.id, reason = reason.code(), "action not admitted");
                    continue;
                }
            };
            self.expand(state, action, actor, executor, 0, Bindings::new(), BTreeMap::new());
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand(
        &mut self,
        state: &GameState,
        action: &'d ActionDef,
        actor: PlayerId,
        executor: PlayerId,
        index: usize,
        bindings: Bindings,
        params: BTreeMap<String, Value>,
    ) {
        let Some(param) = action.params.get(index) else {
            self.consider(
                state,
                Candidate {
                    action,
                    actor,
                    executor,
                    bindings,
                },
                params,
            );
            return;
        };

        let ctx = EvalContext::new(self.def, state, &bindings, self.config.max_query_results)
            .with_actor(actor, executor);
        let domain = match eval_query(&ctx, &param.domain) {
            Ok(domain) => domain,
            Err(err) => {
                self.skip(action, err.code());
                return;
            }
        };
        let mut seen: Vec<Value> = Vec::with_capacity(domain.len());
        for value in domain {
            if seen.iter().any(|s| values_equal(s, &value)) {
                continue;
            }
            if self.done() {
                return;
            }
            if self.expansions >= self.config.max_param_expansions {
                self.truncated = true;
                self.warnings.push(KernelWarning::ParamExpansionBudget {
                    action: action.id.clone(),
                    limit: self.config.max_param_expansions,
                });
                return;
            }
            self.expansions += 1;
            seen.push(value.clone());

            let mut next_params = params.clone();
            next_params.insert(param.name.clone(), value.clone());
            let next_bindings = bindings.update(param.name.clone(), value);
            self.expand(state, action, actor, executor, index + 1, next_bindings, next_params);
        }
    }

    /// Keep the candidate unless probing proves it can never complete.
    ///
    /// Once the deferral budget is spent, enumeration stops: only candidates
    /// proven to complete are kept from then on.
    fn consider(&mut self, state: &GameState, cand: Candidate<'d>, mut params: BTreeMap<String, Value>) {
        let mut steps = self.config.max_decision_probe_steps;
        let declared = params.clone();
        let verdict = self.prober.satisfiable(state, &cand, &mut params, &mut steps);
        if self.prober.exhausted() {
            self.truncated = true;
        }
        match verdict {
            Ok(Satisfiable::No) => {}
            Ok(Satisfiable::Unknown) if self.truncated => {}
            Ok(_) => self.moves.push(Move {
                action: cand.action.id.clone(),
                params: declared,
            }),
            Err(err) => self.skip(cand.action, err.code()),
        }
    }

    fn skip(&mut self, action: &ActionDef, code: &'static str) {
        debug!(action = %action.id, code, "candidate skipped");
        self.warnings.push(KernelWarning::CandidateSkipped {
            action: action.id.clone(),
            code,
        });
    }
}
