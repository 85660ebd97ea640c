//! Terminal detection and end scoring.

use serde::{Deserialize, Serialize};

use crate::core::{GameState, KernelConfig, KernelError, PlayerId};
use crate::def::{EndOutcome, ScoringDef, ValidatedGameDef};
use crate::eval::{eval_condition, eval_value, resolve_player, Bindings, EvalContext};

/// How a game ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TerminalResult {
    Win {
        player: PlayerId,
        victory: Option<String>,
    },
    LossAll,
    Draw,
    /// Players by end score, highest first; ties keep seat order.
    Score { ranking: Vec<(PlayerId, i64)> },
}

/// `None` while the game is still running.
pub fn terminal_result(def: &ValidatedGameDef, state: &GameState) -> Result<Option<TerminalResult>, KernelError> {
    terminal_result_with_config(def, state, &KernelConfig::default())
}

/// End conditions are checked in declaration order and the first that holds
/// decides. A finished card-driven campaign with no condition holding falls
/// back to end scoring, or a draw when no scoring is declared.
pub fn terminal_result_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    config: &KernelConfig,
) -> Result<Option<TerminalResult>, KernelError> {
    let bindings = Bindings::new();
    let ctx = EvalContext::new(def, state, &bindings, config.max_query_results);

    for condition in &def.terminal.conditions {
        if !eval_condition(&ctx, &condition.when)? {
            continue;
        }
        let result = match &condition.outcome {
            EndOutcome::Win { player, victory } => TerminalResult::Win {
                player: resolve_player(&ctx, player)?,
                victory: victory.clone(),
            },
            EndOutcome::LossAll => TerminalResult::LossAll,
            EndOutcome::Draw => TerminalResult::Draw,
            EndOutcome::Score => match &def.terminal.scoring {
                Some(scoring) => score(&ctx, scoring)?,
                None => TerminalResult::Draw,
            },
        };
        return Ok(Some(result));
    }

    let campaign_complete = state
        .turn_order()
        .as_card_driven()
        .is_some_and(|rt| rt.coup.campaign_complete);
    if campaign_complete {
        return Ok(Some(match &def.terminal.scoring {
            Some(scoring) => score(&ctx, scoring)?,
            None => TerminalResult::Draw,
        }));
    }
    Ok(None)
}

fn score(ctx: &EvalContext<'_>, scoring: &ScoringDef) -> Result<TerminalResult, KernelError> {
    let mut ranking = Vec::with_capacity(ctx.state.player_count());
    for player in ctx.state.player_ids() {
        let seat_ctx = ctx.with_actor(player, player);
        let points = eval_value(&seat_ctx, &scoring.score)?.as_int("end score")?;
        ranking.push((player, points));
    }
    ranking.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(TerminalResult::Score { ranking })
}
