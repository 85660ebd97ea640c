//! Move-selection agents for harnesses and tests.
//!
//! Agents are pure over an explicit [`Rng`]: each call takes the generator
//! and hands back the advanced one, so a seeded game replays exactly.

use rand::seq::SliceRandom;
use tracing::trace;

use crate::core::{GameState, KernelConfig, KernelError, Move, Rng, RngStream};
use crate::decision::{
    complete_template_move_with_config, default_choice, resolve_move_decision_sequence_with_config, ChoiceRequest,
};
use crate::def::ValidatedGameDef;
use crate::kernel::{apply_move_with_config, terminal_result_with_config};
use crate::moves::legal_moves_with_config;

/// Picks a complete legal move for the player the kernel is waiting on.
pub trait Agent {
    /// `None` when no candidate could be completed.
    fn choose_move(
        &self,
        def: &ValidatedGameDef,
        state: &GameState,
        rng: Rng,
        config: &KernelConfig,
    ) -> Result<(Option<Move>, Rng), KernelError>;
}

/// Uniformly random template, completed with random viable answers.
#[derive(Clone, Debug, Default)]
pub struct RandomAgent;

impl Agent for RandomAgent {
    fn choose_move(
        &self,
        def: &ValidatedGameDef,
        state: &GameState,
        rng: Rng,
        config: &KernelConfig,
    ) -> Result<(Option<Move>, Rng), KernelError> {
        let mut candidates = legal_moves_with_config(def, state, config)?.moves;
        let mut stream = RngStream::new(rng);
        candidates.shuffle(&mut stream);
        let mut rng = stream.into_rng();

        for template in candidates {
            let (resolution, next) = complete_template_move_with_config(def, state, &template, rng, config)?;
            rng = next;
            match resolution.request {
                ChoiceRequest::Complete(mv) => return Ok((Some(mv), rng)),
                other => trace!(%template, ?other, "template could not be completed"),
            }
        }
        Ok((None, rng))
    }
}

/// First template in enumeration order, completed with the default policy.
#[derive(Clone, Debug, Default)]
pub struct FirstLegalAgent;

impl Agent for FirstLegalAgent {
    fn choose_move(
        &self,
        def: &ValidatedGameDef,
        state: &GameState,
        rng: Rng,
        config: &KernelConfig,
    ) -> Result<(Option<Move>, Rng), KernelError> {
        for template in legal_moves_with_config(def, state, config)?.moves {
            let resolution = resolve_move_decision_sequence_with_config(def, state, &template, default_choice, config)?;
            if let ChoiceRequest::Complete(mv) = resolution.request {
                return Ok((Some(mv), rng));
            }
        }
        Ok((None, rng))
    }
}

/// A finished self-play run.
#[derive(Clone, Debug)]
pub struct PlayedGame {
    pub state: GameState,
    pub moves: Vec<Move>,
    pub rng: Rng,
}

/// Let `agent` move for every seat until the game ends, no move can be
/// found, or `max_moves` moves have been applied.
pub fn play_game<A: Agent>(
    def: &ValidatedGameDef,
    state: GameState,
    agent: &A,
    rng: Rng,
    max_moves: usize,
    config: &KernelConfig,
) -> Result<PlayedGame, KernelError> {
    let mut state = state;
    let mut rng = rng;
    let mut moves = Vec::new();
    while moves.len() < max_moves && terminal_result_with_config(def, &state, config)?.is_none() {
        let (choice, next) = agent.choose_move(def, &state, rng, config)?;
        rng = next;
        let Some(mv) = choice else {
            break;
        };
        state = apply_move_with_config(def, &state, &mv, config)?.state;
        moves.push(mv);
    }
    Ok(PlayedGame { state, moves, rng })
}
