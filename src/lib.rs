//! # game-kernel
//!
//! A deterministic rules kernel for data-defined board games and
//! card-driven wargames.
//!
//! ## Design Principles
//!
//! 1. **Data-Defined**: No hardcoded zones, pieces, phases or actions.
//!    Games arrive as a validated `GameDef` and the kernel interprets it.
//!
//! 2. **Pure Transitions**: Every entry point takes a state and returns a
//!    new one. Randomness lives in the state as an explicit `Rng` value, so a
//!    seed plus a move script replays bit for bit.
//!
//! 3. **Bounded Work**: Every otherwise-unbounded search carries a budget
//!    from `KernelConfig`. Breaching one yields a typed warning and a
//!    deterministic truncated result, never a hang.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: O(1) cloning via `im-rs`, so discovery
//!   runs probe scratch copies freely.
//!
//! - **Incremental Hashing**: a Zobrist hash maintained by every mutation
//!   and checked against a full recompute after each transition.
//!
//! ## Modules
//!
//! - `core`: identifiers, players, values, moves, state, RNG, errors, config
//! - `ast`: selectors, values, conditions, queries and effects
//! - `def`: game definitions and validation
//! - `spatial`: zone adjacency graph
//! - `eval`: pure evaluation of values, conditions and queries
//! - `effects`: the effect interpreter (execution and discovery modes)
//! - `triggers`: reactive trigger dispatch
//! - `turn`: turn-order state machine, including card-driven flow
//! - `moves`: legality gates and legal-move enumeration
//! - `decision`: incremental decision resolution
//! - `kernel`: initial state, move application, terminal detection
//! - `agents`: random and first-legal move pickers
//!
//! ## Example
//!
//! ```
//! use game_kernel::ast::Effect;
//! use game_kernel::core::{LimitScope, Move};
//! use game_kernel::def::{validate_game_def, ActionDef, GameDef, VarDef};
//! use game_kernel::{apply_move, initial_state, legal_moves};
//!
//! let mut def = GameDef::new("tally", 2, 2);
//! def.global_vars = vec![VarDef::int("count", 0)];
//! def.actions = vec![ActionDef::new("tick")
//!     .with_limit(LimitScope::Turn, 1)
//!     .with_effects(vec![Effect::add_global("count", 1)])];
//! let def = validate_game_def(def).unwrap();
//!
//! let state = initial_state(&def, 42, 2).unwrap();
//! let moves = legal_moves(&def, &state).unwrap().moves;
//! assert_eq!(moves, vec![Move::new("tick")]);
//!
//! let next = apply_move(&def, &state, &moves[0]).unwrap().state;
//! assert_eq!(next.turn_count(), 2);
//! ```

pub mod agents;
pub mod ast;
pub mod core;
pub mod decision;
pub mod def;
pub mod effects;
pub mod eval;
pub mod hash;
pub mod kernel;
pub mod moves;
pub mod spatial;
pub mod triggers;
pub mod turn;

// Re-export commonly used types
pub use crate::core::{
    GameState, IllegalMove, IllegalMoveReason, KernelConfig, KernelError, KernelWarning, Move, PlayerId, Rng,
    Value,
};

pub use crate::def::{validate_game_def, GameDef, ValidatedGameDef};

pub use crate::decision::{
    complete_template_move, default_choice, legal_choices, resolve_move_decision_sequence, ChoiceReport,
    ChoiceRequest, DecisionResolution,
};

pub use crate::kernel::{
    advance_to_decision_point, apply_move, initial_state, terminal_result, verify_state_hash, ApplyResult,
    TerminalResult,
};

pub use crate::moves::{legal_moves, LegalMoves};

pub use crate::triggers::{dispatch_triggers, TriggerEvent, TriggerLogEntry};

pub use crate::turn::{advance_phase, decision_player};

/// Result alias for kernel entry points.
pub type Result<T> = std::result::Result<T, KernelError>;
