//! Core value types: identifiers, players, runtime values, moves, state,
//! the deterministic RNG, errors and kernel configuration.
//!
//! Nothing here interprets a game definition; these are the values the
//! interpreter layers pass around.

pub mod action;
pub mod config;
pub mod error;
pub mod ids;
pub mod player;
pub mod rng;
pub mod state;
pub mod value;
pub mod wire;

pub use action::Move;
pub use config::KernelConfig;
pub use error::{
    ContractError, EffectError, EvalError, IllegalMove, IllegalMoveReason, KernelError,
    KernelWarning, LimitScope, RngError, SpatialError, WireError,
};
pub use ids::{ActionId, PhaseId, TableId, TokenId, TokenTypeId, TriggerId, ZoneId};
pub use player::{seat_mask, PlayerId, PlayerMap, MAX_PLAYERS};
pub use rng::{Rng, RngState, RngStream, RNG_ALGORITHM};
pub use state::{GameState, RevealGrant, Token, UsageCounts};
pub use value::{RowRef, Value, VarValue};
pub use wire::{
    decode_game_state, deserialize_game_state, deserialize_move, encode_game_state,
    parse_game_def, serialize_game_def, serialize_game_state, serialize_move,
};
