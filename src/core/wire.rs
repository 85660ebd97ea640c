//! Wire formats for states, moves and definitions.
//!
//! JSON (`serde_json`) is the plain-data format for persistence and replay;
//! bincode is the compact form for simulation harnesses. Both carry the RNG
//! state and token identities, so a decoded state continues exactly where
//! the encoded one left off.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::action::Move;
use super::error::WireError;
use super::state::GameState;
use crate::def::GameDef;

fn to_json<T: Serialize>(value: &T) -> Result<String, WireError> {
    Ok(serde_json::to_string(value)?)
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, WireError> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a state to JSON.
pub fn serialize_game_state(state: &GameState) -> Result<String, WireError> {
    to_json(state)
}

/// Restore a state serialized by [`serialize_game_state`].
pub fn deserialize_game_state(json: &str) -> Result<GameState, WireError> {
    from_json(json)
}

/// Encode a state with bincode.
pub fn encode_game_state(state: &GameState) -> Result<Vec<u8>, WireError> {
    Ok(bincode::serialize(state)?)
}

/// Decode a state encoded by [`encode_game_state`].
pub fn decode_game_state(bytes: &[u8]) -> Result<GameState, WireError> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn serialize_move(mv: &Move) -> Result<String, WireError> {
    to_json(mv)
}

pub fn deserialize_move(json: &str) -> Result<Move, WireError> {
    from_json(json)
}

/// Parse a compiled game definition. The result still has to pass
/// `validate_game_def` before the kernel accepts it.
pub fn parse_game_def(json: &str) -> Result<GameDef, WireError> {
    from_json(json)
}

pub fn serialize_game_def(def: &GameDef) -> Result<String, WireError> {
    to_json(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PhaseId, Rng, Token, TokenTypeId, Value, VarValue, ZoneId};
    use crate::hash::ZobristTable;
    use crate::turn::TurnOrderRuntime;

    fn sample() -> GameState {
        let table = ZobristTable::new(5);
        let mut state = GameState::new(
            &table,
            3,
            PhaseId::new("main"),
            TurnOrderRuntime::RoundRobin,
            Rng::new(77),
        );
        let zone = ZoneId::new("deck");
        state.add_zone(zone.clone());
        let id = state.allocate_token_id(&table);
        state.insert_token(
            &table,
            &zone,
            0,
            Token {
                id,
                kind: TokenTypeId::new("card"),
                props: im::OrdMap::unit("coup".to_string(), Value::Bool(false)),
            },
        );
        state.set_global_var(&table, "aid", VarValue::Int(15));
        state
    }

    #[test]
    fn test_json_roundtrip_preserves_rng_and_tokens() {
        let state = sample();
        let json = serialize_game_state(&state).unwrap();
        let back = deserialize_game_state(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.rng(), state.rng());
        assert_eq!(serialize_game_state(&back).unwrap(), json);
    }

    #[test]
    fn test_bincode_roundtrip() {
        let state = sample();
        let bytes = encode_game_state(&state).unwrap();
        assert_eq!(decode_game_state(&bytes).unwrap(), state);
    }

    #[test]
    fn test_rejects_foreign_rng() {
        let json = serialize_game_state(&sample())
            .unwrap()
            .replace("pcg-dxsm-128/v1", "xorshift/v9");
        let err = deserialize_game_state(&json).unwrap_err();
        assert_eq!(err.code(), "WIRE_JSON");
    }
}
