//! Zobrist state hashing.
//!
//! The state hash is the XOR of one pseudorandom key per *fact* that holds
//! in the state: a token at a slot of a zone, a variable having a value, the
//! active player, and so on. Changing a fact XORs its old key out and its
//! new key in, so the hash can be maintained incrementally by every mutation
//! and recomputed from scratch to check it.
//!
//! ## Keys
//!
//! Token identities are unbounded, so keys are not materialized up front.
//! A fact's key is a keyed FNV-1a digest of the fact, seeded by a word drawn
//! from a ChaCha stream seeded with the definition's fingerprint, and
//! finalized with splitmix64. Two tables built from the same definition
//! produce the same keys on every platform.
//!
//! The RNG state is deliberately not a fact: states that differ only in
//! their generator compare equal by hash.

use std::hash::{Hash, Hasher};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::rng::splitmix64;
use crate::core::{
    ActionId, GameState, PhaseId, PlayerId, RevealGrant, TokenId, TokenTypeId, UsageCounts, Value,
    VarValue, ZoneId,
};
use crate::turn::TurnOrderRuntime;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// One hashed fact.
#[derive(Hash)]
pub enum Fact<'a> {
    TokenPlacement {
        zone: &'a ZoneId,
        slot: u32,
        token: TokenId,
        kind: &'a TokenTypeId,
    },
    TokenProp {
        token: TokenId,
        prop: &'a str,
        value: &'a Value,
    },
    GlobalVar {
        var: &'a str,
        value: VarValue,
    },
    PlayerVar {
        player: PlayerId,
        var: &'a str,
        value: VarValue,
    },
    ZoneVar {
        zone: &'a ZoneId,
        var: &'a str,
        value: VarValue,
    },
    ActivePlayer(PlayerId),
    CurrentPhase(&'a PhaseId),
    TurnCount(u32),
    NextTokenId(u32),
    ActionUsage {
        action: &'a ActionId,
        usage: UsageCounts,
    },
    GlobalMarker {
        marker: &'a str,
        state: &'a str,
    },
    ZoneMarker {
        zone: &'a ZoneId,
        marker: &'a str,
        state: &'a str,
    },
    Reveals {
        zone: &'a ZoneId,
        grants: &'a im::Vector<RevealGrant>,
    },
    TurnOrder(&'a TurnOrderRuntime),
}

/// FNV-1a with platform-independent integer widths.
struct FactHasher(u64);

impl Hasher for FactHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_usize(&mut self, n: usize) {
        self.write_u64(n as u64);
    }

    fn write_isize(&mut self, n: isize) {
        self.write_i64(n as i64);
    }
}

/// Key source for one game definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZobristTable {
    seed: u64,
}

impl ZobristTable {
    /// Derive a table from a definition fingerprint.
    #[must_use]
    pub fn new(fingerprint: u64) -> Self {
        let mut stream = ChaCha8Rng::seed_from_u64(fingerprint);
        Self {
            seed: stream.next_u64(),
        }
    }

    /// Fingerprint of arbitrary bytes (the serialized definition).
    #[must_use]
    pub fn fingerprint(bytes: &[u8]) -> u64 {
        let mut hasher = FactHasher(FNV_OFFSET);
        hasher.write(bytes);
        hasher.finish()
    }

    /// The key of a fact.
    #[must_use]
    pub fn key(&self, fact: &Fact<'_>) -> u64 {
        let mut hasher = FactHasher(FNV_OFFSET ^ self.seed);
        fact.hash(&mut hasher);
        splitmix64(hasher.finish())
    }
}

/// XOR a token's placement out of `hash` and its replacement in.
///
/// Either side may be absent (token created at, or removed from, the slot).
#[must_use]
pub fn update_hash_token_placement(
    table: &ZobristTable,
    hash: u64,
    zone: &ZoneId,
    slot: u32,
    old: Option<(TokenId, &TokenTypeId)>,
    new: Option<(TokenId, &TokenTypeId)>,
) -> u64 {
    let mut hash = hash;
    if let Some((token, kind)) = old {
        hash ^= table.key(&Fact::TokenPlacement {
            zone,
            slot,
            token,
            kind,
        });
    }
    if let Some((token, kind)) = new {
        hash ^= table.key(&Fact::TokenPlacement {
            zone,
            slot,
            token,
            kind,
        });
    }
    hash
}

/// Fold every fact of `state` from scratch.
#[must_use]
pub fn compute_full_hash(table: &ZobristTable, state: &GameState) -> u64 {
    let mut hash = 0u64;

    for (zone, tokens) in state.zones() {
        for (slot, token) in tokens.iter().enumerate() {
            hash ^= table.key(&Fact::TokenPlacement {
                zone,
                slot: slot as u32,
                token: token.id,
                kind: &token.kind,
            });
            for (prop, value) in &token.props {
                hash ^= table.key(&Fact::TokenProp {
                    token: token.id,
                    prop,
                    value,
                });
            }
        }
    }

    for (var, value) in state.global_vars() {
        hash ^= table.key(&Fact::GlobalVar { var, value: *value });
    }
    for (player, vars) in state.player_vars().iter() {
        for (var, value) in vars {
            hash ^= table.key(&Fact::PlayerVar {
                player,
                var,
                value: *value,
            });
        }
    }
    for (zone, vars) in state.zone_vars() {
        for (var, value) in vars {
            hash ^= table.key(&Fact::ZoneVar {
                zone,
                var,
                value: *value,
            });
        }
    }

    hash ^= table.key(&Fact::ActivePlayer(state.active_player()));
    hash ^= table.key(&Fact::CurrentPhase(state.current_phase()));
    hash ^= table.key(&Fact::TurnCount(state.turn_count()));
    hash ^= table.key(&Fact::NextTokenId(state.next_token_id()));

    for (action, usage) in state.action_usage() {
        hash ^= table.key(&Fact::ActionUsage {
            action,
            usage: *usage,
        });
    }
    for (marker, marker_state) in state.global_markers() {
        hash ^= table.key(&Fact::GlobalMarker {
            marker,
            state: marker_state,
        });
    }
    for (zone, markers) in state.zone_markers() {
        for (marker, marker_state) in markers {
            hash ^= table.key(&Fact::ZoneMarker {
                zone,
                marker,
                state: marker_state,
            });
        }
    }
    for (zone, grants) in state.reveals() {
        hash ^= table.key(&Fact::Reveals { zone, grants });
    }
    hash ^= table.key(&Fact::TurnOrder(state.turn_order()));

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let a = ZobristTable::new(7);
        let b = ZobristTable::new(7);
        let fact = Fact::TurnCount(3);
        assert_eq!(a.key(&fact), b.key(&fact));
        assert_ne!(a.key(&fact), ZobristTable::new(8).key(&fact));
    }

    #[test]
    fn test_distinct_facts_get_distinct_keys() {
        let table = ZobristTable::new(1);
        let zone = ZoneId::new("hue");
        let kind = TokenTypeId::new("troop");
        let k0 = table.key(&Fact::TokenPlacement {
            zone: &zone,
            slot: 0,
            token: TokenId(1),
            kind: &kind,
        });
        let k1 = table.key(&Fact::TokenPlacement {
            zone: &zone,
            slot: 1,
            token: TokenId(1),
            kind: &kind,
        });
        assert_ne!(k0, k1);
        assert_ne!(table.key(&Fact::TurnCount(1)), table.key(&Fact::NextTokenId(1)));
    }

    #[test]
    fn test_placement_update_is_an_involution() {
        let table = ZobristTable::new(11);
        let zone = ZoneId::new("saigon");
        let kind = TokenTypeId::new("base");
        let placed = update_hash_token_placement(
            &table,
            0xabcd,
            &zone,
            2,
            None,
            Some((TokenId(4), &kind)),
        );
        assert_ne!(placed, 0xabcd);
        let removed =
            update_hash_token_placement(&table, placed, &zone, 2, Some((TokenId(4), &kind)), None);
        assert_eq!(removed, 0xabcd);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(ZobristTable::fingerprint(b""), FNV_OFFSET);
        assert_ne!(ZobristTable::fingerprint(b"a"), ZobristTable::fingerprint(b"b"));
    }
}
