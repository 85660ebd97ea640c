//! Game state.
//!
//! ## Persistence
//!
//! Every collection is an `im` persistent structure, so cloning a state is
//! O(1) and a transition returns a new state sharing most of its structure
//! with the old one. Kernel entry points take `&GameState` and return a new
//! value; they never mutate the caller's state.
//!
//! ## Hash maintenance
//!
//! Every mutating method takes the definition's `ZobristTable` and keeps
//! `state_hash` up to date by XOR-ing the changed facts. The RNG is the only
//! field outside the hash.

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use super::ids::{ActionId, PhaseId, TokenId, TokenTypeId, ZoneId};
use super::player::{PlayerId, PlayerMap};
use super::rng::Rng;
use super::value::{Value, VarValue};
use crate::ast::TokenFilter;
use crate::hash::{compute_full_hash, update_hash_token_placement, Fact, ZobristTable};
use crate::turn::TurnOrderRuntime;

/// A runtime game piece.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenTypeId,
    pub props: OrdMap<String, Value>,
}

impl Token {
    /// Read a property.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }
}

/// How often an action has been taken in each scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageCounts {
    pub turn: u32,
    pub phase: u32,
    pub game: u32,
}

impl UsageCounts {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.turn == 0 && self.phase == 0 && self.game == 0
    }
}

/// Permission for a set of observers to see matching tokens of a zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealGrant {
    /// Bit `n` is set if seat `n` may see.
    pub observers: u64,
    /// Tokens covered; every token when empty.
    pub filter: Vec<TokenFilter>,
}

/// Complete snapshot of one point in a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    player_count: usize,

    // === Variables ===
    global_vars: OrdMap<String, VarValue>,
    player_vars: PlayerMap<OrdMap<String, VarValue>>,
    zone_vars: OrdMap<ZoneId, OrdMap<String, VarValue>>,

    // === Tokens ===
    /// Slot 0 is the top of each zone.
    zones: OrdMap<ZoneId, Vector<Token>>,
    token_locations: OrdMap<TokenId, ZoneId>,
    next_token_id: u32,

    // === Progression ===
    active_player: PlayerId,
    current_phase: PhaseId,
    turn_count: u32,
    action_usage: OrdMap<ActionId, UsageCounts>,
    turn_order: TurnOrderRuntime,

    // === Markers and visibility ===
    global_markers: OrdMap<String, String>,
    zone_markers: OrdMap<ZoneId, OrdMap<String, String>>,
    reveals: OrdMap<ZoneId, Vector<RevealGrant>>,

    rng: Rng,
    state_hash: u64,
}

impl GameState {
    /// An empty state: no zones, no variables. `initial_state` fills it in
    /// from the definition.
    #[must_use]
    pub fn new(
        table: &ZobristTable,
        player_count: usize,
        first_phase: PhaseId,
        turn_order: TurnOrderRuntime,
        rng: Rng,
    ) -> Self {
        let mut state = Self {
            player_count,
            global_vars: OrdMap::new(),
            player_vars: PlayerMap::new(player_count, |_| OrdMap::new()),
            zone_vars: OrdMap::new(),
            zones: OrdMap::new(),
            token_locations: OrdMap::new(),
            next_token_id: 0,
            active_player: PlayerId::new(0),
            current_phase: first_phase,
            turn_count: 0,
            action_usage: OrdMap::new(),
            turn_order,
            global_markers: OrdMap::new(),
            zone_markers: OrdMap::new(),
            reveals: OrdMap::new(),
            rng,
            state_hash: 0,
        };
        state.state_hash = compute_full_hash(table, &state);
        state
    }

    // === Accessors ===

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        PlayerId::all(self.player_count)
    }

    #[must_use]
    pub fn global_var(&self, name: &str) -> Option<VarValue> {
        self.global_vars.get(name).copied()
    }

    #[must_use]
    pub fn player_var(&self, player: PlayerId, name: &str) -> Option<VarValue> {
        self.player_vars.get(player)?.get(name).copied()
    }

    #[must_use]
    pub fn zone_var(&self, zone: &ZoneId, name: &str) -> Option<VarValue> {
        self.zone_vars.get(zone)?.get(name).copied()
    }

    #[must_use]
    pub fn global_vars(&self) -> &OrdMap<String, VarValue> {
        &self.global_vars
    }

    #[must_use]
    pub fn player_vars(&self) -> &PlayerMap<OrdMap<String, VarValue>> {
        &self.player_vars
    }

    #[must_use]
    pub fn zone_vars(&self) -> &OrdMap<ZoneId, OrdMap<String, VarValue>> {
        &self.zone_vars
    }

    #[must_use]
    pub fn zones(&self) -> &OrdMap<ZoneId, Vector<Token>> {
        &self.zones
    }

    /// Tokens of a zone, top first.
    #[must_use]
    pub fn tokens(&self, zone: &ZoneId) -> Option<&Vector<Token>> {
        self.zones.get(zone)
    }

    #[must_use]
    pub fn has_zone(&self, zone: &ZoneId) -> bool {
        self.zones.contains_key(zone)
    }

    /// Zone currently holding a token.
    #[must_use]
    pub fn token_zone(&self, token: TokenId) -> Option<&ZoneId> {
        self.token_locations.get(&token)
    }

    /// Look up a token anywhere on the board.
    #[must_use]
    pub fn token(&self, token: TokenId) -> Option<&Token> {
        let zone = self.token_locations.get(&token)?;
        self.zones.get(zone)?.iter().find(|t| t.id == token)
    }

    #[must_use]
    pub fn next_token_id(&self) -> u32 {
        self.next_token_id
    }

    #[must_use]
    pub fn active_player(&self) -> PlayerId {
        self.active_player
    }

    #[must_use]
    pub fn current_phase(&self) -> &PhaseId {
        &self.current_phase
    }

    #[must_use]
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    #[must_use]
    pub fn usage(&self, action: &ActionId) -> UsageCounts {
        self.action_usage.get(action).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn action_usage(&self) -> &OrdMap<ActionId, UsageCounts> {
        &self.action_usage
    }

    #[must_use]
    pub fn turn_order(&self) -> &TurnOrderRuntime {
        &self.turn_order
    }

    #[must_use]
    pub fn global_marker(&self, marker: &str) -> Option<&str> {
        self.global_markers.get(marker).map(String::as_str)
    }

    #[must_use]
    pub fn zone_marker(&self, zone: &ZoneId, marker: &str) -> Option<&str> {
        self.zone_markers.get(zone)?.get(marker).map(String::as_str)
    }

    #[must_use]
    pub fn global_markers(&self) -> &OrdMap<String, String> {
        &self.global_markers
    }

    #[must_use]
    pub fn zone_markers(&self) -> &OrdMap<ZoneId, OrdMap<String, String>> {
        &self.zone_markers
    }

    #[must_use]
    pub fn reveals(&self) -> &OrdMap<ZoneId, Vector<RevealGrant>> {
        &self.reveals
    }

    /// Reveal grants on a zone.
    #[must_use]
    pub fn zone_reveals(&self, zone: &ZoneId) -> Vector<RevealGrant> {
        self.reveals.get(zone).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn rng(&self) -> Rng {
        self.rng
    }

    /// The incrementally maintained Zobrist hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.state_hash
    }

    // === Variables ===

    /// Write a global variable; returns the previous value.
    pub fn set_global_var(&mut self, table: &ZobristTable, name: &str, value: VarValue) -> Option<VarValue> {
        let old = self.global_vars.insert(name.to_string(), value);
        if let Some(old) = old {
            self.state_hash ^= table.key(&Fact::GlobalVar { var: name, value: old });
        }
        self.state_hash ^= table.key(&Fact::GlobalVar { var: name, value });
        old
    }

    /// Write a per-player variable; returns the previous value.
    pub fn set_player_var(
        &mut self,
        table: &ZobristTable,
        player: PlayerId,
        name: &str,
        value: VarValue,
    ) -> Option<VarValue> {
        let vars = self.player_vars.get_mut(player)?;
        let old = vars.insert(name.to_string(), value);
        if let Some(old) = old {
            self.state_hash ^= table.key(&Fact::PlayerVar {
                player,
                var: name,
                value: old,
            });
        }
        self.state_hash ^= table.key(&Fact::PlayerVar {
            player,
            var: name,
            value,
        });
        old
    }

    /// Write a zone-scoped variable; returns the previous value.
    pub fn set_zone_var(
        &mut self,
        table: &ZobristTable,
        zone: &ZoneId,
        name: &str,
        value: VarValue,
    ) -> Option<VarValue> {
        let mut vars = self.zone_vars.get(zone).cloned().unwrap_or_default();
        let old = vars.insert(name.to_string(), value);
        self.zone_vars.insert(zone.clone(), vars);
        if let Some(old) = old {
            self.state_hash ^= table.key(&Fact::ZoneVar {
                zone,
                var: name,
                value: old,
            });
        }
        self.state_hash ^= table.key(&Fact::ZoneVar {
            zone,
            var: name,
            value,
        });
        old
    }

    // === Tokens ===

    /// Declare an empty zone. No-op if it exists.
    pub fn add_zone(&mut self, zone: ZoneId) {
        if !self.zones.contains_key(&zone) {
            self.zones.insert(zone, Vector::new());
        }
    }

    /// Hand out the next token id.
    pub fn allocate_token_id(&mut self, table: &ZobristTable) -> TokenId {
        let id = TokenId::new(self.next_token_id);
        self.state_hash ^= table.key(&Fact::NextTokenId(self.next_token_id));
        self.next_token_id += 1;
        self.state_hash ^= table.key(&Fact::NextTokenId(self.next_token_id));
        id
    }

    /// Replace a zone's token list, rehashing only the slots that changed.
    pub fn replace_zone_tokens(&mut self, table: &ZobristTable, zone: &ZoneId, tokens: Vector<Token>) {
        let old = self.zones.get(zone).cloned().unwrap_or_default();
        let len = old.len().max(tokens.len());
        for slot in 0..len {
            let before = old.get(slot);
            let after = tokens.get(slot);
            if before.map(|t| t.id) == after.map(|t| t.id) {
                continue;
            }
            self.state_hash = update_hash_token_placement(
                table,
                self.state_hash,
                zone,
                slot as u32,
                before.map(|t| (t.id, &t.kind)),
                after.map(|t| (t.id, &t.kind)),
            );
        }
        for token in &old {
            if self.token_locations.get(&token.id) == Some(zone) {
                self.token_locations.remove(&token.id);
            }
        }
        for token in &tokens {
            self.token_locations.insert(token.id, zone.clone());
        }
        self.zones.insert(zone.clone(), tokens);
    }

    /// Place a token at `slot` (clamped to the zone length).
    pub fn insert_token(&mut self, table: &ZobristTable, zone: &ZoneId, slot: usize, token: Token) {
        let is_new = self.token_locations.get(&token.id).is_none();
        if is_new {
            for (prop, value) in &token.props {
                self.state_hash ^= table.key(&Fact::TokenProp {
                    token: token.id,
                    prop,
                    value,
                });
            }
        }
        let mut tokens = self.zones.get(zone).cloned().unwrap_or_default();
        let slot = slot.min(tokens.len());
        tokens.insert(slot, token);
        self.replace_zone_tokens(table, zone, tokens);
    }

    /// Take a token off the board entirely. Returns its zone, slot and value.
    pub fn remove_token(&mut self, table: &ZobristTable, token: TokenId) -> Option<(ZoneId, usize, Token)> {
        let (zone, slot, removed) = self.detach(table, token)?;
        for (prop, value) in &removed.props {
            self.state_hash ^= table.key(&Fact::TokenProp {
                token,
                prop,
                value,
            });
        }
        Some((zone, slot, removed))
    }

    /// Move a token to another zone (or another slot of the same zone),
    /// keeping its identity and properties.
    pub fn move_token(&mut self, table: &ZobristTable, token: TokenId, to: &ZoneId, slot: usize) -> Option<ZoneId> {
        let (from, _, moved) = self.detach(table, token)?;
        let mut tokens = self.zones.get(to).cloned().unwrap_or_default();
        let slot = slot.min(tokens.len());
        tokens.insert(slot, moved);
        self.replace_zone_tokens(table, to, tokens);
        Some(from)
    }

    fn detach(&mut self, table: &ZobristTable, token: TokenId) -> Option<(ZoneId, usize, Token)> {
        let zone = self.token_locations.get(&token)?.clone();
        let mut tokens = self.zones.get(&zone)?.clone();
        let slot = tokens.iter().position(|t| t.id == token)?;
        let removed = tokens.remove(slot);
        self.replace_zone_tokens(table, &zone, tokens);
        Some((zone, slot, removed))
    }

    /// Write a token property; returns the previous value.
    pub fn set_token_prop(
        &mut self,
        table: &ZobristTable,
        token: TokenId,
        prop: &str,
        value: Value,
    ) -> Option<Option<Value>> {
        let zone = self.token_locations.get(&token)?.clone();
        let tokens = self.zones.get_mut(&zone)?;
        let slot = tokens.iter().position(|t| t.id == token)?;
        let target = tokens.get_mut(slot)?;
        let old = target.props.insert(prop.to_string(), value.clone());
        if let Some(old) = &old {
            self.state_hash ^= table.key(&Fact::TokenProp {
                token,
                prop,
                value: old,
            });
        }
        self.state_hash ^= table.key(&Fact::TokenProp {
            token,
            prop,
            value: &value,
        });
        Some(old)
    }

    // === Progression ===

    pub fn set_active_player(&mut self, table: &ZobristTable, player: PlayerId) {
        self.state_hash ^= table.key(&Fact::ActivePlayer(self.active_player));
        self.active_player = player;
        self.state_hash ^= table.key(&Fact::ActivePlayer(player));
    }

    pub fn set_current_phase(&mut self, table: &ZobristTable, phase: PhaseId) {
        self.state_hash ^= table.key(&Fact::CurrentPhase(&self.current_phase));
        self.state_hash ^= table.key(&Fact::CurrentPhase(&phase));
        self.current_phase = phase;
    }

    pub fn set_turn_count(&mut self, table: &ZobristTable, turn: u32) {
        self.state_hash ^= table.key(&Fact::TurnCount(self.turn_count));
        self.turn_count = turn;
        self.state_hash ^= table.key(&Fact::TurnCount(turn));
    }

    /// Write an action's usage counters. All-zero counters are dropped.
    pub fn set_usage(&mut self, table: &ZobristTable, action: &ActionId, usage: UsageCounts) {
        if let Some(old) = self.action_usage.remove(action) {
            self.state_hash ^= table.key(&Fact::ActionUsage { action, usage: old });
        }
        if !usage.is_zero() {
            self.state_hash ^= table.key(&Fact::ActionUsage { action, usage });
            self.action_usage.insert(action.clone(), usage);
        }
    }

    /// Rewrite every usage counter through `f`.
    pub fn map_usage(&mut self, table: &ZobristTable, f: impl Fn(UsageCounts) -> UsageCounts) {
        let entries: Vec<(ActionId, UsageCounts)> = self
            .action_usage
            .iter()
            .map(|(a, u)| (a.clone(), *u))
            .collect();
        for (action, usage) in entries {
            self.set_usage(table, &action, f(usage));
        }
    }

    pub fn set_turn_order(&mut self, table: &ZobristTable, runtime: TurnOrderRuntime) {
        self.state_hash ^= table.key(&Fact::TurnOrder(&self.turn_order));
        self.state_hash ^= table.key(&Fact::TurnOrder(&runtime));
        self.turn_order = runtime;
    }

    pub fn set_rng(&mut self, rng: Rng) {
        self.rng = rng;
    }

    // === Markers and visibility ===

    pub fn set_global_marker(&mut self, table: &ZobristTable, marker: &str, state: String) {
        if let Some(old) = self.global_markers.get(marker) {
            self.state_hash ^= table.key(&Fact::GlobalMarker { marker, state: old });
        }
        self.state_hash ^= table.key(&Fact::GlobalMarker {
            marker,
            state: &state,
        });
        self.global_markers.insert(marker.to_string(), state);
    }

    pub fn set_zone_marker(&mut self, table: &ZobristTable, zone: &ZoneId, marker: &str, state: String) {
        let mut markers = self.zone_markers.get(zone).cloned().unwrap_or_default();
        if let Some(old) = markers.get(marker) {
            self.state_hash ^= table.key(&Fact::ZoneMarker {
                zone,
                marker,
                state: old,
            });
        }
        self.state_hash ^= table.key(&Fact::ZoneMarker {
            zone,
            marker,
            state: &state,
        });
        markers.insert(marker.to_string(), state);
        self.zone_markers.insert(zone.clone(), markers);
    }

    /// Replace a zone's reveal grants. An empty list removes the entry.
    pub fn set_reveals(&mut self, table: &ZobristTable, zone: &ZoneId, grants: Vector<RevealGrant>) {
        if let Some(old) = self.reveals.remove(zone) {
            self.state_hash ^= table.key(&Fact::Reveals { zone, grants: &old });
        }
        if !grants.is_empty() {
            self.state_hash ^= table.key(&Fact::Reveals {
                zone,
                grants: &grants,
            });
            self.reveals.insert(zone.clone(), grants);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (ZobristTable, GameState) {
        let table = ZobristTable::new(99);
        let state = GameState::new(
            &table,
            2,
            PhaseId::new("main"),
            TurnOrderRuntime::RoundRobin,
            Rng::new(1),
        );
        (table, state)
    }

    fn token(table: &ZobristTable, state: &mut GameState, kind: &str) -> Token {
        Token {
            id: state.allocate_token_id(table),
            kind: TokenTypeId::new(kind),
            props: OrdMap::new(),
        }
    }

    fn assert_hash_consistent(table: &ZobristTable, state: &GameState) {
        assert_eq!(state.state_hash(), compute_full_hash(table, state));
    }

    #[test]
    fn test_clone_is_independent() {
        let (table, state) = fresh();
        let mut next = state.clone();
        next.set_global_var(&table, "aid", VarValue::Int(5));

        assert_eq!(state.global_var("aid"), None);
        assert_eq!(next.global_var("aid"), Some(VarValue::Int(5)));
        assert_ne!(state.state_hash(), next.state_hash());
    }

    #[test]
    fn test_token_moves_keep_hash_consistent() {
        let (table, mut state) = fresh();
        let a = ZoneId::new("a");
        let b = ZoneId::new("b");
        state.add_zone(a.clone());
        state.add_zone(b.clone());

        for kind in ["troop", "base", "troop"] {
            let t = token(&table, &mut state, kind);
            state.insert_token(&table, &a, 0, t);
            assert_hash_consistent(&table, &state);
        }

        let top = state.tokens(&a).unwrap()[0].id;
        assert_eq!(state.move_token(&table, top, &b, 0), Some(a.clone()));
        assert_eq!(state.token_zone(top), Some(&b));
        assert_hash_consistent(&table, &state);

        state.set_token_prop(&table, top, "activated", Value::Bool(true));
        assert_hash_consistent(&table, &state);

        let (zone, slot, removed) = state.remove_token(&table, top).unwrap();
        assert_eq!((zone, slot), (b, 0));
        assert_eq!(removed.prop("activated"), Some(&Value::Bool(true)));
        assert_eq!(state.token(top), None);
        assert_hash_consistent(&table, &state);
    }

    #[test]
    fn test_move_within_zone() {
        let (table, mut state) = fresh();
        let a = ZoneId::new("deck");
        state.add_zone(a.clone());
        let first = token(&table, &mut state, "card");
        let second = token(&table, &mut state, "card");
        let (fid, sid) = (first.id, second.id);
        state.insert_token(&table, &a, 0, first);
        state.insert_token(&table, &a, 0, second);

        state.move_token(&table, sid, &a, usize::MAX);
        let ids: Vec<_> = state.tokens(&a).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![fid, sid]);
        assert_hash_consistent(&table, &state);
    }

    #[test]
    fn test_progression_and_usage_hash() {
        let (table, mut state) = fresh();
        state.set_active_player(&table, PlayerId(1));
        state.set_current_phase(&table, PhaseId::new("ops"));
        state.set_turn_count(&table, 4);
        let rally = ActionId::new("rally");
        state.set_usage(&table, &rally, UsageCounts { turn: 1, phase: 1, game: 1 });
        assert_hash_consistent(&table, &state);

        state.map_usage(&table, |u| UsageCounts { turn: 0, phase: 0, ..u });
        assert_eq!(state.usage(&rally).game, 1);
        assert_hash_consistent(&table, &state);

        state.map_usage(&table, |_| UsageCounts::default());
        assert!(state.action_usage().is_empty());
        assert_hash_consistent(&table, &state);
    }

    #[test]
    fn test_markers_and_reveals_hash() {
        let (table, mut state) = fresh();
        let hue = ZoneId::new("hue");
        state.set_global_marker(&table, "trail", "2".into());
        state.set_zone_marker(&table, &hue, "support", "active".into());
        state.set_zone_var(&table, &hue, "terror", VarValue::Int(1));
        state.set_player_var(&table, PlayerId(0), "resources", VarValue::Int(7));
        state.set_reveals(
            &table,
            &hue,
            Vector::unit(RevealGrant {
                observers: 0b01,
                filter: vec![],
            }),
        );
        assert_hash_consistent(&table, &state);

        state.set_reveals(&table, &hue, Vector::new());
        assert!(state.reveals().is_empty());
        assert_hash_consistent(&table, &state);
    }

    #[test]
    fn test_rng_is_not_hashed() {
        let (_, state) = fresh();
        let mut other = state.clone();
        other.set_rng(Rng::new(2));
        assert_eq!(state.state_hash(), other.state_hash());
        assert_ne!(state, other);
    }
}
