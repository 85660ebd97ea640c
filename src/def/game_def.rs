//! The game definition data model.
//!
//! `GameDef` is the contract between the external compiler and the kernel.
//! It is plain serde data; nothing here is interpreted until
//! [`validate_game_def`](super::validate_game_def) has checked the references
//! and wrapped it in a [`ValidatedGameDef`](super::ValidatedGameDef).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Condition, Effect, PlayerSel, Query, ValueExpr};
use crate::core::{
    ActionId, LimitScope, PhaseId, TokenTypeId, TriggerId, Value, VarValue, ZoneId,
};

use super::tables::{DataAsset, TableContract};
use super::turn_flow::{ActionClass, TurnOrderConfig};

/// Immutable game specification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDef {
    pub id: String,
    pub players: PlayerRange,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    #[serde(default)]
    pub token_types: Vec<TokenTypeDef>,
    #[serde(default)]
    pub global_vars: Vec<VarDef>,
    #[serde(default)]
    pub per_player_vars: Vec<VarDef>,
    #[serde(default)]
    pub zone_vars: Vec<VarDef>,
    #[serde(default)]
    pub markers: Vec<MarkerDef>,
    /// Effects run once by `initial_state`, in execution mode.
    #[serde(default)]
    pub setup: Vec<Effect>,
    pub turn_structure: TurnStructure,
    #[serde(default)]
    pub turn_order: TurnOrderConfig,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub triggers: Vec<TriggerDef>,
    #[serde(default)]
    pub terminal: TerminalDef,
    #[serde(default)]
    pub stacking: Vec<StackingConstraint>,
    #[serde(default)]
    pub tables: Vec<TableContract>,
    #[serde(default)]
    pub data_assets: Vec<DataAsset>,
}

impl GameDef {
    /// A definition with one phase and nothing else; a starting point for
    /// builders and tests.
    pub fn new(id: impl Into<String>, min_players: usize, max_players: usize) -> Self {
        Self {
            id: id.into(),
            players: PlayerRange {
                min: min_players,
                max: max_players,
            },
            zones: Vec::new(),
            token_types: Vec::new(),
            global_vars: Vec::new(),
            per_player_vars: Vec::new(),
            zone_vars: Vec::new(),
            markers: Vec::new(),
            setup: Vec::new(),
            turn_structure: TurnStructure {
                phases: vec![PhaseDef::new("main")],
            },
            turn_order: TurnOrderConfig::default(),
            actions: Vec::new(),
            triggers: Vec::new(),
            terminal: TerminalDef::default(),
            stacking: Vec::new(),
            tables: Vec::new(),
            data_assets: Vec::new(),
        }
    }

    /// Look up a zone declaration.
    #[must_use]
    pub fn zone(&self, id: &ZoneId) -> Option<&ZoneDef> {
        self.zones.iter().find(|z| &z.id == id)
    }
}

/// Supported player counts, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRange {
    pub min: usize,
    pub max: usize,
}

// === Zones ===

/// Who may see a zone's contents without a reveal grant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    #[default]
    Public,
    Owner,
    Hidden,
}

/// How a zone orders its tokens. Slot 0 is the top.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneOrdering {
    /// Placement honors the requested position.
    #[default]
    Stack,
    /// Tokens enter at the bottom unless placed at random.
    Queue,
    /// Unordered; tokens are kept sorted by id.
    Set,
}

/// One declared edge of the adjacency graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyDecl {
    pub to: ZoneId,
    /// Label used by `MoveTokenAdjacent` (e.g. `north`).
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDef {
    pub id: ZoneId,
    /// Owning seat for per-seat zones.
    #[serde(default)]
    pub owner: Option<u8>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub ordering: ZoneOrdering,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub adjacent: Vec<AdjacencyDecl>,
}

impl ZoneDef {
    /// A public stack zone with no neighbors.
    pub fn new(id: impl Into<ZoneId>) -> Self {
        Self {
            id: id.into(),
            owner: None,
            visibility: Visibility::Public,
            ordering: ZoneOrdering::Stack,
            category: None,
            adjacent: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_owner(mut self, seat: u8) -> Self {
        self.owner = Some(seat);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_ordering(mut self, ordering: ZoneOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Declare a neighbor.
    #[must_use]
    pub fn adjacent_to(mut self, to: impl Into<ZoneId>) -> Self {
        self.adjacent.push(AdjacencyDecl {
            to: to.into(),
            direction: None,
        });
        self
    }

    /// Declare a neighbor reachable by a named direction.
    #[must_use]
    pub fn adjacent_via(mut self, to: impl Into<ZoneId>, direction: impl Into<String>) -> Self {
        self.adjacent.push(AdjacencyDecl {
            to: to.into(),
            direction: Some(direction.into()),
        });
        self
    }
}

// === Tokens, variables, markers ===

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTypeDef {
    pub id: TokenTypeId,
    /// Default property values for new tokens of this type.
    #[serde(default)]
    pub props: BTreeMap<String, Value>,
}

impl TokenTypeDef {
    pub fn new(id: impl Into<TokenTypeId>) -> Self {
        Self {
            id: id.into(),
            props: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_prop(mut self, prop: impl Into<String>, value: Value) -> Self {
        self.props.insert(prop.into(), value);
        self
    }
}

/// A declared variable. Integer writes clamp into `[min, max]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    pub init: VarValue,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl VarDef {
    /// An unbounded integer variable.
    pub fn int(name: impl Into<String>, init: i64) -> Self {
        Self {
            name: name.into(),
            init: VarValue::Int(init),
            min: None,
            max: None,
        }
    }

    /// A boolean variable.
    pub fn boolean(name: impl Into<String>, init: bool) -> Self {
        Self {
            name: name.into(),
            init: VarValue::Bool(init),
            min: None,
            max: None,
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Clamp an integer into the declared range.
    #[must_use]
    pub fn clamp(&self, n: i64) -> i64 {
        let n = self.min.map_or(n, |min| n.max(min));
        self.max.map_or(n, |max| n.min(max))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerScope {
    /// One global instance.
    #[default]
    Global,
    /// One instance per zone, optionally limited to a category.
    Zone { category: Option<String> },
}

/// A marker lattice: an ordered list of states with a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerDef {
    pub id: String,
    pub states: Vec<String>,
    pub default: String,
    #[serde(default)]
    pub scope: MarkerScope,
}

impl MarkerDef {
    /// Index of a state on the lattice.
    #[must_use]
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    /// Whether the marker exists on the given zone category.
    #[must_use]
    pub fn applies_to_zone(&self, category: Option<&str>) -> bool {
        match &self.scope {
            MarkerScope::Global => false,
            MarkerScope::Zone { category: None } => true,
            MarkerScope::Zone {
                category: Some(wanted),
            } => category == Some(wanted.as_str()),
        }
    }
}

// === Turn structure ===

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub id: PhaseId,
    #[serde(default)]
    pub on_enter: Vec<Effect>,
    #[serde(default)]
    pub on_exit: Vec<Effect>,
}

impl PhaseDef {
    pub fn new(id: impl Into<PhaseId>) -> Self {
        Self {
            id: id.into(),
            on_enter: Vec::new(),
            on_exit: Vec::new(),
        }
    }
}

/// The ordered phases of one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStructure {
    pub phases: Vec<PhaseDef>,
}

// === Actions ===

/// A declared parameter and the query producing its domain.
///
/// Domains are evaluated in declaration order with earlier parameters
/// already bound, so a later domain may depend on an earlier choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub domain: Query,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimit {
    pub scope: LimitScope,
    pub max: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: ActionId,
    /// Who may take the action.
    #[serde(default = "default_actor")]
    pub actor: PlayerSel,
    /// Whom the effects run as; the actor when absent.
    #[serde(default)]
    pub executor: Option<PlayerSel>,
    /// Phases the action is available in; every phase when empty.
    #[serde(default)]
    pub phases: Vec<PhaseId>,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    #[serde(default)]
    pub pre: Option<Condition>,
    #[serde(default)]
    pub cost: Vec<Effect>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub limits: Vec<UsageLimit>,
    /// Card-driven action class.
    #[serde(default)]
    pub class: Option<ActionClass>,
}

fn default_actor() -> PlayerSel {
    PlayerSel::Active
}

impl ActionDef {
    /// An action the active player may take in any phase.
    pub fn new(id: impl Into<ActionId>) -> Self {
        Self {
            id: id.into(),
            actor: PlayerSel::Active,
            executor: None,
            phases: Vec::new(),
            params: Vec::new(),
            pre: None,
            cost: Vec::new(),
            effects: Vec::new(),
            limits: Vec::new(),
            class: None,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor: PlayerSel) -> Self {
        self.actor = actor;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: PlayerSel) -> Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub fn in_phase(mut self, phase: impl Into<PhaseId>) -> Self {
        self.phases.push(phase.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, domain: Query) -> Self {
        self.params.push(ParamDef {
            name: name.into(),
            domain,
        });
        self
    }

    #[must_use]
    pub fn with_pre(mut self, pre: Condition) -> Self {
        self.pre = Some(pre);
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: Vec<Effect>) -> Self {
        self.cost = cost;
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, scope: LimitScope, max: u32) -> Self {
        self.limits.push(UsageLimit { scope, max });
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: ActionClass) -> Self {
        self.class = Some(class);
        self
    }

    /// Whether the cost or effect program contains a choice node.
    #[must_use]
    pub fn has_choices(&self) -> bool {
        self.cost.iter().chain(&self.effects).any(Effect::contains_choice)
    }
}

// === Triggers ===

/// Which events a trigger listens for. `None` fields match any value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventPattern {
    PhaseEnter { phase: Option<PhaseId> },
    PhaseExit { phase: Option<PhaseId> },
    TurnStart,
    TurnEnd,
    ActionResolved { action: Option<ActionId> },
    VarChanged { var: Option<String> },
    TokenEntered { zone: Option<ZoneId> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDef {
    pub id: TriggerId,
    pub on: EventPattern,
    #[serde(default)]
    pub when: Option<Condition>,
    pub effects: Vec<Effect>,
}

// === Terminal conditions ===

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndOutcome {
    Win {
        player: PlayerSel,
        #[serde(default)]
        victory: Option<String>,
    },
    LossAll,
    Draw,
    /// Rank players by the end-scoring expression.
    Score,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndCondition {
    pub when: Condition,
    pub outcome: EndOutcome,
}

/// Per-player score, evaluated with that player as actor. Higher ranks first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringDef {
    pub score: ValueExpr,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalDef {
    /// Checked in declaration order; the first that holds ends the game.
    #[serde(default)]
    pub conditions: Vec<EndCondition>,
    #[serde(default)]
    pub scoring: Option<ScoringDef>,
}

// === Stacking ===

/// Caps how many matching tokens one zone may hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackingConstraint {
    pub id: String,
    /// Zones covered; combined with `category`. Both empty means every zone.
    #[serde(default)]
    pub zones: Vec<ZoneId>,
    #[serde(default)]
    pub category: Option<String>,
    /// Token kinds counted; every kind when empty.
    #[serde(default)]
    pub token_kinds: Vec<TokenTypeId>,
    pub max: u32,
}

impl StackingConstraint {
    /// Whether the constraint covers a zone.
    #[must_use]
    pub fn covers_zone(&self, zone: &ZoneDef) -> bool {
        let by_id = self.zones.contains(&zone.id);
        let by_category = self
            .category
            .as_ref()
            .is_some_and(|c| zone.category.as_ref() == Some(c));
        (self.zones.is_empty() && self.category.is_none()) || by_id || by_category
    }

    /// Whether the constraint counts a token kind.
    #[must_use]
    pub fn counts_kind(&self, kind: &TokenTypeId) -> bool {
        self.token_kinds.is_empty() || self.token_kinds.contains(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_clamp() {
        let var = VarDef::int("aid", 10).with_bounds(0, 75);
        assert_eq!(var.clamp(-4), 0);
        assert_eq!(var.clamp(80), 75);
        assert_eq!(var.clamp(30), 30);
        assert_eq!(VarDef::int("free", 0).clamp(i64::MIN), i64::MIN);
    }

    #[test]
    fn test_stacking_coverage() {
        let province = ZoneDef::new("quang-tri").with_category("province");
        let city = ZoneDef::new("hue").with_category("city");
        let constraint = StackingConstraint {
            id: "bases".into(),
            zones: vec![],
            category: Some("province".into()),
            token_kinds: vec![TokenTypeId::new("base")],
            max: 2,
        };
        assert!(constraint.covers_zone(&province));
        assert!(!constraint.covers_zone(&city));
        assert!(constraint.counts_kind(&TokenTypeId::new("base")));
        assert!(!constraint.counts_kind(&TokenTypeId::new("troop")));
    }

    #[test]
    fn test_action_defaults_from_json() {
        let action: ActionDef = serde_json::from_str(r#"{"id":"pass"}"#).unwrap();
        assert_eq!(action.actor, PlayerSel::Active);
        assert!(action.params.is_empty());
        assert!(!action.has_choices());
    }

    #[test]
    fn test_marker_zone_scope() {
        let marker = MarkerDef {
            id: "support".into(),
            states: vec!["opposed".into(), "neutral".into(), "support".into()],
            default: "neutral".into(),
            scope: MarkerScope::Zone {
                category: Some("province".into()),
            },
        };
        assert!(marker.applies_to_zone(Some("province")));
        assert!(!marker.applies_to_zone(None));
        assert_eq!(marker.state_index("support"), Some(2));
    }
}
