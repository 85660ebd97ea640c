//! Definition validation.
//!
//! `validate_game_def` is the only way to obtain a [`ValidatedGameDef`], and
//! every kernel entry point takes one. Reference checks therefore happen
//! exactly once, and the derived indices (adjacency graph, Zobrist keys,
//! table index, id lookups) are built alongside.

use std::ops::Deref;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::ast::{Effect, PlayerSel, VarTarget, ZoneSel};
use crate::core::{ActionId, ContractError, PhaseId, TokenTypeId, ZoneId, MAX_PLAYERS};
use crate::hash::ZobristTable;
use crate::spatial::{AdjacencyGraph, GraphWarning};

use super::game_def::{ActionDef, EventPattern, GameDef, MarkerDef, PhaseDef, VarDef, ZoneDef};
use super::tables::{TableIndex, TableIssue};
use super::turn_flow::TurnOrderConfig;

/// A game definition that passed validation, with its derived indices.
///
/// Cheap to clone; the definition itself is shared.
#[derive(Clone, Debug)]
pub struct ValidatedGameDef {
    def: Arc<GameDef>,
    graph: Arc<AdjacencyGraph>,
    graph_warnings: Vec<GraphWarning>,
    zobrist: ZobristTable,
    tables: Arc<TableIndex>,
    zones: FxHashMap<ZoneId, usize>,
    actions: FxHashMap<ActionId, usize>,
    phases: FxHashMap<PhaseId, usize>,
    token_types: FxHashMap<TokenTypeId, usize>,
}

impl Deref for ValidatedGameDef {
    type Target = GameDef;

    fn deref(&self) -> &GameDef {
        &self.def
    }
}

impl ValidatedGameDef {
    #[must_use]
    pub fn def(&self) -> &GameDef {
        &self.def
    }

    #[must_use]
    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }

    /// Normalizations applied while building the adjacency graph.
    #[must_use]
    pub fn graph_warnings(&self) -> &[GraphWarning] {
        &self.graph_warnings
    }

    #[must_use]
    pub fn zobrist(&self) -> &ZobristTable {
        &self.zobrist
    }

    #[must_use]
    pub fn tables(&self) -> &TableIndex {
        &self.tables
    }

    #[must_use]
    pub fn table_issues(&self) -> &[TableIssue] {
        self.tables.issues()
    }

    #[must_use]
    pub fn zone_def(&self, zone: &ZoneId) -> Option<&ZoneDef> {
        self.zones.get(zone).map(|&i| &self.def.zones[i])
    }

    #[must_use]
    pub fn action(&self, action: &ActionId) -> Option<&ActionDef> {
        self.actions.get(action).map(|&i| &self.def.actions[i])
    }

    #[must_use]
    pub fn phase(&self, phase: &PhaseId) -> Option<&PhaseDef> {
        self.phases.get(phase).map(|&i| &self.def.turn_structure.phases[i])
    }

    /// Position of a phase in the turn structure.
    #[must_use]
    pub fn phase_index(&self, phase: &PhaseId) -> Option<usize> {
        self.phases.get(phase).copied()
    }

    #[must_use]
    pub fn has_token_type(&self, kind: &TokenTypeId) -> bool {
        self.token_types.contains_key(kind)
    }

    #[must_use]
    pub fn token_type(&self, kind: &TokenTypeId) -> Option<&super::game_def::TokenTypeDef> {
        self.token_types.get(kind).map(|&i| &self.def.token_types[i])
    }

    #[must_use]
    pub fn global_var_def(&self, name: &str) -> Option<&VarDef> {
        self.def.global_vars.iter().find(|v| v.name == name)
    }

    #[must_use]
    pub fn player_var_def(&self, name: &str) -> Option<&VarDef> {
        self.def.per_player_vars.iter().find(|v| v.name == name)
    }

    #[must_use]
    pub fn zone_var_def(&self, name: &str) -> Option<&VarDef> {
        self.def.zone_vars.iter().find(|v| v.name == name)
    }

    #[must_use]
    pub fn marker_def(&self, id: &str) -> Option<&MarkerDef> {
        self.def.markers.iter().find(|m| m.id == id)
    }
}

fn index_ids<'a, K, I>(
    kind: &'static str,
    ids: I,
    errors: &mut Vec<ContractError>,
) -> FxHashMap<K, usize>
where
    K: std::hash::Hash + Eq + Clone + std::fmt::Display + 'a,
    I: IntoIterator<Item = &'a K>,
{
    let mut map = FxHashMap::default();
    for (i, id) in ids.into_iter().enumerate() {
        if map.insert(id.clone(), i).is_some() {
            errors.push(ContractError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    map
}

fn unique_names<'a>(
    kind: &'static str,
    names: impl IntoIterator<Item = &'a str>,
    errors: &mut Vec<ContractError>,
) -> FxHashSet<&'a str> {
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            errors.push(ContractError::DuplicateId {
                kind,
                id: name.to_string(),
            });
        }
    }
    seen
}

/// Reference tables for walking effect programs.
struct Scope<'a> {
    zones: &'a FxHashMap<ZoneId, usize>,
    token_types: &'a FxHashMap<TokenTypeId, usize>,
    global_vars: FxHashSet<&'a str>,
    player_vars: FxHashSet<&'a str>,
    zone_vars: FxHashSet<&'a str>,
    markers: FxHashSet<&'a str>,
    windows: FxHashSet<&'a str>,
}

impl Scope<'_> {
    fn unknown(kind: &'static str, id: impl ToString, context: &str) -> ContractError {
        ContractError::UnknownReference {
            kind,
            id: id.to_string(),
            context: context.to_string(),
        }
    }

    fn check_zone(&self, zone: &ZoneSel, context: &str, errors: &mut Vec<ContractError>) {
        if let ZoneSel::Id(id) = zone {
            if !self.zones.contains_key(id) {
                errors.push(Self::unknown("zone", id, context));
            }
        }
    }

    fn check_target(&self, target: &VarTarget, context: &str, errors: &mut Vec<ContractError>) {
        let (known, kind) = match target {
            VarTarget::Global { var } => (self.global_vars.contains(var.as_str()), "global variable"),
            VarTarget::Player { var, .. } => (self.player_vars.contains(var.as_str()), "player variable"),
            VarTarget::Zone { zone, var } => {
                self.check_zone(zone, context, errors);
                (self.zone_vars.contains(var.as_str()), "zone variable")
            }
        };
        if !known {
            errors.push(Self::unknown(kind, target.var(), context));
        }
    }

    fn check_effects(
        &self,
        effects: &[Effect],
        context: &str,
        allow_choices: bool,
        errors: &mut Vec<ContractError>,
    ) {
        for effect in effects {
            self.check_effect(effect, context, allow_choices, errors);
        }
    }

    fn check_effect(
        &self,
        effect: &Effect,
        context: &str,
        allow_choices: bool,
        errors: &mut Vec<ContractError>,
    ) {
        match effect {
            Effect::SetVar { target, .. } | Effect::AddVar { target, .. } => {
                self.check_target(target, context, errors);
            }
            Effect::TransferVar { from, to, .. } => {
                self.check_target(from, context, errors);
                self.check_target(to, context, errors);
            }
            Effect::CreateToken { kind, zone, .. } => {
                if !self.token_types.contains_key(kind) {
                    errors.push(Self::unknown("token type", kind, context));
                }
                self.check_zone(zone, context, errors);
            }
            Effect::MoveToken { to, .. } => self.check_zone(to, context, errors),
            Effect::MoveAll { from, to, .. } | Effect::Draw { from, to, .. } => {
                self.check_zone(from, context, errors);
                self.check_zone(to, context, errors);
            }
            Effect::Shuffle { zone }
            | Effect::Reveal { zone, .. }
            | Effect::Conceal { zone, .. } => self.check_zone(zone, context, errors),
            Effect::SetMarker { zone, marker, .. } | Effect::ShiftMarker { zone, marker, .. } => {
                if let Some(zone) = zone {
                    self.check_zone(zone, context, errors);
                }
                if !self.markers.contains(marker.as_str()) {
                    errors.push(Self::unknown("marker", marker, context));
                }
            }
            Effect::SetEligibility { window, .. } => {
                if !self.windows.contains(window.as_str()) {
                    errors.push(Self::unknown("override window", window, context));
                }
            }
            Effect::If {
                then, otherwise, ..
            } => {
                self.check_effects(then, context, allow_choices, errors);
                self.check_effects(otherwise, context, allow_choices, errors);
            }
            Effect::ForEach { effects, .. }
            | Effect::Let { effects, .. }
            | Effect::Reduce { effects, .. }
            | Effect::RollRandom { effects, .. } => {
                self.check_effects(effects, context, allow_choices, errors);
            }
            Effect::ChooseOne { .. } | Effect::ChooseN { .. } => {
                if !allow_choices {
                    errors.push(ContractError::ChoiceOutsideAction {
                        context: context.to_string(),
                    });
                }
            }
            Effect::DestroyToken { .. }
            | Effect::MoveTokenAdjacent { .. }
            | Effect::SetTokenProp { .. } => {}
        }
    }
}

fn check_var_defs(vars: &[VarDef], errors: &mut Vec<ContractError>) {
    for var in vars {
        let (min, max) = (var.min.unwrap_or(i64::MIN), var.max.unwrap_or(i64::MAX));
        let init_ok = match var.init {
            crate::core::VarValue::Int(n) => (min..=max).contains(&n),
            crate::core::VarValue::Bool(_) => var.min.is_none() && var.max.is_none(),
        };
        if min > max || !init_ok {
            errors.push(ContractError::InvalidVarBounds {
                var: var.name.clone(),
                min,
                max,
            });
        }
    }
}

fn check_turn_order(
    def: &GameDef,
    phases: &FxHashMap<PhaseId, usize>,
    zones: &FxHashMap<ZoneId, usize>,
    actions: &FxHashMap<ActionId, usize>,
    errors: &mut Vec<ContractError>,
) {
    let seat_ok = |seat: &u8| (*seat as usize) < def.players.max;
    match &def.turn_order {
        TurnOrderConfig::RoundRobin | TurnOrderConfig::Simultaneous => {}
        TurnOrderConfig::FixedOrder { order } => {
            if order.is_empty() || !order.iter().all(seat_ok) {
                errors.push(ContractError::TurnOrder(
                    "fixed order must list valid seats".into(),
                ));
            }
        }
        TurnOrderConfig::CardDriven(config) => {
            if !config.faction_order.iter().all(seat_ok) {
                errors.push(ContractError::TurnOrder(
                    "faction order names a seat beyond the player range".into(),
                ));
            }
            if let Some(cards) = &config.cards {
                for zone in [&cards.draw, &cards.lookahead, &cards.played] {
                    if !zones.contains_key(zone) {
                        errors.push(Scope::unknown("zone", zone, "card lifecycle"));
                    }
                }
            }
            if let Some(plan) = &config.coup_plan {
                if plan.phases.is_empty() {
                    errors.push(ContractError::TurnOrder("coup plan has no phases".into()));
                }
                for phase in plan.phases.iter().chain(&plan.final_round_omit_phases) {
                    if !phases.contains_key(phase) {
                        errors.push(Scope::unknown("phase", phase, "coup plan"));
                    }
                }
                let card_phases = def
                    .turn_structure
                    .phases
                    .iter()
                    .filter(|p| !plan.phases.contains(&p.id))
                    .count();
                if card_phases == 0 {
                    errors.push(ContractError::TurnOrder(
                        "every phase belongs to the coup plan".into(),
                    ));
                }
                if config.cards.is_none() {
                    errors.push(ContractError::TurnOrder(
                        "coup plan requires a card lifecycle".into(),
                    ));
                }
            }
            let gated = config
                .monsoon
                .iter()
                .flat_map(|m| m.restrictions.iter().map(|r| &r.action))
                .chain(config.pivotal.iter().flat_map(|p| p.actions.iter()));
            for action in gated {
                if !actions.contains_key(action) {
                    errors.push(Scope::unknown("action", action, "turn order"));
                }
            }
        }
    }
}

/// Check a definition and build its derived indices.
pub fn validate_game_def(def: GameDef) -> Result<ValidatedGameDef, Vec<ContractError>> {
    let mut errors = Vec::new();

    if def.players.min == 0 || def.players.min > def.players.max || def.players.max > MAX_PLAYERS {
        errors.push(ContractError::InvalidPlayerRange {
            min: def.players.min,
            max: def.players.max,
        });
    }
    if def.turn_structure.phases.is_empty() {
        errors.push(ContractError::EmptyTurnStructure);
    }

    let zones = index_ids("zone", def.zones.iter().map(|z| &z.id), &mut errors);
    let actions = index_ids("action", def.actions.iter().map(|a| &a.id), &mut errors);
    let phases = index_ids(
        "phase",
        def.turn_structure.phases.iter().map(|p| &p.id),
        &mut errors,
    );
    let token_types = index_ids("token type", def.token_types.iter().map(|t| &t.id), &mut errors);
    index_ids("trigger", def.triggers.iter().map(|t| &t.id), &mut errors);
    index_ids("table", def.tables.iter().map(|t| &t.id), &mut errors);

    for zone in &def.zones {
        if zone.owner.is_some_and(|seat| seat as usize >= def.players.max) {
            errors.push(Scope::unknown("seat", zone.owner.unwrap_or_default(), zone.id.as_str()));
        }
    }

    check_var_defs(&def.global_vars, &mut errors);
    check_var_defs(&def.per_player_vars, &mut errors);
    check_var_defs(&def.zone_vars, &mut errors);
    for marker in &def.markers {
        if marker.state_index(&marker.default).is_none() {
            errors.push(ContractError::InvalidMarkerDefault {
                marker: marker.id.clone(),
                default: marker.default.clone(),
            });
        }
    }

    let windows = match &def.turn_order {
        TurnOrderConfig::CardDriven(config) => {
            unique_names("override window", config.override_windows.iter().map(|w| w.id.as_str()), &mut errors)
        }
        _ => FxHashSet::default(),
    };
    let scope = Scope {
        zones: &zones,
        token_types: &token_types,
        global_vars: unique_names("global variable", def.global_vars.iter().map(|v| v.name.as_str()), &mut errors),
        player_vars: unique_names("player variable", def.per_player_vars.iter().map(|v| v.name.as_str()), &mut errors),
        zone_vars: unique_names("zone variable", def.zone_vars.iter().map(|v| v.name.as_str()), &mut errors),
        markers: unique_names("marker", def.markers.iter().map(|m| m.id.as_str()), &mut errors),
        windows,
    };

    scope.check_effects(&def.setup, "setup", false, &mut errors);
    for phase in &def.turn_structure.phases {
        let context = format!("phase `{}`", phase.id);
        scope.check_effects(&phase.on_enter, &context, false, &mut errors);
        scope.check_effects(&phase.on_exit, &context, false, &mut errors);
    }
    for action in &def.actions {
        let context = format!("action `{}`", action.id);
        for phase in &action.phases {
            if !phases.contains_key(phase) {
                errors.push(Scope::unknown("phase", phase, &context));
            }
        }
        if matches!(action.executor, Some(PlayerSel::All | PlayerSel::AllOther)) {
            errors.push(ContractError::UnknownReference {
                kind: "single-player executor",
                id: action.executor.as_ref().map(ToString::to_string).unwrap_or_default(),
                context: context.clone(),
            });
        }
        scope.check_effects(&action.cost, &context, true, &mut errors);
        scope.check_effects(&action.effects, &context, true, &mut errors);
    }
    for trigger in &def.triggers {
        let context = format!("trigger `{}`", trigger.id);
        let phase_ref = match &trigger.on {
            EventPattern::PhaseEnter { phase } | EventPattern::PhaseExit { phase } => phase.as_ref(),
            _ => None,
        };
        if let Some(phase) = phase_ref {
            if !phases.contains_key(phase) {
                errors.push(Scope::unknown("phase", phase, &context));
            }
        }
        if let EventPattern::ActionResolved { action: Some(action) } = &trigger.on {
            if !actions.contains_key(action) {
                errors.push(Scope::unknown("action", action, &context));
            }
        }
        scope.check_effects(&trigger.effects, &context, false, &mut errors);
    }
    for constraint in &def.stacking {
        for zone in &constraint.zones {
            if !zones.contains_key(zone) {
                errors.push(Scope::unknown("zone", zone, &format!("stacking `{}`", constraint.id)));
            }
        }
    }
    check_turn_order(&def, &phases, &zones, &actions, &mut errors);

    let graph = match AdjacencyGraph::build(&def.zones) {
        Ok((graph, warnings)) => Some((graph, warnings)),
        Err(graph_errors) => {
            errors.extend(graph_errors);
            None
        }
    };

    if !errors.is_empty() {
        debug!(count = errors.len(), game = %def.id, "game definition rejected");
        return Err(errors);
    }
    let Some((graph, graph_warnings)) = graph else {
        return Err(errors);
    };
    for warning in &graph_warnings {
        warn!(code = warning.code(), ?warning, "adjacency normalized");
    }

    let tables = TableIndex::build(&def.tables, &def.data_assets);
    for issue in tables.issues() {
        warn!(code = issue.code(), ?issue, "data table issue");
    }

    let fingerprint = ZobristTable::fingerprint(&serde_json::to_vec(&def).unwrap_or_default());

    Ok(ValidatedGameDef {
        def: Arc::new(def),
        graph: Arc::new(graph),
        graph_warnings,
        zobrist: ZobristTable::new(fingerprint),
        tables: Arc::new(tables),
        zones,
        actions,
        phases,
        token_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ActionDef, TriggerDef, ZoneDef};

    fn base() -> GameDef {
        let mut def = GameDef::new("test", 2, 4);
        def.zones = vec![ZoneDef::new("a").adjacent_to("b"), ZoneDef::new("b")];
        def.global_vars = vec![VarDef::int("aid", 10).with_bounds(0, 75)];
        def
    }

    #[test]
    fn test_valid_definition() {
        let validated = validate_game_def(base()).unwrap();
        assert_eq!(validated.graph_warnings().len(), 1);
        assert!(validated.zone_def(&ZoneId::new("a")).is_some());
        assert_eq!(validated.phase_index(&PhaseId::new("main")), Some(0));
    }

    #[test]
    fn test_duplicate_and_unknown_references() {
        let mut def = base();
        def.zones.push(ZoneDef::new("a"));
        def.actions.push(
            ActionDef::new("rally")
                .in_phase("ops")
                .with_effects(vec![Effect::add_global("patronage", 1)]),
        );
        let errors = validate_game_def(def).unwrap_err();
        let codes: Vec<_> = errors.iter().map(ContractError::code).collect();
        assert!(codes.contains(&"CONTRACT_DUPLICATE_ID"));
        assert_eq!(
            codes.iter().filter(|c| **c == "CONTRACT_UNKNOWN_REFERENCE").count(),
            2
        );
    }

    #[test]
    fn test_choice_outside_action_rejected() {
        let mut def = base();
        def.triggers.push(TriggerDef {
            id: "on-enter".into(),
            on: EventPattern::TurnStart,
            when: None,
            effects: vec![Effect::choose_one("$z", crate::ast::Query::zones())],
        });
        let errors = validate_game_def(def).unwrap_err();
        assert_eq!(errors[0].code(), "CONTRACT_CHOICE_OUTSIDE_ACTION");
    }

    #[test]
    fn test_bad_bounds_and_players() {
        let mut def = base();
        def.players.min = 0;
        def.global_vars.push(VarDef::int("trail", 9).with_bounds(0, 4));
        def.global_vars.push(VarDef {
            name: "flag".into(),
            init: crate::core::VarValue::Bool(true),
            min: Some(0),
            max: None,
        });
        let errors = validate_game_def(def).unwrap_err();
        let codes: Vec<_> = errors.iter().map(ContractError::code).collect();
        assert_eq!(
            codes,
            vec![
                "CONTRACT_INVALID_PLAYER_RANGE",
                "CONTRACT_INVALID_VAR_BOUNDS",
                "CONTRACT_INVALID_VAR_BOUNDS"
            ]
        );
    }

    #[test]
    fn test_adjacency_errors_surface() {
        let mut def = base();
        def.zones[1] = ZoneDef::new("b").adjacent_to("b");
        let errors = validate_game_def(def).unwrap_err();
        assert_eq!(errors[0].code(), "CONTRACT_ADJACENCY_SELF_LOOP");
    }

    #[test]
    fn test_same_definition_same_keys() {
        let a = validate_game_def(base()).unwrap();
        let b = validate_game_def(base()).unwrap();
        assert_eq!(a.zobrist(), b.zobrist());
    }
}
