//! Initial state construction.

use tracing::debug;

use crate::core::{ContractError, GameState, KernelConfig, KernelError, PlayerId, Rng};
use crate::def::{MarkerScope, TurnOrderConfig, ValidatedGameDef};
use crate::effects::{apply_effects, EffectContext, OpBudget};
use crate::eval::Bindings;
use crate::turn::TurnOrderRuntime;

use super::Transition;

/// Build the opening state for `player_count` seats from `seed`.
pub fn initial_state(def: &ValidatedGameDef, seed: u64, player_count: usize) -> Result<GameState, KernelError> {
    initial_state_with_config(def, seed, player_count, &KernelConfig::default())
}

/// Zones, variables and markers take their declared defaults, setup runs
/// (its events are not dispatched), a card-driven campaign deals its opening
/// cards, and the first turn and phase are announced. The kernel then
/// advances to the first decision point.
pub fn initial_state_with_config(
    def: &ValidatedGameDef,
    seed: u64,
    player_count: usize,
    config: &KernelConfig,
) -> Result<GameState, KernelError> {
    let range = &def.players;
    if player_count < range.min || player_count > range.max {
        return Err(ContractError::PlayerCountOutOfRange {
            count: player_count,
            min: range.min,
            max: range.max,
        }
        .into());
    }
    check_seated(&def.turn_order, player_count)?;
    let first_phase = match &def.turn_order {
        TurnOrderConfig::CardDriven(cards) => def
            .turn_structure
            .phases
            .iter()
            .find(|p| !cards.is_coup_phase(&p.id)),
        _ => def.turn_structure.phases.first(),
    }
    .map(|p| p.id.clone())
    .ok_or(ContractError::EmptyTurnStructure)?;

    let table = def.zobrist();
    let mut state = GameState::new(
        table,
        player_count,
        first_phase.clone(),
        TurnOrderRuntime::for_config(&def.turn_order),
        Rng::new(seed),
    );

    for zone in &def.zones {
        state.add_zone(zone.id.clone());
    }
    for var in &def.global_vars {
        state.set_global_var(table, &var.name, var.init);
    }
    for player in PlayerId::all(player_count) {
        for var in &def.per_player_vars {
            state.set_player_var(table, player, &var.name, var.init);
        }
    }
    for zone in &def.zones {
        for var in &def.zone_vars {
            state.set_zone_var(table, &zone.id, &var.name, var.init);
        }
    }
    for marker in &def.markers {
        match &marker.scope {
            MarkerScope::Global => state.set_global_marker(table, &marker.id, marker.default.clone()),
            MarkerScope::Zone { .. } => {
                for zone in def.zones.iter().filter(|z| marker.applies_to_zone(z.category.as_deref())) {
                    state.set_zone_marker(table, &zone.id, &marker.id, marker.default.clone());
                }
            }
        }
    }
    if let TurnOrderConfig::FixedOrder { order } = &def.turn_order {
        if let Some(&seat) = order.first() {
            state.set_active_player(table, PlayerId(seat));
        }
    }

    if !def.setup.is_empty() {
        let ctx = EffectContext::automatic(def, config, state.active_player());
        let mut budget = OpBudget::new(config.max_effect_ops);
        let run = apply_effects(&ctx, state, &def.setup, Bindings::new(), &mut budget)?;
        debug!(ops = budget.used(), events = run.events.len(), "setup finished");
        state = run.state;
    }

    let mut tx = Transition::new(def, config, state);
    if let TurnOrderConfig::CardDriven(cards) = &def.turn_order {
        tx.start_campaign(cards);
    }
    tx.begin_turn()?;
    tx.enter_phase(first_phase)?;
    tx.advance_to_decision_point()?;
    let result = tx.finish()?;
    debug!(
        seed,
        players = player_count,
        hash = result.state.state_hash(),
        "initial state ready"
    );
    Ok(result.state)
}

/// Turn-order seats must exist at this table, not just within the
/// definition's player range.
fn check_seated(turn_order: &TurnOrderConfig, player_count: usize) -> Result<(), ContractError> {
    let (seats, context) = match turn_order {
        TurnOrderConfig::FixedOrder { order } => (order.as_slice(), "fixed turn order"),
        TurnOrderConfig::CardDriven(cards) => (cards.faction_order.as_slice(), "faction order"),
        TurnOrderConfig::RoundRobin | TurnOrderConfig::Simultaneous => return Ok(()),
    };
    match seats.iter().find(|&&seat| usize::from(seat) >= player_count) {
        Some(&seat) => Err(ContractError::SeatOutOfRange {
            seat,
            player_count,
            context,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Effect, PlayerSel, TokenPosition, ZoneSel};
    use crate::core::{TokenTypeId, VarValue, ZoneId};
    use crate::def::{GameDef, MarkerDef, TokenTypeDef, VarDef, ZoneDef};
    use crate::def::validate_game_def;

    fn def() -> ValidatedGameDef {
        let mut def = GameDef::new("init", 2, 4);
        def.zones = vec![
            ZoneDef::new("deck"),
            ZoneDef::new("saigon").with_category("city"),
            ZoneDef::new("jungle"),
        ];
        def.token_types = vec![TokenTypeDef::new("card")];
        def.global_vars = vec![VarDef::int("aid", 15)];
        def.per_player_vars = vec![VarDef::int("resources", 3)];
        def.zone_vars = vec![VarDef::boolean("sabotaged", false)];
        def.markers = vec![MarkerDef {
            id: "support".into(),
            states: vec!["opposed".into(), "neutral".into(), "supported".into()],
            default: "neutral".into(),
            scope: MarkerScope::Zone {
                category: Some("city".into()),
            },
        }];
        def.setup = (0..3)
            .map(|_| Effect::CreateToken {
                kind: TokenTypeId::new("card"),
                zone: ZoneSel::id("deck"),
                props: Default::default(),
                position: TokenPosition::Top,
                bind: None,
            })
            .collect();
        def.actions = vec![crate::def::ActionDef::new("pass").with_actor(PlayerSel::Active)];
        validate_game_def(def).unwrap()
    }

    #[test]
    fn test_defaults_and_setup() {
        let def = def();
        let state = initial_state(&def, 11, 3).unwrap();
        assert_eq!(state.player_count(), 3);
        assert_eq!(state.global_var("aid"), Some(VarValue::Int(15)));
        assert_eq!(state.player_var(PlayerId(2), "resources"), Some(VarValue::Int(3)));
        assert_eq!(state.zone_var(&ZoneId::new("jungle"), "sabotaged"), Some(VarValue::Bool(false)));
        assert_eq!(state.zone_marker(&ZoneId::new("saigon"), "support"), Some("neutral"));
        assert_eq!(state.zone_marker(&ZoneId::new("jungle"), "support"), None);
        assert_eq!(state.tokens(&ZoneId::new("deck")).map(|t| t.len()), Some(3));
        assert_eq!(state.turn_count(), 1);
    }

    #[test]
    fn test_same_seed_same_state() {
        let def = def();
        let a = initial_state(&def, 5, 2).unwrap();
        let b = initial_state(&def, 5, 2).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
        assert_eq!(a.rng(), b.rng());
    }

    #[test]
    fn test_turn_order_seats_must_be_seated() {
        let mut fixed = GameDef::new("fixed", 2, 4);
        fixed.turn_order = TurnOrderConfig::FixedOrder { order: vec![0, 1, 2, 3] };
        fixed.actions = vec![crate::def::ActionDef::new("pass")];
        let fixed = validate_game_def(fixed).unwrap();
        assert!(initial_state(&fixed, 1, 4).is_ok());
        let err = initial_state(&fixed, 1, 2).unwrap_err();
        assert_eq!(err.code(), "CONTRACT_SEAT_OUT_OF_RANGE");

        let mut cards = GameDef::new("factions", 2, 4);
        cards.turn_order = TurnOrderConfig::CardDriven(crate::def::CardDrivenConfig {
            faction_order: vec![2, 0, 1],
            ..Default::default()
        });
        cards.actions = vec![crate::def::ActionDef::new("pass")];
        let cards = validate_game_def(cards).unwrap();
        assert!(initial_state(&cards, 1, 3).is_ok());
        let err = initial_state(&cards, 1, 2).unwrap_err();
        assert_eq!(err.code(), "CONTRACT_SEAT_OUT_OF_RANGE");
    }

    #[test]
    fn test_player_count_outside_range() {
        let def = def();
        let err = initial_state(&def, 5, 5).unwrap_err();
        assert_eq!(err.code(), "CONTRACT_PLAYER_COUNT");
    }
}
