//! Card-driven turn flow integration tests.
//!
//! Four factions share a deck of event cards. Each card gives the first two
//! eligible factions one decision each; passing hands the slot down the
//! scan order and pays a reward.

use std::collections::BTreeMap;

use game_kernel::ast::{Effect, PlayerSel, TokenPosition, ValueExpr, VarTarget, ZoneSel};
use game_kernel::core::{IllegalMoveReason, LimitScope, Move, PhaseId, VarValue, ZoneId};
use game_kernel::def::{
    validate_game_def, ActionClass, ActionDef, CardDrivenConfig, CardLifecycle, CoupPlan, GameDef, PassReward,
    PhaseDef, TokenTypeDef, TurnOrderConfig, ValidatedGameDef, VarDef, ZoneDef,
};
use game_kernel::turn::CardDrivenRuntime;
use game_kernel::{apply_move, initial_state, legal_moves, terminal_result, GameState, PlayerId, TerminalResult};

/// Build the game with a deck given top to bottom as coup flags.
fn campaign(deck: &[bool], ineligible_after_acting: bool) -> ValidatedGameDef {
    let mut def = GameDef::new("campaign", 4, 4);
    def.zones = vec![ZoneDef::new("draw"), ZoneDef::new("lookahead"), ZoneDef::new("played")];
    def.token_types = vec![TokenTypeDef::new("card")];
    def.per_player_vars = vec![VarDef::int("resources", 0)];
    def.turn_structure.phases = vec![PhaseDef::new("main"), PhaseDef::new("coup")];
    // Created on top, so build the deck bottom first.
    def.setup = deck
        .iter()
        .rev()
        .map(|&coup| Effect::CreateToken {
            kind: "card".into(),
            zone: ZoneSel::id("draw"),
            props: BTreeMap::from([("coup".to_string(), ValueExpr::bool(coup))]),
            position: TokenPosition::Top,
            bind: None,
        })
        .collect();
    def.turn_order = TurnOrderConfig::CardDriven(CardDrivenConfig {
        ineligible_after_acting,
        pass_rewards: vec![PassReward {
            faction: None,
            target: VarTarget::player(PlayerSel::Actor, "resources"),
            amount: 1,
        }],
        cards: Some(CardLifecycle {
            draw: ZoneId::new("draw"),
            lookahead: ZoneId::new("lookahead"),
            played: ZoneId::new("played"),
            coup_prop: "coup".into(),
        }),
        coup_plan: Some(CoupPlan {
            phases: vec![PhaseId::new("coup")],
            final_round_omit_phases: vec![],
            max_consecutive_rounds: 1,
        }),
        ..CardDrivenConfig::default()
    });
    def.actions = vec![
        ActionDef::new("pass").in_phase("main").with_class(ActionClass::Pass),
        ActionDef::new("rally").in_phase("main").with_class(ActionClass::Operation),
        ActionDef::new("redeploy").in_phase("coup").with_limit(LimitScope::Phase, 1),
    ];
    validate_game_def(def).unwrap()
}

fn runtime(state: &GameState) -> CardDrivenRuntime {
    state.turn_order().as_card_driven().cloned().unwrap()
}

fn slots(state: &GameState) -> (Option<PlayerId>, Option<PlayerId>) {
    let card = runtime(state).current_card;
    (card.first_eligible, card.second_eligible)
}

fn play(def: &ValidatedGameDef, state: &GameState, action: &str) -> GameState {
    apply_move(def, state, &Move::new(action)).unwrap().state
}

fn pile(state: &GameState, zone: &str) -> usize {
    state.tokens(&ZoneId::new(zone)).map_or(0, |t| t.len())
}

/// The opening card is dealt and the first two factions hold the slots.
#[test]
fn test_campaign_opens_with_first_two_factions() {
    let def = campaign(&[false; 6], false);
    let state = initial_state(&def, 1, 4).unwrap();
    assert_eq!(slots(&state), (Some(PlayerId(0)), Some(PlayerId(1))));
    assert_eq!(state.active_player(), PlayerId(0));
    assert_eq!((pile(&state, "played"), pile(&state, "lookahead"), pile(&state, "draw")), (1, 1, 4));
    assert_eq!(
        legal_moves(&def, &state).unwrap().moves,
        vec![Move::new("pass"), Move::new("rally")]
    );
}

/// Faction 0 passes: 1 moves up to first, 2 becomes second, and 0 collects
/// the pass reward. Two non-pass actions then end the card and the slots
/// reset to {0, 1}.
#[test]
fn test_pass_then_two_actions() {
    let def = campaign(&[false; 6], false);
    let state = initial_state(&def, 1, 4).unwrap();

    let state = play(&def, &state, "pass");
    assert_eq!(slots(&state), (Some(PlayerId(1)), Some(PlayerId(2))));
    assert_eq!(state.player_var(PlayerId(0), "resources"), Some(VarValue::Int(1)));
    assert_eq!(state.active_player(), PlayerId(1));

    let state = play(&def, &state, "rally");
    assert_eq!(state.active_player(), PlayerId(2));
    assert_eq!(runtime(&state).cards_played, 0);

    let state = play(&def, &state, "rally");
    let rt = runtime(&state);
    assert_eq!(rt.cards_played, 1);
    assert_eq!(slots(&state), (Some(PlayerId(0)), Some(PlayerId(1))));
    assert_eq!(state.active_player(), PlayerId(0));
    assert_eq!((pile(&state, "played"), pile(&state, "lookahead"), pile(&state, "draw")), (2, 1, 3));
    assert_eq!(state.player_var(PlayerId(0), "resources"), Some(VarValue::Int(1)));
    assert_eq!(state.player_var(PlayerId(1), "resources"), Some(VarValue::Int(0)));
}

/// With ineligibility after acting, the factions that acted sit the next
/// card out and the passer leads it.
#[test]
fn test_actors_sit_out_next_card() {
    let def = campaign(&[false; 6], true);
    let state = initial_state(&def, 1, 4).unwrap();
    let state = play(&def, &state, "pass");
    let state = play(&def, &state, "rally");
    let state = play(&def, &state, "rally");

    let rt = runtime(&state);
    assert!(!rt.is_eligible(PlayerId(1)));
    assert!(!rt.is_eligible(PlayerId(2)));
    assert_eq!(slots(&state), (Some(PlayerId(0)), Some(PlayerId(3))));
}

/// Only the faction holding the decision may act; everyone else is not
/// eligible even when the active seat is forced onto them.
#[test]
fn test_non_decision_faction_is_rejected() {
    let def = campaign(&[false; 6], false);
    let mut state = initial_state(&def, 1, 4).unwrap();
    state.set_active_player(def.zobrist(), PlayerId(3));
    let err = apply_move(&def, &state, &Move::new("rally")).unwrap_err();
    assert_eq!(err.illegal_reason(), Some(&IllegalMoveReason::NotEligible));
}

/// A revealed coup card interrupts the campaign with a coup round; when the
/// round's phases are exhausted the next campaign card is played.
#[test]
fn test_coup_round_runs_between_cards() {
    let def = campaign(&[false, true, false, false], false);
    let state = initial_state(&def, 1, 4).unwrap();
    let state = play(&def, &state, "rally");
    let state = play(&def, &state, "rally");

    let rt = runtime(&state);
    assert!(rt.coup.active);
    assert_eq!(state.current_phase(), &PhaseId::new("coup"));
    assert_eq!(legal_moves(&def, &state).unwrap().moves, vec![Move::new("redeploy")]);

    let state = play(&def, &state, "redeploy");
    let rt = runtime(&state);
    assert!(!rt.coup.active);
    assert_eq!(state.current_phase(), &PhaseId::new("main"));
    assert_eq!(slots(&state), (Some(PlayerId(0)), Some(PlayerId(1))));
    assert_eq!(terminal_result(&def, &state).unwrap(), None);
}

/// The final coup round closes the campaign; without scoring that is a draw.
#[test]
fn test_final_coup_ends_the_game() {
    let def = campaign(&[false, true], false);
    let state = initial_state(&def, 1, 4).unwrap();
    let state = play(&def, &state, "rally");
    let state = play(&def, &state, "rally");
    assert!(runtime(&state).coup.final_round);

    let state = play(&def, &state, "redeploy");
    assert!(runtime(&state).coup.campaign_complete);
    assert_eq!(terminal_result(&def, &state).unwrap(), Some(TerminalResult::Draw));
    assert!(legal_moves(&def, &state).unwrap().moves.is_empty());
    let err = apply_move(&def, &state, &Move::new("rally")).unwrap_err();
    assert_eq!(err.illegal_reason(), Some(&IllegalMoveReason::GameOver));
}
