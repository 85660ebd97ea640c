//! Simultaneous turn-order integration tests.
//!
//! Every seat submits once per phase. Submissions are checked when made but
//! only take effect together, in seat order, once the last seat is in.

use game_kernel::ast::{ArithOp, Condition, Effect, PlayerSel, Query, ValueExpr, VarTarget};
use game_kernel::core::{KernelWarning, Move, Value, VarValue};
use game_kernel::def::{validate_game_def, ActionDef, GameDef, TurnOrderConfig, ValidatedGameDef, VarDef};
use game_kernel::{apply_move, decision_player, initial_state, legal_moves, GameState, PlayerId};

/// `claim` takes the single prize while it is unclaimed; `bid` moves coins
/// into the pot; `wait` does nothing.
fn sealed_def() -> ValidatedGameDef {
    let mut def = GameDef::new("sealed", 2, 4);
    def.turn_order = TurnOrderConfig::Simultaneous;
    def.global_vars = vec![VarDef::int("claimed", 0), VarDef::int("pot", 0)];
    def.per_player_vars = vec![VarDef::int("coins", 3).with_bounds(0, 10)];
    def.actions = vec![
        ActionDef::new("claim")
            .with_pre(Condition::eq(ValueExpr::global("claimed"), ValueExpr::int(0)))
            .with_effects(vec![Effect::add_global("claimed", 1)]),
        ActionDef::new("bid")
            .with_param("$amount", Query::range(1, 3))
            .with_pre(Condition::le(
                ValueExpr::binding("$amount"),
                ValueExpr::player_var(PlayerSel::Actor, "coins"),
            ))
            .with_effects(vec![
                Effect::AddVar {
                    target: VarTarget::player(PlayerSel::Actor, "coins"),
                    delta: ValueExpr::arith(ArithOp::Sub, ValueExpr::int(0), ValueExpr::binding("$amount")),
                },
                Effect::AddVar {
                    target: VarTarget::global("pot"),
                    delta: ValueExpr::binding("$amount"),
                },
            ]),
        ActionDef::new("wait"),
    ];
    validate_game_def(def).unwrap()
}

fn bid(amount: i64) -> Move {
    Move::new("bid").with_param("$amount", Value::Int(amount))
}

fn submitted(state: &GameState, seat: u8) -> bool {
    state
        .turn_order()
        .as_simultaneous()
        .is_some_and(|rt| rt.has_submitted(PlayerId(seat)))
}

/// Submissions are buffered: nothing changes until the last seat submits.
#[test]
fn test_submissions_are_buffered() {
    let def = sealed_def();
    let state = initial_state(&def, 1, 3).unwrap();
    assert_eq!(decision_player(&state), PlayerId(0));

    let state = apply_move(&def, &state, &bid(2)).unwrap().state;
    assert!(submitted(&state, 0));
    assert_eq!(decision_player(&state), PlayerId(1));
    assert_eq!(state.global_var("pot"), Some(VarValue::Int(0)));
    assert_eq!(state.player_var(PlayerId(0), "coins"), Some(VarValue::Int(3)));

    let state = apply_move(&def, &state, &bid(1)).unwrap().state;
    assert_eq!(decision_player(&state), PlayerId(2));
    assert_eq!(state.global_var("pot"), Some(VarValue::Int(0)));
}

/// The last submission resolves the round in seat order and starts the
/// next turn with a clean buffer.
#[test]
fn test_last_submission_resolves_round() {
    let def = sealed_def();
    let state = initial_state(&def, 1, 3).unwrap();
    let state = apply_move(&def, &state, &bid(2)).unwrap().state;
    let state = apply_move(&def, &state, &bid(1)).unwrap().state;
    let result = apply_move(&def, &state, &bid(3)).unwrap();
    let state = result.state;

    assert!(result.warnings.is_empty());
    assert_eq!(state.global_var("pot"), Some(VarValue::Int(6)));
    assert_eq!(state.player_var(PlayerId(0), "coins"), Some(VarValue::Int(1)));
    assert_eq!(state.player_var(PlayerId(1), "coins"), Some(VarValue::Int(2)));
    assert_eq!(state.player_var(PlayerId(2), "coins"), Some(VarValue::Int(0)));
    assert_eq!(state.turn_count(), 2);
    assert!(!submitted(&state, 0));
    assert_eq!(decision_player(&state), PlayerId(0));
}

/// A submission that was legal when made but is invalidated by an earlier
/// seat's move is dropped with a warning.
#[test]
fn test_conflicting_submission_is_dropped() {
    let def = sealed_def();
    let state = initial_state(&def, 1, 3).unwrap();
    let state = apply_move(&def, &state, &Move::new("claim")).unwrap().state;
    let state = apply_move(&def, &state, &Move::new("claim")).unwrap().state;
    let result = apply_move(&def, &state, &Move::new("wait")).unwrap();

    assert_eq!(result.state.global_var("claimed"), Some(VarValue::Int(1)));
    assert_eq!(
        result.warnings,
        vec![KernelWarning::SubmissionDropped {
            player: PlayerId(1),
            action: "claim".into(),
            code: "PREDICATE_FAILED",
        }]
    );
}

/// Submissions are still checked on arrival.
#[test]
fn test_illegal_submission_is_rejected_immediately() {
    let def = sealed_def();
    let state = initial_state(&def, 1, 2).unwrap();
    let err = apply_move(&def, &state, &bid(5)).unwrap_err();
    assert_eq!(err.illegal_reason().map(|r| r.code()), Some("PARAM_OUT_OF_DOMAIN"));
    assert!(!submitted(&state, 0));
}

/// A seat with nothing legal to submit is skipped automatically.
#[test]
fn test_seat_without_moves_is_skipped() {
    let mut def = GameDef::new("broke", 2, 2);
    def.turn_order = TurnOrderConfig::Simultaneous;
    def.per_player_vars = vec![VarDef::int("coins", 0)];
    def.actions = vec![ActionDef::new("spend")
        .with_actor(PlayerSel::Id(1))
        .with_effects(vec![Effect::AddVar {
            target: VarTarget::player(PlayerSel::Actor, "coins"),
            delta: ValueExpr::int(1),
        }])];
    let def = validate_game_def(def).unwrap();

    let state = initial_state(&def, 1, 2).unwrap();
    assert!(submitted(&state, 0));
    assert_eq!(decision_player(&state), PlayerId(1));
    assert_eq!(legal_moves(&def, &state).unwrap().moves, vec![Move::new("spend")]);

    let state = apply_move(&def, &state, &Move::new("spend")).unwrap().state;
    assert_eq!(state.player_var(PlayerId(1), "coins"), Some(VarValue::Int(1)));
    assert_eq!(state.turn_count(), 2);
}
