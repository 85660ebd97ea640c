//! Effect interpretation.
//!
//! - `EffectContext`: definition, budgets, acting players and supplied
//!   decisions, with the mode fixed at construction
//! - `apply_effects` / `apply_action_effects`: run a program on a state
//! - `PendingChoice`: what a discovery run reports when it needs a decision
//!
//! ## Modes
//!
//! Execution applies a move for real: an unanswered choice or an unbound
//! name is an error. Discovery runs the same program on a scratch copy and
//! stops at the first unanswered choice (`EffectOutcome::Pending`) or the
//! first read of a name that is not bound yet (`EffectOutcome::Deferred`).
//! Everything else, including budget exhaustion, fails the same way in both
//! modes.

mod choice;
mod context;
mod interpreter;
mod placement;

pub use choice::{decision_key, ChoiceKind, ChoiceOption, OptionLegality, PendingChoice};
pub use context::{EffectContext, EffectMode};
pub use interpreter::{
    apply_action_effects, apply_effects, EffectOutcome, EffectRun, EffectTraceEntry, OpBudget,
};

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::ast::{Condition, Effect, PlayerSel, Query, TokenPosition, TokenSel, ValueExpr, VarTarget, ZoneSel};
    use crate::core::{
        EffectError, GameState, KernelConfig, PhaseId, PlayerId, Rng, TokenTypeId, Value, VarValue, ZoneId,
    };
    use crate::def::{
        validate_game_def, GameDef, MarkerDef, MarkerScope, StackingConstraint, TokenTypeDef, ValidatedGameDef,
        VarDef, ZoneDef, ZoneOrdering,
    };
    use crate::eval::Bindings;
    use crate::hash::compute_full_hash;
    use crate::triggers::TriggerEvent;
    use crate::turn::TurnOrderRuntime;

    fn fixture() -> (ValidatedGameDef, GameState) {
        let mut def = GameDef::new("effects", 2, 2);
        def.zones = vec![
            ZoneDef::new("saigon").with_category("city").adjacent_via("hue", "north"),
            ZoneDef::new("hue").with_category("city"),
            ZoneDef::new("deck"),
            ZoneDef::new("pool").with_ordering(ZoneOrdering::Queue),
            ZoneDef::new("box").with_ordering(ZoneOrdering::Set),
        ];
        def.token_types = vec![
            TokenTypeDef::new("troop").with_prop("strength", Value::Int(1)),
            TokenTypeDef::new("base"),
        ];
        def.global_vars = vec![VarDef::int("aid", 10).with_bounds(0, 20), VarDef::boolean("war", false)];
        def.per_player_vars = vec![VarDef::int("resources", 5).with_bounds(0, 8)];
        def.markers = vec![MarkerDef {
            id: "support".into(),
            states: vec!["opposed".into(), "neutral".into(), "supported".into()],
            default: "neutral".into(),
            scope: MarkerScope::Zone {
                category: Some("city".into()),
            },
        }];
        def.stacking = vec![StackingConstraint {
            id: "one-base".into(),
            zones: vec![],
            category: Some("city".into()),
            token_kinds: vec![TokenTypeId::new("base")],
            max: 1,
        }];
        let def = validate_game_def(def).unwrap();
        let table = *def.zobrist();
        let mut state = GameState::new(&table, 2, PhaseId::new("main"), TurnOrderRuntime::RoundRobin, Rng::new(3));
        for zone in &def.zones {
            state.add_zone(zone.id.clone());
        }
        state.set_global_var(&table, "aid", VarValue::Int(10));
        state.set_global_var(&table, "war", VarValue::Bool(false));
        for p in 0..2 {
            state.set_player_var(&table, PlayerId(p), "resources", VarValue::Int(5));
        }
        (def, state)
    }

    fn run(def: &ValidatedGameDef, state: GameState, effects: &[Effect]) -> Result<EffectRun, EffectError> {
        let config = KernelConfig::default();
        let decisions = BTreeMap::new();
        let ctx = EffectContext::execution(def, &config, PlayerId(0), PlayerId(0), &decisions);
        let mut budget = OpBudget::new(config.max_effect_ops);
        apply_effects(&ctx, state, effects, Bindings::new(), &mut budget)
    }

    fn create(kind: &str, zone: &str, bind: &str) -> Effect {
        Effect::CreateToken {
            kind: TokenTypeId::new(kind),
            zone: ZoneSel::id(zone),
            props: BTreeMap::new(),
            position: TokenPosition::Top,
            bind: Some(bind.to_string()),
        }
    }

    #[test]
    fn test_var_writes_clamp_and_emit_events() {
        let (def, state) = fixture();
        let out = run(&def, state, &[Effect::add_global("aid", 50), Effect::add_global("aid", 0)]).unwrap();
        assert_eq!(out.state.global_var("aid"), Some(VarValue::Int(20)));
        assert_eq!(out.events, vec![TriggerEvent::VarChanged { var: "aid".into() }]);
        assert_eq!(out.state.state_hash(), compute_full_hash(def.zobrist(), &out.state));
    }

    #[test]
    fn test_type_mismatch_on_bool_var() {
        let (def, state) = fixture();
        let err = run(&def, state, &[Effect::add_global("war", 1)]).unwrap_err();
        assert_eq!(err.code(), "EVAL_TYPE_MISMATCH");
    }

    #[test]
    fn test_transfer_limited_by_bounds() {
        let (def, state) = fixture();
        let program = vec![
            Effect::TransferVar {
                from: VarTarget::player(PlayerSel::Id(0), "resources"),
                to: VarTarget::player(PlayerSel::Id(1), "resources"),
                amount: ValueExpr::int(4),
                actual_bind: Some("$moved".into()),
            },
            Effect::set_global("aid", ValueExpr::binding("$moved")),
        ];
        let out = run(&def, state, &program).unwrap();
        assert_eq!(out.state.player_var(PlayerId(0), "resources"), Some(VarValue::Int(2)));
        assert_eq!(out.state.player_var(PlayerId(1), "resources"), Some(VarValue::Int(8)));
        assert_eq!(out.state.global_var("aid"), Some(VarValue::Int(3)));
    }

    #[test]
    fn test_create_uses_type_defaults_and_zone_ordering() {
        let (def, state) = fixture();
        let out = run(
            &def,
            state,
            &[create("troop", "pool", "$a"), create("troop", "pool", "$b"), create("troop", "deck", "$c")],
        )
        .unwrap();
        let pool: Vec<u32> = out.state.tokens(&ZoneId::new("pool")).unwrap().iter().map(|t| t.id.raw()).collect();
        assert_eq!(pool, vec![0, 1]);
        let troop = out.state.token(crate::core::TokenId::new(2)).unwrap();
        assert_eq!(troop.prop("strength"), Some(&Value::Int(1)));
        assert_eq!(out.bindings.get("$c"), Some(&Value::Token(crate::core::TokenId::new(2))));
        assert_eq!(out.state.state_hash(), compute_full_hash(def.zobrist(), &out.state));
    }

    #[test]
    fn test_stacking_violation() {
        let (def, state) = fixture();
        let err = run(&def, state, &[create("base", "hue", "$a"), create("base", "hue", "$b")]).unwrap_err();
        assert_eq!(err.code(), "EFFECT_STACKING_VIOLATION");
    }

    #[test]
    fn test_adjacent_move_by_direction_label() {
        let (def, state) = fixture();
        let program = vec![
            create("troop", "saigon", "$t"),
            Effect::MoveTokenAdjacent {
                token: TokenSel::binding("$t"),
                direction: Some(ValueExpr::str("north")),
            },
        ];
        let out = run(&def, state.clone(), &program).unwrap();
        assert_eq!(out.state.token_zone(crate::core::TokenId::new(0)), Some(&ZoneId::new("hue")));

        let program = vec![
            create("troop", "saigon", "$t"),
            Effect::MoveTokenAdjacent {
                token: TokenSel::binding("$t"),
                direction: Some(ValueExpr::str("deck")),
            },
        ];
        let err = run(&def, state.clone(), &program).unwrap_err();
        assert_eq!(err.code(), "SPATIAL_UNKNOWN_DIRECTION");

        let program = vec![
            create("troop", "saigon", "$t"),
            Effect::MoveTokenAdjacent {
                token: TokenSel::binding("$t"),
                direction: Some(ValueExpr::Literal(Value::Zone(ZoneId::new("deck")))),
            },
        ];
        assert_eq!(run(&def, state.clone(), &program).unwrap_err().code(), "SPATIAL_NOT_ADJACENT");

        let program = vec![
            create("troop", "saigon", "$t"),
            Effect::MoveTokenAdjacent {
                token: TokenSel::binding("$t"),
                direction: None,
            },
        ];
        assert_eq!(run(&def, state, &program).unwrap_err().code(), "SPATIAL_DIRECTION_MISSING");
    }

    #[test]
    fn test_draw_stops_when_source_runs_out() {
        let (def, state) = fixture();
        let program = vec![
            create("troop", "deck", "$a"),
            create("troop", "deck", "$b"),
            Effect::Draw {
                from: ZoneSel::id("deck"),
                to: ZoneSel::id("box"),
                count: ValueExpr::int(5),
            },
        ];
        let out = run(&def, state, &program).unwrap();
        assert!(out.state.tokens(&ZoneId::new("deck")).unwrap().is_empty());
        let boxed: Vec<u32> = out.state.tokens(&ZoneId::new("box")).unwrap().iter().map(|t| t.id.raw()).collect();
        assert_eq!(boxed, vec![0, 1]);
    }

    #[test]
    fn test_marker_shift_clamps() {
        let (def, state) = fixture();
        let shift = |delta| Effect::ShiftMarker {
            zone: Some(ZoneSel::id("hue")),
            marker: "support".into(),
            delta: ValueExpr::int(delta),
        };
        let out = run(&def, state.clone(), &[shift(5)]).unwrap();
        assert_eq!(out.state.zone_marker(&ZoneId::new("hue"), "support"), Some("supported"));
        let out = run(&def, out.state, &[shift(-1)]).unwrap();
        assert_eq!(out.state.zone_marker(&ZoneId::new("hue"), "support"), Some("neutral"));

        let err = run(
            &def,
            state,
            &[Effect::SetMarker {
                zone: Some(ZoneSel::id("deck")),
                marker: "support".into(),
                state: ValueExpr::str("opposed"),
            }],
        )
        .unwrap_err();
        assert_eq!(err.code(), "EVAL_UNKNOWN_MARKER");
    }

    #[test]
    fn test_reveal_then_conceal_one_observer() {
        let (def, state) = fixture();
        let program = vec![
            Effect::Reveal {
                zone: ZoneSel::id("deck"),
                to: PlayerSel::All,
                filter: vec![],
            },
            Effect::Conceal {
                zone: ZoneSel::id("deck"),
                from: Some(PlayerSel::Id(1)),
            },
        ];
        let out = run(&def, state, &program).unwrap();
        let grants = out.state.zone_reveals(&ZoneId::new("deck"));
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].observers, 0b01);
        assert_eq!(out.state.state_hash(), compute_full_hash(def.zobrist(), &out.state));
    }

    #[test]
    fn test_budget_counts_nested_nodes() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let decisions = BTreeMap::new();
        let ctx = EffectContext::execution(&def, &config, PlayerId(0), PlayerId(0), &decisions);
        let program = vec![Effect::for_each("$i", Query::range(1, 10), vec![Effect::add_global("aid", 1)])];

        let mut budget = OpBudget::new(5);
        let err = apply_effects(&ctx, state.clone(), &program, Bindings::new(), &mut budget).unwrap_err();
        assert_eq!(err, EffectError::BudgetExceeded { limit: 5 });

        let mut budget = OpBudget::new(11);
        apply_effects(&ctx, state, &program, Bindings::new(), &mut budget).unwrap();
        assert_eq!(budget.used(), 11);
    }

    #[test]
    fn test_discovery_reports_iteration_keyed_choice() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let program = vec![Effect::for_each(
            "$z",
            Query::enums(["saigon", "hue"]),
            vec![Effect::choose_one("$n", Query::range(1, 3))],
        )];

        let mut decisions = BTreeMap::new();
        decisions.insert("$n[0]".to_string(), Value::Int(2));
        let ctx = EffectContext::discovery(&def, &config, PlayerId(0), PlayerId(0), &decisions);
        let mut budget = OpBudget::new(100);
        let out = apply_effects(&ctx, state.clone(), &program, Bindings::new(), &mut budget).unwrap();
        let EffectOutcome::Pending(pending) = out.outcome else {
            panic!("expected a pending choice");
        };
        assert_eq!(pending.decision, "$n[1]");
        assert_eq!(pending.options.len(), 3);
        assert!(pending.options.iter().all(|o| o.legality == OptionLegality::Unknown));

        let exec = EffectContext::execution(&def, &config, PlayerId(0), PlayerId(0), &decisions);
        let mut budget = OpBudget::new(100);
        let err = apply_effects(&exec, state, &program, Bindings::new(), &mut budget).unwrap_err();
        assert_eq!(err.code(), "EFFECT_UNRESOLVED_CHOICE");
    }

    #[test]
    fn test_invalid_choice_rejected_in_both_modes() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let program = vec![Effect::choose_one("$n", Query::range(1, 3))];
        let decisions = BTreeMap::from([("$n".to_string(), Value::Int(9))]);
        for ctx in [
            EffectContext::execution(&def, &config, PlayerId(0), PlayerId(0), &decisions),
            EffectContext::discovery(&def, &config, PlayerId(0), PlayerId(0), &decisions),
        ] {
            let mut budget = OpBudget::new(100);
            let err = apply_effects(&ctx, state.clone(), &program, Bindings::new(), &mut budget).unwrap_err();
            assert_eq!(err.code(), "EFFECT_INVALID_CHOICE");
        }
    }

    #[test]
    fn test_choose_n_validates_cardinality() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let program = vec![Effect::ChooseN {
            bind: "$zones".into(),
            decision_id: None,
            options: Query::zones(),
            min: ValueExpr::int(1),
            max: ValueExpr::int(2),
        }];
        let ok = BTreeMap::from([(
            "$zones".to_string(),
            Value::List(vec![Value::Str("hue".into()), Value::Zone(ZoneId::new("deck"))]),
        )]);
        let ctx = EffectContext::execution(&def, &config, PlayerId(0), PlayerId(0), &ok);
        let out = apply_effects(&ctx, state.clone(), &program, Bindings::new(), &mut OpBudget::new(10)).unwrap();
        assert_eq!(
            out.bindings.get("$zones"),
            Some(&Value::List(vec![Value::Zone(ZoneId::new("hue")), Value::Zone(ZoneId::new("deck"))]))
        );

        let dup = BTreeMap::from([(
            "$zones".to_string(),
            Value::List(vec![Value::Str("hue".into()), Value::Str("hue".into())]),
        )]);
        let ctx = EffectContext::execution(&def, &config, PlayerId(0), PlayerId(0), &dup);
        let err = apply_effects(&ctx, state, &program, Bindings::new(), &mut OpBudget::new(10)).unwrap_err();
        assert_eq!(err.code(), "EFFECT_INVALID_CHOICE");
    }

    #[test]
    fn test_discovery_defers_unbound_names() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let decisions = BTreeMap::new();
        let ctx = EffectContext::discovery(&def, &config, PlayerId(0), PlayerId(0), &decisions);
        let program = vec![Effect::If {
            when: Condition::ge(ValueExpr::binding("$later"), ValueExpr::int(1)),
            then: vec![Effect::add_global("aid", 1)],
            otherwise: vec![],
        }];
        let out = apply_effects(&ctx, state.clone(), &program, Bindings::new(), &mut OpBudget::new(10)).unwrap();
        assert_eq!(
            out.outcome,
            EffectOutcome::Deferred {
                binding: "$later".into()
            }
        );

        let err = run(&def, state, &program).unwrap_err();
        assert_eq!(err.code(), "EVAL_MISSING_BINDING");
    }

    #[test]
    fn test_automatic_context_rejects_choices() {
        let (def, state) = fixture();
        let config = KernelConfig::default();
        let ctx = EffectContext::automatic(&def, &config, PlayerId(1));
        assert_eq!(ctx.mode(), EffectMode::Execution);
        let program = vec![Effect::choose_one("$n", Query::range(1, 3))];
        let err = apply_effects(&ctx, state, &program, Bindings::new(), &mut OpBudget::new(10)).unwrap_err();
        assert_eq!(err.code(), "EFFECT_CHOICE_NOT_ALLOWED");
    }

    #[test]
    fn test_roll_and_shuffle_advance_rng_deterministically() {
        let (def, state) = fixture();
        let program = vec![
            create("troop", "deck", "$a"),
            create("troop", "deck", "$b"),
            create("troop", "deck", "$c"),
            Effect::Shuffle { zone: ZoneSel::id("deck") },
            Effect::RollRandom {
                bind: "$roll".into(),
                min: ValueExpr::int(1),
                max: ValueExpr::int(6),
                effects: vec![Effect::set_global("aid", ValueExpr::binding("$roll"))],
            },
        ];
        let a = run(&def, state.clone(), &program).unwrap();
        let b = run(&def, state.clone(), &program).unwrap();
        assert_eq!(a.state, b.state);
        assert_ne!(a.state.rng(), state.rng());
        let aid = a.state.global_var("aid").and_then(VarValue::as_int).unwrap();
        assert!((1..=6).contains(&aid));
    }

    #[test]
    fn test_trace_collected_when_enabled() {
        let (def, state) = fixture();
        let config = KernelConfig::default().with_effect_trace(true);
        let decisions = BTreeMap::new();
        let ctx = EffectContext::execution(&def, &config, PlayerId(1), PlayerId(1), &decisions);
        let program = vec![Effect::for_each("$i", Query::range(1, 2), vec![Effect::add_global("aid", 1)])];
        let out = apply_effects(&ctx, state, &program, Bindings::new(), &mut OpBudget::new(10)).unwrap();
        let kinds: Vec<&str> = out.trace.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["forEach", "addVar", "addVar"]);
        assert_eq!(out.trace[2].path, vec![1]);
        assert_eq!(out.trace[2].actor, PlayerId(1));
    }
}
