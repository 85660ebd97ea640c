use criterion::{black_box, criterion_group, criterion_main, Criterion};
use game_kernel::ast::{Condition, Effect, Query, TokenPosition, ValueExpr, ZoneSel};
use game_kernel::core::LimitScope;
use game_kernel::def::{validate_game_def, ActionDef, GameDef, TokenTypeDef, ValidatedGameDef, ZoneDef};
use game_kernel::{initial_state, legal_moves, GameState};

/// A ring of twelve zones with pawns scattered over it; `march` picks any
/// occupied source and an adjacent destination, then a pawn to move.
fn march_def() -> ValidatedGameDef {
    let n = 12;
    let name = |i: usize| format!("z{i:02}");
    let mut def = GameDef::new("march", 2, 2);
    def.zones = (0..n).map(|i| ZoneDef::new(name(i)).adjacent_to(name((i + 1) % n))).collect();
    def.token_types = vec![TokenTypeDef::new("pawn")];
    def.setup = (0..n)
        .step_by(2)
        .flat_map(|i| {
            (0..3).map(move |_| Effect::CreateToken {
                kind: "pawn".into(),
                zone: ZoneSel::id(name(i)),
                props: Default::default(),
                position: TokenPosition::Top,
                bind: None,
            })
        })
        .collect();
    def.actions = vec![ActionDef::new("march")
        .with_limit(LimitScope::Turn, 1)
        .with_param("$from", Query::zones())
        .with_param("$to", Query::zones())
        .with_pre(Condition::And(vec![
            Condition::ge(ValueExpr::zone_count(ZoneSel::binding("$from")), ValueExpr::int(1)),
            Condition::Adjacent {
                left: ZoneSel::binding("$from"),
                right: ZoneSel::binding("$to"),
            },
        ]))
        .with_effects(vec![
            Effect::choose_one("$pawn", Query::tokens_in(ZoneSel::binding("$from"))),
            Effect::move_token("$pawn", ZoneSel::binding("$to")),
        ])];
    validate_game_def(def).unwrap()
}

fn legal_moves_benchmark(c: &mut Criterion) {
    let def = march_def();
    let state: GameState = initial_state(&def, 1, 2).unwrap();

    c.bench_function("legal_moves march", |b| {
        b.iter(|| legal_moves(black_box(&def), black_box(&state)).unwrap())
    });
}

criterion_group!(benches, legal_moves_benchmark);
criterion_main!(benches);
