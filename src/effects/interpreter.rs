//! The effect interpreter.
//!
//! Runs an effect program against an owned `GameState`, charging one
//! operation per executed node against a shared `OpBudget`. Every write goes
//! through the state's hashed setters, so the returned state carries a
//! correct incremental hash.

use im::{OrdMap, Vector};
use serde::Serialize;
use tracing::trace;

use crate::ast::{Effect, Query, TokenFilter, TokenPosition, ValueExpr, VarTarget, ZoneSel};
use crate::core::{
    seat_mask, EffectError, EvalError, GameState, PlayerId, RevealGrant, RngError, SpatialError, Token, TokenId, Value,
    VarValue, ZoneId,
};
use crate::def::{ActionDef, MarkerDef, MarkerScope, TurnOrderConfig, VarDef, WindowDuration, ZoneOrdering};
use crate::eval::{self, Bindings, EvalContext};
use crate::triggers::TriggerEvent;
use crate::turn::{EligibilityOverride, TurnOrderRuntime};

use super::choice::{decision_key, ChoiceKind, ChoiceOption, OptionLegality, PendingChoice};
use super::context::EffectContext;
use super::placement::{check_stacking, placement_slot, zone_ordering};

/// Operation budget shared by every program run of one kernel call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpBudget {
    limit: usize,
    used: usize,
}

impl OpBudget {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    #[must_use]
    pub fn used(&self) -> usize {
        self.used
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.used
    }

    fn charge(&mut self) -> Result<(), EffectError> {
        if self.used >= self.limit {
            return Err(EffectError::BudgetExceeded { limit: self.limit });
        }
        self.used += 1;
        Ok(())
    }
}

/// One executed effect node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EffectTraceEntry {
    /// Position in execution order across the whole call.
    pub seq: usize,
    pub kind: &'static str,
    /// Enclosing `forEach` iteration indices.
    pub path: Vec<usize>,
    pub actor: PlayerId,
}

/// How a program run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectOutcome {
    Completed,
    /// Discovery reached a choice with no supplied answer.
    Pending(PendingChoice),
    /// Discovery read a name that is not bound yet.
    Deferred { binding: String },
}

/// Result of running a program.
#[derive(Clone, Debug)]
pub struct EffectRun {
    pub state: GameState,
    pub outcome: EffectOutcome,
    /// Bindings at the end of the top-level list.
    pub bindings: Bindings,
    pub events: Vec<TriggerEvent>,
    pub trace: Vec<EffectTraceEntry>,
}

impl EffectRun {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == EffectOutcome::Completed
    }
}

/// Run one effect list.
pub fn apply_effects(
    ctx: &EffectContext<'_>,
    state: GameState,
    effects: &[Effect],
    bindings: Bindings,
    budget: &mut OpBudget,
) -> Result<EffectRun, EffectError> {
    let mut interp = Interpreter::new(*ctx, state, budget);
    let result = interp.run_list(effects, bindings.clone());
    interp.finish(result, bindings)
}

/// Run an action's cost, then its effects, as one program.
pub fn apply_action_effects(
    ctx: &EffectContext<'_>,
    state: GameState,
    action: &ActionDef,
    bindings: Bindings,
    budget: &mut OpBudget,
) -> Result<EffectRun, EffectError> {
    let mut interp = Interpreter::new(*ctx, state, budget);
    let result = interp
        .run_list(&action.cost, bindings.clone())
        .and_then(|b| interp.run_list(&action.effects, b));
    interp.finish(result, bindings)
}

enum Halt {
    Fail(EffectError),
    Suspend(EffectOutcome),
}

impl From<EffectError> for Halt {
    fn from(e: EffectError) -> Self {
        Halt::Fail(e)
    }
}

impl From<EvalError> for Halt {
    fn from(e: EvalError) -> Self {
        Halt::Fail(EffectError::Eval(e))
    }
}

impl From<SpatialError> for Halt {
    fn from(e: SpatialError) -> Self {
        Halt::Fail(EffectError::Spatial(e))
    }
}

impl From<RngError> for Halt {
    fn from(e: RngError) -> Self {
        Halt::Fail(EffectError::Rng(e))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum VarSlot {
    Global(String),
    Player(PlayerId, String),
    Zone(ZoneId, String),
}

impl VarSlot {
    fn name(&self) -> &str {
        match self {
            VarSlot::Global(v) | VarSlot::Player(_, v) | VarSlot::Zone(_, v) => v,
        }
    }
}

struct Interpreter<'b, 'a> {
    ctx: EffectContext<'a>,
    state: GameState,
    budget: &'b mut OpBudget,
    events: Vec<TriggerEvent>,
    trace: Vec<EffectTraceEntry>,
    path: Vec<usize>,
}

impl<'b, 'a> Interpreter<'b, 'a> {
    fn new(ctx: EffectContext<'a>, state: GameState, budget: &'b mut OpBudget) -> Self {
        Self {
            ctx,
            state,
            budget,
            events: Vec::new(),
            trace: Vec::new(),
            path: Vec::new(),
        }
    }

    fn finish(self, result: Result<Bindings, Halt>, initial: Bindings) -> Result<EffectRun, EffectError> {
        let (outcome, bindings) = match result {
            Ok(bindings) => (EffectOutcome::Completed, bindings),
            Err(Halt::Suspend(outcome)) => (outcome, initial),
            Err(Halt::Fail(e)) => return Err(e),
        };
        Ok(EffectRun {
            state: self.state,
            outcome,
            bindings,
            events: self.events,
            trace: self.trace,
        })
    }

    fn eval_ctx<'s>(&'s self, bindings: &'s Bindings) -> EvalContext<'s> {
        EvalContext::new(
            self.ctx.def(),
            &self.state,
            bindings,
            self.ctx.config().max_query_results,
        )
        .with_actor(self.ctx.actor(), self.ctx.executor())
    }

    fn value(&self, expr: &ValueExpr, bindings: &Bindings) -> Result<Value, EvalError> {
        eval::eval_value(&self.eval_ctx(bindings), expr)
    }

    fn int(&self, expr: &ValueExpr, bindings: &Bindings, context: &str) -> Result<i64, EvalError> {
        self.value(expr, bindings)?.as_int(context)
    }

    fn query(&self, query: &Query, bindings: &Bindings) -> Result<Vec<Value>, EvalError> {
        eval::eval_query(&self.eval_ctx(bindings), query)
    }

    fn zone(&self, sel: &ZoneSel, bindings: &Bindings) -> Result<ZoneId, EvalError> {
        eval::resolve_zone(&self.eval_ctx(bindings), sel)
    }

    fn run_list(&mut self, effects: &[Effect], mut bindings: Bindings) -> Result<Bindings, Halt> {
        for effect in effects {
            bindings = self.step(effect, bindings)?;
        }
        Ok(bindings)
    }

    fn step(&mut self, effect: &Effect, bindings: Bindings) -> Result<Bindings, Halt> {
        self.budget.charge()?;
        trace!(kind = effect.kind_name(), ops = self.budget.used(), "effect");
        if self.ctx.config().collect_effect_trace {
            self.trace.push(EffectTraceEntry {
                seq: self.budget.used(),
                kind: effect.kind_name(),
                path: self.path.clone(),
                actor: self.ctx.actor(),
            });
        }
        match self.exec(effect, bindings) {
            Err(Halt::Fail(EffectError::Eval(e))) if self.ctx.is_discovery() && e.is_deferrable() => {
                let binding = match e {
                    EvalError::MissingBinding { name } => name,
                    other => other.to_string(),
                };
                Err(Halt::Suspend(EffectOutcome::Deferred { binding }))
            }
            other => other,
        }
    }

    fn exec(&mut self, effect: &Effect, mut bindings: Bindings) -> Result<Bindings, Halt> {
        match effect {
            // === Variables ===
            Effect::SetVar { target, value } => {
                let value = to_var_value(self.value(value, &bindings)?, target.var())?;
                for slot in self.var_slots(target, &bindings)? {
                    self.write_var(slot, value)?;
                }
            }
            Effect::AddVar { target, delta } => {
                let delta = self.int(delta, &bindings, "addVar delta")?;
                for slot in self.var_slots(target, &bindings)? {
                    let current = self.read_int(&slot)?;
                    self.write_var(slot, VarValue::Int(current.saturating_add(delta)))?;
                }
            }
            Effect::TransferVar {
                from,
                to,
                amount,
                actual_bind,
            } => {
                let actual = self.transfer(from, to, amount, &bindings)?;
                if let Some(name) = actual_bind {
                    bindings.insert(name.clone(), Value::Int(actual));
                }
            }

            // === Tokens ===
            Effect::CreateToken {
                kind,
                zone,
                props,
                position,
                bind,
            } => {
                let def = self.ctx.def();
                let type_def = def
                    .token_type(kind)
                    .ok_or_else(|| EffectError::UnknownTokenType(kind.to_string()))?;
                let zone = self.zone(zone, &bindings)?;
                let mut values: OrdMap<String, Value> =
                    type_def.props.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                for (name, expr) in props {
                    values.insert(name.clone(), self.value(expr, &bindings)?);
                }
                let id = self.state.allocate_token_id(def.zobrist());
                let token = Token {
                    id,
                    kind: kind.clone(),
                    props: values,
                };
                self.place_new(&zone, token, *position)?;
                if let Some(name) = bind {
                    bindings.insert(name.clone(), Value::Token(id));
                }
            }
            Effect::DestroyToken { token } => {
                let id = eval::resolve_token(&self.eval_ctx(&bindings), token)?;
                self.state
                    .remove_token(self.ctx.def().zobrist(), id)
                    .ok_or(EvalError::UnknownToken(id))?;
            }
            Effect::MoveToken { token, to, position } => {
                let id = eval::resolve_token(&self.eval_ctx(&bindings), token)?;
                let to = self.zone(to, &bindings)?;
                self.relocate(id, &to, *position, None)?;
            }
            Effect::MoveAll { from, to, filter } => {
                let from = self.zone(from, &bindings)?;
                let to = self.zone(to, &bindings)?;
                if from != to {
                    let ids = self.matching_tokens(&from, filter, &bindings)?;
                    let stacked = zone_ordering(self.ctx.def(), &to) == ZoneOrdering::Stack;
                    for (i, id) in ids.into_iter().enumerate() {
                        self.relocate(id, &to, TokenPosition::Top, stacked.then_some(i))?;
                    }
                }
            }
            Effect::MoveTokenAdjacent { token, direction } => {
                let id = eval::resolve_token(&self.eval_ctx(&bindings), token)?;
                let from = self
                    .state
                    .token_zone(id)
                    .cloned()
                    .ok_or(EvalError::UnknownToken(id))?;
                let Some(direction) = direction else {
                    return Err(SpatialError::DirectionMissing { from }.into());
                };
                let graph = self.ctx.def().graph();
                let to = match self.value(direction, &bindings)? {
                    Value::Zone(zone) => zone,
                    Value::Str(label) => match graph.neighbor_in_direction(&from, &label) {
                        Some(to) => to.clone(),
                        None => {
                            return Err(SpatialError::UnknownDirection {
                                from,
                                direction: label,
                            }
                            .into())
                        }
                    },
                    other => {
                        return Err(EvalError::TypeMismatch {
                            expected: "zone or direction",
                            actual: other.type_name(),
                            context: "moveTokenAdjacent".to_string(),
                        }
                        .into())
                    }
                };
                if !graph.is_adjacent(&from, &to)? {
                    return Err(SpatialError::NotAdjacent { from, to }.into());
                }
                self.relocate(id, &to, TokenPosition::Top, None)?;
            }
            Effect::Draw { from, to, count } => {
                let from = self.zone(from, &bindings)?;
                let to = self.zone(to, &bindings)?;
                let count = self.int(count, &bindings, "draw count")?.max(0);
                for _ in 0..count {
                    let Some(top) = self.state.tokens(&from).and_then(|t| t.front()).map(|t| t.id) else {
                        break;
                    };
                    self.relocate(top, &to, TokenPosition::Top, None)?;
                }
            }
            Effect::Shuffle { zone } => {
                let zone = self.zone(zone, &bindings)?;
                if zone_ordering(self.ctx.def(), &zone) != ZoneOrdering::Set {
                    let mut items: Vec<Token> = self.state.tokens(&zone).into_iter().flatten().cloned().collect();
                    let rng = self.state.rng().shuffle(&mut items);
                    self.state.set_rng(rng);
                    self.state
                        .replace_zone_tokens(self.ctx.def().zobrist(), &zone, items.into_iter().collect());
                }
            }
            Effect::SetTokenProp { token, prop, value } => {
                let id = eval::resolve_token(&self.eval_ctx(&bindings), token)?;
                let value = self.value(value, &bindings)?;
                self.state
                    .set_token_prop(self.ctx.def().zobrist(), id, prop, value)
                    .ok_or(EvalError::UnknownToken(id))?;
            }

            // === Visibility ===
            Effect::Reveal { zone, to, filter } => {
                let zone = self.zone(zone, &bindings)?;
                let observers = seat_mask(eval::resolve_players(&self.eval_ctx(&bindings), to)?);
                let grant = RevealGrant {
                    observers,
                    filter: filter.clone(),
                };
                let mut grants = self.state.zone_reveals(&zone);
                if !grants.iter().any(|g| g == &grant) {
                    grants.push_back(grant);
                    self.state.set_reveals(self.ctx.def().zobrist(), &zone, grants);
                }
            }
            Effect::Conceal { zone, from } => {
                let zone = self.zone(zone, &bindings)?;
                let grants = match from {
                    None => Vector::new(),
                    Some(sel) => {
                        let mask = seat_mask(eval::resolve_players(&self.eval_ctx(&bindings), sel)?);
                        self.state
                            .zone_reveals(&zone)
                            .into_iter()
                            .map(|g| RevealGrant {
                                observers: g.observers & !mask,
                                filter: g.filter,
                            })
                            .filter(|g| g.observers != 0)
                            .collect()
                    }
                };
                self.state.set_reveals(self.ctx.def().zobrist(), &zone, grants);
            }

            // === Markers ===
            Effect::SetMarker { zone, marker, state } => {
                let (marker_def, zone) = self.marker_target(zone.as_ref(), marker, &bindings)?;
                let state = match self.value(state, &bindings)? {
                    Value::Str(s) => s,
                    other => {
                        return Err(EvalError::TypeMismatch {
                            expected: "string",
                            actual: other.type_name(),
                            context: format!("marker `{marker}`"),
                        }
                        .into())
                    }
                };
                if marker_def.state_index(&state).is_none() {
                    return Err(EffectError::InvalidMarkerState {
                        marker: marker.clone(),
                        state,
                    }
                    .into());
                }
                self.write_marker(marker, zone, state);
            }
            Effect::ShiftMarker { zone, marker, delta } => {
                let (marker_def, zone) = self.marker_target(zone.as_ref(), marker, &bindings)?;
                let delta = self.int(delta, &bindings, "shiftMarker delta")?;
                let current = self.current_marker(marker_def, zone.as_ref());
                let index = marker_def.state_index(&current).unwrap_or(0) as i64;
                let last = marker_def.states.len().saturating_sub(1) as i64;
                let next = index.saturating_add(delta).clamp(0, last) as usize;
                if let Some(state) = marker_def.states.get(next) {
                    self.write_marker(marker, zone, state.clone());
                }
            }

            // === Turn flow ===
            Effect::SetEligibility {
                player,
                eligible,
                window,
            } => {
                let def = self.ctx.def();
                let TurnOrderConfig::CardDriven(config) = &def.turn_order else {
                    return Err(EffectError::NotCardDriven.into());
                };
                let TurnOrderRuntime::CardDriven(mut runtime) = self.state.turn_order().clone() else {
                    return Err(EffectError::NotCardDriven.into());
                };
                let duration = config.window(window).unwrap_or(WindowDuration::Turn);
                for player in eval::resolve_players(&self.eval_ctx(&bindings), player)? {
                    runtime.overrides.push(EligibilityOverride {
                        player,
                        eligible: *eligible,
                        window: window.clone(),
                        duration,
                        delay: u8::from(duration == WindowDuration::NextTurn),
                    });
                }
                self.state
                    .set_turn_order(def.zobrist(), TurnOrderRuntime::CardDriven(runtime));
            }

            // === Control flow ===
            Effect::If {
                when,
                then,
                otherwise,
            } => {
                let branch = if eval::eval_condition(&self.eval_ctx(&bindings), when)? {
                    then
                } else {
                    otherwise
                };
                self.run_list(branch, bindings.clone())?;
            }
            Effect::ForEach {
                bind,
                over,
                effects,
                limit,
                count_bind,
            } => {
                let mut items = self.query(over, &bindings)?;
                if let Some(limit) = limit {
                    let limit = self.int(limit, &bindings, "forEach limit")?.max(0) as usize;
                    items.truncate(limit);
                }
                let count = items.len();
                for (i, item) in items.into_iter().enumerate() {
                    self.path.push(i);
                    let result = self.run_list(effects, bindings.update(bind.clone(), item));
                    self.path.pop();
                    result?;
                }
                if let Some(name) = count_bind {
                    bindings.insert(name.clone(), Value::Int(count as i64));
                }
            }
            Effect::Let { bind, value, effects } => {
                let value = self.value(value, &bindings)?;
                self.run_list(effects, bindings.update(bind.clone(), value))?;
            }
            Effect::Reduce {
                over,
                item_bind,
                acc_bind,
                initial,
                next,
                result_bind,
                effects,
            } => {
                let items = self.query(over, &bindings)?;
                let mut acc = self.value(initial, &bindings)?;
                for item in items {
                    let scope = bindings
                        .update(item_bind.clone(), item)
                        .update(acc_bind.clone(), acc);
                    acc = self.value(next, &scope)?;
                }
                self.run_list(effects, bindings.update(result_bind.clone(), acc))?;
            }
            Effect::RollRandom {
                bind,
                min,
                max,
                effects,
            } => {
                let min = self.int(min, &bindings, "rollRandom min")?;
                let max = self.int(max, &bindings, "rollRandom max")?;
                let (roll, rng) = self.state.rng().next_int(min, max)?;
                self.state.set_rng(rng);
                self.run_list(effects, bindings.update(bind.clone(), Value::Int(roll)))?;
            }

            // === Choices ===
            Effect::ChooseOne {
                bind,
                decision_id,
                options,
            } => {
                let chosen = self.choose(bind, decision_id.as_deref(), options, None, &bindings)?;
                bindings.insert(bind.clone(), chosen);
            }
            Effect::ChooseN {
                bind,
                decision_id,
                options,
                min,
                max,
            } => {
                let min = self.int(min, &bindings, "chooseN min")?.max(0) as usize;
                let max = self.int(max, &bindings, "chooseN max")?.max(0) as usize;
                let chosen = self.choose(bind, decision_id.as_deref(), options, Some((min, max)), &bindings)?;
                bindings.insert(bind.clone(), chosen);
            }
        }
        Ok(bindings)
    }

    // === Variables ===

    fn var_slots(&self, target: &VarTarget, bindings: &Bindings) -> Result<Vec<VarSlot>, EvalError> {
        let ctx = self.eval_ctx(bindings);
        Ok(match target {
            VarTarget::Global { var } => vec![VarSlot::Global(var.clone())],
            VarTarget::Player { player, var } => eval::resolve_players(&ctx, player)?
                .into_iter()
                .map(|p| VarSlot::Player(p, var.clone()))
                .collect(),
            VarTarget::Zone { zone, var } => vec![VarSlot::Zone(eval::resolve_zone(&ctx, zone)?, var.clone())],
        })
    }

    fn single_slot(&self, target: &VarTarget, bindings: &Bindings) -> Result<VarSlot, EvalError> {
        let ctx = self.eval_ctx(bindings);
        Ok(match target {
            VarTarget::Player { player, var } => VarSlot::Player(eval::resolve_player(&ctx, player)?, var.clone()),
            VarTarget::Global { var } => VarSlot::Global(var.clone()),
            VarTarget::Zone { zone, var } => VarSlot::Zone(eval::resolve_zone(&ctx, zone)?, var.clone()),
        })
    }

    fn var_def(&self, slot: &VarSlot) -> Result<&'a VarDef, EvalError> {
        let def = self.ctx.def();
        let (found, scope) = match slot {
            VarSlot::Global(v) => (def.global_var_def(v), "global"),
            VarSlot::Player(_, v) => (def.player_var_def(v), "player"),
            VarSlot::Zone(_, v) => (def.zone_var_def(v), "zone"),
        };
        found.ok_or_else(|| EvalError::MissingVar {
            scope,
            name: slot.name().to_string(),
        })
    }

    fn read_int(&self, slot: &VarSlot) -> Result<i64, EvalError> {
        let stored = match slot {
            VarSlot::Global(v) => self.state.global_var(v),
            VarSlot::Player(p, v) => self.state.player_var(*p, v),
            VarSlot::Zone(z, v) => self.state.zone_var(z, v),
        };
        let value = match stored {
            Some(value) => value,
            None => self.var_def(slot)?.init,
        };
        value.to_value().as_int(slot.name())
    }

    /// Write a declared variable, clamping integers to its bounds.
    fn write_var(&mut self, slot: VarSlot, value: VarValue) -> Result<(), Halt> {
        let var_def = self.var_def(&slot)?;
        let value = match (var_def.init, value) {
            (VarValue::Int(_), VarValue::Int(n)) => VarValue::Int(var_def.clamp(n)),
            (VarValue::Bool(_), VarValue::Bool(b)) => VarValue::Bool(b),
            (init, other) => {
                return Err(EvalError::TypeMismatch {
                    expected: init.to_value().type_name(),
                    actual: other.to_value().type_name(),
                    context: format!("write to `{}`", slot.name()),
                }
                .into())
            }
        };
        let table = self.ctx.def().zobrist();
        let old = match &slot {
            VarSlot::Global(v) => self.state.set_global_var(table, v, value),
            VarSlot::Player(p, v) => self.state.set_player_var(table, *p, v, value),
            VarSlot::Zone(z, v) => self.state.set_zone_var(table, z, v, value),
        };
        if old != Some(value) {
            self.events.push(TriggerEvent::VarChanged {
                var: slot.name().to_string(),
            });
        }
        Ok(())
    }

    /// Move what the source can give and the destination can take.
    fn transfer(
        &mut self,
        from: &VarTarget,
        to: &VarTarget,
        amount: &ValueExpr,
        bindings: &Bindings,
    ) -> Result<i64, Halt> {
        let from = self.single_slot(from, bindings)?;
        let to = self.single_slot(to, bindings)?;
        let amount = self.int(amount, bindings, "transferVar amount")?.max(0);
        let have = self.read_int(&from)?;
        let room_base = self.read_int(&to)?;
        let available = self
            .var_def(&from)?
            .min
            .map_or(amount, |min| have.saturating_sub(min).max(0));
        let room = self
            .var_def(&to)?
            .max
            .map_or(amount, |max| max.saturating_sub(room_base).max(0));
        let actual = amount.min(available).min(room);

        self.write_var(from, VarValue::Int(have - actual))?;
        let dest = self.read_int(&to)?;
        self.write_var(to, VarValue::Int(dest.saturating_add(actual)))?;
        Ok(actual)
    }

    // === Tokens ===

    fn matching_tokens(
        &self,
        zone: &ZoneId,
        filter: &[TokenFilter],
        bindings: &Bindings,
    ) -> Result<Vec<TokenId>, EvalError> {
        let ctx = self.eval_ctx(bindings);
        let mut ids = Vec::new();
        for token in self.state.tokens(zone).into_iter().flatten() {
            if eval::token_matches(&ctx, token, filter)? {
                ids.push(token.id);
            }
        }
        Ok(ids)
    }

    fn place_new(&mut self, zone: &ZoneId, token: Token, position: TokenPosition) -> Result<(), Halt> {
        let def = self.ctx.def();
        let (slot, rng) = placement_slot(
            zone_ordering(def, zone),
            self.state.tokens(zone),
            token.id,
            position,
            self.state.rng(),
        )?;
        self.state.set_rng(rng);
        let id = token.id;
        self.state.insert_token(def.zobrist(), zone, slot, token.clone());
        check_stacking(def, &self.state, zone, &token)?;
        self.events.push(TriggerEvent::TokenEntered {
            token: id,
            zone: zone.clone(),
        });
        Ok(())
    }

    /// Move an existing token. `fixed_slot` overrides the zone's placement
    /// rule (used to keep a moved block in order).
    fn relocate(
        &mut self,
        id: TokenId,
        to: &ZoneId,
        position: TokenPosition,
        fixed_slot: Option<usize>,
    ) -> Result<(), Halt> {
        let def = self.ctx.def();
        let token = self.state.token(id).cloned().ok_or(EvalError::UnknownToken(id))?;
        let slot = match fixed_slot {
            Some(slot) => slot,
            None => {
                let remaining: Option<Vector<Token>> = self
                    .state
                    .tokens(to)
                    .map(|tokens| tokens.iter().filter(|t| t.id != id).cloned().collect());
                let (slot, rng) =
                    placement_slot(zone_ordering(def, to), remaining.as_ref(), id, position, self.state.rng())?;
                self.state.set_rng(rng);
                slot
            }
        };
        let from = self
            .state
            .move_token(def.zobrist(), id, to, slot)
            .ok_or(EvalError::UnknownToken(id))?;
        check_stacking(def, &self.state, to, &token)?;
        if &from != to {
            self.events.push(TriggerEvent::TokenEntered {
                token: id,
                zone: to.clone(),
            });
        }
        Ok(())
    }

    // === Markers ===

    fn marker_target(
        &self,
        zone: Option<&ZoneSel>,
        marker: &str,
        bindings: &Bindings,
    ) -> Result<(&'a MarkerDef, Option<ZoneId>), EvalError> {
        let def = self.ctx.def();
        let unknown = || EvalError::UnknownMarker(marker.to_string());
        let marker_def = def.marker_def(marker).ok_or_else(unknown)?;
        match zone {
            None if matches!(marker_def.scope, MarkerScope::Global) => Ok((marker_def, None)),
            None => Err(unknown()),
            Some(sel) => {
                let zone = self.zone(sel, bindings)?;
                let category = def.zone_def(&zone).and_then(|z| z.category.as_deref());
                if marker_def.applies_to_zone(category) {
                    Ok((marker_def, Some(zone)))
                } else {
                    Err(unknown())
                }
            }
        }
    }

    fn current_marker(&self, marker_def: &MarkerDef, zone: Option<&ZoneId>) -> String {
        let stored = match zone {
            None => self.state.global_marker(&marker_def.id),
            Some(zone) => self.state.zone_marker(zone, &marker_def.id),
        };
        stored.unwrap_or(marker_def.default.as_str()).to_string()
    }

    fn write_marker(&mut self, marker: &str, zone: Option<ZoneId>, state: String) {
        let table = self.ctx.def().zobrist();
        match zone {
            None => self.state.set_global_marker(table, marker, state),
            Some(zone) => self.state.set_zone_marker(table, &zone, marker, state),
        }
    }

    // === Choices ===

    fn choose(
        &mut self,
        bind: &str,
        decision_id: Option<&str>,
        options: &Query,
        range: Option<(usize, usize)>,
        bindings: &Bindings,
    ) -> Result<Value, Halt> {
        let decision = decision_key(decision_id.unwrap_or(bind), bindings, &self.path);
        if !self.ctx.is_interactive() {
            return Err(EffectError::ChoiceNotAllowed { decision }.into());
        }

        let mut candidates: Vec<Value> = Vec::new();
        for value in self.query(options, bindings)? {
            if !candidates.iter().any(|c| eval::values_equal(c, &value)) {
                candidates.push(value);
            }
        }
        let min = range.map_or(1, |(min, _)| min);
        if candidates.len() < min {
            return Err(EffectError::InsufficientOptions {
                decision,
                available: candidates.len(),
                min,
            }
            .into());
        }
        let kind = match range {
            None => ChoiceKind::ChooseOne,
            Some((min, max)) => ChoiceKind::ChooseN {
                min,
                max: max.min(candidates.len()).max(min),
            },
        };

        let Some(supplied) = self.ctx.decision(&decision) else {
            if self.ctx.is_discovery() {
                return Err(Halt::Suspend(EffectOutcome::Pending(PendingChoice {
                    decision,
                    bind: bind.to_string(),
                    kind,
                    options: candidates
                        .into_iter()
                        .map(|value| ChoiceOption {
                            value,
                            legality: OptionLegality::Unknown,
                        })
                        .collect(),
                })));
            }
            return Err(EffectError::UnresolvedChoice { decision }.into());
        };

        let invalid = |decision: String| {
            Halt::Fail(EffectError::InvalidChoice {
                decision,
                value: supplied.to_string(),
            })
        };
        let canonical = |value: &Value| candidates.iter().find(|c| eval::values_equal(c, value)).cloned();
        match kind {
            ChoiceKind::ChooseOne => canonical(supplied).ok_or_else(|| invalid(decision)),
            ChoiceKind::ChooseN { min, max } => {
                let Value::List(picked) = supplied else {
                    return Err(invalid(decision));
                };
                if picked.len() < min || picked.len() > max {
                    return Err(invalid(decision));
                }
                let mut out: Vec<Value> = Vec::with_capacity(picked.len());
                for value in picked {
                    match canonical(value) {
                        Some(c) if !out.contains(&c) => out.push(c),
                        _ => return Err(invalid(decision)),
                    }
                }
                Ok(Value::List(out))
            }
        }
    }
}

fn to_var_value(value: Value, var: &str) -> Result<VarValue, EvalError> {
    match value {
        Value::Int(n) => Ok(VarValue::Int(n)),
        Value::Bool(b) => Ok(VarValue::Bool(b)),
        other => Err(EvalError::TypeMismatch {
            expected: "int or bool",
            actual: other.type_name(),
            context: format!("write to `{var}`"),
        }),
    }
}
