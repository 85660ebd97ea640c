//! Value expressions and references.

use crate::ast::{AggregateOp, ArithOp, Reference, ValueExpr};
use crate::core::{EvalError, Value, VarValue};

use super::condition::eval_condition;
use super::context::EvalContext;
use super::query::{eval_query, token_matches};
use super::selectors::{resolve_player, resolve_token, resolve_zone};

/// Evaluate a value expression.
pub fn eval_value(ctx: &EvalContext<'_>, expr: &ValueExpr) -> Result<Value, EvalError> {
    match expr {
        ValueExpr::Literal(value) => Ok(value.clone()),
        ValueExpr::Ref(reference) => resolve_reference(ctx, reference),
        ValueExpr::Arith { op, left, right } => {
            let l = eval_value(ctx, left)?.as_int("arithmetic")?;
            let r = eval_value(ctx, right)?.as_int("arithmetic")?;
            arith(*op, l, r).map(Value::Int)
        }
        ValueExpr::Aggregate {
            op,
            query,
            bind,
            value,
        } => aggregate(ctx, *op, query, bind, value.as_deref()),
        ValueExpr::If {
            when,
            then,
            otherwise,
        } => {
            if eval_condition(ctx, when)? {
                eval_value(ctx, then)
            } else {
                eval_value(ctx, otherwise)
            }
        }
        ValueExpr::Concat(parts) => {
            let mut out = String::new();
            for part in parts {
                match eval_value(ctx, part)? {
                    Value::Str(s) => out.push_str(&s),
                    other => out.push_str(&other.to_string()),
                }
            }
            Ok(Value::Str(out))
        }
        ValueExpr::Player(sel) => resolve_player(ctx, sel).map(Value::Player),
        ValueExpr::Zone(sel) => resolve_zone(ctx, sel).map(Value::Zone),
    }
}

/// Integer arithmetic. Overflow saturates; `Div` truncates toward zero and
/// `Mod` is always non-negative.
pub(crate) fn arith(op: ArithOp, l: i64, r: i64) -> Result<i64, EvalError> {
    Ok(match op {
        ArithOp::Add => l.saturating_add(r),
        ArithOp::Sub => l.saturating_sub(r),
        ArithOp::Mul => l.saturating_mul(r),
        ArithOp::Div => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l.saturating_div(r)
        }
        ArithOp::Mod => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l.checked_rem_euclid(r).unwrap_or(0)
        }
        ArithOp::Min => l.min(r),
        ArithOp::Max => l.max(r),
    })
}

fn aggregate(
    ctx: &EvalContext<'_>,
    op: AggregateOp,
    query: &crate::ast::Query,
    bind: &str,
    value: Option<&ValueExpr>,
) -> Result<Value, EvalError> {
    let items = eval_query(ctx, query)?;
    if op == AggregateOp::Count {
        return Ok(Value::Int(items.len() as i64));
    }

    let mut acc: Option<i64> = None;
    for item in items {
        let n = match value {
            Some(expr) => {
                let scope = ctx.bindings.update(bind.to_string(), item);
                eval_value(&ctx.with_bindings(&scope), expr)?.as_int("aggregate value")?
            }
            None => item.as_int("aggregate item")?,
        };
        acc = Some(match (op, acc) {
            (_, None) => n,
            (AggregateOp::Sum, Some(a)) => a.saturating_add(n),
            (AggregateOp::Min, Some(a)) => a.min(n),
            (AggregateOp::Max, Some(a)) => a.max(n),
            (AggregateOp::Count, Some(a)) => a,
        });
    }
    Ok(Value::Int(acc.unwrap_or(0)))
}

fn var_value(value: Option<VarValue>, scope: &'static str, name: &str) -> Result<Value, EvalError> {
    value.map(VarValue::to_value).ok_or_else(|| EvalError::MissingVar {
        scope,
        name: name.to_string(),
    })
}

/// Resolve a reference against the state, bindings and data tables.
pub fn resolve_reference(ctx: &EvalContext<'_>, reference: &Reference) -> Result<Value, EvalError> {
    match reference {
        Reference::GlobalVar(name) => var_value(ctx.state.global_var(name), "global", name),
        Reference::PlayerVar { player, var } => {
            let player = resolve_player(ctx, player)?;
            var_value(ctx.state.player_var(player, var), "player", var)
        }
        Reference::ZoneVar { zone, var } => {
            let zone = resolve_zone(ctx, zone)?;
            match ctx.state.zone_var(&zone, var) {
                Some(value) => Ok(value.to_value()),
                None => var_value(ctx.def.zone_var_def(var).map(|d| d.init), "zone", var),
            }
        }
        Reference::Binding(name) => {
            ctx.bindings
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::MissingBinding { name: name.clone() })
        }
        Reference::TokenProp { token, prop } => {
            let id = resolve_token(ctx, &crate::ast::TokenSel::Binding(token.clone()))?;
            ctx.state
                .token(id)
                .and_then(|t| t.prop(prop))
                .cloned()
                .ok_or_else(|| EvalError::MissingVar {
                    scope: "token",
                    name: prop.clone(),
                })
        }
        Reference::TokenZone { token } => {
            let id = resolve_token(ctx, &crate::ast::TokenSel::Binding(token.clone()))?;
            ctx.state
                .token_zone(id)
                .cloned()
                .map(Value::Zone)
                .ok_or(EvalError::UnknownToken(id))
        }
        Reference::ZoneCount { zone, filter } => {
            let zone = resolve_zone(ctx, zone)?;
            let mut count = 0i64;
            for token in ctx.state.tokens(&zone).into_iter().flatten() {
                if token_matches(ctx, token, filter)? {
                    count += 1;
                }
            }
            Ok(Value::Int(count))
        }
        Reference::ActivePlayer => Ok(Value::Player(ctx.state.active_player())),
        Reference::Actor => Ok(Value::Player(ctx.actor)),
        Reference::TurnCount => Ok(Value::Int(i64::from(ctx.state.turn_count()))),
        Reference::CurrentPhase => Ok(Value::Str(ctx.state.current_phase().to_string())),
        Reference::Marker { zone, marker } => {
            let zone = resolve_zone(ctx, zone)?;
            let def = ctx
                .def
                .marker_def(marker)
                .ok_or_else(|| EvalError::UnknownMarker(marker.clone()))?;
            Ok(Value::Str(
                ctx.state
                    .zone_marker(&zone, marker)
                    .unwrap_or(def.default.as_str())
                    .to_string(),
            ))
        }
        Reference::GlobalMarker(marker) => {
            let def = ctx
                .def
                .marker_def(marker)
                .ok_or_else(|| EvalError::UnknownMarker(marker.clone()))?;
            Ok(Value::Str(
                ctx.state
                    .global_marker(marker)
                    .unwrap_or(def.default.as_str())
                    .to_string(),
            ))
        }
        Reference::TableField { table, key, field } => {
            let key = key
                .iter()
                .map(|k| eval_value(ctx, k))
                .collect::<Result<Vec<_>, _>>()?;
            let row = ctx.def.tables().lookup(table, &key)?;
            ctx.def.tables().field(table, row, field)
        }
        Reference::RowField { row, field } => {
            let value = ctx
                .bindings
                .get(row)
                .ok_or_else(|| EvalError::MissingBinding { name: row.clone() })?;
            let row_ref = value.as_row(row)?;
            ctx.def.tables().field(&row_ref.table, row_ref.row, field)
        }
        Reference::Eligible(sel) => {
            let player = resolve_player(ctx, sel)?;
            Ok(Value::Bool(
                ctx.state
                    .turn_order()
                    .as_card_driven()
                    .map_or(true, |rt| rt.is_eligible(player)),
            ))
        }
    }
}

/// Equality with the loose coercions the rules language allows: zone ids
/// compare equal to their names and seats to their indices.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Zone(z), Value::Str(s)) | (Value::Str(s), Value::Zone(z)) => z.as_str() == s,
        (Value::Player(p), Value::Int(n)) | (Value::Int(n), Value::Player(p)) => {
            p.index() as i64 == *n
        }
        _ => a == b,
    }
}
