//! Boolean conditions, including the spatial predicates.

use crate::ast::{CompareOp, Condition, ZoneFilter};
use crate::core::{EvalError, Value, ZoneId};

use super::context::EvalContext;
use super::query::eval_query;
use super::selectors::resolve_zone;
use super::value::{eval_value, values_equal};

/// Evaluate a condition. `And`/`Or` short-circuit left to right.
pub fn eval_condition(ctx: &EvalContext<'_>, cond: &Condition) -> Result<bool, EvalError> {
    match cond {
        Condition::Const(b) => Ok(*b),
        Condition::And(parts) => {
            for part in parts {
                if !eval_condition(ctx, part)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Or(parts) => {
            for part in parts {
                if eval_condition(ctx, part)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Not(inner) => Ok(!eval_condition(ctx, inner)?),
        Condition::Compare { op, left, right } => {
            let l = eval_value(ctx, left)?;
            let r = eval_value(ctx, right)?;
            compare(*op, &l, &r)
        }
        Condition::In { item, set } => {
            let item = eval_value(ctx, item)?;
            Ok(eval_query(ctx, set)?.iter().any(|v| values_equal(&item, v)))
        }
        Condition::Adjacent { left, right } => {
            let l = resolve_zone(ctx, left)?;
            let r = resolve_zone(ctx, right)?;
            Ok(ctx.def.graph().is_adjacent(&l, &r)?)
        }
        Condition::Connected {
            from,
            to,
            via,
            max_depth,
        } => {
            let from = resolve_zone(ctx, from)?;
            let to = resolve_zone(ctx, to)?;
            ctx.def
                .graph()
                .connected(&from, &to, *max_depth, |zone| zone_passes(ctx, via.as_ref(), zone))
        }
    }
}

/// Compare two values. Equality is loose; ordering needs integers.
pub fn compare(op: CompareOp, l: &Value, r: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => return Ok(values_equal(l, r)),
        CompareOp::Ne => return Ok(!values_equal(l, r)),
        _ => {}
    }
    let l = l.as_int("comparison")?;
    let r = r.as_int("comparison")?;
    Ok(match op {
        CompareOp::Lt => l < r,
        CompareOp::Le => l <= r,
        CompareOp::Gt => l > r,
        CompareOp::Ge => l >= r,
        CompareOp::Eq => l == r,
        CompareOp::Ne => l != r,
    })
}

/// Apply an optional per-hop zone filter.
pub(crate) fn zone_passes(
    ctx: &EvalContext<'_>,
    filter: Option<&ZoneFilter>,
    zone: &ZoneId,
) -> Result<bool, EvalError> {
    let Some(filter) = filter else {
        return Ok(true);
    };
    let scope = ctx
        .bindings
        .update(filter.bind.clone(), Value::Zone(zone.clone()));
    eval_condition(&ctx.with_bindings(&scope), &filter.when)
}
