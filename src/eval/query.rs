//! Queries: ordered result sequences, bounded by `max_query_results`.

use crate::ast::{Query, TokenFilter};
use crate::core::{EvalError, RowRef, Token, Value};

use super::condition::{compare, eval_condition, zone_passes};
use super::context::EvalContext;
use super::selectors::resolve_zone;
use super::value::{eval_value, values_equal};

/// Collects results and fails once the bound is crossed.
struct Bounded {
    items: Vec<Value>,
    limit: usize,
}

impl Bounded {
    fn new(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit,
        }
    }

    fn push(&mut self, value: Value) -> Result<(), EvalError> {
        if self.items.len() >= self.limit {
            return Err(EvalError::QueryBoundsExceeded { limit: self.limit });
        }
        self.items.push(value);
        Ok(())
    }

    fn extend(&mut self, values: impl IntoIterator<Item = Value>) -> Result<(), EvalError> {
        for value in values {
            self.push(value)?;
        }
        Ok(())
    }
}

/// Whether a token passes every filter.
pub fn token_matches(
    ctx: &EvalContext<'_>,
    token: &Token,
    filters: &[TokenFilter],
) -> Result<bool, EvalError> {
    for filter in filters {
        let ok = match filter {
            TokenFilter::Kind(kind) => &token.kind == kind,
            TokenFilter::Prop { prop, op, value } => match token.prop(prop) {
                Some(actual) => compare(*op, actual, &eval_value(ctx, value)?)?,
                None => false,
            },
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn push_tokens(
    ctx: &EvalContext<'_>,
    out: &mut Bounded,
    zone: &crate::core::ZoneId,
    filter: &[TokenFilter],
) -> Result<(), EvalError> {
    for token in ctx.state.tokens(zone).into_iter().flatten() {
        if token_matches(ctx, token, filter)? {
            out.push(Value::Token(token.id))?;
        }
    }
    Ok(())
}

/// Evaluate a query.
pub fn eval_query(ctx: &EvalContext<'_>, query: &Query) -> Result<Vec<Value>, EvalError> {
    let mut out = Bounded::new(ctx.max_query_results);
    collect(ctx, query, &mut out)?;
    Ok(out.items)
}

fn collect(ctx: &EvalContext<'_>, query: &Query, out: &mut Bounded) -> Result<(), EvalError> {
    match query {
        Query::IntRange { min, max } => {
            let min = eval_value(ctx, min)?.as_int("range min")?;
            let max = eval_value(ctx, max)?.as_int("range max")?;
            if max >= min {
                let span = (max as i128 - min as i128 + 1) as u128;
                if span > out.limit.saturating_sub(out.items.len()) as u128 {
                    return Err(EvalError::QueryBoundsExceeded { limit: out.limit });
                }
                out.extend((min..=max).map(Value::Int))?;
            }
        }
        Query::Literal(values) => out.extend(values.iter().cloned())?,
        Query::Players => out.extend(ctx.state.player_ids().map(Value::Player))?,
        Query::Zones { category, filter } => {
            for zone in &ctx.def.zones {
                if category.is_some() && zone.category != *category {
                    continue;
                }
                if !ctx.state.has_zone(&zone.id) {
                    continue;
                }
                if zone_passes(ctx, filter.as_ref(), &zone.id)? {
                    out.push(Value::Zone(zone.id.clone()))?;
                }
            }
        }
        Query::TokensInZone { zone, filter } => {
            let zone = resolve_zone(ctx, zone)?;
            push_tokens(ctx, out, &zone, filter)?;
        }
        Query::TokensInAdjacentZones { zone, filter } => {
            let zone = resolve_zone(ctx, zone)?;
            for neighbor in ctx.def.graph().neighbors(&zone)? {
                push_tokens(ctx, out, neighbor, filter)?;
            }
        }
        Query::AdjacentZones { zone } => {
            let zone = resolve_zone(ctx, zone)?;
            out.extend(
                ctx.def
                    .graph()
                    .neighbors(&zone)?
                    .iter()
                    .cloned()
                    .map(Value::Zone),
            )?;
        }
        Query::ConnectedZones {
            zone,
            via,
            max_depth,
            include_start,
        } => {
            let zone = resolve_zone(ctx, zone)?;
            let reached = ctx.def.graph().reachable(&zone, *max_depth, *include_start, |z| {
                zone_passes(ctx, via.as_ref(), z)
            })?;
            out.extend(reached.into_iter().map(Value::Zone))?;
        }
        Query::Binding(name) => {
            let value = ctx
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::MissingBinding { name: name.clone() })?;
            out.extend(value.into_list())?;
        }
        Query::Concat(parts) => {
            for part in parts {
                collect(ctx, part, out)?;
            }
        }
        Query::TableRows { table, filter } => {
            let tables = ctx.def.tables();
            let wanted = filter
                .iter()
                .map(|f| Ok((f.field.as_str(), eval_value(ctx, &f.value)?)))
                .collect::<Result<Vec<_>, EvalError>>()?;
            for row in 0..tables.row_count(table)? as u32 {
                let mut keep = true;
                for (field, value) in &wanted {
                    if !values_equal(&tables.field(table, row, field)?, value) {
                        keep = false;
                        break;
                    }
                }
                if keep {
                    out.push(Value::Row(RowRef {
                        table: table.clone(),
                        row,
                    }))?;
                }
            }
        }
        Query::Filter { source, bind, when } => {
            for item in eval_query(ctx, source)? {
                let scope = ctx.bindings.update(bind.clone(), item.clone());
                if eval_condition(&ctx.with_bindings(&scope), when)? {
                    out.push(item)?;
                }
            }
        }
    }
    Ok(())
}
