//! Resolution of player, zone and token selectors.

use crate::ast::{PlayerSel, TokenSel, ZoneSel};
use crate::core::{EvalError, PlayerId, TokenId, ZoneId};

use super::context::EvalContext;
use super::value::eval_value;

fn seat(ctx: &EvalContext<'_>, index: i64) -> Result<PlayerId, EvalError> {
    if (0..ctx.state.player_count() as i64).contains(&index) {
        Ok(PlayerId(index as u8))
    } else {
        Err(EvalError::PlayerOutOfRange { index })
    }
}

fn binding<'c>(ctx: &'c EvalContext<'_>, name: &str) -> Result<&'c crate::core::Value, EvalError> {
    ctx.bindings.get(name).ok_or_else(|| EvalError::MissingBinding {
        name: name.to_string(),
    })
}

/// Every player a selector names, in seat order.
pub fn resolve_players(ctx: &EvalContext<'_>, sel: &PlayerSel) -> Result<Vec<PlayerId>, EvalError> {
    match sel {
        PlayerSel::All => Ok(ctx.state.player_ids().collect()),
        PlayerSel::AllOther => Ok(ctx.state.player_ids().filter(|p| *p != ctx.actor).collect()),
        single => Ok(vec![resolve_player(ctx, single)?]),
    }
}

/// The one player a selector names. Multi-player selectors are a
/// cardinality error, never silently narrowed.
pub fn resolve_player(ctx: &EvalContext<'_>, sel: &PlayerSel) -> Result<PlayerId, EvalError> {
    match sel {
        PlayerSel::Actor => Ok(ctx.actor),
        PlayerSel::Active => Ok(ctx.state.active_player()),
        PlayerSel::Executor => Ok(ctx.executor),
        PlayerSel::Id(n) => seat(ctx, i64::from(*n)),
        PlayerSel::Binding(name) => {
            let player = binding(ctx, name)?.as_player(name)?;
            seat(ctx, player.index() as i64)
        }
        PlayerSel::Relative(offset) => Ok(ctx.actor.offset(*offset, ctx.state.player_count())),
        PlayerSel::All | PlayerSel::AllOther => Err(EvalError::SelectorCardinality {
            selector: sel.to_string(),
            actual: resolve_players(ctx, sel)?.len(),
        }),
    }
}

/// The zone a selector names; it must exist in the state.
pub fn resolve_zone(ctx: &EvalContext<'_>, sel: &ZoneSel) -> Result<ZoneId, EvalError> {
    let zone = match sel {
        ZoneSel::Id(id) => id.clone(),
        ZoneSel::Owned { base, player } => {
            let owner = resolve_player(ctx, player)?;
            ZoneId::owned(base, owner.0)
        }
        ZoneSel::Binding(name) => binding(ctx, name)?.as_zone(name)?,
        ZoneSel::Expr(expr) => eval_value(ctx, expr)?.as_zone("zone expression")?,
    };
    if ctx.state.has_zone(&zone) {
        Ok(zone)
    } else {
        Err(EvalError::UnknownZone(zone))
    }
}

/// The token a selector names; it must be on the board.
pub fn resolve_token(ctx: &EvalContext<'_>, sel: &TokenSel) -> Result<TokenId, EvalError> {
    let token = match sel {
        TokenSel::Binding(name) => binding(ctx, name)?.as_token(name)?,
        TokenSel::Top(zone) => {
            let zone = resolve_zone(ctx, zone)?;
            return ctx
                .state
                .tokens(&zone)
                .and_then(|t| t.front())
                .map(|t| t.id)
                .ok_or(EvalError::EmptyZone(zone));
        }
    };
    if ctx.state.token(token).is_some() {
        Ok(token)
    } else {
        Err(EvalError::UnknownToken(token))
    }
}
