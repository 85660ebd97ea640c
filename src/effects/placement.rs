//! Token placement rules: where an arriving token lands, and whether the
//! zone may hold it.

use im::Vector;

use crate::ast::TokenPosition;
use crate::core::{EffectError, GameState, Rng, RngError, Token, TokenId, ZoneId};
use crate::def::{ValidatedGameDef, ZoneOrdering};

/// Slot an arriving token takes in a zone of the given ordering.
///
/// Stacks honor the requested position. Queues take arrivals at the bottom
/// unless a random slot is asked for. Sets keep tokens sorted by id.
pub(crate) fn placement_slot(
    ordering: ZoneOrdering,
    tokens: Option<&Vector<Token>>,
    token: TokenId,
    position: TokenPosition,
    rng: Rng,
) -> Result<(usize, Rng), RngError> {
    let len = tokens.map_or(0, Vector::len);
    match (ordering, position) {
        (ZoneOrdering::Set, _) => {
            let slot = tokens
                .and_then(|t| t.iter().position(|existing| existing.id > token))
                .unwrap_or(len);
            Ok((slot, rng))
        }
        (_, TokenPosition::Random) => {
            let (slot, rng) = rng.next_int(0, len as i64)?;
            Ok((slot as usize, rng))
        }
        (ZoneOrdering::Queue, _) | (ZoneOrdering::Stack, TokenPosition::Bottom) => Ok((len, rng)),
        (ZoneOrdering::Stack, TokenPosition::Top) => Ok((0, rng)),
    }
}

/// Ordering of a zone; undeclared zones behave as stacks.
pub(crate) fn zone_ordering(def: &ValidatedGameDef, zone: &ZoneId) -> ZoneOrdering {
    def.zone_def(zone).map_or(ZoneOrdering::Stack, |z| z.ordering)
}

/// Check every stacking constraint covering `zone` after `token` arrived.
pub(crate) fn check_stacking(
    def: &ValidatedGameDef,
    state: &GameState,
    zone: &ZoneId,
    token: &Token,
) -> Result<(), EffectError> {
    let Some(zone_def) = def.zone_def(zone) else {
        return Ok(());
    };
    let Some(tokens) = state.tokens(zone) else {
        return Ok(());
    };
    for constraint in &def.stacking {
        if !constraint.covers_zone(zone_def) || !constraint.counts_kind(&token.kind) {
            continue;
        }
        let count = tokens.iter().filter(|t| constraint.counts_kind(&t.kind)).count();
        if count > constraint.max as usize {
            return Err(EffectError::StackingViolation {
                constraint: constraint.id.clone(),
                token: token.id,
                zone: zone.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TokenTypeId;

    fn tokens(ids: &[u32]) -> Vector<Token> {
        ids.iter()
            .map(|&id| Token {
                id: TokenId::new(id),
                kind: TokenTypeId::new("piece"),
                props: im::OrdMap::new(),
            })
            .collect()
    }

    #[test]
    fn test_stack_positions() {
        let zone = tokens(&[4, 2]);
        let rng = Rng::new(1);
        let (top, _) = placement_slot(ZoneOrdering::Stack, Some(&zone), TokenId::new(9), TokenPosition::Top, rng).unwrap();
        let (bottom, _) =
            placement_slot(ZoneOrdering::Stack, Some(&zone), TokenId::new(9), TokenPosition::Bottom, rng).unwrap();
        assert_eq!((top, bottom), (0, 2));
    }

    #[test]
    fn test_queue_appends_even_when_top_requested() {
        let zone = tokens(&[1, 2, 3]);
        let (slot, _) =
            placement_slot(ZoneOrdering::Queue, Some(&zone), TokenId::new(0), TokenPosition::Top, Rng::new(1)).unwrap();
        assert_eq!(slot, 3);
    }

    #[test]
    fn test_set_keeps_ids_sorted() {
        let zone = tokens(&[1, 5, 8]);
        let (slot, _) =
            placement_slot(ZoneOrdering::Set, Some(&zone), TokenId::new(6), TokenPosition::Top, Rng::new(1)).unwrap();
        assert_eq!(slot, 2);
        let (slot, _) = placement_slot(ZoneOrdering::Set, None, TokenId::new(6), TokenPosition::Top, Rng::new(1)).unwrap();
        assert_eq!(slot, 0);
    }

    #[test]
    fn test_random_slot_in_range_and_advances_rng() {
        let zone = tokens(&[1, 2]);
        let rng = Rng::new(7);
        let (slot, next) =
            placement_slot(ZoneOrdering::Stack, Some(&zone), TokenId::new(3), TokenPosition::Random, rng).unwrap();
        assert!(slot <= 2);
        assert_ne!(next, rng);
    }
}
