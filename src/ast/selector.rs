//! Player, zone and token selectors.

use serde::{Deserialize, Serialize};

use crate::core::ZoneId;

use super::value::ValueExpr;

/// Selects one or more players.
///
/// `All` and `AllOther` are multi-valued; everything else names exactly one
/// seat. Places that need one player reject multi-valued selectors with a
/// cardinality error instead of picking one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerSel {
    /// The player taking the action (or the active player outside actions).
    Actor,
    /// The player whose turn it is.
    Active,
    /// The player the action's effects run as.
    Executor,
    /// A fixed seat.
    Id(u8),
    /// A seat held in a binding.
    Binding(String),
    /// The seat `offset` places clockwise from the actor.
    Relative(i64),
    /// Every seat.
    All,
    /// Every seat except the actor.
    AllOther,
}

impl PlayerSel {
    /// Whether this selector can name more than one player.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, PlayerSel::All | PlayerSel::AllOther)
    }
}

impl std::fmt::Display for PlayerSel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerSel::Actor => f.write_str("actor"),
            PlayerSel::Active => f.write_str("active"),
            PlayerSel::Executor => f.write_str("executor"),
            PlayerSel::Id(n) => write!(f, "{n}"),
            PlayerSel::Binding(b) => f.write_str(b),
            PlayerSel::Relative(o) => write!(f, "relative({o})"),
            PlayerSel::All => f.write_str("all"),
            PlayerSel::AllOther => f.write_str("allOther"),
        }
    }
}

/// Selects exactly one zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneSel {
    /// A zone by id.
    Id(ZoneId),
    /// The per-seat instance `<base>:<seat>` of an owned zone.
    Owned { base: String, player: PlayerSel },
    /// A zone held in a binding.
    Binding(String),
    /// A computed zone name.
    Expr(Box<ValueExpr>),
}

impl ZoneSel {
    /// Select a zone by id.
    pub fn id(zone: impl Into<String>) -> Self {
        ZoneSel::Id(ZoneId::new(zone))
    }

    /// Select a bound zone.
    pub fn binding(name: impl Into<String>) -> Self {
        ZoneSel::Binding(name.into())
    }
}

/// Selects one token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenSel {
    /// A token held in a binding.
    Binding(String),
    /// The top token of a zone.
    Top(ZoneSel),
}

impl TokenSel {
    /// Select a bound token.
    pub fn binding(name: impl Into<String>) -> Self {
        TokenSel::Binding(name.into())
    }
}
