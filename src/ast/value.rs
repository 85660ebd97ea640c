//! Value expressions.

use serde::{Deserialize, Serialize};

use crate::core::{TableId, Value};

use super::condition::Condition;
use super::query::{Query, TokenFilter};
use super::selector::{PlayerSel, ZoneSel};

/// Integer operators. Division truncates toward zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

/// Folds over a query's result sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateOp {
    Sum,
    Count,
    Min,
    Max,
}

/// Something an expression can read from the state or the bindings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reference {
    GlobalVar(String),
    PlayerVar { player: PlayerSel, var: String },
    ZoneVar { zone: ZoneSel, var: String },
    Binding(String),
    /// A property of a bound token (falls back to the token type default).
    TokenProp { token: String, prop: String },
    /// The zone currently holding a bound token.
    TokenZone { token: String },
    /// Number of tokens in a zone matching every filter.
    ZoneCount { zone: ZoneSel, filter: Vec<TokenFilter> },
    ActivePlayer,
    Actor,
    TurnCount,
    CurrentPhase,
    /// Per-zone marker state.
    Marker { zone: ZoneSel, marker: String },
    GlobalMarker(String),
    /// A field of the row a unique key selects.
    TableField {
        table: TableId,
        key: Vec<ValueExpr>,
        field: String,
    },
    /// A field of a bound row.
    RowField { row: String, field: String },
    /// Card-driven eligibility of a faction.
    Eligible(PlayerSel),
}

/// An expression producing a single `Value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueExpr {
    Literal(Value),
    Ref(Reference),
    Arith {
        op: ArithOp,
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
    },
    /// Fold `value` over `query`, binding each element to `bind`.
    /// `Count` ignores `value`.
    Aggregate {
        op: AggregateOp,
        query: Box<Query>,
        bind: String,
        value: Option<Box<ValueExpr>>,
    },
    If {
        when: Box<Condition>,
        then: Box<ValueExpr>,
        otherwise: Box<ValueExpr>,
    },
    /// String concatenation of the displayed parts.
    Concat(Vec<ValueExpr>),
    Player(PlayerSel),
    Zone(ZoneSel),
}

impl ValueExpr {
    /// Integer literal.
    #[must_use]
    pub fn int(n: i64) -> Self {
        ValueExpr::Literal(Value::Int(n))
    }

    /// Boolean literal.
    #[must_use]
    pub fn bool(b: bool) -> Self {
        ValueExpr::Literal(Value::Bool(b))
    }

    /// String literal.
    pub fn str(s: impl Into<String>) -> Self {
        ValueExpr::Literal(Value::Str(s.into()))
    }

    /// Read a global variable.
    pub fn global(var: impl Into<String>) -> Self {
        ValueExpr::Ref(Reference::GlobalVar(var.into()))
    }

    /// Read a per-player variable.
    pub fn player_var(player: PlayerSel, var: impl Into<String>) -> Self {
        ValueExpr::Ref(Reference::PlayerVar {
            player,
            var: var.into(),
        })
    }

    /// Read a binding.
    pub fn binding(name: impl Into<String>) -> Self {
        ValueExpr::Ref(Reference::Binding(name.into()))
    }

    /// Read a bound token's property.
    pub fn token_prop(token: impl Into<String>, prop: impl Into<String>) -> Self {
        ValueExpr::Ref(Reference::TokenProp {
            token: token.into(),
            prop: prop.into(),
        })
    }

    /// Count tokens in a zone.
    #[must_use]
    pub fn zone_count(zone: ZoneSel) -> Self {
        ValueExpr::Ref(Reference::ZoneCount {
            zone,
            filter: Vec::new(),
        })
    }

    /// Binary arithmetic.
    #[must_use]
    pub fn arith(op: ArithOp, left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left + right`.
    #[must_use]
    pub fn add(left: ValueExpr, right: ValueExpr) -> Self {
        Self::arith(ArithOp::Add, left, right)
    }

    /// Aggregate over a query.
    pub fn aggregate(
        op: AggregateOp,
        query: Query,
        bind: impl Into<String>,
        value: Option<ValueExpr>,
    ) -> Self {
        ValueExpr::Aggregate {
            op,
            query: Box::new(query),
            bind: bind.into(),
            value: value.map(Box::new),
        }
    }
}

impl From<i64> for ValueExpr {
    fn from(n: i64) -> Self {
        ValueExpr::int(n)
    }
}
