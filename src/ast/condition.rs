//! Boolean conditions.

use serde::{Deserialize, Serialize};

use super::query::Query;
use super::selector::ZoneSel;
use super::value::ValueExpr;

/// Comparison operators. Ordering comparisons require integers; equality
/// works on any pair of values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Per-hop zone filter for spatial searches and zone queries.
///
/// The candidate zone is bound to `bind` while `when` is evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneFilter {
    pub bind: String,
    pub when: Box<Condition>,
}

impl ZoneFilter {
    /// Create a zone filter.
    pub fn new(bind: impl Into<String>, when: Condition) -> Self {
        Self {
            bind: bind.into(),
            when: Box::new(when),
        }
    }
}

/// A predicate over the state and bindings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Const(bool),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        op: CompareOp,
        left: ValueExpr,
        right: ValueExpr,
    },
    /// `item` is one of the query's results.
    In { item: ValueExpr, set: Query },
    /// The zones are direct neighbors.
    Adjacent { left: ZoneSel, right: ZoneSel },
    /// `to` is reachable from `from` within `max_depth` hops, every hop
    /// (including `to`) passing `via`.
    Connected {
        from: ZoneSel,
        to: ZoneSel,
        via: Option<ZoneFilter>,
        max_depth: Option<u32>,
    },
}

impl Condition {
    /// Comparison helper.
    #[must_use]
    pub fn compare(op: CompareOp, left: ValueExpr, right: ValueExpr) -> Self {
        Condition::Compare { op, left, right }
    }

    /// `left == right`.
    #[must_use]
    pub fn eq(left: ValueExpr, right: ValueExpr) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    /// `left >= right`.
    #[must_use]
    pub fn ge(left: ValueExpr, right: ValueExpr) -> Self {
        Self::compare(CompareOp::Ge, left, right)
    }

    /// `left <= right`.
    #[must_use]
    pub fn le(left: ValueExpr, right: ValueExpr) -> Self {
        Self::compare(CompareOp::Le, left, right)
    }

    /// Negate this condition.
    #[must_use]
    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }
}
