//! Queries: expressions producing ordered result sequences.
//!
//! Every query result is a `Vec<Value>` in a deterministic order (zone
//! order, token slot order, declaration order or ascending value). The
//! evaluator caps result length at `max_query_results`.

use serde::{Deserialize, Serialize};

use crate::core::{TableId, TokenTypeId, Value};

use super::condition::{CompareOp, Condition, ZoneFilter};
use super::selector::ZoneSel;
use super::value::ValueExpr;

/// Token filter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenFilter {
    /// Token is of this type.
    Kind(TokenTypeId),
    /// Token property compares against a value.
    Prop {
        prop: String,
        op: CompareOp,
        value: ValueExpr,
    },
}

impl TokenFilter {
    /// Filter on token type.
    pub fn kind(kind: impl Into<String>) -> Self {
        TokenFilter::Kind(TokenTypeId::new(kind))
    }

    /// Filter on a property equal to `value`.
    pub fn prop_eq(prop: impl Into<String>, value: ValueExpr) -> Self {
        TokenFilter::Prop {
            prop: prop.into(),
            op: CompareOp::Eq,
            value,
        }
    }
}

/// Field-equality filter on table rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowFilter {
    pub field: String,
    pub value: ValueExpr,
}

/// A result-sequence expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Query {
    /// Integers `min..=max` ascending; empty when `min > max`.
    IntRange { min: ValueExpr, max: ValueExpr },
    /// Literal values in declaration order.
    Literal(Vec<Value>),
    /// Every seat ascending.
    Players,
    /// Zones in declaration order, optionally by category and filter.
    Zones {
        category: Option<String>,
        filter: Option<ZoneFilter>,
    },
    /// Tokens of a zone top-first.
    TokensInZone { zone: ZoneSel, filter: Vec<TokenFilter> },
    /// Tokens of every neighbor of `zone`, neighbors in sorted order.
    TokensInAdjacentZones { zone: ZoneSel, filter: Vec<TokenFilter> },
    /// Sorted neighbors of a zone.
    AdjacentZones { zone: ZoneSel },
    /// Zones reachable from `zone` by breadth-first search.
    ConnectedZones {
        zone: ZoneSel,
        via: Option<ZoneFilter>,
        max_depth: Option<u32>,
        include_start: bool,
    },
    /// A bound list (or scalar, as a one-element list).
    Binding(String),
    /// Results of each query, concatenated.
    Concat(Vec<Query>),
    /// Rows of a table matching every filter, in row order.
    TableRows { table: TableId, filter: Vec<RowFilter> },
    /// Elements of `source` for which `when` holds with the element bound.
    Filter {
        source: Box<Query>,
        bind: String,
        when: Box<Condition>,
    },
}

impl Query {
    /// Integer range helper.
    #[must_use]
    pub fn range(min: i64, max: i64) -> Self {
        Query::IntRange {
            min: ValueExpr::int(min),
            max: ValueExpr::int(max),
        }
    }

    /// Literal string options.
    pub fn enums<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Literal(items.into_iter().map(|s| Value::Str(s.into())).collect())
    }

    /// Every zone.
    #[must_use]
    pub fn zones() -> Self {
        Query::Zones {
            category: None,
            filter: None,
        }
    }

    /// Tokens in a zone.
    #[must_use]
    pub fn tokens_in(zone: ZoneSel) -> Self {
        Query::TokensInZone {
            zone,
            filter: Vec::new(),
        }
    }
}
