//! Game-definition abstract syntax: closed sum types for selectors, values,
//! conditions, queries and effects.
//!
//! Each family has exactly one evaluation function (`eval_value`,
//! `eval_condition`, `eval_query`, `apply_effects`) that matches it
//! exhaustively.

mod condition;
mod effect;
mod query;
mod selector;
mod value;

pub use condition::{CompareOp, Condition, ZoneFilter};
pub use effect::{Effect, TokenPosition, VarTarget};
pub use query::{Query, RowFilter, TokenFilter};
pub use selector::{PlayerSel, TokenSel, ZoneSel};
pub use value::{AggregateOp, ArithOp, Reference, ValueExpr};
