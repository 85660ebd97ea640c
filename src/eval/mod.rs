//! Pure evaluation of values, conditions and queries against a state.
//!
//! Evaluation never mutates and never draws randomness. Failures are typed
//! `EvalError`s; the effect interpreter decides at its boundary whether a
//! failure is fatal (execution mode) or "not yet known" (discovery mode).

mod condition;
mod context;
mod query;
mod selectors;
mod value;

pub use condition::{compare, eval_condition};
pub use context::{Bindings, EvalContext};
pub use query::{eval_query, token_matches};
pub use selectors::{resolve_player, resolve_players, resolve_token, resolve_zone};
pub use value::{eval_value, resolve_reference, values_equal};

pub(crate) use condition::zone_passes;
pub(crate) use value::arith;
