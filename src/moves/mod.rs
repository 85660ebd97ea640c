//! Move legality.
//!
//! Every question about a move goes through the same gates, in order:
//!
//! 1. the action exists and the game is not over
//! 2. phase, actor, executor and usage limits
//! 3. card-driven eligibility, option matrix, pivotal window and monsoon
//! 4. declared parameters, each checked against its domain
//! 5. the precondition, deferred when it reads a name the program binds
//! 6. a discovery run of the cost and effect programs
//!
//! `legal_moves` expands parameter domains and keeps every candidate whose
//! decisions might still be answered legally.

mod enumerate;
mod gates;
mod probe;

pub use enumerate::{legal_moves, legal_moves_with_config, LegalMoves};

pub(crate) use enumerate::has_legal_move;
pub(crate) use gates::{admit, bind_params, effect_rejection, precondition, Precondition, Rejection};
pub(crate) use probe::{Probe, Prober};
