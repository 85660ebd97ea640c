//! Turn-order state machine.
//!
//! Every variant shares phase progression: leaving a phase runs its exit
//! hook, entering one resets phase usage and runs its entry hook, and
//! wrapping past the last phase ends the turn.
//!
//! - **Round robin / fixed order**: the active seat rotates on wrap.
//! - **Simultaneous**: each seat submits once per phase; submissions are
//!   buffered and resolve together in seat order.
//! - **Card driven**: each card is a turn with two eligible factions, pass
//!   rewards, an option matrix, eligibility override windows and coup rounds.

mod card_driven;
mod phase;
mod runtime;

pub use card_driven::monsoon_active;
pub use phase::{
    advance_phase, advance_phase_with_config, decision_player, reset_phase_usage, reset_turn_usage,
};
pub use runtime::{
    CardDrivenRuntime, CardState, CoupState, EligibilityOverride, SimultaneousRuntime, TurnOrderRuntime,
};

pub(crate) use card_driven::{check_card_gates, check_monsoon_caps};
