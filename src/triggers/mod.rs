//! Reactive triggers.
//!
//! A trigger is declared in the game definition with an [`EventPattern`]
//! (`crate::def::EventPattern`), an optional `when` condition and an effect
//! program. The kernel raises [`TriggerEvent`]s at phase boundaries, turn
//! boundaries and after each action; the effect interpreter raises more
//! (variable changes, token arrivals).
//!
//! ## Dispatch order
//!
//! For each event, matching triggers run in declaration order. Events a
//! trigger's program emits are dispatched depth-first before the next
//! trigger runs. Past `max_trigger_depth` the cascade is cut: the log gets a
//! [`TriggerLogEntry::Truncated`] entry and the caller a warning.
//!
//! ## Example
//!
//! ```
//! use game_kernel::core::PhaseId;
//! use game_kernel::def::EventPattern;
//! use game_kernel::triggers::TriggerEvent;
//!
//! let event = TriggerEvent::PhaseEnter(PhaseId::new("main"));
//! assert!(event.matches(&EventPattern::PhaseEnter { phase: None }));
//! assert!(!event.matches(&EventPattern::TurnStart));
//! ```

mod dispatch;
mod event;

pub use dispatch::{dispatch_triggers, dispatch_triggers_with_config, DispatchResult, TriggerLogEntry};
pub use event::{TriggerEvent, EVENT_ACTOR, EVENT_PHASE, EVENT_TOKEN, EVENT_VAR, EVENT_ZONE};
