//! Events the kernel emits.
//!
//! Events are produced by phase transitions, action resolution and by the
//! effect interpreter (variable writes, token arrivals). Trigger programs
//! see an event's payload through reserved bindings.

use serde::{Deserialize, Serialize};

use crate::core::{ActionId, PhaseId, PlayerId, TokenId, Value, ZoneId};
use crate::def::EventPattern;
use crate::eval::Bindings;

/// Binding holding the phase of a phase event.
pub const EVENT_PHASE: &str = "$event.phase";
/// Binding holding the acting player of an `ActionResolved` event.
pub const EVENT_ACTOR: &str = "$event.actor";
/// Binding holding the variable name of a `VarChanged` event.
pub const EVENT_VAR: &str = "$event.var";
/// Binding holding the arriving token of a `TokenEntered` event.
pub const EVENT_TOKEN: &str = "$event.token";
/// Binding holding the destination zone of a `TokenEntered` event.
pub const EVENT_ZONE: &str = "$event.zone";

/// Something that happened.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerEvent {
    PhaseEnter(PhaseId),
    PhaseExit(PhaseId),
    TurnStart,
    TurnEnd,
    ActionResolved { action: ActionId, actor: PlayerId },
    VarChanged { var: String },
    TokenEntered { token: TokenId, zone: ZoneId },
}

impl TriggerEvent {
    /// Whether a trigger listening for `pattern` sees this event.
    #[must_use]
    pub fn matches(&self, pattern: &EventPattern) -> bool {
        match (self, pattern) {
            (TriggerEvent::PhaseEnter(p), EventPattern::PhaseEnter { phase })
            | (TriggerEvent::PhaseExit(p), EventPattern::PhaseExit { phase }) => {
                phase.as_ref().map_or(true, |want| want == p)
            }
            (TriggerEvent::TurnStart, EventPattern::TurnStart)
            | (TriggerEvent::TurnEnd, EventPattern::TurnEnd) => true,
            (TriggerEvent::ActionResolved { action, .. }, EventPattern::ActionResolved { action: want }) => {
                want.as_ref().map_or(true, |w| w == action)
            }
            (TriggerEvent::VarChanged { var }, EventPattern::VarChanged { var: want }) => {
                want.as_ref().map_or(true, |w| w == var)
            }
            (TriggerEvent::TokenEntered { zone, .. }, EventPattern::TokenEntered { zone: want }) => {
                want.as_ref().map_or(true, |w| w == zone)
            }
            _ => false,
        }
    }

    /// The event's payload as trigger bindings.
    #[must_use]
    pub fn bindings(&self) -> Bindings {
        let mut out = Bindings::new();
        match self {
            TriggerEvent::PhaseEnter(phase) | TriggerEvent::PhaseExit(phase) => {
                out.insert(EVENT_PHASE.to_string(), Value::Str(phase.as_str().to_string()));
            }
            TriggerEvent::ActionResolved { actor, .. } => {
                out.insert(EVENT_ACTOR.to_string(), Value::Player(*actor));
            }
            TriggerEvent::VarChanged { var } => {
                out.insert(EVENT_VAR.to_string(), Value::Str(var.clone()));
            }
            TriggerEvent::TokenEntered { token, zone } => {
                out.insert(EVENT_TOKEN.to_string(), Value::Token(*token));
                out.insert(EVENT_ZONE.to_string(), Value::Zone(zone.clone()));
            }
            TriggerEvent::TurnStart | TriggerEvent::TurnEnd => {}
        }
        out
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEvent::PhaseEnter(p) => write!(f, "phaseEnter({p})"),
            TriggerEvent::PhaseExit(p) => write!(f, "phaseExit({p})"),
            TriggerEvent::TurnStart => f.write_str("turnStart"),
            TriggerEvent::TurnEnd => f.write_str("turnEnd"),
            TriggerEvent::ActionResolved { action, actor } => {
                write!(f, "actionResolved({action}, {actor})")
            }
            TriggerEvent::VarChanged { var } => write!(f, "varChanged({var})"),
            TriggerEvent::TokenEntered { token, zone } => write!(f, "tokenEntered({token}, {zone})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_patterns_match_any_payload() {
        let event = TriggerEvent::TokenEntered {
            token: TokenId::new(3),
            zone: ZoneId::new("saigon"),
        };
        assert!(event.matches(&EventPattern::TokenEntered { zone: None }));
        assert!(event.matches(&EventPattern::TokenEntered {
            zone: Some(ZoneId::new("saigon"))
        }));
        assert!(!event.matches(&EventPattern::TokenEntered {
            zone: Some(ZoneId::new("hue"))
        }));
        assert!(!event.matches(&EventPattern::TurnStart));
    }

    #[test]
    fn test_phase_patterns_distinguish_enter_and_exit() {
        let enter = TriggerEvent::PhaseEnter(PhaseId::new("coup"));
        assert!(enter.matches(&EventPattern::PhaseEnter { phase: None }));
        assert!(!enter.matches(&EventPattern::PhaseExit { phase: None }));
    }

    #[test]
    fn test_event_bindings() {
        let event = TriggerEvent::TokenEntered {
            token: TokenId::new(7),
            zone: ZoneId::new("hue"),
        };
        let bindings = event.bindings();
        assert_eq!(bindings.get(EVENT_TOKEN), Some(&Value::Token(TokenId::new(7))));
        assert_eq!(bindings.get(EVENT_ZONE), Some(&Value::Zone(ZoneId::new("hue"))));
        assert!(TriggerEvent::TurnEnd.bindings().is_empty());
    }
}
