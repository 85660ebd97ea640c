//! Turn-order configuration.
//!
//! The variant chosen here decides how the active player rotates and when a
//! turn ends. The matching runtime state lives in
//! [`TurnOrderRuntime`](crate::turn::TurnOrderRuntime).
//!
//! ## Card-driven flow
//!
//! Each card is one turn. Two factions are eligible per card: the first
//! eligible acts (or passes), then the second eligible. The option matrix
//! limits what the second may do given what the first did. The card ends
//! after two non-pass actions, after a pivotal action, or when no eligible
//! faction is left. Coup cards interrupt the campaign with a coup round.

use serde::{Deserialize, Serialize};

use crate::ast::VarTarget;
use crate::core::{ActionId, PhaseId, ZoneId};

/// What kind of action a card-driven move is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionClass {
    Pass,
    Event,
    Operation,
    LimitedOperation,
    OperationPlusSpecialActivity,
}

impl ActionClass {
    /// Class used for option-matrix lookup.
    #[must_use]
    pub fn matrix_key(self) -> Self {
        match self {
            ActionClass::LimitedOperation => ActionClass::Operation,
            other => other,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurnOrderConfig {
    /// Seats take turns in index order.
    #[default]
    RoundRobin,
    /// Seats take turns in a declared order.
    FixedOrder { order: Vec<u8> },
    /// Every seat submits once per phase; moves resolve together.
    Simultaneous,
    CardDriven(CardDrivenConfig),
}

/// How long an eligibility override lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowDuration {
    /// Applied at the end of the current card, for the next card only.
    Turn,
    /// Applied at the end of the card after the current one.
    NextTurn,
    /// Reapplied at every card end until the next coup round finishes.
    Round,
    /// Reapplied at every card end for the rest of the game.
    Cycle,
}

/// A named override window that `SetEligibility` effects refer to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideWindow {
    pub id: String,
    pub duration: WindowDuration,
}

/// Permitted second-eligible classes for one first-eligible class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMatrixRow {
    pub first: ActionClass,
    pub second: Vec<ActionClass>,
}

/// Resource paid to a faction that passes. `PlayerSel::Actor` in the target
/// names the passing faction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReward {
    /// Seat the reward applies to; every seat when absent.
    #[serde(default)]
    pub faction: Option<u8>,
    pub target: VarTarget,
    pub amount: i64,
}

/// The card piles. Slot 0 of each zone is the top card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLifecycle {
    pub draw: ZoneId,
    pub lookahead: ZoneId,
    pub played: ZoneId,
    /// Boolean token property marking coup cards.
    pub coup_prop: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupPlan {
    /// Phases run during a coup round, in order.
    pub phases: Vec<PhaseId>,
    /// Phases skipped when the coup round is the last one.
    #[serde(default)]
    pub final_round_omit_phases: Vec<PhaseId>,
    /// Coup cards drawn after this many back-to-back coup rounds are skipped.
    #[serde(default = "one")]
    pub max_consecutive_rounds: u32,
}

fn one() -> u32 {
    1
}

/// Limit on one parameter of a restricted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamCap {
    pub param: String,
    /// Maximum list length, or maximum integer value.
    pub max: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsoonRestriction {
    pub action: ActionId,
    /// The action is forbidden outright when absent.
    #[serde(default)]
    pub max_param: Option<ParamCap>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsoonConfig {
    pub restrictions: Vec<MonsoonRestriction>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotalConfig {
    pub actions: Vec<ActionId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDrivenConfig {
    /// Scan order for eligibility; seat order when empty.
    #[serde(default)]
    pub faction_order: Vec<u8>,
    /// Non-pass actors sit out the next card.
    #[serde(default)]
    pub ineligible_after_acting: bool,
    #[serde(default)]
    pub override_windows: Vec<OverrideWindow>,
    #[serde(default)]
    pub option_matrix: Vec<OptionMatrixRow>,
    #[serde(default)]
    pub pass_rewards: Vec<PassReward>,
    #[serde(default)]
    pub cards: Option<CardLifecycle>,
    #[serde(default)]
    pub coup_plan: Option<CoupPlan>,
    #[serde(default)]
    pub monsoon: Option<MonsoonConfig>,
    #[serde(default)]
    pub pivotal: Option<PivotalConfig>,
}

impl CardDrivenConfig {
    /// Seats in eligibility scan order.
    #[must_use]
    pub fn scan_order(&self, player_count: usize) -> Vec<u8> {
        if self.faction_order.is_empty() {
            (0..player_count as u8).collect()
        } else {
            self.faction_order.clone()
        }
    }

    /// Classes the second eligible may use after the first used `first`.
    /// `None` means the matrix does not restrict this case.
    #[must_use]
    pub fn second_options(&self, first: ActionClass) -> Option<&[ActionClass]> {
        let key = first.matrix_key();
        self.option_matrix
            .iter()
            .find(|row| row.first.matrix_key() == key)
            .map(|row| row.second.as_slice())
    }

    /// Whether `candidate` is permitted for the second eligible.
    #[must_use]
    pub fn permits_second(&self, first: ActionClass, candidate: ActionClass) -> bool {
        if candidate == ActionClass::Pass {
            return true;
        }
        match self.second_options(first) {
            None => true,
            Some(allowed) => {
                allowed.contains(&candidate)
                    || (candidate == ActionClass::LimitedOperation
                        && allowed.contains(&ActionClass::Operation))
            }
        }
    }

    /// Duration of a declared override window.
    #[must_use]
    pub fn window(&self, id: &str) -> Option<WindowDuration> {
        self.override_windows
            .iter()
            .find(|w| w.id == id)
            .map(|w| w.duration)
    }

    #[must_use]
    pub fn is_pivotal(&self, action: &ActionId) -> bool {
        self.pivotal
            .as_ref()
            .is_some_and(|p| p.actions.contains(action))
    }

    #[must_use]
    pub fn is_coup_phase(&self, phase: &PhaseId) -> bool {
        self.coup_plan
            .as_ref()
            .is_some_and(|plan| plan.phases.contains(phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> CardDrivenConfig {
        CardDrivenConfig {
            option_matrix: vec![
                OptionMatrixRow {
                    first: ActionClass::Event,
                    second: vec![ActionClass::OperationPlusSpecialActivity],
                },
                OptionMatrixRow {
                    first: ActionClass::Operation,
                    second: vec![ActionClass::LimitedOperation],
                },
                OptionMatrixRow {
                    first: ActionClass::OperationPlusSpecialActivity,
                    second: vec![ActionClass::LimitedOperation, ActionClass::Event],
                },
            ],
            ..CardDrivenConfig::default()
        }
    }

    #[test]
    fn test_limited_operation_uses_operation_row() {
        let config = matrix();
        assert_eq!(
            config.second_options(ActionClass::LimitedOperation),
            Some(&[ActionClass::LimitedOperation][..])
        );
        assert!(!config.permits_second(ActionClass::LimitedOperation, ActionClass::Event));
    }

    #[test]
    fn test_pass_always_permitted() {
        let config = matrix();
        assert!(config.permits_second(ActionClass::Operation, ActionClass::Pass));
        assert!(!config.permits_second(ActionClass::Operation, ActionClass::Operation));
    }

    #[test]
    fn test_operation_row_admits_limited_operation() {
        let config = CardDrivenConfig {
            option_matrix: vec![OptionMatrixRow {
                first: ActionClass::Event,
                second: vec![ActionClass::Operation],
            }],
            ..CardDrivenConfig::default()
        };
        assert!(config.permits_second(ActionClass::Event, ActionClass::LimitedOperation));
        assert!(config.permits_second(ActionClass::Pass, ActionClass::Event));
    }

    #[test]
    fn test_tagged_json() {
        let config: TurnOrderConfig =
            serde_json::from_str(r#"{"type":"fixedOrder","order":[2,0,1]}"#).unwrap();
        assert_eq!(config, TurnOrderConfig::FixedOrder { order: vec![2, 0, 1] });

        let config: TurnOrderConfig =
            serde_json::from_str(r#"{"type":"cardDriven","ineligible_after_acting":true}"#).unwrap();
        match config {
            TurnOrderConfig::CardDriven(c) => assert!(c.ineligible_after_acting),
            other => panic!("unexpected {other:?}"),
        }
    }
}
