//! Turn-order runtime state, one variant per configured turn order.

use serde::{Deserialize, Serialize};

use crate::core::{Move, PlayerId};
use crate::def::{ActionClass, TurnOrderConfig, WindowDuration};

/// Per-variant turn-order state carried in `GameState`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnOrderRuntime {
    RoundRobin,
    FixedOrder { position: u32 },
    Simultaneous(SimultaneousRuntime),
    CardDriven(CardDrivenRuntime),
}

impl TurnOrderRuntime {
    /// Fresh runtime for a configuration. Card-driven slots are seeded later
    /// by `initial_state`, once setup has dealt the cards.
    #[must_use]
    pub fn for_config(config: &TurnOrderConfig) -> Self {
        match config {
            TurnOrderConfig::RoundRobin => TurnOrderRuntime::RoundRobin,
            TurnOrderConfig::FixedOrder { .. } => TurnOrderRuntime::FixedOrder { position: 0 },
            TurnOrderConfig::Simultaneous => {
                TurnOrderRuntime::Simultaneous(SimultaneousRuntime::default())
            }
            TurnOrderConfig::CardDriven(_) => TurnOrderRuntime::CardDriven(CardDrivenRuntime::default()),
        }
    }

    #[must_use]
    pub fn as_card_driven(&self) -> Option<&CardDrivenRuntime> {
        match self {
            TurnOrderRuntime::CardDriven(rt) => Some(rt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_simultaneous(&self) -> Option<&SimultaneousRuntime> {
        match self {
            TurnOrderRuntime::Simultaneous(rt) => Some(rt),
            _ => None,
        }
    }
}

/// Buffered submissions for the current simultaneous phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimultaneousRuntime {
    /// Bit `n` is set once seat `n` has submitted.
    pub submitted: u64,
    /// Submitted moves in arrival order.
    pub pending: Vec<(PlayerId, Move)>,
}

impl SimultaneousRuntime {
    #[must_use]
    pub fn has_submitted(&self, player: PlayerId) -> bool {
        self.submitted & player.bit() != 0
    }

    /// Whether every seat below `player_count` has submitted.
    #[must_use]
    pub fn all_submitted(&self, player_count: usize) -> bool {
        PlayerId::all(player_count).all(|p| self.has_submitted(p))
    }

    /// First seat that still owes a submission.
    #[must_use]
    pub fn next_to_submit(&self, player_count: usize) -> Option<PlayerId> {
        PlayerId::all(player_count).find(|p| !self.has_submitted(*p))
    }
}

/// Progress on the current card.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardState {
    pub first_eligible: Option<PlayerId>,
    pub second_eligible: Option<PlayerId>,
    /// Factions that took a non-pass action on this card.
    pub acted: u64,
    /// Factions that passed on this card.
    pub passed: u64,
    /// Class the first eligible resolved with.
    pub first_action_class: Option<ActionClass>,
    pub non_pass_count: u32,
}

impl CardState {
    /// Whether a faction has acted or passed on this card.
    #[must_use]
    pub fn has_resolved(&self, player: PlayerId) -> bool {
        (self.acted | self.passed) & player.bit() != 0
    }

    /// Whether no faction has acted or passed yet.
    #[must_use]
    pub fn is_pre_action(&self) -> bool {
        self.acted == 0 && self.passed == 0
    }

    /// The faction whose decision it is: the first eligible until it has
    /// resolved, then the second.
    #[must_use]
    pub fn decision_faction(&self) -> Option<PlayerId> {
        match self.first_eligible {
            Some(first) if !self.has_resolved(first) => Some(first),
            _ => self
                .second_eligible
                .filter(|second| !self.has_resolved(*second)),
        }
    }
}

/// A pending or standing eligibility override.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EligibilityOverride {
    pub player: PlayerId,
    pub eligible: bool,
    pub window: String,
    pub duration: WindowDuration,
    /// Card ends to skip before the override first applies.
    pub delay: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoupState {
    /// A coup round is in progress.
    pub active: bool,
    /// The running (or last) coup round was entered with an empty draw pile.
    pub final_round: bool,
    /// Back-to-back coup rounds so far.
    pub consecutive_rounds: u32,
    /// The final coup round has finished.
    pub campaign_complete: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardDrivenRuntime {
    pub current_card: CardState,
    /// Bit `n` is set while seat `n` is eligible.
    pub eligible: u64,
    /// Overrides in declaration order.
    pub overrides: Vec<EligibilityOverride>,
    pub coup: CoupState,
    pub cards_played: u32,
}

impl CardDrivenRuntime {
    #[must_use]
    pub fn is_eligible(&self, player: PlayerId) -> bool {
        self.eligible & player.bit() != 0
    }

    pub fn set_eligible(&mut self, player: PlayerId, eligible: bool) {
        if eligible {
            self.eligible |= player.bit();
        } else {
            self.eligible &= !player.bit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_faction_moves_to_second() {
        let mut card = CardState {
            first_eligible: Some(PlayerId(0)),
            second_eligible: Some(PlayerId(1)),
            ..CardState::default()
        };
        assert!(card.is_pre_action());
        assert_eq!(card.decision_faction(), Some(PlayerId(0)));

        card.acted |= PlayerId(0).bit();
        assert_eq!(card.decision_faction(), Some(PlayerId(1)));

        card.passed |= PlayerId(1).bit();
        assert_eq!(card.decision_faction(), None);
    }

    #[test]
    fn test_simultaneous_tracking() {
        let mut rt = SimultaneousRuntime::default();
        assert_eq!(rt.next_to_submit(3), Some(PlayerId(0)));
        rt.submitted |= PlayerId(0).bit() | PlayerId(2).bit();
        assert_eq!(rt.next_to_submit(3), Some(PlayerId(1)));
        assert!(!rt.all_submitted(3));
        rt.submitted |= PlayerId(1).bit();
        assert!(rt.all_submitted(3));
    }

    #[test]
    fn test_runtime_for_config() {
        assert_eq!(
            TurnOrderRuntime::for_config(&TurnOrderConfig::FixedOrder { order: vec![1, 0] }),
            TurnOrderRuntime::FixedOrder { position: 0 }
        );
        assert!(TurnOrderRuntime::for_config(&TurnOrderConfig::Simultaneous)
            .as_simultaneous()
            .is_some());
    }
}
