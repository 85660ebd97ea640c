//! Card-driven turn flow.
//!
//! Each card is one turn. The two eligible factions decide in order, the
//! card ends, overrides resolve, the next card is revealed and the slots are
//! reseeded. Coup cards interrupt the campaign with a coup round that runs
//! the coup plan's phases instead of the card phases.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{Effect, ValueExpr};
use crate::core::{seat_mask, GameState, IllegalMoveReason, KernelError, PhaseId, PlayerId, TokenId, Value, ZoneId};
use crate::def::{ActionClass, ActionDef, CardDrivenConfig, TurnOrderConfig, ValidatedGameDef, WindowDuration};
use crate::eval::Bindings;
use crate::kernel::Transition;

use super::runtime::{CardDrivenRuntime, CardState, TurnOrderRuntime};

fn top_token(state: &GameState, zone: &ZoneId) -> Option<TokenId> {
    state.tokens(zone).and_then(|t| t.front()).map(|t| t.id)
}

fn top_is_coup(state: &GameState, zone: &ZoneId, prop: &str) -> bool {
    state
        .tokens(zone)
        .and_then(|t| t.front())
        .and_then(|t| t.prop(prop))
        == Some(&Value::Bool(true))
}

fn card_phases<'d>(def: &'d ValidatedGameDef, config: &CardDrivenConfig) -> Vec<&'d PhaseId> {
    def.turn_structure
        .phases
        .iter()
        .map(|p| &p.id)
        .filter(|id| !config.is_coup_phase(id))
        .collect()
}

fn coup_phases(config: &CardDrivenConfig, final_round: bool) -> Vec<PhaseId> {
    config.coup_plan.as_ref().map_or_else(Vec::new, |plan| {
        plan.phases
            .iter()
            .filter(|p| !(final_round && plan.final_round_omit_phases.contains(p)))
            .cloned()
            .collect()
    })
}

/// Whether monsoon restrictions are in force: the lookahead card is a coup card.
#[must_use]
pub fn monsoon_active(def: &ValidatedGameDef, state: &GameState) -> bool {
    let TurnOrderConfig::CardDriven(config) = &def.turn_order else {
        return false;
    };
    match (&config.monsoon, &config.cards) {
        (Some(_), Some(cards)) => top_is_coup(state, &cards.lookahead, &cards.coup_prop),
        _ => false,
    }
}

/// Card-driven admission: eligibility, pivotal window, option matrix and
/// monsoon bans. Actions without a class are not governed by card flow.
pub(crate) fn check_card_gates(
    def: &ValidatedGameDef,
    state: &GameState,
    action: &ActionDef,
    actor: PlayerId,
) -> Result<(), IllegalMoveReason> {
    let TurnOrderConfig::CardDriven(config) = &def.turn_order else {
        return Ok(());
    };
    let Some(rt) = state.turn_order().as_card_driven() else {
        return Ok(());
    };
    if rt.coup.active {
        return Ok(());
    }

    if monsoon_active(def, state) {
        let banned = config.monsoon.iter().flat_map(|m| &m.restrictions).any(|r| {
            r.action == action.id && r.max_param.is_none()
        });
        if banned {
            return Err(IllegalMoveReason::MonsoonRestricted);
        }
    }

    let pivotal = config.is_pivotal(&action.id);
    if action.class.is_none() && !pivotal {
        return Ok(());
    }
    let card = &rt.current_card;
    if card.decision_faction() != Some(actor) || !rt.is_eligible(actor) {
        return Err(IllegalMoveReason::NotEligible);
    }
    if pivotal && !card.is_pre_action() {
        return Err(IllegalMoveReason::PivotalWindowClosed);
    }
    if let (Some(class), Some(first)) = (action.class, card.first_action_class) {
        if card.second_eligible == Some(actor) && !config.permits_second(first, class) {
            return Err(IllegalMoveReason::TurnFlowClassMismatch);
        }
    }
    Ok(())
}

/// Monsoon parameter caps. A list counts by length, an integer by value.
pub(crate) fn check_monsoon_caps(
    def: &ValidatedGameDef,
    state: &GameState,
    action: &ActionDef,
    params: &BTreeMap<String, Value>,
) -> Result<(), IllegalMoveReason> {
    let TurnOrderConfig::CardDriven(config) = &def.turn_order else {
        return Ok(());
    };
    if !monsoon_active(def, state) {
        return Ok(());
    }
    let caps = config
        .monsoon
        .iter()
        .flat_map(|m| &m.restrictions)
        .filter(|r| r.action == action.id)
        .filter_map(|r| r.max_param.as_ref());
    for cap in caps {
        let size = match params.get(&cap.param) {
            Some(Value::List(items)) => items.len() as i64,
            Some(Value::Int(n)) => *n,
            _ => continue,
        };
        if size > cap.max {
            return Err(IllegalMoveReason::MonsoonRestricted);
        }
    }
    Ok(())
}

impl Transition<'_> {
    fn card_runtime(&self) -> CardDrivenRuntime {
        self.state.turn_order().as_card_driven().cloned().unwrap_or_default()
    }

    fn set_card_runtime(&mut self, runtime: CardDrivenRuntime) {
        let table = self.table();
        self.state.set_turn_order(table, TurnOrderRuntime::CardDriven(runtime));
    }

    fn move_top(&mut self, from: &ZoneId, to: &ZoneId) -> Option<TokenId> {
        let card = top_token(&self.state, from)?;
        let table = self.table();
        self.state.move_token(table, card, to, 0);
        Some(card)
    }

    /// Deal the opening cards, make every faction eligible and seed the
    /// first card's slots.
    pub(crate) fn start_campaign(&mut self, config: &CardDrivenConfig) {
        if let Some(cards) = &config.cards {
            if top_token(&self.state, &cards.played).is_none() {
                self.move_top(&cards.draw, &cards.played);
            }
            if top_token(&self.state, &cards.lookahead).is_none() {
                self.move_top(&cards.draw, &cards.lookahead);
            }
        }
        let mut rt = self.card_runtime();
        rt.eligible = seat_mask(PlayerId::all(self.state.player_count()));
        self.set_card_runtime(rt);
        self.reseed(config);
    }

    /// Seed the first and second eligible slots by scan order.
    fn reseed(&mut self, config: &CardDrivenConfig) {
        let mut rt = self.card_runtime();
        let mut eligible = config
            .scan_order(self.state.player_count())
            .into_iter()
            .map(PlayerId)
            .filter(|p| rt.is_eligible(*p));
        let (first, second) = (eligible.next(), eligible.next());
        rt.current_card = CardState {
            first_eligible: first,
            second_eligible: second,
            ..CardState::default()
        };
        let active = rt.current_card.first_eligible;
        self.set_card_runtime(rt);
        if let Some(active) = active {
            let table = self.table();
            self.state.set_active_player(table, active);
        }
    }

    /// Record a resolved action against the current card, ending the card
    /// when its decisions are used up.
    pub(crate) fn on_action_resolved(&mut self, action: &ActionDef, actor: PlayerId) -> Result<(), KernelError> {
        let def = self.def;
        let TurnOrderConfig::CardDriven(config) = &def.turn_order else {
            return Ok(());
        };
        let mut rt = self.card_runtime();
        if rt.coup.active {
            return Ok(());
        }
        let pivotal = config.is_pivotal(&action.id);
        if action.class.is_none() && !pivotal {
            return Ok(());
        }

        if action.class == Some(ActionClass::Pass) {
            self.record_pass(config, rt, actor)?;
        } else {
            let card = &mut rt.current_card;
            card.acted |= actor.bit();
            card.non_pass_count += 1;
            if card.first_eligible == Some(actor) && card.first_action_class.is_none() {
                card.first_action_class = action.class;
            }
            self.set_card_runtime(rt);
        }

        let card = self.card_runtime().current_card;
        if pivotal || card.non_pass_count >= 2 || card.decision_faction().is_none() {
            debug!(action = %action.id, pivotal, "card finished");
            return self.end_card(config);
        }
        if let Some(next) = card.decision_faction() {
            let table = self.table();
            self.state.set_active_player(table, next);
        }
        Ok(())
    }

    fn record_pass(
        &mut self,
        config: &CardDrivenConfig,
        mut rt: CardDrivenRuntime,
        actor: PlayerId,
    ) -> Result<(), KernelError> {
        rt.current_card.passed |= actor.bit();
        let scan: Vec<PlayerId> = config
            .scan_order(self.state.player_count())
            .into_iter()
            .map(PlayerId)
            .collect();
        let card = rt.current_card.clone();
        let open = |p: &PlayerId| rt.is_eligible(*p) && !card.has_resolved(*p);
        if card.first_eligible == Some(actor) {
            let mut next = scan.iter().copied().filter(open);
            let (first, second) = (next.next(), next.next());
            rt.current_card.first_eligible = first;
            rt.current_card.second_eligible = second;
        } else if card.second_eligible == Some(actor) {
            let second = scan
                .iter()
                .copied()
                .filter(open)
                .find(|p| Some(*p) != card.first_eligible);
            rt.current_card.second_eligible = second;
        }
        self.set_card_runtime(rt);

        let rewards: Vec<Effect> = config
            .pass_rewards
            .iter()
            .filter(|r| r.faction.map_or(true, |f| f == actor.0))
            .map(|r| Effect::AddVar {
                target: r.target.clone(),
                delta: ValueExpr::int(r.amount),
            })
            .collect();
        debug!(faction = %actor, rewards = rewards.len(), "faction passed");
        self.run_automatic(&rewards, actor, Bindings::new())
    }

    /// Close the current card and open the next.
    fn end_card(&mut self, config: &CardDrivenConfig) -> Result<(), KernelError> {
        self.exit_phase()?;
        self.emit(crate::triggers::TriggerEvent::TurnEnd)?;

        let mut rt = self.card_runtime();
        let players = self.state.player_count();
        let acted = rt.current_card.acted;
        for p in PlayerId::all(players) {
            let sits_out = config.ineligible_after_acting && acted & p.bit() != 0;
            rt.set_eligible(p, !sits_out);
        }

        let mut kept = Vec::with_capacity(rt.overrides.len());
        for mut o in std::mem::take(&mut rt.overrides) {
            if o.delay > 0 {
                o.delay -= 1;
                kept.push(o);
                continue;
            }
            rt.set_eligible(o.player, o.eligible);
            if matches!(o.duration, WindowDuration::Round | WindowDuration::Cycle) {
                kept.push(o);
            }
        }
        rt.overrides = kept;
        self.set_card_runtime(rt);
        self.next_card(config)
    }

    /// Reveal cards until a campaign card or an admissible coup card is
    /// current, then start its turn.
    fn next_card(&mut self, config: &CardDrivenConfig) -> Result<(), KernelError> {
        loop {
            let coup_card = self.advance_lifecycle(config);
            let mut rt = self.card_runtime();
            match coup_card {
                None => {
                    rt.coup.campaign_complete = true;
                    self.set_card_runtime(rt);
                    debug!("card deck exhausted, campaign complete");
                    return Ok(());
                }
                Some(true) => {
                    if let Some(plan) = &config.coup_plan {
                        if rt.coup.consecutive_rounds >= plan.max_consecutive_rounds {
                            debug!(rounds = rt.coup.consecutive_rounds, "coup round suppressed");
                            continue;
                        }
                        return self.enter_coup_round(config, rt);
                    }
                    rt.coup.consecutive_rounds = 0;
                    self.set_card_runtime(rt);
                    break;
                }
                Some(false) => {
                    rt.coup.consecutive_rounds = 0;
                    self.set_card_runtime(rt);
                    break;
                }
            }
        }

        self.reseed(config);
        self.begin_turn()?;
        let def = self.def;
        let first = card_phases(def, config)
            .first()
            .map(|p| (*p).clone())
            .or_else(|| def.turn_structure.phases.first().map(|p| p.id.clone()));
        match first {
            Some(phase) => self.enter_phase(phase),
            None => Ok(()),
        }
    }

    /// Move lookahead to played and draw to lookahead. Returns whether the
    /// newly played card is a coup card, or `None` when nothing was left to
    /// play.
    fn advance_lifecycle(&mut self, config: &CardDrivenConfig) -> Option<bool> {
        let Some(cards) = &config.cards else {
            return Some(false);
        };
        self.move_top(&cards.lookahead, &cards.played)?;
        self.move_top(&cards.draw, &cards.lookahead);
        let mut rt = self.card_runtime();
        rt.cards_played += 1;
        self.set_card_runtime(rt);
        Some(top_is_coup(&self.state, &cards.played, &cards.coup_prop))
    }

    fn enter_coup_round(&mut self, config: &CardDrivenConfig, mut rt: CardDrivenRuntime) -> Result<(), KernelError> {
        let final_round = config
            .cards
            .as_ref()
            .map_or(true, |cards| top_token(&self.state, &cards.draw).is_none());
        rt.coup.active = true;
        rt.coup.final_round = final_round;
        rt.coup.consecutive_rounds += 1;
        rt.current_card = CardState::default();
        self.set_card_runtime(rt);
        debug!(final_round, "coup round started");

        let phases = coup_phases(config, final_round);
        let Some(first) = phases.first().cloned() else {
            return self.finish_coup_round(config);
        };
        if let Some(lead) = config.scan_order(self.state.player_count()).first() {
            let table = self.table();
            self.state.set_active_player(table, PlayerId(*lead));
        }
        self.begin_turn()?;
        self.enter_phase(first)
    }

    fn end_coup_round(&mut self, config: &CardDrivenConfig) -> Result<(), KernelError> {
        self.exit_phase()?;
        self.emit(crate::triggers::TriggerEvent::TurnEnd)?;
        self.finish_coup_round(config)
    }

    fn finish_coup_round(&mut self, config: &CardDrivenConfig) -> Result<(), KernelError> {
        let mut rt = self.card_runtime();
        rt.coup.active = false;
        rt.overrides.retain(|o| o.duration != WindowDuration::Round);
        if rt.coup.final_round {
            rt.coup.campaign_complete = true;
            self.set_card_runtime(rt);
            debug!("final coup round finished, campaign complete");
            return Ok(());
        }
        rt.eligible = seat_mask(PlayerId::all(self.state.player_count()));
        self.set_card_runtime(rt);
        debug!("coup round finished");
        self.next_card(config)
    }

    /// Phase advance under card-driven flow: walk the card phases (or the
    /// coup phases during a coup round), ending the card or round on wrap.
    pub(crate) fn advance_card_phase(&mut self, config: &CardDrivenConfig) -> Result<(), KernelError> {
        let rt = self.card_runtime();
        if rt.coup.campaign_complete {
            return Ok(());
        }
        let current = self.state.current_phase().clone();
        let next = if rt.coup.active {
            let phases = coup_phases(config, rt.coup.final_round);
            phases
                .iter()
                .position(|p| *p == current)
                .and_then(|i| phases.get(i + 1).cloned())
        } else {
            let phases = card_phases(self.def, config);
            phases
                .iter()
                .position(|p| **p == current)
                .and_then(|i| phases.get(i + 1).map(|p| (*p).clone()))
        };
        match next {
            Some(phase) => {
                self.exit_phase()?;
                self.enter_phase(phase)
            }
            None if rt.coup.active => self.end_coup_round(config),
            None => self.end_card(config),
        }
    }
}
