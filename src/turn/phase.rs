//! Phase progression shared by every turn order.

use tracing::debug;

use crate::core::{GameState, KernelConfig, KernelError, PhaseId, PlayerId, UsageCounts};
use crate::def::{TurnOrderConfig, ValidatedGameDef};
use crate::hash::ZobristTable;
use crate::kernel::{ApplyResult, Transition};
use crate::triggers::TriggerEvent;

use super::runtime::{SimultaneousRuntime, TurnOrderRuntime};

/// The player whose move the kernel is waiting for.
///
/// Simultaneous play waits on the lowest seat that has not submitted yet.
/// Card-driven play waits on the current card's decision faction, or on the
/// active player during a coup round.
#[must_use]
pub fn decision_player(state: &GameState) -> PlayerId {
    match state.turn_order() {
        TurnOrderRuntime::Simultaneous(rt) => rt
            .next_to_submit(state.player_count())
            .unwrap_or_else(|| state.active_player()),
        TurnOrderRuntime::CardDriven(rt) if !rt.coup.active => rt
            .current_card
            .decision_faction()
            .unwrap_or_else(|| state.active_player()),
        _ => state.active_player(),
    }
}

/// Leave the current phase and enter the next one, ending the turn on wrap.
pub fn advance_phase(def: &ValidatedGameDef, state: &GameState) -> Result<ApplyResult, KernelError> {
    advance_phase_with_config(def, state, &KernelConfig::default())
}

pub fn advance_phase_with_config(
    def: &ValidatedGameDef,
    state: &GameState,
    config: &KernelConfig,
) -> Result<ApplyResult, KernelError> {
    let mut tx = Transition::new(def, config, state.clone());
    tx.advance_phase()?;
    tx.finish()
}

/// Zero every action's turn and phase counters.
#[must_use]
pub fn reset_turn_usage(def: &ValidatedGameDef, state: &GameState) -> GameState {
    let mut state = state.clone();
    clear_turn_usage(&mut state, def.zobrist());
    state
}

/// Zero every action's phase counter.
#[must_use]
pub fn reset_phase_usage(def: &ValidatedGameDef, state: &GameState) -> GameState {
    let mut state = state.clone();
    clear_phase_usage(&mut state, def.zobrist());
    state
}

fn clear_turn_usage(state: &mut GameState, table: &ZobristTable) {
    state.map_usage(table, |u| UsageCounts {
        turn: 0,
        phase: 0,
        ..u
    });
}

fn clear_phase_usage(state: &mut GameState, table: &ZobristTable) {
    state.map_usage(table, |u| UsageCounts { phase: 0, ..u });
}

impl Transition<'_> {
    pub(crate) fn advance_phase(&mut self) -> Result<(), KernelError> {
        let def = self.def;
        if let TurnOrderConfig::CardDriven(config) = &def.turn_order {
            return self.advance_card_phase(config);
        }
        let phases = &def.turn_structure.phases;
        let index = def.phase_index(self.state.current_phase()).unwrap_or(0);
        self.exit_phase()?;
        match phases.get(index + 1) {
            Some(next) => self.enter_phase(next.id.clone()),
            None => {
                self.end_turn()?;
                match phases.first() {
                    Some(first) => self.enter_phase(first.id.clone()),
                    None => Ok(()),
                }
            }
        }
    }

    /// Close the turn, rotate the seat and open the next turn.
    fn end_turn(&mut self) -> Result<(), KernelError> {
        self.emit(TriggerEvent::TurnEnd)?;
        let table = self.table();
        let players = self.state.player_count();
        match (self.state.turn_order().clone(), &self.def.turn_order) {
            (TurnOrderRuntime::RoundRobin, _) => {
                let next = self.state.active_player().next(players);
                self.state.set_active_player(table, next);
            }
            (TurnOrderRuntime::FixedOrder { position }, TurnOrderConfig::FixedOrder { order }) if !order.is_empty() => {
                let position = (position as usize + 1) % order.len();
                self.state
                    .set_turn_order(table, TurnOrderRuntime::FixedOrder { position: position as u32 });
                self.state.set_active_player(table, PlayerId(order[position]));
            }
            _ => {}
        }
        self.begin_turn()
    }

    /// Count a new turn and announce it.
    pub(crate) fn begin_turn(&mut self) -> Result<(), KernelError> {
        let table = self.table();
        let turn = self.state.turn_count() + 1;
        self.state.set_turn_count(table, turn);
        clear_turn_usage(&mut self.state, table);
        debug!(turn, active = %self.state.active_player(), "turn started");
        self.emit(TriggerEvent::TurnStart)
    }

    /// Make `phase` current, run its entry hook and announce it.
    pub(crate) fn enter_phase(&mut self, phase: PhaseId) -> Result<(), KernelError> {
        let table = self.table();
        clear_phase_usage(&mut self.state, table);
        self.state.set_current_phase(table, phase.clone());
        if self.state.turn_order().as_simultaneous().is_some() {
            self.state
                .set_turn_order(table, TurnOrderRuntime::Simultaneous(SimultaneousRuntime::default()));
            self.state.set_active_player(table, PlayerId::new(0));
        }
        debug!(%phase, "phase entered");

        let def = self.def;
        let event = TriggerEvent::PhaseEnter(phase.clone());
        if let Some(phase_def) = def.phase(&phase) {
            self.run_automatic(&phase_def.on_enter, self.state.active_player(), event.bindings())?;
        }
        self.emit(event)
    }

    /// Run the current phase's exit hook and announce the exit.
    pub(crate) fn exit_phase(&mut self) -> Result<(), KernelError> {
        let phase = self.state.current_phase().clone();
        let def = self.def;
        let event = TriggerEvent::PhaseExit(phase.clone());
        if let Some(phase_def) = def.phase(&phase) {
            self.run_automatic(&phase_def.on_exit, self.state.active_player(), event.bindings())?;
        }
        self.emit(event)
    }
}
