//! Effect programs.
//!
//! An effect program is an ordered `Vec<Effect>`. Choice nodes bind their
//! result for the remainder of the enclosing list; `Let`, `ForEach`,
//! `Reduce` and `RollRandom` bind only inside their nested list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::TokenTypeId;

use super::condition::Condition;
use super::query::{Query, TokenFilter};
use super::selector::{PlayerSel, TokenSel, ZoneSel};
use super::value::ValueExpr;

/// A variable slot an effect writes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VarTarget {
    Global { var: String },
    Player { player: PlayerSel, var: String },
    Zone { zone: ZoneSel, var: String },
}

impl VarTarget {
    /// A global variable.
    pub fn global(var: impl Into<String>) -> Self {
        VarTarget::Global { var: var.into() }
    }

    /// A per-player variable.
    pub fn player(player: PlayerSel, var: impl Into<String>) -> Self {
        VarTarget::Player {
            player,
            var: var.into(),
        }
    }

    /// Variable name.
    #[must_use]
    pub fn var(&self) -> &str {
        match self {
            VarTarget::Global { var } | VarTarget::Player { var, .. } | VarTarget::Zone { var, .. } => var,
        }
    }
}

/// Where a moved or created token lands in an ordered zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenPosition {
    #[default]
    Top,
    Bottom,
    Random,
}

/// One node of an effect program.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Effect {
    // === Variables ===
    SetVar {
        target: VarTarget,
        value: ValueExpr,
    },
    AddVar {
        target: VarTarget,
        delta: ValueExpr,
    },
    /// Move up to `amount` from one integer variable to another, limited by
    /// what the source holds above its minimum and what the destination can
    /// take below its maximum. The amount actually moved is bound to
    /// `actual_bind` for the rest of the list.
    TransferVar {
        from: VarTarget,
        to: VarTarget,
        amount: ValueExpr,
        actual_bind: Option<String>,
    },

    // === Tokens ===
    CreateToken {
        kind: TokenTypeId,
        zone: ZoneSel,
        props: BTreeMap<String, ValueExpr>,
        position: TokenPosition,
        bind: Option<String>,
    },
    DestroyToken {
        token: TokenSel,
    },
    MoveToken {
        token: TokenSel,
        to: ZoneSel,
        position: TokenPosition,
    },
    MoveAll {
        from: ZoneSel,
        to: ZoneSel,
        filter: Vec<TokenFilter>,
    },
    /// Move a token to the neighbor of its current zone that `direction`
    /// names: either a declared direction label or a neighbor zone id.
    MoveTokenAdjacent {
        token: TokenSel,
        direction: Option<ValueExpr>,
    },
    Draw {
        from: ZoneSel,
        to: ZoneSel,
        count: ValueExpr,
    },
    Shuffle {
        zone: ZoneSel,
    },
    SetTokenProp {
        token: TokenSel,
        prop: String,
        value: ValueExpr,
    },

    // === Visibility ===
    Reveal {
        zone: ZoneSel,
        to: PlayerSel,
        filter: Vec<TokenFilter>,
    },
    /// Withdraw reveal grants on a zone; all of them, or only those naming
    /// the given observers.
    Conceal {
        zone: ZoneSel,
        from: Option<PlayerSel>,
    },

    // === Markers ===
    SetMarker {
        zone: Option<ZoneSel>,
        marker: String,
        state: ValueExpr,
    },
    /// Step a marker along its lattice, clamped at both ends.
    ShiftMarker {
        zone: Option<ZoneSel>,
        marker: String,
        delta: ValueExpr,
    },

    // === Turn flow ===
    /// Card-driven eligibility override for a named window.
    SetEligibility {
        player: PlayerSel,
        eligible: bool,
        window: String,
    },

    // === Control flow ===
    If {
        when: Condition,
        then: Vec<Effect>,
        otherwise: Vec<Effect>,
    },
    ForEach {
        bind: String,
        over: Query,
        effects: Vec<Effect>,
        limit: Option<ValueExpr>,
        count_bind: Option<String>,
    },
    Let {
        bind: String,
        value: ValueExpr,
        effects: Vec<Effect>,
    },
    /// Fold `next` over `over` (element in `item_bind`, accumulator in
    /// `acc_bind`), then run `effects` with the result in `result_bind`.
    Reduce {
        over: Query,
        item_bind: String,
        acc_bind: String,
        initial: ValueExpr,
        next: ValueExpr,
        result_bind: String,
        effects: Vec<Effect>,
    },
    RollRandom {
        bind: String,
        min: ValueExpr,
        max: ValueExpr,
        effects: Vec<Effect>,
    },

    // === Choices ===
    ChooseOne {
        bind: String,
        decision_id: Option<String>,
        options: Query,
    },
    ChooseN {
        bind: String,
        decision_id: Option<String>,
        options: Query,
        min: ValueExpr,
        max: ValueExpr,
    },
}

impl Effect {
    /// `var += delta` on a global.
    pub fn add_global(var: impl Into<String>, delta: i64) -> Self {
        Effect::AddVar {
            target: VarTarget::global(var),
            delta: ValueExpr::int(delta),
        }
    }

    /// `var = value` on a global.
    pub fn set_global(var: impl Into<String>, value: ValueExpr) -> Self {
        Effect::SetVar {
            target: VarTarget::global(var),
            value,
        }
    }

    /// Move a bound token to the top of a zone.
    pub fn move_token(token: impl Into<String>, to: ZoneSel) -> Self {
        Effect::MoveToken {
            token: TokenSel::binding(token),
            to,
            position: TokenPosition::Top,
        }
    }

    /// Choose one option, bound to `bind`.
    pub fn choose_one(bind: impl Into<String>, options: Query) -> Self {
        Effect::ChooseOne {
            bind: bind.into(),
            decision_id: None,
            options,
        }
    }

    /// Iterate a query.
    pub fn for_each(bind: impl Into<String>, over: Query, effects: Vec<Effect>) -> Self {
        Effect::ForEach {
            bind: bind.into(),
            over,
            effects,
            limit: None,
            count_bind: None,
        }
    }

    /// Whether this node or any nested node is a choice.
    #[must_use]
    pub fn contains_choice(&self) -> bool {
        match self {
            Effect::ChooseOne { .. } | Effect::ChooseN { .. } => true,
            Effect::If { then, otherwise, .. } => {
                then.iter().chain(otherwise).any(Effect::contains_choice)
            }
            Effect::ForEach { effects, .. }
            | Effect::Let { effects, .. }
            | Effect::Reduce { effects, .. }
            | Effect::RollRandom { effects, .. } => effects.iter().any(Effect::contains_choice),
            _ => false,
        }
    }

    /// Short kind name used in traces.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Effect::SetVar { .. } => "setVar",
            Effect::AddVar { .. } => "addVar",
            Effect::TransferVar { .. } => "transferVar",
            Effect::CreateToken { .. } => "createToken",
            Effect::DestroyToken { .. } => "destroyToken",
            Effect::MoveToken { .. } => "moveToken",
            Effect::MoveAll { .. } => "moveAll",
            Effect::MoveTokenAdjacent { .. } => "moveTokenAdjacent",
            Effect::Draw { .. } => "draw",
            Effect::Shuffle { .. } => "shuffle",
            Effect::SetTokenProp { .. } => "setTokenProp",
            Effect::Reveal { .. } => "reveal",
            Effect::Conceal { .. } => "conceal",
            Effect::SetMarker { .. } => "setMarker",
            Effect::ShiftMarker { .. } => "shiftMarker",
            Effect::SetEligibility { .. } => "setEligibility",
            Effect::If { .. } => "if",
            Effect::ForEach { .. } => "forEach",
            Effect::Let { .. } => "let",
            Effect::Reduce { .. } => "reduce",
            Effect::RollRandom { .. } => "rollRandom",
            Effect::ChooseOne { .. } => "chooseOne",
            Effect::ChooseN { .. } => "chooseN",
        }
    }
}
