//! Game definitions: the compiler's output contract and its validation.

mod game_def;
mod tables;
mod turn_flow;
mod validate;

pub use game_def::{
    ActionDef, AdjacencyDecl, EndCondition, EndOutcome, EventPattern, GameDef, MarkerDef,
    MarkerScope, ParamDef, PhaseDef, PlayerRange, ScoringDef, StackingConstraint, TerminalDef,
    TokenTypeDef, TriggerDef, TurnStructure, UsageLimit, VarDef, Visibility, ZoneDef,
    ZoneOrdering,
};
pub use tables::{normalize_asset_id, DataAsset, TableContract, TableIndex, TableIssue};
pub use turn_flow::{
    ActionClass, CardDrivenConfig, CardLifecycle, CoupPlan, MonsoonConfig, MonsoonRestriction,
    OptionMatrixRow, OverrideWindow, ParamCap, PassReward, PivotalConfig, TurnOrderConfig,
    WindowDuration,
};
pub use validate::{validate_game_def, ValidatedGameDef};
