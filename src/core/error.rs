//! Error and warning taxonomy.
//!
//! Four families, each with a stable machine-readable `code()`:
//!
//! - **Contract errors** (`ContractError`): the game definition itself is
//!   malformed. Raised by validation; never recovered.
//! - **Legality errors** (`IllegalMove`): a caller asked for a move the rules
//!   forbid. Expected and recoverable.
//! - **Evaluation errors** (`EvalError`, `SpatialError`, `EffectError`): an
//!   expression or effect program could not be evaluated against the state.
//! - **Budget warnings** (`KernelWarning`): a bounded enumeration hit its
//!   ceiling and returned a deterministic truncated result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{ActionId, PhaseId, TableId, TokenId, ZoneId};
use super::player::PlayerId;

/// Errors raised while evaluating values, conditions and queries.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("missing {scope} variable `{name}`")]
    MissingVar { scope: &'static str, name: String },

    #[error("missing binding `{name}`")]
    MissingBinding { name: String },

    #[error("selector `{selector}` resolved to {actual} players, expected exactly one")]
    SelectorCardinality { selector: String, actual: usize },

    #[error("type mismatch in {context}: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
        context: String,
    },

    #[error("query produced more than {limit} results")]
    QueryBoundsExceeded { limit: usize },

    #[error("unknown zone `{0}`")]
    UnknownZone(ZoneId),

    #[error("unknown token {0}")]
    UnknownToken(TokenId),
    #[error("zone `{0}` is empty")]
    EmptyZone(ZoneId),

    #[error("seat {index} is outside the table")]
    PlayerOutOfRange { index: i64 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown table `{0}`")]
    UnknownTable(TableId),

    #[error("no row of `{table}` matches key `{key}`")]
    TableRowNotFound { table: TableId, key: String },

    #[error("unknown field `{field}` on table `{table}`")]
    UnknownTableField { table: TableId, field: String },

    #[error("unknown marker `{0}`")]
    UnknownMarker(String),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

impl EvalError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::MissingVar { .. } => "EVAL_MISSING_VAR",
            EvalError::MissingBinding { .. } => "EVAL_MISSING_BINDING",
            EvalError::SelectorCardinality { .. } => "EVAL_SELECTOR_CARDINALITY",
            EvalError::TypeMismatch { .. } => "EVAL_TYPE_MISMATCH",
            EvalError::QueryBoundsExceeded { .. } => "EVAL_QUERY_BOUNDS_EXCEEDED",
            EvalError::UnknownZone(_) => "EVAL_UNKNOWN_ZONE",
            EvalError::UnknownToken(_) => "EVAL_UNKNOWN_TOKEN",
            EvalError::EmptyZone(_) => "EVAL_EMPTY_ZONE",
            EvalError::PlayerOutOfRange { .. } => "EVAL_PLAYER_OUT_OF_RANGE",
            EvalError::DivisionByZero => "EVAL_DIVISION_BY_ZERO",
            EvalError::UnknownTable(_) => "EVAL_UNKNOWN_TABLE",
            EvalError::TableRowNotFound { .. } => "EVAL_TABLE_ROW_NOT_FOUND",
            EvalError::UnknownTableField { .. } => "EVAL_UNKNOWN_TABLE_FIELD",
            EvalError::UnknownMarker(_) => "EVAL_UNKNOWN_MARKER",
            EvalError::Spatial(e) => e.code(),
        }
    }

    /// Whether discovery mode may treat this error as "not yet known".
    #[must_use]
    pub fn is_deferrable(&self) -> bool {
        matches!(self, EvalError::MissingBinding { .. })
    }
}

/// Errors raised by adjacency-dependent operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SpatialError {
    #[error("zone `{to}` is not adjacent to `{from}`")]
    NotAdjacent { from: ZoneId, to: ZoneId },

    #[error("adjacent move out of `{from}` declares no direction")]
    DirectionMissing { from: ZoneId },

    #[error("zone `{0}` is not part of the adjacency graph")]
    UnknownZone(ZoneId),

    #[error("no neighbor of `{from}` lies in direction `{direction}`")]
    UnknownDirection { from: ZoneId, direction: String },
}

impl SpatialError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SpatialError::NotAdjacent { .. } => "SPATIAL_NOT_ADJACENT",
            SpatialError::DirectionMissing { .. } => "SPATIAL_DIRECTION_MISSING",
            SpatialError::UnknownZone(_) => "SPATIAL_UNKNOWN_ZONE",
            SpatialError::UnknownDirection { .. } => "SPATIAL_UNKNOWN_DIRECTION",
        }
    }
}

/// Errors raised by the deterministic RNG.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RngError {
    #[error("empty range: min {min} > max {max}")]
    InvalidRange { min: i64, max: i64 },

    #[error("unsupported rng algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    #[error("rng state has an even stream increment")]
    InvalidState,
}

impl RngError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RngError::InvalidRange { .. } => "RNG_INVALID_RANGE",
            RngError::UnsupportedAlgorithm(_) => "RNG_UNSUPPORTED_ALGORITHM",
            RngError::InvalidState => "RNG_INVALID_STATE",
        }
    }
}

/// Errors raised while executing an effect program.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Rng(#[from] RngError),

    #[error("effect budget of {limit} operations exhausted")]
    BudgetExceeded { limit: usize },

    #[error("decision `{decision}` is unresolved")]
    UnresolvedChoice { decision: String },

    #[error("`{value}` is not a legal option for decision `{decision}`")]
    InvalidChoice { decision: String, value: String },

    #[error("decision `{decision}` offers {available} options but needs {min}")]
    InsufficientOptions {
        decision: String,
        available: usize,
        min: usize,
    },

    #[error("choice `{decision}` reached in a non-interactive program")]
    ChoiceNotAllowed { decision: String },

    #[error("token {token} is not in zone `{zone}`")]
    TokenNotInZone { token: TokenId, zone: ZoneId },

    #[error("unknown token type `{0}`")]
    UnknownTokenType(String),

    #[error("stacking constraint `{constraint}` forbids {token} in `{zone}`")]
    StackingViolation {
        constraint: String,
        token: TokenId,
        zone: ZoneId,
    },

    #[error("`{state}` is not a state of marker `{marker}`")]
    InvalidMarkerState { marker: String, state: String },

    #[error("eligibility override outside card-driven turn order")]
    NotCardDriven,
}

impl EffectError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EffectError::Eval(e) => e.code(),
            EffectError::Spatial(e) => e.code(),
            EffectError::Rng(e) => e.code(),
            EffectError::BudgetExceeded { .. } => "EFFECT_BUDGET_EXCEEDED",
            EffectError::UnresolvedChoice { .. } => "EFFECT_UNRESOLVED_CHOICE",
            EffectError::InvalidChoice { .. } => "EFFECT_INVALID_CHOICE",
            EffectError::InsufficientOptions { .. } => "EFFECT_INSUFFICIENT_OPTIONS",
            EffectError::ChoiceNotAllowed { .. } => "EFFECT_CHOICE_NOT_ALLOWED",
            EffectError::TokenNotInZone { .. } => "EFFECT_TOKEN_NOT_IN_ZONE",
            EffectError::UnknownTokenType(_) => "EFFECT_UNKNOWN_TOKEN_TYPE",
            EffectError::StackingViolation { .. } => "EFFECT_STACKING_VIOLATION",
            EffectError::InvalidMarkerState { .. } => "EFFECT_INVALID_MARKER_STATE",
            EffectError::NotCardDriven => "EFFECT_NOT_CARD_DRIVEN",
        }
    }
}

/// Scope of an action usage counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitScope {
    Turn,
    Phase,
    Game,
}

impl std::fmt::Display for LimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LimitScope::Turn => "turn",
            LimitScope::Phase => "phase",
            LimitScope::Game => "game",
        })
    }
}

/// Why a move was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IllegalMoveReason {
    #[error("unknown action")]
    UnknownAction,

    #[error("acting player is not allowed by the actor selector")]
    ActorNotAllowed,

    #[error("action is not available in phase `{phase}`")]
    PhaseMismatch { phase: PhaseId },

    #[error("{scope} usage limit reached")]
    UsageLimitExceeded { scope: LimitScope },

    #[error("parameter `{missing}` is unresolved")]
    IncompleteParams { missing: String },

    #[error("parameter `{param}` is outside its domain")]
    ParamOutOfDomain { param: String },

    #[error("precondition failed")]
    PredicateFailed,

    #[error("turn flow does not permit this action class")]
    TurnFlowClassMismatch,

    #[error("faction is not eligible on this card")]
    NotEligible,

    #[error("action is restricted during monsoon")]
    MonsoonRestricted,

    #[error("pivotal action outside the pre-action window")]
    PivotalWindowClosed,

    #[error("player has already submitted this round")]
    AlreadySubmitted,

    #[error("invalid choice for decision `{decision}`")]
    InvalidChoice { decision: String },

    #[error("effect program failed: {code}")]
    EffectFailed { code: &'static str, detail: String },

    #[error("game is over")]
    GameOver,
}

impl IllegalMoveReason {
    /// Stable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            IllegalMoveReason::UnknownAction => "UNKNOWN_ACTION",
            IllegalMoveReason::ActorNotAllowed => "ACTOR_NOT_ALLOWED",
            IllegalMoveReason::PhaseMismatch { .. } => "PHASE_MISMATCH",
            IllegalMoveReason::UsageLimitExceeded { .. } => "USAGE_LIMIT_EXCEEDED",
            IllegalMoveReason::IncompleteParams { .. } => "INCOMPLETE_PARAMS",
            IllegalMoveReason::ParamOutOfDomain { .. } => "PARAM_OUT_OF_DOMAIN",
            IllegalMoveReason::PredicateFailed => "PREDICATE_FAILED",
            IllegalMoveReason::TurnFlowClassMismatch => "TURN_FLOW_CLASS_MISMATCH",
            IllegalMoveReason::NotEligible => "NOT_ELIGIBLE",
            IllegalMoveReason::MonsoonRestricted => "MONSOON_RESTRICTED",
            IllegalMoveReason::PivotalWindowClosed => "PIVOTAL_WINDOW_CLOSED",
            IllegalMoveReason::AlreadySubmitted => "ALREADY_SUBMITTED",
            IllegalMoveReason::InvalidChoice { .. } => "INVALID_CHOICE",
            IllegalMoveReason::EffectFailed { .. } => "EFFECT_FAILED",
            IllegalMoveReason::GameOver => "GAME_OVER",
        }
    }
}

/// A rejected move.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("illegal move `{action}`: {reason}")]
pub struct IllegalMove {
    pub action: ActionId,
    pub reason: IllegalMoveReason,
}

impl IllegalMove {
    /// Create an illegal-move error.
    #[must_use]
    pub fn new(action: ActionId, reason: IllegalMoveReason) -> Self {
        Self { action, reason }
    }

    /// Always `ILLEGAL_MOVE`; the reason carries its own code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        "ILLEGAL_MOVE"
    }
}

/// Problems with the game definition itself.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{context} references unknown {kind} `{id}`")]
    UnknownReference {
        kind: &'static str,
        id: String,
        context: String,
    },

    #[error("zone `{zone}` lists itself as a neighbor")]
    AdjacencySelfLoop { zone: ZoneId },

    #[error("zone `{zone}` lists unknown neighbor `{neighbor}`")]
    AdjacencyDangling { zone: ZoneId, neighbor: ZoneId },

    #[error("player range {min}..={max} is invalid")]
    InvalidPlayerRange { min: usize, max: usize },

    #[error("player count {count} is outside {min}..={max}")]
    PlayerCountOutOfRange { count: usize, min: usize, max: usize },

    #[error("turn structure declares no phases")]
    EmptyTurnStructure,

    #[error("{context} names seat {seat}, but only {player_count} players are seated")]
    SeatOutOfRange {
        seat: u8,
        player_count: usize,
        context: &'static str,
    },

    #[error("variable `{var}` has min {min} > max {max} or an out-of-range initial value")]
    InvalidVarBounds { var: String, min: i64, max: i64 },

    #[error("marker `{marker}` default `{default}` is not one of its states")]
    InvalidMarkerDefault { marker: String, default: String },

    #[error("invalid turn-order configuration: {0}")]
    TurnOrder(String),

    #[error("{context} contains a choice, which only action programs may do")]
    ChoiceOutsideAction { context: String },
}

impl ContractError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ContractError::DuplicateId { .. } => "CONTRACT_DUPLICATE_ID",
            ContractError::UnknownReference { .. } => "CONTRACT_UNKNOWN_REFERENCE",
            ContractError::AdjacencySelfLoop { .. } => "CONTRACT_ADJACENCY_SELF_LOOP",
            ContractError::AdjacencyDangling { .. } => "CONTRACT_ADJACENCY_DANGLING",
            ContractError::InvalidPlayerRange { .. } => "CONTRACT_INVALID_PLAYER_RANGE",
            ContractError::PlayerCountOutOfRange { .. } => "CONTRACT_PLAYER_COUNT",
            ContractError::EmptyTurnStructure => "CONTRACT_EMPTY_TURN_STRUCTURE",
            ContractError::SeatOutOfRange { .. } => "CONTRACT_SEAT_OUT_OF_RANGE",
            ContractError::InvalidVarBounds { .. } => "CONTRACT_INVALID_VAR_BOUNDS",
            ContractError::InvalidMarkerDefault { .. } => "CONTRACT_INVALID_MARKER_DEFAULT",
            ContractError::TurnOrder(_) => "CONTRACT_TURN_ORDER",
            ContractError::ChoiceOutsideAction { .. } => "CONTRACT_CHOICE_OUTSIDE_ACTION",
        }
    }
}

/// Errors from the wire format.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Rng(#[from] RngError),
}

impl WireError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            WireError::Json(_) => "WIRE_JSON",
            WireError::Bincode(_) => "WIRE_BINCODE",
            WireError::Rng(e) => e.code(),
        }
    }
}

/// Top-level kernel error.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    IllegalMove(#[from] IllegalMove),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("game definition failed validation with {} errors", .0.len())]
    InvalidDefinition(Vec<ContractError>),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error("incremental hash {incremental:#018x} disagrees with full recompute {full:#018x}")]
    HashMismatch { incremental: u64, full: u64 },

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl KernelError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::IllegalMove(e) => e.code(),
            KernelError::Contract(e) => e.code(),
            KernelError::InvalidDefinition(_) => "CONTRACT_INVALID_DEFINITION",
            KernelError::Eval(e) => e.code(),
            KernelError::Effect(e) => e.code(),
            KernelError::HashMismatch { .. } => "HASH_MISMATCH",
            KernelError::Wire(e) => e.code(),
        }
    }

    /// The legality reason, if this is an `ILLEGAL_MOVE`.
    #[must_use]
    pub fn illegal_reason(&self) -> Option<&IllegalMoveReason> {
        match self {
            KernelError::IllegalMove(e) => Some(&e.reason),
            _ => None,
        }
    }
}

/// Non-fatal signals that an operation returned a truncated result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelWarning {
    /// `resolve_move_decision_sequence` ran out of probe steps.
    DecisionProbeBudget { action: ActionId, limit: usize },
    /// Deferred predicates were re-evaluated too many times.
    DeferredPredicateBudget { action: ActionId, limit: usize },
    /// Parameter expansion for an action was cut off.
    ParamExpansionBudget { action: ActionId, limit: usize },
    /// Trigger cascade was cut at the depth limit.
    TriggerDepthExceeded { depth: usize, event: String },
    /// Phase auto-advance stopped before reaching a decision point.
    AutoAdvanceBudget { limit: usize },
    /// A candidate was skipped because probing it failed to evaluate.
    CandidateSkipped { action: ActionId, code: &'static str },
    /// A buffered simultaneous submission stopped being legal before it ran.
    SubmissionDropped {
        player: PlayerId,
        action: ActionId,
        code: &'static str,
    },
}

impl KernelWarning {
    /// Stable warning code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            KernelWarning::DecisionProbeBudget { .. } => "BUDGET_DECISION_PROBE_STEPS",
            KernelWarning::DeferredPredicateBudget { .. } => "BUDGET_DEFERRED_PREDICATES",
            KernelWarning::ParamExpansionBudget { .. } => "BUDGET_PARAM_EXPANSIONS",
            KernelWarning::TriggerDepthExceeded { .. } => "BUDGET_TRIGGER_DEPTH",
            KernelWarning::AutoAdvanceBudget { .. } => "BUDGET_AUTO_ADVANCE",
            KernelWarning::CandidateSkipped { .. } => "ENUMERATION_CANDIDATE_SKIPPED",
            KernelWarning::SubmissionDropped { .. } => "SIMULTANEOUS_SUBMISSION_DROPPED",
        }
    }
}
