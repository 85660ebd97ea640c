//! Kernel configuration: per-call budgets and verification switches.
//!
//! Budgets are hard ceilings on otherwise-unbounded work. They are plain
//! values passed into each call, never globals, so tests can shrink any one
//! of them to exercise its truncation path.

use serde::{Deserialize, Serialize};

/// Budgets and switches for one kernel call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Effect operations one program (including nested control flow and
    /// cascaded triggers of a single dispatch) may execute.
    pub max_effect_ops: usize,

    /// Choice requests one decision-sequence resolution may issue.
    pub max_decision_probe_steps: usize,

    /// Total re-evaluations of predicates that referenced unbound values.
    pub max_deferred_predicates: usize,

    /// Candidate parameter combinations `legal_moves` may expand, summed
    /// over all actions.
    pub max_param_expansions: usize,

    /// Results a single query may produce before it is an error.
    pub max_query_results: usize,

    /// Trigger cascade depth.
    pub max_trigger_depth: usize,

    /// Phase advances `advance_to_decision_point` may perform.
    pub max_auto_advances: usize,

    /// Recompute the full hash after every transition and compare.
    pub verify_incremental_hash: bool,

    /// Record an `EffectTraceEntry` per executed effect.
    pub collect_effect_trace: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_effect_ops: 10_000,
            max_decision_probe_steps: 256,
            max_deferred_predicates: 1_024,
            max_param_expansions: 100_000,
            max_query_results: 10_000,
            max_trigger_depth: 8,
            max_auto_advances: 64,
            verify_incremental_hash: true,
            collect_effect_trace: false,
        }
    }
}

impl KernelConfig {
    /// Set the effect-operation budget.
    #[must_use]
    pub fn with_max_effect_ops(mut self, ops: usize) -> Self {
        self.max_effect_ops = ops;
        self
    }

    /// Set the decision probe-step budget.
    #[must_use]
    pub fn with_max_decision_probe_steps(mut self, steps: usize) -> Self {
        self.max_decision_probe_steps = steps;
        self
    }

    /// Set the deferred-predicate budget.
    #[must_use]
    pub fn with_max_deferred_predicates(mut self, count: usize) -> Self {
        self.max_deferred_predicates = count;
        self
    }

    /// Set the parameter-expansion budget.
    #[must_use]
    pub fn with_max_param_expansions(mut self, count: usize) -> Self {
        self.max_param_expansions = count;
        self
    }

    /// Set the per-query result bound.
    #[must_use]
    pub fn with_max_query_results(mut self, count: usize) -> Self {
        self.max_query_results = count;
        self
    }

    /// Set the trigger recursion depth.
    #[must_use]
    pub fn with_max_trigger_depth(mut self, depth: usize) -> Self {
        self.max_trigger_depth = depth;
        self
    }

    /// Set the auto-advance budget.
    #[must_use]
    pub fn with_max_auto_advances(mut self, count: usize) -> Self {
        self.max_auto_advances = count;
        self
    }

    /// Enable or disable full-hash verification after transitions.
    #[must_use]
    pub fn with_hash_verification(mut self, enabled: bool) -> Self {
        self.verify_incremental_hash = enabled;
        self
    }

    /// Enable or disable effect tracing.
    #[must_use]
    pub fn with_effect_trace(mut self, enabled: bool) -> Self {
        self.collect_effect_trace = enabled;
        self
    }
}
