//! Moves: an action id plus a parameter map.
//!
//! A move names the action (the "verb") and binds values to parameter and
//! decision keys (the "nouns"). For example:
//! - `pass` = action only, no params
//! - `rally { $space: saigon }` = one declared param
//! - `rally { $space: saigon, $cubes: [tok3, tok7] }` = declared param plus
//!   one resolved in-program decision
//!
//! The parameter map is ordered, so two moves with the same bindings compare,
//! hash and serialize identically regardless of insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::ActionId;
use super::value::Value;

/// A (possibly partial) move.
///
/// ## Example
///
/// ```
/// use game_kernel::core::{Move, Value};
///
/// let pass = Move::new("pass");
/// assert!(pass.params.is_empty());
///
/// let rally = Move::new("rally").with_param("$space", Value::from("saigon"));
/// assert_eq!(rally.param("$space"), Some(&Value::from("saigon")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Move {
    /// The action being taken.
    pub action: ActionId,

    /// Declared parameters and resolved decision keys.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl Move {
    /// Create a move with no parameters.
    pub fn new(action: impl Into<ActionId>) -> Self {
        Self {
            action: action.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Look up a parameter or decision key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Whether the key is bound.
    #[must_use]
    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.action)?;
        if !self.params.is_empty() {
            f.write_str(" {")?;
            for (i, (k, v)) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{k}: {v}")?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}
