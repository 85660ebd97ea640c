//! Runtime values.
//!
//! Every expression the evaluator produces, every move parameter and every
//! binding is a `Value`. Variables are narrower: they only ever hold a
//! `VarValue` (integer or boolean), which keeps hashing and clamping simple.

use serde::{Deserialize, Serialize};

use super::error::EvalError;
use super::ids::{TableId, TokenId, ZoneId};
use super::player::PlayerId;

/// Reference to a row of a runtime data table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowRef {
    pub table: TableId,
    pub row: u32,
}

/// A runtime value.
///
/// Values are totally ordered so option lists and query results can be
/// sorted and deduplicated deterministically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Player(PlayerId),
    Zone(ZoneId),
    Token(TokenId),
    Row(RowRef),
    List(Vec<Value>),
}

impl Value {
    /// Short type name used in type-mismatch errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Player(_) => "player",
            Value::Zone(_) => "zone",
            Value::Token(_) => "token",
            Value::Row(_) => "row",
            Value::List(_) => "list",
        }
    }

    fn mismatch(&self, expected: &'static str, context: &str) -> EvalError {
        EvalError::TypeMismatch {
            expected,
            actual: self.type_name(),
            context: context.to_string(),
        }
    }

    /// Interpret as an integer.
    pub fn as_int(&self, context: &str) -> Result<i64, EvalError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(other.mismatch("int", context)),
        }
    }

    /// Interpret as a boolean.
    pub fn as_bool(&self, context: &str) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool", context)),
        }
    }

    /// Interpret as a zone. Strings are accepted as zone names.
    pub fn as_zone(&self, context: &str) -> Result<ZoneId, EvalError> {
        match self {
            Value::Zone(z) => Ok(z.clone()),
            Value::Str(s) => Ok(ZoneId::new(s.clone())),
            other => Err(other.mismatch("zone", context)),
        }
    }

    /// Interpret as a token.
    pub fn as_token(&self, context: &str) -> Result<TokenId, EvalError> {
        match self {
            Value::Token(t) => Ok(*t),
            other => Err(other.mismatch("token", context)),
        }
    }

    /// Interpret as a player seat. Non-negative integers are accepted as seats.
    pub fn as_player(&self, context: &str) -> Result<PlayerId, EvalError> {
        match self {
            Value::Player(p) => Ok(*p),
            Value::Int(n) if (0..=u8::MAX as i64).contains(n) => Ok(PlayerId(*n as u8)),
            other => Err(other.mismatch("player", context)),
        }
    }

    /// Interpret as a table row.
    pub fn as_row(&self, context: &str) -> Result<&RowRef, EvalError> {
        match self {
            Value::Row(r) => Ok(r),
            other => Err(other.mismatch("row", context)),
        }
    }

    /// Interpret as a list. Scalars are promoted to one-element lists.
    #[must_use]
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(items) => items,
            scalar => vec![scalar],
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Player(p) => write!(f, "{}", p.0),
            Value::Zone(z) => f.write_str(z.as_str()),
            Value::Token(t) => write!(f, "{t}"),
            Value::Row(r) => write!(f, "{}#{}", r.table, r.row),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<PlayerId> for Value {
    fn from(p: PlayerId) -> Self {
        Value::Player(p)
    }
}

impl From<ZoneId> for Value {
    fn from(z: ZoneId) -> Self {
        Value::Zone(z)
    }
}

impl From<TokenId> for Value {
    fn from(t: TokenId) -> Self {
        Value::Token(t)
    }
}

/// The value of a declared variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarValue {
    Int(i64),
    Bool(bool),
}

impl VarValue {
    /// Widen into a general `Value`.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            VarValue::Int(n) => Value::Int(n),
            VarValue::Bool(b) => Value::Bool(b),
        }
    }

    /// Integer payload, if any.
    #[must_use]
    pub fn as_int(self) -> Option<i64> {
        match self {
            VarValue::Int(n) => Some(n),
            VarValue::Bool(_) => None,
        }
    }

    /// Stable encoding used as the hashed fact payload.
    #[must_use]
    pub fn hash_word(self) -> u64 {
        match self {
            VarValue::Int(n) => n as u64,
            VarValue::Bool(b) => 0x8000_0000_0000_0000 | b as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_int_mismatch_reports_types() {
        let err = Value::Bool(true).as_int("addVar delta").unwrap_err();
        match err {
            EvalError::TypeMismatch { expected, actual, context } => {
                assert_eq!(expected, "int");
                assert_eq!(actual, "bool");
                assert_eq!(context, "addVar delta");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_player_from_int() {
        assert_eq!(Value::Int(2).as_player("seat").unwrap(), PlayerId(2));
        assert!(Value::Int(-1).as_player("seat").is_err());
    }

    #[test]
    fn test_display_list() {
        let v = Value::List(vec![Value::Int(1), Value::from("hue")]);
        assert_eq!(v.to_string(), "[1,hue]");
    }

    #[test]
    fn test_values_sort_deterministically() {
        let mut values = vec![Value::Int(3), Value::Int(-2), Value::Int(10)];
        values.sort();
        assert_eq!(values, vec![Value::Int(-2), Value::Int(3), Value::Int(10)]);
    }
}
