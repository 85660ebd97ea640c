//! Pending choices and decision keys.

use serde::{Deserialize, Serialize};

use crate::core::Value;
use crate::eval::Bindings;

/// Whether picking an option can lead to a legal completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionLegality {
    Legal,
    Illegal,
    /// Probing could not settle it within budget.
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: Value,
    pub legality: OptionLegality,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChoiceKind {
    ChooseOne,
    /// Pick between `min` and `max` distinct options.
    ChooseN { min: usize, max: usize },
}

/// The next unresolved decision of a move.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingChoice {
    /// Key the answer goes under in `Move::params`.
    pub decision: String,
    /// Binding the answer populates inside the program.
    pub bind: String,
    pub kind: ChoiceKind,
    pub options: Vec<ChoiceOption>,
}

impl PendingChoice {
    /// Options not known to be illegal, legal ones first.
    pub fn viable_options(&self) -> impl Iterator<Item = &ChoiceOption> {
        let legal = self
            .options
            .iter()
            .filter(|o| o.legality == OptionLegality::Legal);
        let unknown = self
            .options
            .iter()
            .filter(|o| o.legality == OptionLegality::Unknown);
        legal.chain(unknown)
    }
}

/// Build the decision key for a choice.
///
/// `{$name}` placeholders in the template are replaced with the bound value.
/// A template without placeholders reached inside `forEach` gets the
/// iteration path appended (`$target[0,2]`), so each iteration asks its own
/// question.
#[must_use]
pub fn decision_key(template: &str, bindings: &Bindings, path: &[usize]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut substituted = false;
    while let Some(open) = rest.find("{$") {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + close];
        out.push_str(&rest[..open]);
        match bindings.get(name) {
            Some(value) => {
                out.push_str(&value.to_string());
                substituted = true;
            }
            None => out.push_str(&rest[open..=open + close]),
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);

    if !substituted && !path.is_empty() {
        let indices: Vec<String> = path.iter().map(usize::to_string).collect();
        out.push('[');
        out.push_str(&indices.join(","));
        out.push(']');
    }
    out
}
