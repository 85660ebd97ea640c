//! Runtime data tables.
//!
//! A `TableContract` names a data asset, a path inside its JSON payload to an
//! array of row objects, the fields the rules read, and the unique keys rows
//! are looked up by. `TableIndex::build` resolves every contract once per
//! validated definition.
//!
//! ## Issues, not failures
//!
//! A missing asset or unresolved path does not fail the build. The table is
//! indexed empty and a `TableIssue` is recorded; lookups against it then fail
//! at evaluation time with a typed `EvalError`.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{EvalError, TableId, Value};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContract {
    pub id: TableId,
    /// Asset id; matched after trimming and lowercasing.
    pub asset: String,
    /// Object keys leading from the payload root to the row array.
    #[serde(default)]
    pub path: Vec<String>,
    pub fields: Vec<String>,
    /// Each entry is a composite key; rows must be unique on it.
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,
}

/// Raw data shipped with the definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAsset {
    pub id: String,
    pub payload: serde_json::Value,
}

/// A soft diagnostic recorded while indexing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableIssue {
    MissingAsset { table: TableId, asset: String },
    UnresolvedPath { table: TableId, path: String },
    UnresolvedField { table: TableId, row: u32, field: String },
    DuplicateKey { table: TableId, key: String },
}

impl TableIssue {
    /// Stable issue code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            TableIssue::MissingAsset { .. } => "MISSING_ASSET",
            TableIssue::UnresolvedPath { .. } => "UNRESOLVED_PATH",
            TableIssue::UnresolvedField { .. } => "UNRESOLVED_FIELD",
            TableIssue::DuplicateKey { .. } => "DUPLICATE_KEY",
        }
    }
}

#[derive(Clone, Debug, Default)]
struct KeyIndex {
    fields: Vec<String>,
    rows: FxHashMap<Vec<Value>, u32>,
}

#[derive(Clone, Debug, Default)]
struct IndexedTable {
    fields: Vec<String>,
    rows: Vec<BTreeMap<String, Value>>,
    keys: Vec<KeyIndex>,
}

/// Row and key indices for every declared table.
#[derive(Clone, Debug, Default)]
pub struct TableIndex {
    tables: FxHashMap<TableId, IndexedTable>,
    issues: Vec<TableIssue>,
}

/// Canonical form of an asset id.
#[must_use]
pub fn normalize_asset_id(id: &str) -> String {
    id.trim().to_lowercase()
}

fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
        serde_json::Value::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

impl TableIndex {
    /// Index every contract against the shipped assets.
    #[must_use]
    pub fn build(contracts: &[TableContract], assets: &[DataAsset]) -> Self {
        let by_id: FxHashMap<String, &DataAsset> = assets
            .iter()
            .map(|a| (normalize_asset_id(&a.id), a))
            .collect();

        let mut index = Self::default();
        for contract in contracts {
            let table = index.index_table(contract, &by_id);
            index.tables.insert(contract.id.clone(), table);
        }
        index
    }

    fn index_table(
        &mut self,
        contract: &TableContract,
        assets: &FxHashMap<String, &DataAsset>,
    ) -> IndexedTable {
        let mut table = IndexedTable {
            fields: contract.fields.clone(),
            rows: Vec::new(),
            keys: contract
                .unique_keys
                .iter()
                .map(|fields| KeyIndex {
                    fields: fields.clone(),
                    rows: FxHashMap::default(),
                })
                .collect(),
        };

        let Some(asset) = assets.get(&normalize_asset_id(&contract.asset)) else {
            self.issues.push(TableIssue::MissingAsset {
                table: contract.id.clone(),
                asset: contract.asset.clone(),
            });
            return table;
        };

        let mut node = &asset.payload;
        for segment in &contract.path {
            match node.get(segment) {
                Some(next) => node = next,
                None => {
                    self.issues.push(TableIssue::UnresolvedPath {
                        table: contract.id.clone(),
                        path: contract.path.join("."),
                    });
                    return table;
                }
            }
        }
        let Some(raw_rows) = node.as_array() else {
            self.issues.push(TableIssue::UnresolvedPath {
                table: contract.id.clone(),
                path: contract.path.join("."),
            });
            return table;
        };

        for (i, raw) in raw_rows.iter().enumerate() {
            let row_index = i as u32;
            let mut row = BTreeMap::new();
            for field in &contract.fields {
                match raw.get(field).and_then(json_to_value) {
                    Some(value) => {
                        row.insert(field.clone(), value);
                    }
                    None => self.issues.push(TableIssue::UnresolvedField {
                        table: contract.id.clone(),
                        row: row_index,
                        field: field.clone(),
                    }),
                }
            }

            for key in &mut table.keys {
                let composite: Option<Vec<Value>> =
                    key.fields.iter().map(|f| row.get(f).cloned()).collect();
                let Some(composite) = composite else { continue };
                if key.rows.contains_key(&composite) {
                    self.issues.push(TableIssue::DuplicateKey {
                        table: contract.id.clone(),
                        key: format_key(&composite),
                    });
                } else {
                    key.rows.insert(composite, row_index);
                }
            }
            table.rows.push(row);
        }
        table
    }

    /// Diagnostics recorded while building.
    #[must_use]
    pub fn issues(&self) -> &[TableIssue] {
        &self.issues
    }

    fn table(&self, id: &TableId) -> Result<&IndexedTable, EvalError> {
        self.tables
            .get(id)
            .ok_or_else(|| EvalError::UnknownTable(id.clone()))
    }

    /// Number of rows in a table.
    pub fn row_count(&self, id: &TableId) -> Result<usize, EvalError> {
        Ok(self.table(id)?.rows.len())
    }

    /// Read one field of one row.
    pub fn field(&self, id: &TableId, row: u32, field: &str) -> Result<Value, EvalError> {
        let table = self.table(id)?;
        if !table.fields.iter().any(|f| f == field) {
            return Err(EvalError::UnknownTableField {
                table: id.clone(),
                field: field.to_string(),
            });
        }
        table
            .rows
            .get(row as usize)
            .and_then(|r| r.get(field))
            .cloned()
            .ok_or_else(|| EvalError::TableRowNotFound {
                table: id.clone(),
                key: format!("#{row}"),
            })
    }

    /// Find the row whose unique key of matching arity equals `key`.
    pub fn lookup(&self, id: &TableId, key: &[Value]) -> Result<u32, EvalError> {
        let table = self.table(id)?;
        table
            .keys
            .iter()
            .filter(|k| k.fields.len() == key.len())
            .find_map(|k| k.rows.get(key).copied())
            .ok_or_else(|| EvalError::TableRowNotFound {
                table: id.clone(),
                key: format_key(key),
            })
    }
}

fn format_key(key: &[Value]) -> String {
    key.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}
