use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One row of a tidy table: a (document, term, value) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triplet {
    pub document: String,
    pub term: String,
    pub value: f64,
}

impl Triplet {
    pub fn new(document: impl Into<String>, term: impl Into<String>, value: f64) -> Self {
        Self { document: document.into(), term: term.into(), value }
    }
}

/// Field names that `tidy_with_meta` writes itself and metadata may not shadow.
pub const RESERVED_FIELDS: [&str; 3] = ["document", "term", "value"];

/// Names the columns of loosely typed JSON rows that hold the document id,
/// the term and the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub document: String,
    pub term: String,
    pub value: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self { document: "document".into(), term: "term".into(), value: "value".into() }
    }
}

impl ColumnSpec {
    pub fn new(document: impl Into<String>, term: impl Into<String>, value: impl Into<String>) -> Self {
        Self { document: document.into(), term: term.into(), value: value.into() }
    }

    /// Validate a single JSON row and turn it into a triplet.
    pub fn parse_row(&self, row: usize, record: &Value) -> Result<Triplet> {
        let obj = record.as_object().ok_or_else(|| Error::Schema {
            row,
            message: "expected a JSON object".into(),
        })?;
        let document = label_field(obj, row, &self.document)?;
        let term = label_field(obj, row, &self.term)?;
        let value = match obj.get(&self.value) {
            None | Some(Value::Null) => {
                return Err(Error::Schema { row, message: format!("missing value column {:?}", self.value) })
            }
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| Error::Schema {
                row,
                message: format!("value column {:?} is not representable as f64", self.value),
            })?,
            Some(other) => {
                return Err(Error::Schema {
                    row,
                    message: format!("value column {:?} must be numeric, got {}", self.value, type_name(other)),
                })
            }
        };
        Ok(Triplet { document, term, value })
    }

    /// Validate every row up front; the first bad row fails the whole batch.
    pub fn parse_rows<'a, I>(&self, rows: I) -> Result<Vec<Triplet>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        rows.into_iter().enumerate().map(|(i, r)| self.parse_row(i, r)).collect()
    }
}

fn label_field(obj: &Map<String, Value>, row: usize, name: &str) -> Result<String> {
    match obj.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        None | Some(Value::Null) => Err(Error::Schema { row, message: format!("missing column {name:?}") }),
        Some(other) => Err(Error::Schema {
            row,
            message: format!("column {name:?} must be a string or integer, got {}", type_name(other)),
        }),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-document side table (timestamps, headings, ...). Not part of the matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaTable {
    fields: Vec<String>,
    rows: HashMap<String, Map<String, Value>>,
}

impl MetaTable {
    pub fn new() -> Self { Self::default() }

    /// Add the metadata of one document. New field names are appended to
    /// `fields()` in the order they are first seen. Errors number the row by
    /// how many documents the table already holds; use [`MetaTable::insert_at`]
    /// to report the caller's own row instead.
    pub fn insert(&mut self, document: impl Into<String>, values: Map<String, Value>) -> Result<()> {
        self.insert_at(self.rows.len(), document, values)
    }

    /// Like [`MetaTable::insert`], with `row` carried into any schema error.
    pub fn insert_at(&mut self, row: usize, document: impl Into<String>, values: Map<String, Value>) -> Result<()> {
        let document = document.into();
        if self.rows.contains_key(&document) {
            return Err(Error::Schema { row, message: format!("duplicate metadata for document {document:?}") });
        }
        if let Some(key) = values.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
            return Err(Error::Schema { row, message: format!("metadata field {key:?} is reserved") });
        }
        for key in values.keys() {
            if !self.fields.iter().any(|f| f == key) {
                self.fields.push(key.clone());
            }
        }
        self.rows.insert(document, values);
        Ok(())
    }

    /// Build from JSON objects; `key` names the document column and every
    /// other field becomes metadata.
    pub fn from_rows<'a, I>(rows: I, key: &str) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut table = Self::new();
        for (row, record) in rows.into_iter().enumerate() {
            let obj = record.as_object().ok_or_else(|| Error::Schema {
                row,
                message: "expected a JSON object".into(),
            })?;
            let document = label_field(obj, row, key)?;
            let mut values = obj.clone();
            values.remove(key);
            table.insert_at(row, document, values)?;
        }
        Ok(table)
    }

    pub fn fields(&self) -> &[String] { &self.fields }

    pub fn get(&self, document: &str) -> Option<&Map<String, Value>> { self.rows.get(document) }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}
