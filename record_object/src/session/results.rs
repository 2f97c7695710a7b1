use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement of a write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub errors: u64,
    pub first_error: Option<String>,
    pub generated_keys: Vec<String>,
}

impl WriteResult {
    pub fn inserted(generated_key: Option<String>) -> Self {
        Self {
            inserted: 1,
            generated_keys: generated_key.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn replaced() -> Self {
        Self {
            replaced: 1,
            ..Self::default()
        }
    }

    pub fn unchanged() -> Self {
        Self {
            unchanged: 1,
            ..Self::default()
        }
    }

    pub fn deleted() -> Self {
        Self {
            deleted: 1,
            ..Self::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            skipped: 1,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: 1,
            first_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Documents the write actually touched, changed or not
    pub fn affected(&self) -> u64 {
        self.inserted + self.replaced + self.unchanged + self.deleted
    }
}

/// Documents returned by a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    rows: Vec<Value>,
}

impl QueryResult {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    /// No document matched (or the single match was `null`)
    pub fn is_nil(&self) -> bool {
        self.rows.is_empty() || (self.rows.len() == 1 && self.rows[0].is_null())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Value> {
        self.rows
    }

    /// Decode the first row, if any
    pub fn one<T: DeserializeOwned>(self) -> Result<Option<T>, serde_json::Error> {
        self.rows
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
    }

    /// Decode every row
    pub fn all<T: DeserializeOwned>(self) -> Result<Vec<T>, serde_json::Error> {
        self.rows.into_iter().map(serde_json::from_value).collect()
    }
}
