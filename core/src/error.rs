use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown institution '{name}'")]
    UnknownInstitution { name: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StatsResult<T> = Result<T, StatsError>;

/// A malformed field in one raw row. Row-local: the offending row is
/// rejected, the batch continues, and the error lands in the run's error
/// list next to the rollups.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("row [{row}]: bad {field} ({value})")]
pub struct ValidationError {
    /// Source identity of the rejected row.
    pub row: String,
    pub field: String,
    pub value: String,
}

impl ValidationError {
    pub fn new(row: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A non-fatal anomaly: logged, the data is retained with a deterministic
/// first-occurrence-wins resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIntegrityWarning {
    pub kind: String,
    pub detail: String,
}

impl DataIntegrityWarning {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}
