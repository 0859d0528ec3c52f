use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The archetype exists but no success template was precomputed for it.
    #[error("no success template available for archetype: {archetype}")]
    MissingTemplate { archetype: String },

    #[error("student {0} not found in cluster assignments")]
    UnknownStudent(String),

    #[error("no engagement data found for student {0}")]
    MissingEngagement(String),

    #[error("{}: missing required column `{column}`", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}:{line}: invalid value {value:?} in column `{column}`", .path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, DashboardError>;
