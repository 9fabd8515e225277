//! Error types shared by the parse, build and layout stages

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, LineageError>;

/// Everything that can stop a rebuild.
///
/// The two skip policies of the builder (non-SELECT CTE bodies and FROM
/// entries without a table name) are not errors and never show up here.
#[derive(Debug, Error)]
pub enum LineageError {
    /// The query text could not be turned into a parsed query
    #[error("failed to parse SQL: {0}")]
    Parse(String),

    /// Rank assignment found a dependency loop through `node`
    #[error("cycle detected in lineage graph at node '{node}'")]
    CycleDetected { node: String },

    /// An edge points at a node id that is not in the graph
    #[error("edge '{edge}' references missing node '{endpoint}'")]
    MissingReference { edge: String, endpoint: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LineageError {
    /// Whether the raw topology is still worth showing as a fallback
    pub fn allows_degraded_view(&self) -> bool {
        matches!(self, LineageError::CycleDetected { .. })
    }
}

impl From<sqlparser::parser::ParserError> for LineageError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        LineageError::Parse(err.to_string())
    }
}
