//! Error types for the aggregation pipeline.
//!
//! Missing inputs are fatal and carry the subject/tract context needed to
//! diagnose them. Malformed lines inside a stat file never reach this type;
//! the parser drops them on the spot.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the pipeline modules.
pub type Result<T> = std::result::Result<T, TractStatError>;

/// Errors raised while discovering, reading, or writing tract statistics.
#[derive(Debug, Error)]
pub enum TractStatError {
    /// No stat file matched the structure directory, shallow or recursive.
    #[error("No stat files for {subject} {tract} (searched {pattern})")]
    NotFound {
        subject: String,
        tract: String,
        pattern: String,
    },

    /// The per-subject whole-brain summary is mandatory.
    #[error("Missing wholebrain stat for {subject}: {}", path.display())]
    MissingWholeBrain { subject: String, path: PathBuf },

    /// Stat file path was requested but does not exist.
    #[error("Stat file not found: {}", path.display())]
    StatFileMissing { path: PathBuf },

    #[error("Results directory not found: {}", path.display())]
    ResultsRootMissing { path: PathBuf },

    /// None of the path components carried a subject token.
    #[error("Could not identify subject from {}", path.display())]
    UnknownSubject { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl TractStatError {
    /// Whether this error means a required input is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TractStatError::NotFound { .. }
                | TractStatError::MissingWholeBrain { .. }
                | TractStatError::StatFileMissing { .. }
                | TractStatError::ResultsRootMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_subject_and_tract() {
        let err = TractStatError::NotFound {
            subject: "sub-010002".to_string(),
            tract: "Association_UncinateFasciculusL".to_string(),
            pattern: "results/sub-010002_tracts/Association_UncinateFasciculusL/**/*.stat.txt"
                .to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("sub-010002"));
        assert!(message.contains("Association_UncinateFasciculusL"));
        assert!(message.contains("*.stat.txt"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_subject_is_not_a_missing_input() {
        let err = TractStatError::UnknownSubject {
            path: PathBuf::from("results/orphan.stat.txt"),
        };
        assert!(!err.is_not_found());
    }
}
