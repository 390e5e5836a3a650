use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown data variant '{name}' (configured: {known})")]
    UnknownVariant { name: String, known: String },

    #[error("Missing input file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Missing required column '{column}' in {}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Malformed input in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Join integrity violated in {join}: {detail}")]
    JoinIntegrity { join: String, detail: String },
}

impl PrepError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PrepError::MissingFile(path)
        } else {
            PrepError::Io { path, source }
        }
    }

    /// Errors that only affect one participant's inputs and may be skipped.
    pub fn is_unit_local(&self) -> bool {
        matches!(
            self,
            PrepError::MissingFile(_)
                | PrepError::MissingColumn { .. }
                | PrepError::Malformed { .. }
                | PrepError::InvalidIdentifier(_)
                | PrepError::Io { .. }
                | PrepError::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_missing_file() {
        let err = PrepError::io(
            "nowhere.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, PrepError::MissingFile(_)));
        assert!(err.is_unit_local());
    }

    #[test]
    fn join_integrity_is_not_unit_local() {
        let err = PrepError::JoinIntegrity {
            join: "design_matrix".to_string(),
            detail: "duplicate bin 4".to_string(),
        };
        assert!(!err.is_unit_local());
        assert!(err.to_string().contains("duplicate bin 4"));
    }
}
