//! Error types for Annomics
//!
//! Defines the error taxonomy used throughout the library:
//! format, parse, configuration, catalog and I/O errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for Annomics operations
#[derive(Debug, Error)]
pub enum AnnomicsError {
    /// Malformed row or column layout
    #[error("Format error in {}: line {line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Non-numeric or inverted coordinates
    #[error("Parse error in {}: line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Invalid run configuration, detected before any work is done
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Annotation catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Unreadable input or unwritable destination
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnnomicsError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        AnnomicsError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a not-found I/O error for a path
    pub fn not_found<P: AsRef<Path>>(path: P, message: &str) -> Self {
        Self::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, message.to_string()),
        )
    }

    /// Path of the file the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            AnnomicsError::Format { path, .. }
            | AnnomicsError::Parse { path, .. }
            | AnnomicsError::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Errors raised while validating a run configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Genome build outside the supported set
    #[error("Unsupported genome build '{build}'. Available: {available}")]
    UnsupportedGenome { build: String, available: String },

    /// Annotation category name that is not recognised
    #[error("Unknown annotation type '{0}'")]
    UnknownAnnotationType(String),

    /// Both annotation groups disabled and no explicit categories given
    #[error("No annotation categories selected")]
    NoAnnotationsSelected,

    /// Two input files resolve to the same sample name
    #[error("Duplicate sample name '{name}' for {} and {}", first.display(), second.display())]
    DuplicateSampleName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The same sample name given twice to a combined analysis
    #[error("Sample '{0}' appears more than once")]
    DuplicateSample(String),

    /// Any other invalid option value
    #[error("Invalid option {option}: {message}")]
    InvalidOption { option: &'static str, message: String },
}

/// Errors reported by an annotation catalog provider
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Provider has no data for this genome build
    #[error("Genome build '{0}' is not available in the catalog")]
    UnsupportedGenome(String),

    /// Provider does not serve this annotation key
    #[error("Unknown annotation type '{0}'")]
    UnknownAnnotationType(String),

    /// Track exists in principle but could not be loaded
    #[error("Track {key} is unavailable: {reason}")]
    TrackUnavailable { key: String, reason: String },

    /// Malformed record inside a track file
    #[error("Invalid record in track {key} at line {line}: {message}")]
    InvalidTrackRecord {
        key: String,
        line: usize,
        message: String,
    },

    /// I/O error while reading a track
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Annomics operations
pub type Result<T> = std::result::Result<T, AnnomicsError>;

/// Result type alias for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_path_and_line() {
        let err = AnnomicsError::Format {
            path: PathBuf::from("samples/a.bed"),
            line: 7,
            message: "too few fields".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("samples/a.bed"));
        assert!(text.contains("line 7"));
        assert_eq!(err.path(), Some(Path::new("samples/a.bed")));
    }

    #[test]
    fn test_configuration_error_has_no_path() {
        let err: AnnomicsError = ConfigurationError::NoAnnotationsSelected.into();
        assert!(err.path().is_none());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_not_found_kind() {
        match AnnomicsError::not_found("missing.bed", "input file not found") {
            AnnomicsError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
