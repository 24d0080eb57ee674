use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Failure of a single request handled by the coordinator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Validation(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Download failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    #[error("Could not detect output filename")]
    ExtractionOutputUnparseable,
}

impl FetchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Ways the external extraction process can fail.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not start extractor: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("extractor exited with {status}: {stderr}", status = exit_label(*.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("extractor timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Errors raised while maintaining the artifact directory. These never reach
/// request callers; the sweep logs them and moves on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    EvictionDeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_carry_detail() {
        let err = FetchError::from(ExtractionError::NonZeroExit {
            code: Some(1),
            stderr: "ERROR: Video unavailable".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Download failed: extractor exited with status 1: ERROR: Video unavailable"
        );

        let err = FetchError::from(ExtractionError::Timeout(Duration::from_secs(300)));
        assert_eq!(err.to_string(), "Download failed: extractor timed out after 5m");

        let err = ExtractionError::NonZeroExit {
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn unparseable_output_is_distinct() {
        let err = FetchError::ExtractionOutputUnparseable;
        assert_eq!(err.to_string(), "Could not detect output filename");
        assert!(!matches!(err, FetchError::ExtractionFailed(_)));
    }
}
