// error.rs - Error taxonomy shared across pipeline stages

use thiserror::Error;

/// Fatal errors. The pipeline aborts on the first one; no stage silently
/// coerces or imputes values to keep going.
#[derive(Debug, Error)]
pub enum CoexError {
    /// Fewer than 3 complete paired observations for a correlation.
    #[error("insufficient samples for correlation between '{a}' and '{b}': {n} paired observations (need at least 3)")]
    InsufficientSamples { a: String, b: String, n: usize },

    /// Zero-variance column, or NaN/inf reaching a numeric stage.
    #[error("degenerate input in {stage}: {detail}")]
    DegenerateInput { stage: &'static str, detail: String },

    /// Requested module label absent after detection/merging.
    #[error("unknown module label '{0}' (no genes assigned; labels can change after merging)")]
    UnknownModule(String),

    /// Dimensional inconsistency between matrices at a stage boundary.
    #[error("shape mismatch in {stage}: {detail}")]
    ShapeMismatch { stage: &'static str, detail: String },

    /// Invalid configuration value or combination.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed input table.
    #[error("{0}")]
    Parse(String),
}

impl CoexError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        CoexError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoexError>;

/// Non-fatal advisory, e.g. no candidate power reaching the target
/// scale-free fit. Collected by the pipeline and reported to the caller,
/// never swallowed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConfigurationWarning {
    pub message: String,
}

impl ConfigurationWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigurationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
