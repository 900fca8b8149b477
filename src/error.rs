use thiserror::Error;

use crate::pipeline::FilterError;

/// Everything a reducer handler can fail with.
///
/// Gesture-level validation problems are not errors; handlers ignore them.
/// What ends up here is caught at the reducer boundary and recorded in
/// `State::error_action`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spectrum not found: {0}")]
    SpectrumNotFound(String),
    #[error("unsupported document version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("handler panicked: {0}")]
    Panic(String),
}
