//! Audio file helpers
//!
//! Input format checks and WAV header probing. Decoding and transcoding are
//! left to the separation engine.

pub mod wav;

use std::path::Path;
use crate::error::{StemRouteError, Result};

pub use wav::{AudioFormat, AudioHeader, probe_duration};

/// Container extensions accepted as separation input
pub const SUPPORTED_INPUT_FORMATS: &[&str] = &[
    "wav", "flac", "mp3", "aac", "ogg", "m4a", "wma", "aiff", "alac", "webm",
];

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Check that `path` exists and has a supported audio extension
pub fn validate_input_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(StemRouteError::invalid_input(format!(
            "Input file does not exist: {}", path.display()
        )));
    }

    if !SUPPORTED_INPUT_FORMATS.iter().any(|ext| has_extension(path, ext)) {
        return Err(StemRouteError::invalid_input(format!(
            "Unsupported audio format: {} (expected one of {})",
            path.display(),
            SUPPORTED_INPUT_FORMATS.join(", ")
        )));
    }

    Ok(())
}
