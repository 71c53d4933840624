//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum StemRouteError {
    #[error("Unsupported processing mode: {0}")]
    UnsupportedMode(String),

    #[error("Output name config not found for model: {0}")]
    UnknownModelConfiguration(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Task {task_id}: stage {stage} did not produce required stem '{stem}'")]
    StageContractViolation {
        task_id: String,
        stage: usize,
        stem: String,
    },

    #[error("Task {task_id}: stage {stage} failed: {source}")]
    StageFailed {
        task_id: String,
        stage: usize,
        #[source]
        source: Box<StemRouteError>,
    },

    #[error("Separation engine error: {0}")]
    EngineFailure(String),

    #[error("Sound generation error: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No output files were produced for task {0}")]
    NoOutputs(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StemRouteError {
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config(msg.into()) }
    pub fn engine<S: Into<String>>(msg: S) -> Self { Self::EngineFailure(msg.into()) }
    pub fn generation<S: Into<String>>(msg: S) -> Self { Self::Generation(msg.into()) }
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self { Self::InvalidInput(msg.into()) }
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio(msg.into()) }

    pub fn missing_stem(task_id: &str, stage: usize, stem: impl Into<String>) -> Self {
        Self::StageContractViolation {
            task_id: task_id.to_string(),
            stage,
            stem: stem.into(),
        }
    }

    /// Attach task and stage identity to an error raised inside a stage
    pub fn in_stage(self, task_id: &str, stage: usize) -> Self {
        match self {
            // already carries its own stage identity
            e @ (Self::StageContractViolation { .. } | Self::StageFailed { .. }) => e,
            other => Self::StageFailed {
                task_id: task_id.to_string(),
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Configuration errors are fatal and never worth retrying
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMode(_) | Self::UnknownModelConfiguration(_) | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StemRouteError>;

impl From<toml::de::Error> for StemRouteError {
    fn from(err: toml::de::Error) -> Self { Self::config(format!("Failed to parse config file: {}", err)) }
}

impl From<hound::Error> for StemRouteError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}
