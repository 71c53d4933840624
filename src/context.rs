//! Processing modes and the per-task processing context

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::config::{ModelRole, ModelSet};
use crate::engine::{OutputNaming, OutputTarget};
use crate::error::{StemRouteError, Result};
use crate::stems::{ModelId, StemName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    VocalExtractor,
    InstrumentalExtractor,
    VocalInstrumentalExtractor,
    LeadBackVocalExtractor,
    DeReverb,
    DeEcho,
    DeNoise,
    StemExtractor,
    SoundCreator,
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Mode::VocalExtractor,
        Mode::InstrumentalExtractor,
        Mode::VocalInstrumentalExtractor,
        Mode::LeadBackVocalExtractor,
        Mode::DeReverb,
        Mode::DeEcho,
        Mode::DeNoise,
        Mode::StemExtractor,
        Mode::SoundCreator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::VocalExtractor => "vocal_extractor",
            Mode::InstrumentalExtractor => "instrumental_extractor",
            Mode::VocalInstrumentalExtractor => "vocal_instrumental_extractor",
            Mode::LeadBackVocalExtractor => "lead_back_vocal_extractor",
            Mode::DeReverb => "de_reverb",
            Mode::DeEcho => "de_echo",
            Mode::DeNoise => "de_noise",
            Mode::StemExtractor => "stem_extractor",
            Mode::SoundCreator => "sound_creator",
        }
    }

    /// Every mode except the generative one separates an input file
    pub fn requires_input(&self) -> bool {
        !matches!(self, Mode::SoundCreator)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = StemRouteError;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| StemRouteError::UnsupportedMode(s.to_string()))
    }
}

/// Everything a strategy may read about the task it is running.
///
/// Built once per task and only handed out by shared reference, so every
/// stage of a multi-stage strategy sees the same values.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    task_id: String,
    mode: Mode,
    input_path: Option<PathBuf>,
    models: ModelSet,
    output_dir: PathBuf,
    output_format: String,
    prompt: Option<String>,
    audio_length: Option<f64>,
}

impl ProcessingContext {
    pub fn builder<S: Into<String>, P: Into<PathBuf>>(task_id: S, mode: Mode, output_dir: P) -> ContextBuilder {
        ContextBuilder {
            ctx: ProcessingContext {
                task_id: task_id.into(),
                mode,
                input_path: None,
                models: ModelSet::default(),
                output_dir: output_dir.into(),
                output_format: "wav".to_string(),
                prompt: None,
                audio_length: None,
            },
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    pub fn require_input(&self) -> Result<&Path> {
        self.input_path().ok_or_else(|| {
            StemRouteError::invalid_input(format!("Mode {} requires an input audio file", self.mode))
        })
    }

    pub fn model(&self, role: ModelRole) -> &ModelId {
        self.models.get(role)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_format(&self) -> &str {
        &self.output_format
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn audio_length(&self) -> Option<f64> {
        self.audio_length
    }

    /// Task-qualified filename stem for a logical stem: `{task_id}_{token}`
    pub fn output_file_stem(&self, stem: &StemName) -> String {
        format!("{}_{}", self.task_id, stem.file_token())
    }

    /// Full path the engine is expected to write a stem to
    pub fn output_path(&self, stem: &StemName) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_file_stem(stem), self.output_format))
    }

    /// Identity naming: each engine stem keeps its name under the task convention
    pub fn generate_output_names(&self, stems: &[StemName]) -> OutputNaming {
        let mut naming = OutputNaming::new();
        for stem in stems {
            naming.insert(stem.as_str(), self.target(stem.clone()));
        }
        naming
    }

    /// Naming target that writes an engine stem under `stem`'s task convention
    pub fn target(&self, stem: StemName) -> OutputTarget {
        let file_stem = self.output_file_stem(&stem);
        OutputTarget { stem, file_stem }
    }
}

pub struct ContextBuilder {
    ctx: ProcessingContext,
}

impl ContextBuilder {
    pub fn input<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ctx.input_path = Some(path.into());
        self
    }

    pub fn models(mut self, models: ModelSet) -> Self {
        self.ctx.models = models;
        self
    }

    pub fn output_format<S: Into<String>>(mut self, format: S) -> Self {
        self.ctx.output_format = format.into();
        self
    }

    pub fn prompt(mut self, prompt: Option<String>) -> Self {
        self.ctx.prompt = prompt;
        self
    }

    pub fn audio_length(mut self, seconds: Option<f64>) -> Self {
        self.ctx.audio_length = seconds;
        self
    }

    pub fn build(self) -> Result<ProcessingContext> {
        validate_task_id(&self.ctx.task_id)?;
        Ok(self.ctx)
    }
}

/// Task ids end up in filenames shared by concurrent tasks
pub fn validate_task_id(task_id: &str) -> Result<()> {
    if task_id.trim().is_empty() {
        return Err(StemRouteError::invalid_input("Task id must not be empty"));
    }
    if task_id.contains(['/', '\\']) || task_id.contains("..") {
        return Err(StemRouteError::invalid_input(format!(
            "Task id '{}' must not contain path separators", task_id
        )));
    }
    Ok(())
}
