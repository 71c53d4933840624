//! Configuration management for the separation pipeline

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use clap::Parser;
use serde::{Deserialize, Serialize};
use crate::error::{StemRouteError, Result};
use crate::stems::{ModelId, StemNamingTable};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub models: ModelSet,
    pub engine: EngineConfig,
    pub generator: GeneratorConfig,
    pub processing: ProcessingConfig,
    /// Extra or replacement entries for the model -> stems table
    pub stem_table: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub model_dir: PathBuf,
    pub output_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub prompt_influence: f32,
    pub default_duration: f64,
    pub timeout_secs: u64,
}

/// Tuning presets forwarded to the separator for each model architecture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub executable: PathBuf,
    pub mdx: MdxParams,
    pub vr: VrParams,
    pub demucs: DemucsParams,
    pub mdxc: MdxcParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdxParams {
    pub hop_length: u32,
    pub segment_size: u32,
    pub overlap: f32,
    pub batch_size: u32,
    pub enable_denoise: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VrParams {
    pub batch_size: u32,
    pub window_size: u32,
    pub aggression: i32,
    pub enable_tta: bool,
    pub enable_post_process: bool,
    pub post_process_threshold: f32,
    pub high_end_process: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemucsParams {
    pub segment_size: String,
    pub shifts: u32,
    pub overlap: f32,
    pub segments_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdxcParams {
    pub segment_size: u32,
    pub override_model_segment_size: bool,
    pub batch_size: u32,
    pub overlap: u32,
    pub pitch_shift: i32,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp/outputs"),
            model_dir: PathBuf::from("./audio-separator-models"),
            output_format: "wav".to_string(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { verbose: false }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.elevenlabs.io".to_string(),
            prompt_influence: 0.3,
            default_duration: 5.0,
            timeout_secs: 120,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("audio-separator"),
            mdx: MdxParams::default(),
            vr: VrParams::default(),
            demucs: DemucsParams::default(),
            mdxc: MdxcParams::default(),
        }
    }
}

impl Default for MdxParams {
    fn default() -> Self {
        Self { hop_length: 1024, segment_size: 256, overlap: 0.25, batch_size: 1, enable_denoise: false }
    }
}

impl Default for VrParams {
    fn default() -> Self {
        Self {
            batch_size: 1,
            window_size: 1024,
            aggression: 5,
            enable_tta: true,
            enable_post_process: true,
            post_process_threshold: 0.2,
            high_end_process: false,
        }
    }
}

impl Default for DemucsParams {
    fn default() -> Self {
        Self { segment_size: "Default".to_string(), shifts: 4, overlap: 0.9, segments_enabled: true }
    }
}

impl Default for MdxcParams {
    fn default() -> Self {
        Self { segment_size: 512, override_model_segment_size: true, batch_size: 1, overlap: 25, pitch_shift: 0 }
    }
}

/// Slot a separation model fills within the strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelRole {
    VocalExtractor,
    InstrumentalExtractor,
    LeadBackSplitter,
    DeEcho,
    DeReverb,
    DeNoise,
    StemExtractor,
}

impl ModelRole {
    pub const ALL: [ModelRole; 7] = [
        ModelRole::VocalExtractor,
        ModelRole::InstrumentalExtractor,
        ModelRole::LeadBackSplitter,
        ModelRole::DeEcho,
        ModelRole::DeReverb,
        ModelRole::DeNoise,
        ModelRole::StemExtractor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::VocalExtractor => "vocal_extractor",
            ModelRole::InstrumentalExtractor => "instrumental_extractor",
            ModelRole::LeadBackSplitter => "lead_back_splitter",
            ModelRole::DeEcho => "de_echo",
            ModelRole::DeReverb => "de_reverb",
            ModelRole::DeNoise => "de_noise",
            ModelRole::StemExtractor => "stem_extractor",
        }
    }

    /// Environment variable that overrides the configured model
    pub fn env_var(&self) -> &'static str {
        match self {
            ModelRole::VocalExtractor => "VOCAL_EXTRACTOR_MODEL",
            ModelRole::InstrumentalExtractor => "INSTRUMENTAL_EXTRACTOR_MODEL",
            ModelRole::LeadBackSplitter => "LEAD_BACK_SPLITTER_MODEL",
            ModelRole::DeEcho => "DE_ECHO_MODEL",
            ModelRole::DeReverb => "DE_REVERB_MODEL",
            ModelRole::DeNoise => "DE_NOISE_MODEL",
            ModelRole::StemExtractor => "STEM_EXTRACTOR_MODEL",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelRole {
    type Err = StemRouteError;

    fn from_str(s: &str) -> Result<Self> {
        ModelRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| StemRouteError::config(format!("Unknown model role: {}", s)))
    }
}

/// One model per role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSet {
    pub vocal_extractor: ModelId,
    pub instrumental_extractor: ModelId,
    pub lead_back_splitter: ModelId,
    pub de_echo: ModelId,
    pub de_reverb: ModelId,
    pub de_noise: ModelId,
    pub stem_extractor: ModelId,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            vocal_extractor: ModelId::new("Kim_Vocal_2.onnx"),
            instrumental_extractor: ModelId::new("MDX23C-8KFFT-InstVoc_HQ_2.ckpt"),
            lead_back_splitter: ModelId::new("UVR-BVE-4B_SN-44100-1.pth"),
            de_echo: ModelId::new("UVR-De-Echo-Aggressive.pth"),
            de_reverb: ModelId::new("deverb_bs_roformer_8_384dim_10depth.ckpt"),
            de_noise: ModelId::new("UVR-DeNoise.pth"),
            stem_extractor: ModelId::new("htdemucs_6s.yaml"),
        }
    }
}

impl ModelSet {
    pub fn get(&self, role: ModelRole) -> &ModelId {
        match role {
            ModelRole::VocalExtractor => &self.vocal_extractor,
            ModelRole::InstrumentalExtractor => &self.instrumental_extractor,
            ModelRole::LeadBackSplitter => &self.lead_back_splitter,
            ModelRole::DeEcho => &self.de_echo,
            ModelRole::DeReverb => &self.de_reverb,
            ModelRole::DeNoise => &self.de_noise,
            ModelRole::StemExtractor => &self.stem_extractor,
        }
    }

    pub fn set(&mut self, role: ModelRole, model: ModelId) {
        let slot = match role {
            ModelRole::VocalExtractor => &mut self.vocal_extractor,
            ModelRole::InstrumentalExtractor => &mut self.instrumental_extractor,
            ModelRole::LeadBackSplitter => &mut self.lead_back_splitter,
            ModelRole::DeEcho => &mut self.de_echo,
            ModelRole::DeReverb => &mut self.de_reverb,
            ModelRole::DeNoise => &mut self.de_noise,
            ModelRole::StemExtractor => &mut self.stem_extractor,
        };
        *slot = model;
    }

    /// Apply per-request overrides keyed by role name; unknown roles and
    /// empty model names are skipped.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> ModelSet {
        let mut models = self.clone();
        for (role, model) in overrides {
            if model.trim().is_empty() {
                continue;
            }
            match role.parse::<ModelRole>() {
                Ok(role) => models.set(role, ModelId::new(model.trim())),
                Err(_) => log::warn!("Ignoring model override for unknown role '{}'", role),
            }
        }
        models
    }

    /// Every configured model must be known to the naming table
    pub fn validate_against(&self, table: &StemNamingTable) -> Result<()> {
        for role in ModelRole::ALL {
            table.lookup(self.get(role))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "stemroute", about = "Multi-mode audio separation orchestrator", version, author)]
pub struct Args {
    #[arg(short = 't', long = "task-id", help = "Task identifier used to name output files (random if omitted)")]
    pub task_id: Option<String>,

    #[arg(short = 'm', long = "mode", help = "Processing mode, e.g. vocal_extractor or de_reverb")]
    pub mode: Option<String>,

    #[arg(short = 'i', long = "input", help = "Input audio file path")]
    pub input: Option<PathBuf>,

    #[arg(short = 'p', long = "prompt", help = "Text prompt for sound_creator")]
    pub prompt: Option<String>,

    #[arg(short = 'd', long = "duration", help = "Target duration in seconds for sound_creator")]
    pub duration: Option<f64>,

    #[arg(long = "model", value_parser = parse_model_override, help = "Model override as role=model_file (repeatable)")]
    pub models: Vec<(String, String)>,

    #[arg(short = 'o', long = "output-dir", help = "Working directory for separated stems")]
    pub output_dir: Option<PathBuf>,

    #[arg(long = "model-dir", help = "Directory holding separation model files")]
    pub model_dir: Option<PathBuf>,

    #[arg(short = 'f', long = "output-format", help = "Output audio format written by the separator")]
    pub output_format: Option<String>,

    #[arg(long = "separator-bin", help = "Path to the audio-separator executable")]
    pub separator_bin: Option<PathBuf>,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "list-modes", help = "Print the supported processing modes and exit")]
    pub list_modes: bool,

    #[arg(long = "write-default-config", help = "Write a default config file to the given path and exit")]
    pub write_default_config: Option<PathBuf>,
}

fn parse_model_override(raw: &str) -> std::result::Result<(String, String), String> {
    let (role, model) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected role=model, got '{}'", raw))?;
    let (role, model) = (role.trim(), model.trim());
    if role.is_empty() || model.is_empty() {
        return Err(format!("expected role=model, got '{}'", raw));
    }
    Ok((role.to_string(), model.to_string()))
}

impl Config {
    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: &Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        config.apply_env();

        // Command line arguments override file and environment
        if let Some(dir) = &args.output_dir {
            config.paths.output_dir = dir.clone();
        }
        if let Some(dir) = &args.model_dir {
            config.paths.model_dir = dir.clone();
        }
        if let Some(format) = &args.output_format {
            config.paths.output_format = format.clone();
        }
        if let Some(bin) = &args.separator_bin {
            config.engine.executable = bin.clone();
        }
        config.processing.verbose |= args.verbose;

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StemRouteError::config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay environment settings read through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for role in ModelRole::ALL {
            if let Some(model) = lookup(role.env_var()) {
                self.models.set(role, ModelId::new(model));
            }
        }
        if let Some(key) = lookup("ELEVENLABS_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(dir) = lookup("STEMROUTE_OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("STEMROUTE_MODEL_DIR") {
            self.paths.model_dir = PathBuf::from(dir);
        }
        if let Some(bin) = lookup("AUDIO_SEPARATOR_BIN") {
            self.engine.executable = PathBuf::from(bin);
        }
    }

    /// Build the naming table: stock catalogue plus configured entries
    pub fn stem_table(&self) -> StemNamingTable {
        let mut table = StemNamingTable::default();
        table.extend_from(&self.stem_table);
        table
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        let format = &self.paths.output_format;
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StemRouteError::config(format!("Invalid output format: '{}'", format)));
        }

        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(StemRouteError::config("Output directory must not be empty"));
        }

        if self.engine.executable.as_os_str().is_empty() {
            return Err(StemRouteError::config("Separator executable must not be empty"));
        }

        if !(0.0..=1.0).contains(&self.generator.prompt_influence) {
            return Err(StemRouteError::config("Prompt influence must be in range [0.0, 1.0]"));
        }

        if !(0.5..=30.0).contains(&self.generator.default_duration) {
            return Err(StemRouteError::config("Default sound duration must be between 0.5 and 30 seconds"));
        }

        for (model, stems) in &self.stem_table {
            if stems.is_empty() {
                return Err(StemRouteError::config(format!("Stem table entry for '{}' lists no stems", model)));
            }
        }

        self.models.validate_against(&self.stem_table())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StemRouteError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| StemRouteError::config(format!("Failed to write config file: {}", e)))
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }

    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }
}
