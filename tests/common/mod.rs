//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use stemroute::engine::{EngineOutput, OutputNaming, SeparationEngine};
use stemroute::generator::SoundGenerator;
use stemroute::stems::{ModelId, StemNamingTable};
use stemroute::{Config, Result, StemRouteError};

pub const SAMPLE_RATE: u32 = 8000;

/// Write a silent mono 16-bit WAV of the given length
pub fn write_wav(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");
    for _ in 0..(seconds * SAMPLE_RATE as f32) as usize {
        writer.write_sample(0i16).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.output_dir = dir.join("out");
    config.paths.model_dir = dir.join("models");
    config
}

pub type Calls = Arc<Mutex<Vec<(String, PathBuf)>>>;

/// Writes a two-second WAV for every stem the loaded model produces.
///
/// Stems without a requested name are written the way the separator names
/// them by default and labeled with the model's own stem.
pub struct WavEngine {
    output_dir: PathBuf,
    table: StemNamingTable,
    loaded: Option<ModelId>,
    pub calls: Calls,
}

impl WavEngine {
    pub fn new(output_dir: &Path) -> Self {
        std::fs::create_dir_all(output_dir).unwrap();
        Self {
            output_dir: output_dir.to_path_buf(),
            table: StemNamingTable::default(),
            loaded: None,
            calls: Arc::default(),
        }
    }
}

impl SeparationEngine for WavEngine {
    fn load_model(&mut self, model: &ModelId) -> Result<()> {
        self.loaded = Some(model.clone());
        Ok(())
    }

    fn separate(&mut self, input: &Path, naming: &OutputNaming) -> Result<Vec<EngineOutput>> {
        let model = self.loaded.clone().ok_or_else(|| StemRouteError::engine("no model loaded"))?;
        self.calls.lock().unwrap().push((model.to_string(), input.to_path_buf()));

        let input_stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        let mut outputs = Vec::new();
        for stem in self.table.lookup(&model)? {
            let output = match naming.get(stem.as_str()) {
                Some(target) => EngineOutput::labeled(
                    target.stem.clone(),
                    self.output_dir.join(format!("{}.wav", target.file_stem)),
                ),
                None => EngineOutput::labeled(
                    stem.clone(),
                    self.output_dir.join(format!("{}_({})_{}.wav", input_stem, stem, model)),
                ),
            };
            write_wav(&output.path, 2.0);
            outputs.push(output);
        }
        Ok(outputs)
    }

    fn name(&self) -> &'static str {
        "wav-fixture"
    }
}

pub type Prompts = Arc<Mutex<Vec<(String, String, f64)>>>;

/// Records each prompt and writes a placeholder MP3
pub struct RecordingGenerator {
    output_dir: PathBuf,
    pub prompts: Prompts,
}

impl RecordingGenerator {
    pub fn new(output_dir: &Path) -> Self {
        Self { output_dir: output_dir.to_path_buf(), prompts: Arc::default() }
    }
}

impl SoundGenerator for RecordingGenerator {
    fn generate(&self, task_id: &str, prompt: &str, duration: f64) -> Result<PathBuf> {
        self.prompts
            .lock()
            .unwrap()
            .push((task_id.to_string(), prompt.to_string(), duration));
        let path = self.output_dir.join(format!("{}_sound.mp3", task_id));
        std::fs::write(&path, b"ID3")?;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
