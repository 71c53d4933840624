//! Text-to-audio generation used by the sound creator mode

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Serialize;
use crate::config::GeneratorConfig;
use crate::error::{StemRouteError, Result};

const SOUND_GENERATION_PATH: &str = "/v1/sound-generation";

/// Generates a sound file from a text prompt
pub trait SoundGenerator: Send + Sync {
    /// Generate audio for `prompt` lasting roughly `duration` seconds and
    /// return the path of the written file
    fn generate(&self, task_id: &str, prompt: &str, duration: f64) -> Result<PathBuf>;

    /// Get the name of this generator (for logging)
    fn name(&self) -> &'static str;
}

#[derive(Debug, Serialize)]
struct SoundGenerationRequest<'a> {
    text: &'a str,
    duration_seconds: f64,
    prompt_influence: f32,
}

/// ElevenLabs sound-effects client
#[derive(Debug)]
pub struct ElevenLabsGenerator {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    base_url: String,
    prompt_influence: f32,
    output_dir: PathBuf,
}

impl ElevenLabsGenerator {
    pub fn new(config: &GeneratorConfig, output_dir: &Path) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("{}/{}", crate::NAME, crate::VERSION))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StemRouteError::generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            prompt_influence: config.prompt_influence,
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_path(&self, task_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}_sound.mp3", task_id))
    }
}

impl SoundGenerator for ElevenLabsGenerator {
    fn generate(&self, task_id: &str, prompt: &str, duration: f64) -> Result<PathBuf> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| StemRouteError::config("ElevenLabs API key not set (ELEVENLABS_API_KEY)"))?;

        let url = format!("{}{}", self.base_url, SOUND_GENERATION_PATH);
        let body = SoundGenerationRequest {
            text: prompt,
            duration_seconds: duration,
            prompt_influence: self.prompt_influence,
        };

        log::info!("Requesting {:.1}s sound for task {}", duration, task_id);
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| StemRouteError::generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(StemRouteError::generation(format!(
                "Sound generation returned {}: {}", status, text
            )));
        }

        let audio = response
            .bytes()
            .map_err(|e| StemRouteError::generation(format!("Failed to read response body: {}", e)))?;
        if audio.is_empty() {
            return Err(StemRouteError::generation("Sound generation returned an empty body"));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_path(task_id);
        std::fs::write(&path, &audio)?;
        log::debug!("Saved generated sound to {}", path.display());

        Ok(path)
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}
