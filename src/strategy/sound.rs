//! Prompt-driven sound generation

use crate::context::{Mode, ProcessingContext};
use crate::error::{StemRouteError, Result};
use crate::resolver::{OutputFileHandle, ResolvedStems};
use crate::stems::StemName;
use super::{ProcessingStrategy, StageRunner};

/// Generates a sound from the task prompt instead of separating an input
#[derive(Debug, Clone)]
pub struct SoundCreator {
    default_duration: f64,
}

impl SoundCreator {
    pub fn new(default_duration: f64) -> Self {
        Self { default_duration }
    }
}

impl ProcessingStrategy for SoundCreator {
    fn mode(&self) -> Mode {
        Mode::SoundCreator
    }

    fn process(&self, ctx: &ProcessingContext, runner: &mut StageRunner<'_>) -> Result<ResolvedStems> {
        let prompt = ctx
            .prompt()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StemRouteError::invalid_input("sound_creator requires a non-empty prompt"))?;

        let duration = ctx.audio_length().unwrap_or(self.default_duration);
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StemRouteError::invalid_input(format!(
                "Sound duration must be positive, got {}", duration
            )));
        }

        log::info!("Task {}: generating sound via {}", ctx.task_id(), runner.generator().name());
        let path = runner.generator().generate(ctx.task_id(), prompt, duration)?;
        if !path.is_file() {
            return Err(StemRouteError::generation(format!(
                "Generator reported {} but no file was written", path.display()
            )));
        }

        let mut result = ResolvedStems::new();
        result.insert(OutputFileHandle {
            task_id: ctx.task_id().to_string(),
            stem: StemName::new("sound"),
            path,
        });
        Ok(result)
    }
}
