//! Task entry point: validate, dispatch, assemble

use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::assembler::{AssembledResult, ResultAssembler};
use crate::audio;
use crate::config::Config;
use crate::context::{Mode, ProcessingContext};
use crate::engine::{AudioSeparatorCli, SeparationEngine};
use crate::error::{StemRouteError, Result};
use crate::generator::{ElevenLabsGenerator, SoundGenerator};
use crate::resolver::OutputResolver;
use crate::stems::StemNamingTable;
use crate::strategy::{StageRunner, StrategyRegistry};

/// One unit of work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRequest {
    pub task_id: String,
    pub mode: String,
    pub input: Option<PathBuf>,
    pub prompt: Option<String>,
    pub duration: Option<f64>,
    /// Role name -> model identifier
    pub model_overrides: BTreeMap<String, String>,
}

impl TaskRequest {
    pub fn new<T: Into<String>, M: Into<String>>(task_id: T, mode: M) -> Self {
        Self {
            task_id: task_id.into(),
            mode: mode.into(),
            ..Self::default()
        }
    }

    pub fn with_input<P: Into<PathBuf>>(mut self, input: P) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_prompt<S: Into<String>>(mut self, prompt: S, duration: Option<f64>) -> Self {
        self.prompt = Some(prompt.into());
        self.duration = duration;
        self
    }

    pub fn with_model<R: Into<String>, M: Into<String>>(mut self, role: R, model: M) -> Self {
        self.model_overrides.insert(role.into(), model.into());
        self
    }
}

/// Outcome envelope for one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub success: bool,
    pub mode: String,
    pub result: Option<AssembledResult>,
    /// Seconds of audio in the primary output, WAV only
    pub conversion_duration: Option<f64>,
    pub error: Option<String>,
}

impl TaskResponse {
    fn completed(request: &TaskRequest, result: AssembledResult, conversion_duration: Option<f64>) -> Self {
        Self {
            task_id: request.task_id.clone(),
            success: true,
            mode: request.mode.clone(),
            result: Some(result),
            conversion_duration,
            error: None,
        }
    }

    fn failed(request: &TaskRequest, error: &StemRouteError) -> Self {
        Self {
            task_id: request.task_id.clone(),
            success: false,
            mode: request.mode.clone(),
            result: None,
            conversion_duration: None,
            error: Some(error.to_string()),
        }
    }
}

/// Runs tasks against one engine and one generator
pub struct Pipeline {
    config: Config,
    engine: Box<dyn SeparationEngine>,
    generator: Box<dyn SoundGenerator>,
    registry: StrategyRegistry,
    stem_table: StemNamingTable,
    resolver: OutputResolver,
    assembler: ResultAssembler,
}

impl Pipeline {
    pub fn new(config: Config, engine: Box<dyn SeparationEngine>, generator: Box<dyn SoundGenerator>) -> Self {
        let registry = StrategyRegistry::standard(config.generator.default_duration);
        let stem_table = config.stem_table();
        let resolver = OutputResolver::new(&config.paths.output_dir);

        Self {
            config,
            engine,
            generator,
            registry,
            stem_table,
            resolver,
            assembler: ResultAssembler::new(),
        }
    }

    /// Pipeline backed by the `audio-separator` CLI and ElevenLabs
    pub fn from_config(config: Config) -> Result<Self> {
        config.models.validate_against(&config.stem_table())?;
        let engine = AudioSeparatorCli::new(&config)?;
        let generator = ElevenLabsGenerator::new(&config.generator, &config.paths.output_dir)?;
        log::info!("Pipeline ready: output dir {}", config.paths.output_dir.display());
        Ok(Self::new(config, Box::new(engine), Box::new(generator)))
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run a task, turning any failure into a failed response
    pub fn handle(&mut self, request: &TaskRequest) -> TaskResponse {
        match self.execute(request) {
            Ok(response) => response,
            Err(e) => {
                if e.is_configuration_error() {
                    log::error!("Task {} rejected: {}", request.task_id, e);
                } else {
                    log::error!("Task {} failed: {}", request.task_id, e);
                }
                TaskResponse::failed(request, &e)
            }
        }
    }

    pub fn execute(&mut self, request: &TaskRequest) -> Result<TaskResponse> {
        let mode: Mode = request.mode.parse()?;
        let strategy = self.registry.get(mode)?;
        log::info!("Task {}: mode {} via {}", request.task_id, mode, self.engine.name());

        if mode.requires_input() {
            let input = request.input.as_deref().ok_or_else(|| {
                StemRouteError::invalid_input(format!("Mode {} requires an input audio file", mode))
            })?;
            audio::validate_input_file(input)?;
        }
        std::fs::create_dir_all(&self.config.paths.output_dir)?;

        let mut builder = ProcessingContext::builder(&request.task_id, mode, &self.config.paths.output_dir)
            .models(self.config.models.with_overrides(&request.model_overrides))
            .output_format(self.config.paths.output_format.to_lowercase())
            .prompt(request.prompt.clone())
            .audio_length(request.duration);
        if let Some(input) = &request.input {
            builder = builder.input(input);
        }
        let ctx = builder.build()?;

        let resolved = {
            let mut runner = StageRunner::new(
                self.engine.as_mut(),
                self.generator.as_ref(),
                &self.stem_table,
                &self.resolver,
            );
            strategy.process(&ctx, &mut runner)?
        };

        let result = self.assembler.assemble(mode, ctx.task_id(), &resolved)?;
        let conversion_duration = match result.primary_path() {
            Some(path) => audio::probe_duration(path).unwrap_or_else(|e| {
                log::warn!("Task {}: could not probe {}: {}", ctx.task_id(), path.display(), e);
                None
            }),
            None => None,
        };

        log::info!("Task {} completed with {} result key(s)", ctx.task_id(), result.len());
        Ok(TaskResponse::completed(request, result, conversion_duration))
    }
}
