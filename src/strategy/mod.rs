//! Processing strategies
//!
//! A strategy is the mode-specific sequence of separation stages. Every
//! engine call goes through [`StageRunner::run_stage`], which looks the model
//! up in the naming table, runs it, filters its outputs and checks the stems
//! the stage must produce.

pub mod extractors;
pub mod registry;
pub mod sound;

use std::path::PathBuf;
use crate::context::{Mode, ProcessingContext};
use crate::engine::{OutputNaming, SeparationEngine};
use crate::error::{StemRouteError, Result};
use crate::generator::SoundGenerator;
use crate::resolver::{OutputResolver, ResolvedStems};
use crate::stems::{ModelId, StemName, StemNamingTable};

pub use extractors::{DualExtractor, LeadBackVocalExtractor, SingleExtractor};
pub use registry::StrategyRegistry;
pub use sound::SoundCreator;

/// Mode-specific processing algorithm
pub trait ProcessingStrategy: std::fmt::Debug + Send + Sync {
    /// Mode this strategy implements
    fn mode(&self) -> Mode;

    /// Run every stage for the task and return the stems it produced
    fn process(&self, ctx: &ProcessingContext, runner: &mut StageRunner<'_>) -> Result<ResolvedStems>;
}

/// One engine invocation within a strategy
#[derive(Debug, Clone)]
pub struct Stage {
    pub index: usize,
    pub model: ModelId,
    pub input: PathBuf,
    naming: Option<OutputNaming>,
    expected: Option<Vec<StemName>>,
    required: Vec<StemName>,
}

impl Stage {
    pub fn new<P: Into<PathBuf>>(index: usize, model: ModelId, input: P) -> Self {
        Self {
            index,
            model,
            input: input.into(),
            naming: None,
            expected: None,
            required: Vec::new(),
        }
    }

    /// Output naming; defaults to the model's stems under the task convention
    pub fn naming(mut self, naming: OutputNaming) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Stems to keep; defaults to the model's stems from the naming table
    pub fn keep<I, S>(mut self, stems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StemName>,
    {
        self.expected = Some(stems.into_iter().map(Into::into).collect());
        self
    }

    /// Stems whose absence fails the task
    pub fn require<I, S>(mut self, stems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StemName>,
    {
        self.required = stems.into_iter().map(Into::into).collect();
        self
    }
}

/// Collaborators a strategy runs against
pub struct StageRunner<'a> {
    engine: &'a mut dyn SeparationEngine,
    generator: &'a dyn SoundGenerator,
    stem_table: &'a StemNamingTable,
    resolver: &'a OutputResolver,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        engine: &'a mut dyn SeparationEngine,
        generator: &'a dyn SoundGenerator,
        stem_table: &'a StemNamingTable,
        resolver: &'a OutputResolver,
    ) -> Self {
        Self { engine, generator, stem_table, resolver }
    }

    pub fn generator(&self) -> &dyn SoundGenerator {
        self.generator
    }

    pub fn run_stage(&mut self, ctx: &ProcessingContext, stage: Stage) -> Result<ResolvedStems> {
        let task_id = ctx.task_id();
        let model_stems = self.stem_table.lookup(&stage.model)?.to_vec();

        let naming = match stage.naming {
            Some(naming) => {
                if let Some((engine_stem, _)) = naming
                    .iter()
                    .find(|(engine_stem, _)| !model_stems.iter().any(|s| s.as_str() == *engine_stem))
                {
                    return Err(StemRouteError::config(format!(
                        "Model {} does not produce a '{}' stem", stage.model, engine_stem
                    )));
                }
                naming
            }
            None => ctx.generate_output_names(&model_stems),
        };
        let expected = stage.expected.unwrap_or(model_stems);

        log::info!(
            "Task {} stage {}: {} on {} via {}",
            task_id, stage.index, stage.model, stage.input.display(), self.engine.name()
        );

        let outputs = self
            .engine
            .run(&stage.model, &stage.input, &naming)
            .map_err(|e| e.in_stage(task_id, stage.index))?;

        let resolved = self
            .resolver
            .resolve(&outputs, task_id, &expected)
            .map_err(|e| e.in_stage(task_id, stage.index))?;

        for stem in &stage.required {
            resolved.require(stem, task_id, stage.index)?;
        }

        log::debug!(
            "Task {} stage {} resolved: {:?}",
            task_id,
            stage.index,
            resolved.stems().map(StemName::as_str).collect::<Vec<_>>()
        );

        Ok(resolved)
    }
}
