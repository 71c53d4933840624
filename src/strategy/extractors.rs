//! Separation strategies built from engine stages

use std::io::ErrorKind;
use crate::config::ModelRole;
use crate::context::{Mode, ProcessingContext};
use crate::engine::OutputNaming;
use crate::error::{StemRouteError, Result};
use crate::resolver::ResolvedStems;
use crate::stems::StemName;
use super::{ProcessingStrategy, Stage, StageRunner};

/// One model run over the input, filtered to the model's own stems
#[derive(Debug, Clone)]
pub struct SingleExtractor {
    mode: Mode,
    role: ModelRole,
    required: &'static [&'static str],
}

impl SingleExtractor {
    pub fn new(mode: Mode, role: ModelRole, required: &'static [&'static str]) -> Self {
        Self { mode, role, required }
    }

    pub fn vocal() -> Self {
        Self::new(Mode::VocalExtractor, ModelRole::VocalExtractor, &["vocals"])
    }

    pub fn instrumental() -> Self {
        Self::new(Mode::InstrumentalExtractor, ModelRole::InstrumentalExtractor, &["instrumental"])
    }

    pub fn de_reverb() -> Self {
        Self::new(Mode::DeReverb, ModelRole::DeReverb, &[])
    }

    pub fn de_echo() -> Self {
        Self::new(Mode::DeEcho, ModelRole::DeEcho, &[])
    }

    pub fn de_noise() -> Self {
        Self::new(Mode::DeNoise, ModelRole::DeNoise, &[])
    }

    pub fn stems() -> Self {
        Self::new(Mode::StemExtractor, ModelRole::StemExtractor, &[])
    }
}

impl ProcessingStrategy for SingleExtractor {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn process(&self, ctx: &ProcessingContext, runner: &mut StageRunner<'_>) -> Result<ResolvedStems> {
        let stage = Stage::new(0, ctx.model(self.role).clone(), ctx.require_input()?)
            .require(self.required.iter().copied());
        runner.run_stage(ctx, stage)
    }
}

/// Two independent single-stem runs over the same input, merged.
///
/// Each run names only its own stem, so whatever else a model writes is
/// discarded and the two runs cannot overwrite each other's result.
#[derive(Debug, Clone)]
pub struct DualExtractor {
    branches: [(ModelRole, &'static str); 2],
}

impl Default for DualExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DualExtractor {
    pub fn new() -> Self {
        Self {
            branches: [
                (ModelRole::VocalExtractor, "vocals"),
                (ModelRole::InstrumentalExtractor, "instrumental"),
            ],
        }
    }

    /// Same runs with the instrumental model first
    pub fn reversed() -> Self {
        let mut extractor = Self::new();
        extractor.branches.reverse();
        extractor
    }
}

impl ProcessingStrategy for DualExtractor {
    fn mode(&self) -> Mode {
        Mode::VocalInstrumentalExtractor
    }

    fn process(&self, ctx: &ProcessingContext, runner: &mut StageRunner<'_>) -> Result<ResolvedStems> {
        let input = ctx.require_input()?;
        let mut result = ResolvedStems::new();

        for (index, (role, stem)) in self.branches.iter().enumerate() {
            let stem = StemName::new(*stem);
            let mut naming = OutputNaming::new();
            naming.insert(stem.as_str(), ctx.target(stem.clone()));

            let stage = Stage::new(index, ctx.model(*role).clone(), input)
                .naming(naming)
                .keep([stem.clone()])
                .require([stem]);
            result.merge(runner.run_stage(ctx, stage)?);
        }

        Ok(result)
    }
}

/// Vocal/instrumental split, then the vocals split again into lead and
/// backing vocals.
#[derive(Debug, Clone, Default)]
pub struct LeadBackVocalExtractor;

impl LeadBackVocalExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessingStrategy for LeadBackVocalExtractor {
    fn mode(&self) -> Mode {
        Mode::LeadBackVocalExtractor
    }

    fn process(&self, ctx: &ProcessingContext, runner: &mut StageRunner<'_>) -> Result<ResolvedStems> {
        let task_id = ctx.task_id();
        let split_stems = [StemName::new("vocals"), StemName::new("instrumental")];

        let first = Stage::new(0, ctx.model(ModelRole::VocalExtractor).clone(), ctx.require_input()?)
            .naming(ctx.generate_output_names(&split_stems))
            .keep(split_stems.clone())
            .require(split_stems.clone());
        let mut stage_one = runner.run_stage(ctx, first)?;

        let vocals = stage_one.require(&split_stems[0], task_id, 0)?.path.clone();
        if !vocals.is_file() {
            return Err(StemRouteError::missing_stem(task_id, 0, "vocals"));
        }

        // the splitter calls lead vocals "instrumental" and backing vocals "vocals"
        let mut naming = OutputNaming::new();
        naming.insert("vocals", ctx.target(StemName::new("vocal_back")));
        naming.insert("instrumental", ctx.target(StemName::new("vocal_front")));

        let second = Stage::new(1, ctx.model(ModelRole::LeadBackSplitter).clone(), &vocals)
            .naming(naming)
            .keep(["vocal_front", "vocal_back"])
            .require(["vocal_front", "vocal_back"]);
        let mut result = runner.run_stage(ctx, second)?;

        match std::fs::remove_file(&vocals) {
            Ok(()) => log::debug!("Removed intermediate {}", vocals.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove intermediate {}: {}", vocals.display(), e),
        }

        if let Some(instrumental) = stage_one.remove("instrumental") {
            result.insert(instrumental);
        }
        Ok(result)
    }
}
