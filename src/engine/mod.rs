//! Separation engine boundary
//!
//! The numerical source separation happens outside this crate. Strategies
//! talk to it only through [`SeparationEngine`], which reports each produced
//! file together with the stem it was written for.

pub mod separator;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use crate::error::Result;
use crate::stems::{ModelId, StemName};

pub use separator::AudioSeparatorCli;

/// Where the engine should write one of its internal stems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Logical stem the written file represents for the caller
    pub stem: StemName,
    /// Filename without extension
    pub file_stem: String,
}

/// Engine-internal stem name -> caller's output target.
///
/// The keys are the model's own vocabulary; the targets let a strategy
/// rename e.g. the splitter's "instrumental" output to `vocal_front`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputNaming {
    targets: BTreeMap<String, OutputTarget>,
}

impl OutputNaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, engine_stem: S, target: OutputTarget) {
        self.targets.insert(engine_stem.into(), target);
    }

    pub fn get(&self, engine_stem: &str) -> Option<&OutputTarget> {
        self.targets.get(engine_stem)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputTarget)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn targets(&self) -> impl Iterator<Item = &OutputTarget> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// `{engine stem: file stem}` form understood by the separator CLI
    pub fn custom_output_names(&self) -> BTreeMap<&str, &str> {
        self.targets
            .iter()
            .map(|(k, v)| (k.as_str(), v.file_stem.as_str()))
            .collect()
    }
}

/// One file produced by an engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub path: PathBuf,
    /// Stem the engine wrote this file for, when it knows
    pub stem: Option<StemName>,
}

impl EngineOutput {
    pub fn labeled<P: Into<PathBuf>>(stem: StemName, path: P) -> Self {
        Self { path: path.into(), stem: Some(stem) }
    }

    pub fn unlabeled<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into(), stem: None }
    }
}

/// Separation backend.
///
/// Engines are stateful: `load_model` must precede `separate`, and a single
/// instance must not be shared between concurrent loads.
pub trait SeparationEngine: Send {
    /// Make `model` the active model for subsequent `separate` calls
    fn load_model(&mut self, model: &ModelId) -> Result<()>;

    /// Separate `input` with the active model, writing outputs per `naming`
    fn separate(&mut self, input: &Path, naming: &OutputNaming) -> Result<Vec<EngineOutput>>;

    /// Get the name of this engine (for logging)
    fn name(&self) -> &'static str;

    fn run(&mut self, model: &ModelId, input: &Path, naming: &OutputNaming) -> Result<Vec<EngineOutput>> {
        self.load_model(model)?;
        self.separate(input, naming)
    }
}
