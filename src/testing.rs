//! In-process stand-ins for the separation engine and sound generator

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use crate::engine::{EngineOutput, OutputNaming, SeparationEngine};
use crate::error::{StemRouteError, Result};
use crate::generator::SoundGenerator;
use crate::stems::{ModelId, StemNamingTable};

#[derive(Debug, Clone)]
pub struct EngineCall {
    pub model: ModelId,
    pub input: PathBuf,
    pub naming: OutputNaming,
}

/// Writes an empty `.wav` for every stem of the loaded model.
///
/// Named stems go to `{file_stem}.wav`; the rest get the separator's own
/// `{input}_({stem})_{model}.wav` pattern and are labeled with the engine
/// stem.
#[derive(Debug)]
pub struct FakeEngine {
    dir: PathBuf,
    table: StemNamingTable,
    loaded: Option<ModelId>,
    fail_on: Option<String>,
    skipped: Vec<String>,
    unlabeled: bool,
    byproduct: bool,
    pub calls: Vec<EngineCall>,
}

impl FakeEngine {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            table: StemNamingTable::default(),
            loaded: None,
            fail_on: None,
            skipped: Vec::new(),
            unlabeled: false,
            byproduct: false,
            calls: Vec::new(),
        }
    }

    pub fn fail_on(mut self, model: &str) -> Self {
        self.fail_on = Some(model.to_string());
        self
    }

    /// Never write this engine stem
    pub fn skip_stem(mut self, stem: &str) -> Self {
        self.skipped.push(stem.to_string());
        self
    }

    /// Report every file without its stem
    pub fn unlabeled(mut self) -> Self {
        self.unlabeled = true;
        self
    }

    /// Also write a file matching no stem
    pub fn with_byproduct(mut self) -> Self {
        self.byproduct = true;
        self
    }
}

impl SeparationEngine for FakeEngine {
    fn load_model(&mut self, model: &ModelId) -> Result<()> {
        self.loaded = Some(model.clone());
        Ok(())
    }

    fn separate(&mut self, input: &Path, naming: &OutputNaming) -> Result<Vec<EngineOutput>> {
        let model = self.loaded.clone().ok_or_else(|| StemRouteError::engine("no model loaded"))?;
        self.calls.push(EngineCall { model: model.clone(), input: input.to_path_buf(), naming: naming.clone() });

        if self.fail_on.as_deref() == Some(model.as_str()) {
            return Err(StemRouteError::engine(format!("{} crashed", model)));
        }

        let input_stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("input");
        let model_stem = Path::new(model.as_str()).file_stem().and_then(|s| s.to_str()).unwrap_or("model");
        let mut outputs = Vec::new();

        for stem in self.table.lookup(&model)? {
            if self.skipped.iter().any(|s| s == stem.as_str()) {
                continue;
            }
            let output = match naming.get(stem.as_str()) {
                Some(target) => {
                    let path = self.dir.join(format!("{}.wav", target.file_stem));
                    if self.unlabeled {
                        EngineOutput::unlabeled(path)
                    } else {
                        EngineOutput::labeled(target.stem.clone(), path)
                    }
                }
                None => {
                    let path = self.dir.join(format!("{}_({})_{}.wav", input_stem, stem, model_stem));
                    if self.unlabeled {
                        EngineOutput::unlabeled(path)
                    } else {
                        EngineOutput::labeled(stem.clone(), path)
                    }
                }
            };
            std::fs::write(&output.path, b"")?;
            outputs.push(output);
        }

        if self.byproduct {
            let path = self.dir.join(format!("{}_byproduct.wav", input_stem));
            std::fs::write(&path, b"")?;
            outputs.push(EngineOutput::unlabeled(path));
        }

        Ok(outputs)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorCall {
    pub task_id: String,
    pub prompt: String,
    pub duration: f64,
}

/// Records prompts and writes an empty `{task}_sound.mp3`
#[derive(Debug)]
pub struct FakeGenerator {
    dir: PathBuf,
    failing: bool,
    calls: Mutex<Vec<GeneratorCall>>,
}

impl FakeGenerator {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), failing: false, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl SoundGenerator for FakeGenerator {
    fn generate(&self, task_id: &str, prompt: &str, duration: f64) -> Result<PathBuf> {
        self.calls.lock().unwrap().push(GeneratorCall {
            task_id: task_id.to_string(),
            prompt: prompt.to_string(),
            duration,
        });
        if self.failing {
            return Err(StemRouteError::generation("service unavailable"));
        }
        let path = self.dir.join(format!("{}_sound.mp3", task_id));
        std::fs::write(&path, b"ID3")?;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
