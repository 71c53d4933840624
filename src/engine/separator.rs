//! `audio-separator` command-line adapter

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use crate::config::{Config, EngineConfig};
use crate::engine::{EngineOutput, OutputNaming, SeparationEngine};
use crate::error::{StemRouteError, Result};
use crate::stems::ModelId;

const STDERR_TAIL_LINES: usize = 20;

/// Output directory listing: file -> modification time
type Snapshot = BTreeMap<PathBuf, Option<SystemTime>>;

/// Runs each separation as a child process of the `audio-separator` CLI
#[derive(Debug)]
pub struct AudioSeparatorCli {
    params: EngineConfig,
    model_dir: PathBuf,
    output_dir: PathBuf,
    output_format: String,
    loaded: Option<ModelId>,
}

impl AudioSeparatorCli {
    pub fn new(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.paths.model_dir)?;
        std::fs::create_dir_all(&config.paths.output_dir)?;

        Ok(Self {
            params: config.engine.clone(),
            model_dir: config.paths.model_dir.clone(),
            output_dir: config.paths.output_dir.clone(),
            output_format: config.paths.output_format.to_lowercase(),
            loaded: None,
        })
    }

    pub fn loaded_model(&self) -> Option<&ModelId> {
        self.loaded.as_ref()
    }

    fn build_args(&self, model: &ModelId, input: &Path, naming: &OutputNaming) -> Result<Vec<OsString>> {
        let p = &self.params;
        let mut args: Vec<OsString> = vec![
            input.into(),
            "--model_filename".into(),
            model.as_str().into(),
            "--model_file_dir".into(),
            self.model_dir.clone().into(),
            "--output_dir".into(),
            self.output_dir.clone().into(),
            "--output_format".into(),
            self.output_format.to_uppercase().into(),
        ];

        if !naming.is_empty() {
            let names = serde_json::to_string(&naming.custom_output_names())
                .map_err(|e| StemRouteError::engine(format!("Failed to encode output names: {}", e)))?;
            args.push("--custom_output_names".into());
            args.push(names.into());
        }

        let mut push = |flag: &str, value: String| {
            args.push(flag.into());
            args.push(value.into());
        };
        push("--mdx_hop_length", p.mdx.hop_length.to_string());
        push("--mdx_segment_size", p.mdx.segment_size.to_string());
        push("--mdx_overlap", p.mdx.overlap.to_string());
        push("--mdx_batch_size", p.mdx.batch_size.to_string());
        push("--vr_batch_size", p.vr.batch_size.to_string());
        push("--vr_window_size", p.vr.window_size.to_string());
        push("--vr_aggression", p.vr.aggression.to_string());
        push("--vr_post_process_threshold", p.vr.post_process_threshold.to_string());
        push("--demucs_segment_size", p.demucs.segment_size.clone());
        push("--demucs_shifts", p.demucs.shifts.to_string());
        push("--demucs_overlap", p.demucs.overlap.to_string());
        push("--demucs_segments_enabled", p.demucs.segments_enabled.to_string());
        push("--mdxc_segment_size", p.mdxc.segment_size.to_string());
        push("--mdxc_overlap", p.mdxc.overlap.to_string());
        push("--mdxc_batch_size", p.mdxc.batch_size.to_string());
        push("--mdxc_pitch_shift", p.mdxc.pitch_shift.to_string());

        let switches = [
            ("--mdx_enable_denoise", p.mdx.enable_denoise),
            ("--vr_enable_tta", p.vr.enable_tta),
            ("--vr_enable_post_process", p.vr.enable_post_process),
            ("--vr_high_end_process", p.vr.high_end_process),
            ("--mdxc_override_model_segment_size", p.mdxc.override_model_segment_size),
        ];
        args.extend(switches.into_iter().filter(|(_, on)| *on).map(|(flag, _)| flag.into()));

        Ok(args)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let mut files = Snapshot::new();
        for entry in std::fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.insert(entry.path(), metadata.modified().ok());
            }
        }
        Ok(files)
    }

    /// Collect what this run wrote for `input`.
    ///
    /// Files under a requested name are labeled with the requested stem.
    /// Files in the separator's default `{input}_(Stem)_{model}` pattern are
    /// labeled with the engine stem. Anything else in the directory belongs
    /// to someone else and is not reported. A file counts as written by this
    /// run only if it is new or its modification time changed.
    fn collect_outputs(&self, before: &Snapshot, input: &Path, naming: &OutputNaming) -> Result<Vec<EngineOutput>> {
        let after = self.snapshot()?;
        let fresh = |path: &PathBuf| match (before.get(path), after.get(path)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(old), Some(new)) => old != new,
        };

        let mut outputs = Vec::new();
        let mut claimed = BTreeSet::new();

        for target in naming.targets() {
            let path = self.output_dir.join(format!("{}.{}", target.file_stem, self.output_format));
            if fresh(&path) {
                claimed.insert(path.clone());
                outputs.push(EngineOutput::labeled(target.stem.clone(), path));
            } else if after.contains_key(&path) {
                log::warn!("{} predates this run; not claiming it", path.display());
            }
        }

        let input_stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        for path in after.keys().filter(|p| fresh(*p) && !claimed.contains(*p)) {
            let engine_stem = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| default_output_stem(name, input_stem));
            match engine_stem {
                Some(stem) => outputs.push(EngineOutput::labeled(stem.into(), path.clone())),
                None => log::debug!("Ignoring {}: not written for {}", path.display(), input.display()),
            }
        }

        Ok(outputs)
    }
}

/// Engine stem from a `{input_stem}_({stem})_{model}.{ext}` filename
fn default_output_stem<'a>(file_name: &'a str, input_stem: &str) -> Option<&'a str> {
    if input_stem.is_empty() {
        return None;
    }
    let rest = file_name.strip_prefix(input_stem)?.strip_prefix("_(")?;
    let (stem, _) = rest.split_once(')')?;
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

impl SeparationEngine for AudioSeparatorCli {
    fn load_model(&mut self, model: &ModelId) -> Result<()> {
        if model.as_str().trim().is_empty() {
            return Err(StemRouteError::engine("Model identifier must not be empty"));
        }
        log::info!("Loading separation model {}", model);
        self.loaded = Some(model.clone());
        Ok(())
    }

    fn separate(&mut self, input: &Path, naming: &OutputNaming) -> Result<Vec<EngineOutput>> {
        let model = self
            .loaded
            .clone()
            .ok_or_else(|| StemRouteError::engine("No model loaded; call load_model first"))?;

        if !input.is_file() {
            return Err(StemRouteError::engine(format!(
                "Input file does not exist: {}", input.display()
            )));
        }

        let args = self.build_args(&model, input, naming)?;
        let before = self.snapshot()?;

        log::debug!("Running {} with model {} on {}", self.params.executable.display(), model, input.display());
        let output = Command::new(&self.params.executable)
            .args(&args)
            .output()
            .map_err(|e| StemRouteError::engine(format!(
                "Failed to launch {}: {}", self.params.executable.display(), e
            )))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(StemRouteError::engine(format!(
                "{} exited with {} for model {}: {}",
                self.params.executable.display(), output.status, model, tail
            )));
        }

        let outputs = self.collect_outputs(&before, input, naming)?;
        log::debug!("Separation produced {} file(s)", outputs.len());
        Ok(outputs)
    }

    fn name(&self) -> &'static str {
        "audio-separator"
    }
}
