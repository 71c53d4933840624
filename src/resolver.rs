//! Output resolution: match engine outputs to expected stems, discard the rest

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use crate::engine::EngineOutput;
use crate::error::{StemRouteError, Result};
use crate::stems::StemName;

/// A kept output file and the stem it was resolved as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileHandle {
    pub task_id: String,
    pub stem: StemName,
    pub path: PathBuf,
}

/// Stem -> file mapping produced by one or more stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStems {
    stems: BTreeMap<StemName, OutputFileHandle>,
}

impl ResolvedStems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: OutputFileHandle) {
        self.stems.insert(handle.stem.clone(), handle);
    }

    pub fn get(&self, stem: &str) -> Option<&OutputFileHandle> {
        self.stems.get(&StemName::new(stem))
    }

    pub fn path(&self, stem: &str) -> Option<&Path> {
        self.get(stem).map(|h| h.path.as_path())
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.get(stem).is_some()
    }

    pub fn remove(&mut self, stem: &str) -> Option<OutputFileHandle> {
        self.stems.remove(&StemName::new(stem))
    }

    /// Fails with a stage contract violation when `stem` was not resolved
    pub fn require(&self, stem: &StemName, task_id: &str, stage: usize) -> Result<&OutputFileHandle> {
        self.stems
            .get(stem)
            .ok_or_else(|| StemRouteError::missing_stem(task_id, stage, stem.as_str()))
    }

    /// Add every stem of `other`; later stages win on conflicts
    pub fn merge(&mut self, other: ResolvedStems) {
        self.stems.extend(other.stems);
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn stems(&self) -> impl Iterator<Item = &StemName> {
        self.stems.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputFileHandle> {
        self.stems.values()
    }
}

/// Classifies raw engine outputs against the stems a stage expects
#[derive(Debug, Clone)]
pub struct OutputResolver {
    working_dir: PathBuf,
}

impl OutputResolver {
    pub fn new<P: Into<PathBuf>>(working_dir: P) -> Self {
        Self { working_dir: working_dir.into() }
    }

    /// Keep outputs whose stem is in `expected`, delete every other output
    /// this task owns.
    ///
    /// An unlabeled output is owned only if its name starts with
    /// `{task_id}_`; other unlabeled files are left on disk. Safe to repeat
    /// over the same outputs: files that are already gone are skipped.
    pub fn resolve(&self, outputs: &[EngineOutput], task_id: &str, expected: &[StemName]) -> Result<ResolvedStems> {
        let mut resolved = ResolvedStems::new();

        for output in outputs {
            let path = self.absolute(&output.path);
            let matched = match &output.stem {
                Some(stem) => expected.iter().find(|e| *e == stem),
                None => match derive_label(&path, task_id) {
                    Some(label) => expected.iter().find(|e| e.matches_label(&label)),
                    None => {
                        log::warn!("Leaving {} in place: not named for task {}", path.display(), task_id);
                        continue;
                    }
                },
            };

            match matched {
                Some(stem) if !resolved.stems.contains_key(stem) => {
                    log::debug!("Resolved {} -> {}", stem, path.display());
                    resolved.insert(OutputFileHandle {
                        task_id: task_id.to_string(),
                        stem: stem.clone(),
                        path,
                    });
                }
                Some(stem) => {
                    if resolved.stems[stem].path != path {
                        log::warn!("Duplicate output for stem {}: {}", stem, path.display());
                        discard(&path)?;
                    }
                }
                None => discard(&path)?,
            }
        }

        Ok(resolved)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// Recover the stem label from a `{task_id}_{label}.{ext}` filename
pub fn derive_label(path: &Path, task_id: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(task_id)?.strip_prefix('_')?;
    let label = rest.split('.').next().unwrap_or(rest);
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

fn discard(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Discarded unexpected output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) -> Vec<EngineOutput> {
        names
            .iter()
            .map(|name| {
                std::fs::write(dir.join(name), b"").unwrap();
                EngineOutput::unlabeled(*name)
            })
            .collect()
    }

    #[test]
    fn test_resolve_filters_unexpected() {
        let dir = TempDir::new().unwrap();
        let resolver = OutputResolver::new(dir.path());
        let outputs = touch(dir.path(), &["task1_A.wav", "task1_B.wav", "task1_unexpected.wav"]);

        let resolved = resolver.resolve(&outputs, "task1", &["A".into(), "B".into()]).unwrap();

        assert_eq!(resolved.stems().map(|s| s.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(resolved.path("A"), Some(dir.path().join("task1_A.wav").as_path()));
        assert!(dir.path().join("task1_A.wav").exists());
        assert!(dir.path().join("task1_B.wav").exists());
        assert!(!dir.path().join("task1_unexpected.wav").exists());
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let resolver = OutputResolver::new(dir.path());
        let outputs = touch(dir.path(), &["t1_vocals.wav", "t1_instrumental.wav"]);
        let expected = [StemName::new("vocals")];

        let first = resolver.resolve(&outputs, "t1", &expected).unwrap();
        let second = resolver.resolve(&outputs, "t1", &expected).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert!(!dir.path().join("t1_instrumental.wav").exists());
    }

    #[test]
    fn test_unlabeled_foreign_files_survive() {
        let dir = TempDir::new().unwrap();
        let resolver = OutputResolver::new(dir.path());
        let outputs = touch(dir.path(), &["t1_vocals.wav", "t2_vocals.wav", "song_(Vocals)_model.wav"]);

        let resolved = resolver.resolve(&outputs, "t1", &["vocals".into()]).unwrap();

        assert_eq!(resolved.len(), 1);
        assert!(dir.path().join("t2_vocals.wav").exists());
        assert!(dir.path().join("song_(Vocals)_model.wav").exists());
    }

    #[test]
    fn test_labeled_outputs_skip_filename_parsing() {
        let dir = TempDir::new().unwrap();
        let resolver = OutputResolver::new(dir.path());
        std::fs::write(dir.path().join("t1_noecho.wav"), b"").unwrap();
        std::fs::write(dir.path().join("odd name.wav"), b"").unwrap();

        let outputs = vec![
            EngineOutput::labeled("no echo".into(), dir.path().join("t1_noecho.wav")),
            EngineOutput::labeled("echo".into(), dir.path().join("odd name.wav")),
        ];
        let resolved = resolver.resolve(&outputs, "t1", &["no echo".into(), "echo".into()]).unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.path("echo"), Some(dir.path().join("odd name.wav").as_path()));
    }

    #[test]
    fn test_space_stems_match_file_tokens() {
        let dir = TempDir::new().unwrap();
        let resolver = OutputResolver::new(dir.path());
        let outputs = touch(dir.path(), &["t1_nonoise.wav", "t1_noise.wav"]);

        let resolved = resolver.resolve(&outputs, "t1", &["noise".into(), "no noise".into()]).unwrap();
        assert!(resolved.contains("no noise"));
        assert!(resolved.contains("noise"));
    }

    #[test]
    fn test_require_reports_stage() {
        let resolved = ResolvedStems::new();
        let err = resolved.require(&"vocals".into(), "t9", 2).unwrap_err();
        assert!(matches!(
            err,
            StemRouteError::StageContractViolation { ref task_id, stage: 2, ref stem } if task_id == "t9" && stem == "vocals"
        ));
    }

    #[test]
    fn test_derive_label() {
        assert_eq!(derive_label(Path::new("/x/t1_vocal_front.wav"), "t1").as_deref(), Some("vocal_front"));
        assert_eq!(derive_label(Path::new("t1_vocals.mp3"), "t1").as_deref(), Some("vocals"));
        assert_eq!(derive_label(Path::new("t2_vocals.wav"), "t1"), None);
        assert_eq!(derive_label(Path::new("t1_.wav"), "t1"), None);
    }
}
