//! Mode-specific result layouts

use std::path::{Path, PathBuf};
use serde::ser::{Serialize, SerializeMap, Serializer};
use crate::context::Mode;
use crate::error::{StemRouteError, Result};
use crate::resolver::ResolvedStems;

/// Result key -> stem it is filled from, in output order
struct Layout {
    primary: &'static str,
    slots: &'static [(&'static str, &'static str)],
}

const VOCAL_INSTRUMENTAL: &[(&str, &str)] = &[("vocal", "vocals"), ("instrumental", "instrumental")];

fn layout(mode: Mode) -> Layout {
    match mode {
        Mode::VocalExtractor | Mode::VocalInstrumentalExtractor => Layout {
            primary: "vocal",
            slots: VOCAL_INSTRUMENTAL,
        },
        Mode::InstrumentalExtractor => Layout {
            primary: "instrumental",
            slots: VOCAL_INSTRUMENTAL,
        },
        Mode::LeadBackVocalExtractor => Layout {
            primary: "vocal",
            slots: &[("vocal", "vocal_front"), ("back_vocal", "vocal_back"), ("instrumental", "instrumental")],
        },
        Mode::DeReverb => Layout {
            primary: "noreverb",
            slots: &[("noreverb", "noreverb"), ("reverb", "reverb")],
        },
        Mode::DeEcho => Layout {
            primary: "no_echo",
            slots: &[("no_echo", "no echo"), ("echo", "echo")],
        },
        Mode::DeNoise => Layout {
            primary: "no_noise",
            slots: &[("no_noise", "no noise"), ("noise", "noise")],
        },
        Mode::StemExtractor => Layout {
            primary: "vocals",
            slots: &[
                ("bass", "bass"),
                ("drums", "drums"),
                ("guitar", "guitar"),
                ("other", "other"),
                ("piano", "piano"),
                ("vocals", "vocals"),
            ],
        },
        Mode::SoundCreator => Layout {
            primary: "sound",
            slots: &[("sound", "sound")],
        },
    }
}

/// Ordered result keys with the file each one resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledResult {
    primary: &'static str,
    entries: Vec<(&'static str, Option<PathBuf>)>,
}

impl AssembledResult {
    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, path)| path.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// File used for duration probing: the layout's primary key, else the
    /// first key that resolved
    pub fn primary_path(&self) -> Option<&Path> {
        self.get(self.primary)
            .or_else(|| self.entries.iter().find_map(|(_, path)| path.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AssembledResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, path) in &self.entries {
            map.serialize_entry(key, path)?;
        }
        map.end()
    }
}

/// Maps resolved stems onto the result keys of a mode
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, mode: Mode, task_id: &str, stems: &ResolvedStems) -> Result<AssembledResult> {
        let layout = layout(mode);
        let entries: Vec<_> = layout
            .slots
            .iter()
            .map(|(key, stem)| (*key, stems.path(stem).map(Path::to_path_buf)))
            .collect();

        if entries.iter().all(|(_, path)| path.is_none()) {
            return Err(StemRouteError::NoOutputs(format!(
                "{} ({}); expected any of {}",
                task_id,
                mode,
                layout.slots.iter().map(|(_, s)| *s).collect::<Vec<_>>().join(", ")
            )));
        }

        for (key, path) in &entries {
            if path.is_none() {
                log::warn!("Task {}: result key '{}' has no output", task_id, key);
            }
        }

        Ok(AssembledResult { primary: layout.primary, entries })
    }
}
