//! Stem vocabulary and the model → stem naming table

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{StemRouteError, Result};

/// Logical label of one separated audio component
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StemName(String);

impl StemName {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form of the name used inside filenames ("no echo" -> "noecho")
    pub fn file_token(&self) -> String {
        self.0.replace(' ', "")
    }

    /// Whether a label recovered from an output matches this stem
    pub fn matches_label(&self, label: &str) -> bool {
        self.0 == label || self.file_token() == label
    }
}

impl fmt::Display for StemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StemName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Opaque separation model identifier (usually the model filename)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    ("model_bs_roformer_ep_317_sdr_12.9755.ckpt", &["vocals", "instrumental"]),
    ("Kim_Vocal_2.onnx", &["vocals", "instrumental"]),
    ("model_bs_roformer_ep_937_sdr_10.5309.ckpt", &["vocals", "instrumental"]),
    ("MDX23C-8KFFT-InstVoc_HQ_2.ckpt", &["vocals", "instrumental"]),
    ("UVR-BVE-4B_SN-44100-1.pth", &["vocals", "instrumental"]),
    ("mel_band_roformer_karaoke_aufr33_viperx_sdr_10.1956.ckpt", &["vocals", "instrumental"]),
    ("UVR-De-Echo-Aggressive.pth", &["no echo", "echo"]),
    ("UVR-DeNoise.pth", &["noise", "no noise"]),
    ("deverb_bs_roformer_8_384dim_10depth.ckpt", &["noreverb", "reverb"]),
    ("htdemucs_6s.yaml", &["vocals", "drums", "bass", "guitar", "piano", "other"]),
    ("htdemucs_ft.yaml", &["vocals", "drums", "bass", "other"]),
];

/// Mapping from model identifier to the ordered stems that model produces.
///
/// Passed explicitly to the stage runner so it can be validated and swapped
/// per deployment; `Default` carries the stock model catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemNamingTable {
    entries: BTreeMap<ModelId, Vec<StemName>>,
}

impl Default for StemNamingTable {
    fn default() -> Self {
        let mut table = Self::new();
        for (model, stems) in DEFAULT_TABLE {
            table.insert(*model, stems.iter().copied());
        }
        table
    }
}

impl StemNamingTable {
    /// Empty table
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Add or replace the stems for a model
    pub fn insert<M, I, S>(&mut self, model: M, stems: I)
    where
        M: Into<ModelId>,
        I: IntoIterator<Item = S>,
        S: Into<StemName>,
    {
        self.entries.insert(model.into(), stems.into_iter().map(Into::into).collect());
    }

    /// Merge entries loaded from configuration, replacing existing ones
    pub fn extend_from(&mut self, extra: &BTreeMap<String, Vec<String>>) {
        for (model, stems) in extra {
            self.insert(ModelId::new(model.as_str()), stems.iter().map(|s| StemName::new(s.as_str())));
        }
    }

    pub fn lookup(&self, model: &ModelId) -> Result<&[StemName]> {
        self.entries
            .get(model)
            .map(Vec::as_slice)
            .ok_or_else(|| StemRouteError::UnknownModelConfiguration(model.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<String> for StemName {
    fn from(name: String) -> Self {
        Self(name)
    }
}
