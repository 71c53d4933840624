//! WAV header probing

use std::path::Path;
use hound::{SampleFormat, WavReader};
use crate::error::{StemRouteError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Int,
    Float,
}

impl AudioFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Int => "int",
            AudioFormat::Float => "float",
        }
    }
}

impl From<SampleFormat> for AudioFormat {
    fn from(format: SampleFormat) -> Self {
        match format {
            SampleFormat::Int => AudioFormat::Int,
            SampleFormat::Float => AudioFormat::Float,
        }
    }
}

/// Stream parameters read from a WAV header, without decoding samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    /// Samples per channel
    pub frames: u32,
    pub bits_per_sample: u16,
    pub duration: f64,
}

impl AudioHeader {
    pub fn new(sample_rate: u32, channels: u16, format: AudioFormat, bits_per_sample: u16, frames: u32) -> Self {
        let duration = if sample_rate == 0 {
            0.0
        } else {
            frames as f64 / sample_rate as f64
        };

        Self {
            sample_rate,
            channels,
            format,
            frames,
            bits_per_sample,
            duration,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;

        let spec = reader.spec();
        let header = AudioHeader::new(
            spec.sample_rate,
            spec.channels,
            spec.sample_format.into(),
            spec.bits_per_sample,
            reader.duration(),
        );
        header.validate()?;
        log::debug!(
            "{}: {} Hz, {} ch, {}-bit {}",
            path.display(), header.sample_rate, header.channels, header.bits_per_sample, header.format.name()
        );
        Ok(header)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(StemRouteError::audio("Sample rate cannot be 0"));
        }

        if self.channels == 0 {
            return Err(StemRouteError::audio("Channel count cannot be 0"));
        }

        Ok(())
    }
}

/// Duration in seconds of a WAV file; `None` for any other container
pub fn probe_duration<P: AsRef<Path>>(path: P) -> Result<Option<f64>> {
    let path = path.as_ref();
    if !super::has_extension(path, "wav") {
        log::debug!("Skipping duration probe for non-WAV output {}", path.display());
        return Ok(None);
    }
    AudioHeader::from_file(path).map(|h| Some(h.duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_audio_header_creation() {
        let header = AudioHeader::new(16000, 1, AudioFormat::Float, 32, 1000);
        assert_eq!(header.frames, 1000);
        assert!((header.duration - 0.0625).abs() < f64::EPSILON);
        assert!(header.validate().is_ok());

        assert!(AudioHeader::new(0, 1, AudioFormat::Int, 16, 1000).validate().is_err());
        assert!(AudioHeader::new(16000, 0, AudioFormat::Int, 16, 1000).validate().is_err());
    }

    #[test]
    fn test_stereo_duration_counts_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1_vocals.wav");
        write_wav(&path, 8000, 2, 12000);

        let header = AudioHeader::from_file(&path).unwrap();
        assert_eq!(header.channels, 2);
        assert_eq!(header.format, AudioFormat::Int);
        assert!((header.duration - 1.5).abs() < 1e-9);
        assert_eq!(probe_duration(&path).unwrap(), Some(1.5));
    }

    #[test]
    fn test_probe_skips_other_formats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1_sound.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        assert_eq!(probe_duration(&path).unwrap(), None);
    }

    #[test]
    fn test_probe_rejects_corrupt_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1_vocals.WAV");
        std::fs::write(&path, b"not a wav").unwrap();
        assert!(matches!(probe_duration(&path), Err(StemRouteError::Audio(_))));
    }
}
