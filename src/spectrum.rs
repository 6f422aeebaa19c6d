//! Spectrum Sampling
//!
//! Reduces one frequency-magnitude frame (bytes `0..=255`, one per bin) to the
//! four scalar features every later stage consumes. Band edges are expressed
//! as bin indices and fractions of the bin count so that the same layout works
//! for any analyser size.

use crate::error::{PulseError, Result};
use crate::math::shape;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Largest magnitude a spectrum bin can report
pub const MAX_MAGNITUDE: f64 = 255.0;

/// Normalized band energies for one tick, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Average over every bin
    pub level: f64,
    /// Low band (kick drums, bass lines)
    pub bass: f64,
    /// Everything between bass and treble
    pub mid: f64,
    /// Upper band (hats, cymbals, sibilance)
    pub treble: f64,
}

impl FeatureSet {
    /// The all-zero feature set used whenever no frame is available
    pub const SILENT: FeatureSet = FeatureSet {
        level: 0.0,
        bass: 0.0,
        mid: 0.0,
        treble: 0.0,
    };
}

/// Band layout and perceptual curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// First bass bin (bins below carry DC and rumble)
    pub bass_start: usize,
    /// One past the last bass bin, clipped to the frame length
    pub bass_end: usize,
    /// Upper fraction of the bins averaged as treble
    pub treble_fraction: f64,
    /// Exponent applied after normalization; values below 1 lift quiet signals
    pub compression: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            bass_start: 2,
            bass_end: 48,
            treble_fraction: 0.3,
            compression: 0.85,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bass_start >= self.bass_end {
            return Err(PulseError::InvalidConfig(format!(
                "bass band {}..{} is empty",
                self.bass_start, self.bass_end
            )));
        }
        if !(self.treble_fraction > 0.0 && self.treble_fraction < 1.0) {
            return Err(PulseError::InvalidConfig(format!(
                "treble fraction must be in (0, 1), got {}",
                self.treble_fraction
            )));
        }
        if !(self.compression > 0.0 && self.compression.is_finite()) {
            return Err(PulseError::InvalidConfig(format!(
                "compression exponent must be positive, got {}",
                self.compression
            )));
        }
        Ok(())
    }
}

/// Bin ranges resolved for a concrete frame length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandRanges {
    pub bass: Range<usize>,
    pub mid: Range<usize>,
    pub treble: Range<usize>,
}

/// Mean magnitude over `frame[start..end]`.
///
/// `end` is clipped to the frame; an empty or inverted range averages to 0.
pub fn average(frame: &[u8], start: usize, end: usize) -> f64 {
    let end = end.min(frame.len());
    if end <= start {
        return 0.0;
    }
    let sum: u64 = frame[start..end].iter().map(|&m| m as u64).sum();
    sum as f64 / (end - start) as f64
}

/// Extracts [`FeatureSet`]s from spectrum frames
#[derive(Debug, Clone, Default)]
pub struct SpectrumSampler {
    config: SamplerConfig,
}

impl SpectrumSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Resolve the band layout for a frame of `len` bins
    pub fn band_ranges(&self, len: usize) -> BandRanges {
        let bass = self.config.bass_start.min(len)..self.config.bass_end.min(len);
        let treble_len = (len as f64 * self.config.treble_fraction).round() as usize;
        let treble_start = len.saturating_sub(treble_len);
        BandRanges {
            mid: bass.end..treble_start,
            bass,
            treble: treble_start..len,
        }
    }

    /// Derive the features of one frame; `None` means capture is not ready.
    pub fn extract(&self, frame: Option<&[u8]>) -> FeatureSet {
        let Some(frame) = frame else {
            return FeatureSet::SILENT;
        };
        let bands = self.band_ranges(frame.len());
        FeatureSet {
            level: self.normalize(average(frame, 0, frame.len())),
            bass: self.normalize(average(frame, bands.bass.start, bands.bass.end)),
            mid: self.normalize(average(frame, bands.mid.start, bands.mid.end)),
            treble: self.normalize(average(frame, bands.treble.start, bands.treble.end)),
        }
    }

    fn normalize(&self, magnitude: f64) -> f64 {
        shape((magnitude / MAX_MAGNITUDE).clamp(0.0, 1.0), self.config.compression)
    }
}
