//! Beat Detection
//!
//! Kick detection against an adaptive bass baseline, plus a smoothed tempo
//! estimate derived from the spacing of detected kicks.
//!
//! The baseline is an exponential moving average of the bass feature. A kick
//! fires when bass clears the baseline (as it stood before this tick) by
//! `margin + threshold`. The baseline then absorbs the current bass value, so a
//! single impulse lifts it enough that the next tick needs a fresh rise to
//! fire again.

use crate::error::{PulseError, Result};
use crate::math::lerp;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Tunable constants for [`BeatDetector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Weight of the previous baseline in the EMA update
    pub ema_decay: f64,
    /// Offset added to the baseline before comparing
    pub margin: f64,
    /// Excess over `baseline + margin` required to call a kick
    pub threshold: f64,
    /// Blend factor toward each accepted instantaneous tempo
    pub bpm_smoothing: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Tempo reported before any interval has been measured
    pub initial_bpm: f64,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            ema_decay: 0.85,
            margin: 0.01,
            threshold: 0.02,
            bpm_smoothing: 0.15,
            min_bpm: 60.0,
            max_bpm: 200.0,
            initial_bpm: 130.0,
        }
    }
}

impl BeatConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.ema_decay) {
            return Err(PulseError::InvalidConfig(format!(
                "beat EMA decay must be in [0, 1), got {}",
                self.ema_decay
            )));
        }
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) {
            return Err(PulseError::InvalidConfig(format!(
                "tempo bounds {}..{} are not a valid range",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(self.min_bpm..=self.max_bpm).contains(&self.initial_bpm) {
            return Err(PulseError::InvalidConfig(format!(
                "initial tempo {} outside {}..{}",
                self.initial_bpm, self.min_bpm, self.max_bpm
            )));
        }
        if !(0.0..=1.0).contains(&self.bpm_smoothing) {
            return Err(PulseError::InvalidConfig(format!(
                "tempo smoothing must be in [0, 1], got {}",
                self.bpm_smoothing
            )));
        }
        Ok(())
    }
}

/// Cross-tick beat tracking state.
///
/// Beats counted toward scene advancement live on the scene runtime; this
/// keeps only the session-wide total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatState {
    /// Timestamp (seconds) of the most recent kick
    pub last_beat: Option<f64>,
    /// Smoothed tempo, always within the configured bounds
    pub bpm_estimate: f64,
    /// Kicks detected since the state was created or reset
    pub total_beats: u64,
    /// Adaptive bass baseline
    pub baseline_ema: f64,
}

impl BeatState {
    pub fn new(config: &BeatConfig) -> Self {
        Self {
            last_beat: None,
            bpm_estimate: config.initial_bpm,
            total_beats: 0,
            baseline_ema: 0.0,
        }
    }

    pub fn reset(&mut self, config: &BeatConfig) {
        *self = Self::new(config);
    }
}

impl Default for BeatState {
    fn default() -> Self {
        Self::new(&BeatConfig::default())
    }
}

/// Result of one detector update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeatEvent {
    pub kick_hit: bool,
    /// How far bass cleared `baseline + margin`; zero when it did not
    pub strength: f64,
    /// Tempo estimate after this update
    pub bpm: f64,
}

/// Stateless kick detector; all memory lives in [`BeatState`]
#[derive(Debug, Clone, Default)]
pub struct BeatDetector {
    config: BeatConfig,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BeatConfig {
        &self.config
    }

    /// A fresh state using this detector's initial tempo
    pub fn initial_state(&self) -> BeatState {
        BeatState::new(&self.config)
    }

    /// Feed one tick's bass feature observed at `now` (seconds).
    pub fn update(&self, state: &mut BeatState, bass: f64, now: f64) -> BeatEvent {
        let cfg = &self.config;
        let strength = (bass - (state.baseline_ema + cfg.margin)).max(0.0);
        let kick_hit = strength > cfg.threshold;

        // Baseline tracks every tick, including the one that fired
        state.baseline_ema = lerp(bass, state.baseline_ema, cfg.ema_decay);

        if kick_hit {
            if let Some(last) = state.last_beat {
                let interval = now - last;
                if interval > 0.0 {
                    let instant = 60.0 / interval;
                    if (cfg.min_bpm..=cfg.max_bpm).contains(&instant) {
                        state.bpm_estimate = lerp(state.bpm_estimate, instant, cfg.bpm_smoothing)
                            .clamp(cfg.min_bpm, cfg.max_bpm);
                        trace!(instant, bpm = state.bpm_estimate, "tempo updated");
                    } else {
                        trace!(instant, "tempo outlier ignored");
                    }
                }
            }
            state.last_beat = Some(now);
            state.total_beats += 1;
        }

        BeatEvent {
            kick_hit,
            strength: if kick_hit { strength } else { 0.0 },
            bpm: state.bpm_estimate,
        }
    }
}
