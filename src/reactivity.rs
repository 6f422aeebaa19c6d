//! Reactivity Smoothing
//!
//! Fuses the band features and kick events into the scalars the renderer maps
//! onto motion and light: a one-pole smoothed reactivity level, peak-held
//! pulses that jump on triggers and decay geometrically, and bounded camera
//! shake/zoom.

use crate::beat::BeatEvent;
use crate::error::{PulseError, Result};
use crate::math::{lerp, shape};
use crate::params::{keys, LiveParameters};
use crate::spectrum::FeatureSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactivityConfig {
    /// Gain on the overall level before it saturates at 1
    pub level_gain: f64,
    pub level_exponent: f64,
    pub level_weight: f64,
    /// Exponent above 1 so strong bass dominates
    pub bass_exponent: f64,
    pub bass_weight: f64,
    /// Share of the kick pulse fed back into the raw value
    pub kick_feed: f64,
    /// Blend toward the raw value per tick
    pub smoothing: f64,
    pub max_reactivity: f64,

    pub kick_impulse_gain: f64,
    pub flash_impulse_gain: f64,
    pub kick_decay: f64,
    pub flash_decay: f64,

    pub chroma_exponent: f64,
    /// Multiplier applied to the chroma pulse on a kick
    pub chroma_kick_cut: f64,
    pub chroma_decay: f64,
    pub chroma_lag: f64,

    pub shake_gain: f64,
    pub shake_max: f64,
    pub shake_decay: f64,
    pub zoom_gain: f64,
    pub zoom_floor: f64,
    pub zoom_max: f64,
    pub zoom_decay: f64,
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        Self {
            level_gain: 6.0,
            level_exponent: 0.7,
            level_weight: 0.8,
            bass_exponent: 1.4,
            bass_weight: 1.3,
            kick_feed: 0.6,
            smoothing: 0.14,
            max_reactivity: 4.0,
            kick_impulse_gain: 4.0,
            flash_impulse_gain: 3.0,
            kick_decay: 0.88,
            flash_decay: 0.90,
            chroma_exponent: 1.8,
            chroma_kick_cut: 0.25,
            chroma_decay: 0.88,
            chroma_lag: 0.12,
            shake_gain: 12.0,
            shake_max: 18.0,
            shake_decay: 0.86,
            zoom_gain: 0.015,
            zoom_floor: 0.6,
            zoom_max: 0.08,
            zoom_decay: 0.90,
        }
    }
}

impl ReactivityConfig {
    pub fn validate(&self) -> Result<()> {
        let factors = [
            ("smoothing", self.smoothing),
            ("kick_decay", self.kick_decay),
            ("flash_decay", self.flash_decay),
            ("chroma_decay", self.chroma_decay),
            ("chroma_lag", self.chroma_lag),
            ("chroma_kick_cut", self.chroma_kick_cut),
            ("shake_decay", self.shake_decay),
            ("zoom_decay", self.zoom_decay),
        ];
        for (name, value) in factors {
            if !(0.0..=1.0).contains(&value) {
                return Err(PulseError::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(self.max_reactivity > 0.0) {
            return Err(PulseError::InvalidConfig(
                "max_reactivity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-tick multipliers taken from the live parameters and user sensitivity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactivityGains {
    pub sensitivity: f64,
    pub reactivity_mul: f64,
    pub chroma_sens: f64,
    pub cam_shake_mul: f64,
    pub cam_zoom_mul: f64,
}

impl ReactivityGains {
    pub fn from_params(live: &LiveParameters, sensitivity: f64) -> Self {
        Self {
            sensitivity,
            reactivity_mul: live.number_or(keys::REACTIVITY_MUL, 1.0),
            chroma_sens: live.number_or(keys::CHROMA_SENS, 0.0),
            cam_shake_mul: live.number_or(keys::CAM_SHAKE_MUL, 1.0),
            cam_zoom_mul: live.number_or(keys::CAM_ZOOM_MUL, 1.0),
        }
    }
}

impl Default for ReactivityGains {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            reactivity_mul: 1.0,
            chroma_sens: 1.0,
            cam_shake_mul: 1.0,
            cam_zoom_mul: 1.0,
        }
    }
}

/// Decaying visual drive scalars.
///
/// Ranges: `reactivity` in `[0, max_reactivity]`, the pulses and chroma in
/// `[0, 1]`, `cam_shake` in `[0, shake_max]`, `cam_zoom` in `[0, zoom_max]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactivityState {
    pub reactivity: f64,
    pub kick_pulse: f64,
    pub flash_pulse: f64,
    pub chroma_pulse: f64,
    pub chroma_smooth: f64,
    /// Written by the strobe scheduler
    pub strobe_pulse: f64,
    pub cam_shake: f64,
    pub cam_zoom: f64,
}

impl ReactivityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReactivitySmoother {
    config: ReactivityConfig,
}

impl ReactivitySmoother {
    pub fn new(config: ReactivityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReactivityConfig {
        &self.config
    }

    /// Advance every channel by one tick
    pub fn update(
        &self,
        state: &mut ReactivityState,
        features: &FeatureSet,
        beat: &BeatEvent,
        gains: &ReactivityGains,
    ) {
        let cfg = &self.config;

        if beat.kick_hit {
            let kick = (beat.strength * cfg.kick_impulse_gain).clamp(0.0, 1.0);
            let flash = (beat.strength * cfg.flash_impulse_gain).clamp(0.0, 1.0);
            state.kick_pulse = state.kick_pulse.max(kick);
            state.flash_pulse = state.flash_pulse.max(flash);
            state.cam_shake = (state.cam_shake
                + cfg.shake_gain * state.kick_pulse * gains.cam_shake_mul)
                .clamp(0.0, cfg.shake_max);
            state.cam_zoom = (state.cam_zoom
                + cfg.zoom_gain * (cfg.zoom_floor + state.kick_pulse) * gains.cam_zoom_mul)
                .clamp(0.0, cfg.zoom_max);
        } else {
            state.kick_pulse *= cfg.kick_decay;
            state.flash_pulse *= cfg.flash_decay;
        }

        // Treble drives chroma, a kick knocks it back
        let driven = shape(features.treble, cfg.chroma_exponent) * gains.chroma_sens;
        let mut chroma = state.chroma_pulse.max(driven);
        if beat.kick_hit {
            chroma *= cfg.chroma_kick_cut;
        }
        state.chroma_pulse = (chroma * cfg.chroma_decay).clamp(0.0, 1.0);
        state.chroma_smooth =
            lerp(state.chroma_smooth, state.chroma_pulse, cfg.chroma_lag).clamp(0.0, 1.0);

        let level = (features.level * cfg.level_gain).min(1.0);
        let raw = shape(level, cfg.level_exponent) * cfg.level_weight
            + shape(features.bass, cfg.bass_exponent) * cfg.bass_weight;
        let target =
            (raw + state.kick_pulse * cfg.kick_feed) * gains.sensitivity * gains.reactivity_mul;
        state.reactivity =
            lerp(state.reactivity, target, cfg.smoothing).clamp(0.0, cfg.max_reactivity);

        state.cam_shake *= cfg.shake_decay;
        state.cam_zoom *= cfg.zoom_decay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kick(strength: f64) -> BeatEvent {
        BeatEvent {
            kick_hit: true,
            strength,
            bpm: 130.0,
        }
    }

    #[test]
    fn test_kick_pulse_decays_geometrically() {
        let smoother = ReactivitySmoother::default();
        let mut state = ReactivityState {
            kick_pulse: 1.0,
            ..Default::default()
        };
        for _ in 0..5 {
            smoother.update(
                &mut state,
                &FeatureSet::SILENT,
                &BeatEvent::default(),
                &ReactivityGains::default(),
            );
        }
        assert_relative_eq!(state.kick_pulse, 0.88f64.powi(5), epsilon = 1e-12);
        assert_relative_eq!(state.kick_pulse, 0.528, epsilon = 1e-3);
    }

    #[test]
    fn test_pulses_never_increase_without_trigger() {
        let smoother = ReactivitySmoother::default();
        let mut state = ReactivityState {
            kick_pulse: 0.8,
            flash_pulse: 0.6,
            ..Default::default()
        };
        let mut prev = state.clone();
        for _ in 0..30 {
            smoother.update(
                &mut state,
                &FeatureSet::SILENT,
                &BeatEvent::default(),
                &ReactivityGains::default(),
            );
            assert!(state.kick_pulse <= prev.kick_pulse);
            assert!(state.flash_pulse <= prev.flash_pulse);
            assert_relative_eq!(state.flash_pulse, prev.flash_pulse * 0.9, epsilon = 1e-12);
            prev = state.clone();
        }
    }

    #[test]
    fn test_kick_raises_pulses_to_max() {
        let smoother = ReactivitySmoother::default();
        let mut state = ReactivityState {
            kick_pulse: 0.9,
            ..Default::default()
        };
        // 0.1 * 4 = 0.4 is below the held value
        smoother.update(
            &mut state,
            &FeatureSet::SILENT,
            &kick(0.1),
            &ReactivityGains::default(),
        );
        assert_eq!(state.kick_pulse, 0.9);
        assert_relative_eq!(state.flash_pulse, 0.3, epsilon = 1e-12);

        smoother.update(
            &mut state,
            &FeatureSet::SILENT,
            &kick(0.5),
            &ReactivityGains::default(),
        );
        assert_eq!(state.kick_pulse, 1.0);
        assert_eq!(state.flash_pulse, 1.0);
    }

    #[test]
    fn test_reactivity_is_one_pole() {
        let smoother = ReactivitySmoother::default();
        let mut state = ReactivityState::new();
        let features = FeatureSet {
            level: 1.0,
            bass: 1.0,
            mid: 0.0,
            treble: 0.0,
        };
        let gains = ReactivityGains::default();
        smoother.update(&mut state, &features, &BeatEvent::default(), &gains);
        // raw = 0.8 + 1.3
        assert_relative_eq!(state.reactivity, 2.1 * 0.14, epsilon = 1e-12);
        for _ in 0..500 {
            smoother.update(&mut state, &features, &BeatEvent::default(), &gains);
        }
        assert_relative_eq!(state.reactivity, 2.1, epsilon = 1e-9);
    }

    #[test]
    fn test_reactivity_clamped() {
        let smoother = ReactivitySmoother::default();
        let mut state = ReactivityState::new();
        let features = FeatureSet {
            level: 1.0,
            bass: 1.0,
            mid: 1.0,
            treble: 1.0,
        };
        let gains = ReactivityGains {
            sensitivity: 3.0,
            reactivity_mul: 2.0,
            ..Default::default()
        };
        for _ in 0..500 {
            smoother.update(&mut state, &features, &kick(1.0), &gains);
            assert!(state.reactivity <= 4.0);
            assert!((0.0..=1.0).contains(&state.chroma_pulse));
            assert!(state.cam_shake <= 18.0);
            assert!(state.cam_zoom <= 0.08);
        }
    }

    #[test]
    fn test_kick_suppresses_chroma() {
        let smoother = ReactivitySmoother::default();
        let treble = FeatureSet {
            treble: 1.0,
            ..FeatureSet::SILENT
        };
        let gains = ReactivityGains {
            chroma_sens: 1.0,
            ..Default::default()
        };

        let mut quiet = ReactivityState::new();
        smoother.update(&mut quiet, &treble, &BeatEvent::default(), &gains);
        assert_relative_eq!(quiet.chroma_pulse, 0.88, epsilon = 1e-12);
        assert_relative_eq!(quiet.chroma_smooth, 0.88 * 0.12, epsilon = 1e-12);

        let mut kicked = ReactivityState::new();
        smoother.update(&mut kicked, &treble, &kick(0.2), &gains);
        assert_relative_eq!(kicked.chroma_pulse, 0.25 * 0.88, epsilon = 1e-12);
    }

    #[test]
    fn test_camera_accumulates_on_kick() {
        let smoother = ReactivitySmoother::default();
        let mut state = ReactivityState::new();
        smoother.update(
            &mut state,
            &FeatureSet::SILENT,
            &kick(0.25),
            &ReactivityGains::default(),
        );
        // kick pulse 1.0: shake 12 then decays, zoom min(0.024, 0.08) then decays
        assert_relative_eq!(state.cam_shake, 12.0 * 0.86, epsilon = 1e-12);
        assert_relative_eq!(state.cam_zoom, 0.015 * 1.6 * 0.90, epsilon = 1e-12);
    }

    #[test]
    fn test_gains_from_params() {
        let live = LiveParameters::baseline();
        let gains = ReactivityGains::from_params(&live, 1.5);
        assert_eq!(gains.sensitivity, 1.5);
        assert_eq!(gains.reactivity_mul, 0.85);
        assert_eq!(gains.chroma_sens, 4.0);
    }
}
