//! Glitch and kaleidoscope triggers.
//!
//! Loud treble occasionally arms a short run of glitch frames. Kicks
//! occasionally slam the kaleidoscope mix to full, after which it fades.

use crate::error::{PulseError, Result};
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    /// Treble level that must be exceeded before a glitch can arm
    pub treble_gate: f64,
    /// Frames armed per trigger
    pub frames: u32,
    /// Chance a kick re-opens the kaleidoscope
    pub kalei_kick_chance: f64,
    pub kalei_decay: f64,
    /// Mix below which the kaleidoscope is not drawn
    pub kalei_floor: f64,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            treble_gate: 0.6,
            frames: 2,
            kalei_kick_chance: 0.08,
            kalei_decay: 0.94,
            kalei_floor: 0.02,
        }
    }
}

impl GlitchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.kalei_decay) {
            return Err(PulseError::InvalidConfig(format!(
                "kaleidoscope decay must be in [0, 1], got {}",
                self.kalei_decay
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlitchState {
    pub frames_left: u32,
    /// Kaleidoscope blend in `[0, 1]`
    pub kalei_mix: f64,
}

impl GlitchState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlitchScheduler {
    config: GlitchConfig,
}

impl GlitchScheduler {
    pub fn new(config: GlitchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GlitchConfig {
        &self.config
    }

    /// Maybe open the kaleidoscope on a kick. Draws only when the scene has
    /// segments.
    pub fn on_kick(
        &self,
        state: &mut GlitchState,
        kick_hit: bool,
        kalei_segments: f64,
        rng: &mut impl RandomSource,
    ) {
        if kick_hit && kalei_segments > 0.0 && rng.chance(self.config.kalei_kick_chance) {
            state.kalei_mix = 1.0;
        }
    }

    /// Arm, spend and decay. Returns whether this tick is a glitch frame.
    pub fn tick(
        &self,
        state: &mut GlitchState,
        treble: f64,
        glitch_chance: f64,
        rng: &mut impl RandomSource,
    ) -> bool {
        if treble > self.config.treble_gate && rng.chance(glitch_chance) {
            state.frames_left = self.config.frames;
        }
        let glitching = state.frames_left > 0;
        if glitching {
            state.frames_left -= 1;
        }
        state.kalei_mix *= self.config.kalei_decay;
        glitching
    }

    pub fn kaleidoscope_visible(&self, state: &GlitchState, kalei_segments: f64) -> bool {
        kalei_segments > 0.0 && state.kalei_mix > self.config.kalei_floor
    }
}
