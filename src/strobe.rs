//! Strobe Scheduling
//!
//! Two independent flash generators:
//!
//! - [`StrobeScheduler`]: single full-frame strobes, rate-limited by a minimum
//!   interval and gated on strong signal.
//! - [`BurstScheduler`]: short trains of rapid flashes at 6-12 Hz, each
//!   followed by a randomized cooldown that lengthens as the audio gets
//!   quieter.
//!
//! Both decay their pulse before deciding whether to fire, so a pulse reads
//! exactly 1.0 on the tick it fires.

use crate::error::{PulseError, Result};
use crate::math::lerp;
use crate::reactivity::ReactivityState;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

// =============================================================================
// Main Strobe
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrobeConfig {
    /// Seconds that must pass between strobes
    pub min_interval: f64,
    /// Reactivity above which the signal counts as strong
    pub reactivity_gate: f64,
    /// Kick pulse above which the signal counts as strong
    pub kick_gate: f64,
    pub base_probability: f64,
    pub reactivity_weight: f64,
    /// Weight of the scene's `strobe_probability`
    pub param_weight: f64,
    pub decay: f64,
}

impl Default for StrobeConfig {
    fn default() -> Self {
        Self {
            min_interval: 0.8,
            reactivity_gate: 0.18,
            kick_gate: 0.12,
            base_probability: 0.02,
            reactivity_weight: 0.35,
            param_weight: 0.9,
            decay: 0.82,
        }
    }
}

impl StrobeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_interval >= 0.0) {
            return Err(PulseError::InvalidConfig(format!(
                "strobe interval must be non-negative, got {}",
                self.min_interval
            )));
        }
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(PulseError::InvalidConfig(format!(
                "strobe decay must be in [0, 1], got {}",
                self.decay
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrobeState {
    pub last_strobe: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct StrobeScheduler {
    config: StrobeConfig,
}

impl StrobeScheduler {
    pub fn new(config: StrobeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrobeConfig {
        &self.config
    }

    /// Firing probability for a clamped reactivity `r`
    pub fn probability(&self, r: f64, strobe_probability: f64) -> f64 {
        let cfg = &self.config;
        cfg.base_probability
            + r * (cfg.reactivity_weight + strobe_probability * cfg.param_weight)
    }

    /// Decay `signals.strobe_pulse` and maybe fire. Draws from `rng` only when
    /// eligible and strong.
    pub fn tick(
        &self,
        state: &mut StrobeState,
        signals: &mut ReactivityState,
        strobe_probability: f64,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> bool {
        let cfg = &self.config;
        signals.strobe_pulse *= cfg.decay;

        let eligible = state
            .last_strobe
            .map_or(true, |last| now - last > cfg.min_interval);
        if !eligible {
            return false;
        }

        let r = signals.reactivity.clamp(0.0, 1.0);
        let strong = r > cfg.reactivity_gate || signals.kick_pulse > cfg.kick_gate;
        if !strong {
            return false;
        }

        if rng.chance(self.probability(r, strobe_probability)) {
            signals.strobe_pulse = 1.0;
            state.last_strobe = Some(now);
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Burst Strobe
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Below this reactivity no burst starts
    pub quiet_gate: f64,
    pub base_probability: f64,
    pub reactivity_weight: f64,
    pub param_weight: f64,
    /// Chance a burst is a single flash
    pub single_probability: f64,
    /// Inclusive flash-count range for multi-flash bursts
    pub min_count: u32,
    pub max_count: u32,
    pub min_hz: f64,
    pub max_hz: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
    /// Fixed part of the post-burst cooldown, seconds
    pub cooldown_base: f64,
    /// Random part, scaled by `1 - reactivity`
    pub cooldown_min: f64,
    pub cooldown_max: f64,
    pub decay: f64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            quiet_gate: 0.06,
            base_probability: 0.015,
            reactivity_weight: 0.22,
            param_weight: 0.8,
            single_probability: 0.4,
            min_count: 3,
            max_count: 6,
            min_hz: 6.0,
            max_hz: 12.0,
            jitter_min: 0.85,
            jitter_max: 1.15,
            cooldown_base: 0.25,
            cooldown_min: 0.4,
            cooldown_max: 1.4,
            decay: 0.1,
        }
    }
}

impl BurstConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_count == 0 || self.min_count > self.max_count {
            return Err(PulseError::InvalidConfig(format!(
                "burst count range {}..={} is invalid",
                self.min_count, self.max_count
            )));
        }
        if !(self.min_hz > 0.0 && self.min_hz <= self.max_hz) {
            return Err(PulseError::InvalidConfig(format!(
                "burst rate range {}..{} Hz is invalid",
                self.min_hz, self.max_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(PulseError::InvalidConfig(format!(
                "burst decay must be in [0, 1], got {}",
                self.decay
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurstState {
    pub active: bool,
    /// Flashes left in the running burst
    pub remaining: u32,
    pub hz: f64,
    pub next_flash_at: f64,
    pub cooldown_until: f64,
    /// Decaying flash intensity
    pub flash: f64,
}

impl BurstState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct BurstScheduler {
    config: BurstConfig,
}

impl BurstScheduler {
    pub fn new(config: BurstConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BurstConfig {
        &self.config
    }

    /// Advance the burst machine. Returns `true` on ticks that flash.
    pub fn tick(
        &self,
        state: &mut BurstState,
        reactivity: f64,
        strobe_probability: f64,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> bool {
        let cfg = &self.config;
        let r = reactivity.clamp(0.0, 1.0);
        state.flash *= cfg.decay;

        if !state.active && now >= state.cooldown_until && r >= cfg.quiet_gate {
            let start = cfg.base_probability
                + r * (cfg.reactivity_weight + strobe_probability * cfg.param_weight);
            if rng.chance(start) {
                state.active = true;
                state.remaining = if rng.chance(cfg.single_probability) {
                    1
                } else {
                    rng.range_usize(cfg.min_count as usize, cfg.max_count as usize + 1) as u32
                };
                state.hz = lerp(cfg.min_hz, cfg.max_hz, r);
                state.next_flash_at = now;
            }
        }

        if !(state.active && now >= state.next_flash_at) {
            return false;
        }

        state.flash = 1.0;
        state.remaining = state.remaining.saturating_sub(1);
        state.next_flash_at = now + rng.range(cfg.jitter_min, cfg.jitter_max) / state.hz;
        if state.remaining == 0 {
            state.active = false;
            state.cooldown_until = now
                + cfg.cooldown_base
                + (1.0 - r) * rng.range(cfg.cooldown_min, cfg.cooldown_max);
        }
        true
    }
}
