//! Streak Field
//!
//! Radial light streaks sized by the live parameters. The field is rebuilt
//! from scratch whenever a scene is applied; between rebuilds each streak
//! travels outward (or inward) and re-seeds itself once it leaves the frame.
//! Positions are left to the renderer: a streak only carries its direction,
//! progress and look.

use crate::error::{PulseError, Result};
use crate::params::{keys, LiveParameters, Palette, StreakDirection, StreakTheme};
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Trail length range in pixels
    pub length_min: f64,
    pub length_max: f64,
    /// Random factor range applied to `streak_base_width`
    pub width_jitter_min: f64,
    pub width_jitter_max: f64,
    /// Progress at which a streak re-seeds
    pub respawn_at: f64,
    /// Extra speed gained across the trip
    pub acceleration: f64,
    pub base_rate: f64,
    pub reactivity_gain: f64,
    pub kick_gain: f64,
    /// Additional rainbow hue drift per unit reactivity
    pub rainbow_reactivity_drift: f64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            length_min: 40.0,
            length_max: 160.0,
            width_jitter_min: 0.8,
            width_jitter_max: 1.5,
            respawn_at: 1.05,
            acceleration: 1.4,
            base_rate: 0.85,
            reactivity_gain: 0.5,
            kick_gain: 0.8,
            rainbow_reactivity_drift: 2.0,
        }
    }
}

impl StreakConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.length_min >= 0.0 && self.length_min <= self.length_max) {
            return Err(PulseError::InvalidConfig(format!(
                "streak length range {}..{} is invalid",
                self.length_min, self.length_max
            )));
        }
        if !(self.respawn_at > 0.0) {
            return Err(PulseError::InvalidConfig(format!(
                "streak respawn point must be positive, got {}",
                self.respawn_at
            )));
        }
        Ok(())
    }
}

/// The streak-related slice of the live parameters
#[derive(Debug, Clone, PartialEq)]
pub struct StreakParams {
    pub enabled: bool,
    pub count: usize,
    pub speed_min: f64,
    pub speed_max: f64,
    pub base_width: f64,
    pub theme: StreakTheme,
}

impl StreakParams {
    pub fn from_params(live: &LiveParameters) -> Self {
        let count = live.number_or(keys::STREAK_COUNT, 0.0).round().max(0.0) as usize;
        Self {
            enabled: live.flag_or(keys::STREAK_ENABLED, true),
            count,
            speed_min: live.number_or(keys::STREAK_SPEED_MIN, 0.004),
            speed_max: live.number_or(keys::STREAK_SPEED_MAX, 0.010),
            base_width: live.number_or(keys::STREAK_BASE_WIDTH, 2.0),
            theme: live.theme(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    /// Travel direction in radians
    pub angle: f64,
    /// Travels from the edge toward the centre
    pub inward: bool,
    pub speed: f64,
    pub length: f64,
    pub base_width: f64,
    /// Degrees
    pub hue: f64,
    /// 0 at spawn, re-seeds at the configured respawn point
    pub progress: f64,
}

impl Streak {
    pub fn seed(params: &StreakParams, config: &StreakConfig, rng: &mut impl RandomSource) -> Self {
        let theme = &params.theme;
        let angle = rng.range(0.0, TAU);
        let inward = match theme.direction {
            StreakDirection::Out => false,
            StreakDirection::In => true,
            StreakDirection::Both => rng.chance(theme.reverse_prob),
        };
        let speed = rng.range(params.speed_min, params.speed_max);
        let length = rng.range(config.length_min, config.length_max);
        let base_width =
            params.base_width * rng.range(config.width_jitter_min, config.width_jitter_max);
        let hue = match theme.palette {
            Palette::White => 0.0,
            Palette::Blue | Palette::Mono => {
                let range = theme.hue_range();
                theme.hue_base() + rng.range(-range, range)
            }
            Palette::Rainbow => rng.range(0.0, 360.0),
        };
        Self {
            angle,
            inward,
            speed,
            length,
            base_width,
            hue,
            progress: 0.0,
        }
    }

    /// Unit direction vector
    pub fn direction(&self) -> (f64, f64) {
        (libm::cos(self.angle), libm::sin(self.angle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakField {
    streaks: Vec<Streak>,
}

impl StreakField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streaks(&self) -> &[Streak] {
        &self.streaks
    }

    pub fn len(&self) -> usize {
        self.streaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streaks.is_empty()
    }

    pub fn clear(&mut self) {
        self.streaks.clear();
    }

    /// Rebuild to `params.count` fresh streaks, or none when disabled
    pub fn reseed(
        &mut self,
        params: &StreakParams,
        config: &StreakConfig,
        rng: &mut impl RandomSource,
    ) {
        self.streaks.clear();
        if params.enabled {
            self.streaks
                .extend((0..params.count).map(|_| Streak::seed(params, config, &mut *rng)));
        }
        debug!(count = self.streaks.len(), "streaks re-seeded");
    }

    /// Move every streak one tick
    pub fn advance(
        &mut self,
        reactivity: f64,
        kick: f64,
        params: &StreakParams,
        config: &StreakConfig,
        rng: &mut impl RandomSource,
    ) {
        let theme = &params.theme;
        let drive = config.base_rate + reactivity * config.reactivity_gain + kick * config.kick_gain;
        for streak in &mut self.streaks {
            let t = streak.progress.clamp(0.0, 1.0);
            streak.progress += streak.speed * (1.0 + t * config.acceleration) * drive;
            if streak.progress >= config.respawn_at {
                *streak = Streak::seed(params, config, &mut *rng);
                continue;
            }
            match theme.palette {
                Palette::Blue | Palette::Mono => {
                    let base = theme.hue_base();
                    let range = theme.hue_range();
                    let drift = theme.hue_drift;
                    streak.hue = (streak.hue + rng.range(-drift, drift))
                        .clamp(base - range, base + range);
                }
                Palette::Rainbow => {
                    streak.hue +=
                        theme.hue_drift + reactivity * config.rainbow_reactivity_drift;
                    if streak.hue >= 360.0 {
                        streak.hue -= 360.0;
                    }
                }
                Palette::White => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{Rng, ScriptedRng};

    fn params(count: usize, theme: StreakTheme) -> StreakParams {
        StreakParams {
            enabled: true,
            count,
            speed_min: 0.004,
            speed_max: 0.010,
            base_width: 2.0,
            theme,
        }
    }

    #[test]
    fn test_reseed_to_count() {
        let mut field = StreakField::new();
        let mut rng = Rng::from_seed(3);
        field.reseed(&params(96, StreakTheme::default()), &StreakConfig::default(), &mut rng);
        assert_eq!(field.len(), 96);
        field.reseed(&params(36, StreakTheme::default()), &StreakConfig::default(), &mut rng);
        assert_eq!(field.len(), 36);
    }

    #[test]
    fn test_disabled_field_is_empty() {
        let mut field = StreakField::new();
        let mut p = params(20, StreakTheme::default());
        p.enabled = false;
        field.reseed(&p, &StreakConfig::default(), &mut Rng::from_seed(1));
        assert!(field.is_empty());
    }

    #[test]
    fn test_seed_ranges() {
        let cfg = StreakConfig::default();
        let mut rng = Rng::from_seed(11);
        let p = params(1, StreakTheme::default());
        for _ in 0..500 {
            let s = Streak::seed(&p, &cfg, &mut rng);
            assert!((0.004..0.010).contains(&s.speed));
            assert!((40.0..160.0).contains(&s.length));
            assert!((1.6..3.0).contains(&s.base_width));
            assert!((0.0..360.0).contains(&s.hue));
            assert!(!s.inward);
        }
    }

    #[test]
    fn test_direction_modes() {
        let cfg = StreakConfig::default();
        let inward = StreakTheme {
            direction: StreakDirection::In,
            ..Default::default()
        };
        let s = Streak::seed(&params(1, inward), &cfg, &mut ScriptedRng::constant(0.5));
        assert!(s.inward);

        let both = StreakTheme {
            direction: StreakDirection::Both,
            reverse_prob: 0.25,
            ..Default::default()
        };
        // angle draw, then the inward draw
        let s = Streak::seed(&params(1, both.clone()), &cfg, &mut ScriptedRng::new(vec![0.5, 0.1]));
        assert!(s.inward);
        let s = Streak::seed(&params(1, both), &cfg, &mut ScriptedRng::new(vec![0.5, 0.3]));
        assert!(!s.inward);
    }

    #[test]
    fn test_palette_hues() {
        let cfg = StreakConfig::default();
        let mut rng = Rng::from_seed(5);
        let white = StreakTheme {
            palette: Palette::White,
            ..Default::default()
        };
        assert_eq!(Streak::seed(&params(1, white), &cfg, &mut rng).hue, 0.0);

        let blue = StreakTheme {
            palette: Palette::Blue,
            ..Default::default()
        };
        for _ in 0..100 {
            let hue = Streak::seed(&params(1, blue.clone()), &cfg, &mut rng).hue;
            assert!((185.0..=225.0).contains(&hue));
        }
    }

    #[test]
    fn test_advance_respawns() {
        let cfg = StreakConfig::default();
        let p = params(8, StreakTheme::default());
        let mut rng = Rng::from_seed(9);
        let mut field = StreakField::new();
        field.reseed(&p, &cfg, &mut rng);
        let mut max_seen: f64 = 0.0;
        for _ in 0..2000 {
            field.advance(0.5, 0.2, &p, &cfg, &mut rng);
            for s in field.streaks() {
                assert!(s.progress < cfg.respawn_at);
                assert!((0.0..360.0).contains(&s.hue));
                max_seen = max_seen.max(s.progress);
            }
        }
        assert!(max_seen > 0.9);
        assert_eq!(field.len(), 8);
    }

    #[test]
    fn test_mono_hue_stays_in_band() {
        let cfg = StreakConfig::default();
        let theme = StreakTheme {
            palette: Palette::Mono,
            hue_base: Some(34.0),
            hue_range: Some(8.0),
            hue_drift: 3.0,
            ..Default::default()
        };
        let p = params(4, theme);
        let mut rng = Rng::from_seed(21);
        let mut field = StreakField::new();
        field.reseed(&p, &cfg, &mut rng);
        for _ in 0..500 {
            field.advance(1.0, 1.0, &p, &cfg, &mut rng);
            for s in field.streaks() {
                assert!((26.0..=42.0).contains(&s.hue));
            }
        }
    }

    #[test]
    fn test_direction_is_unit() {
        let cfg = StreakConfig::default();
        let mut rng = Rng::from_seed(13);
        let p = params(1, StreakTheme::default());
        for _ in 0..50 {
            let (x, y) = Streak::seed(&p, &cfg, &mut rng).direction();
            assert!((x * x + y * y - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_params_from_live() {
        let live = LiveParameters::baseline();
        let p = StreakParams::from_params(&live);
        assert!(p.enabled);
        assert_eq!(p.count, 20);
        assert_eq!(p.theme.reverse_prob, 0.4);
    }
}
