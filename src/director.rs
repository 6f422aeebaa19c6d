//! Scene Director
//!
//! A cyclic state machine over the scenes of a [`SceneDeck`]. Each tick the
//! director:
//!
//! 1. sweeps the active scene's automation ranges across its effective
//!    duration,
//! 2. records kicks and activity,
//! 3. checks the three exit conditions (duration, beat count, inactivity) and
//!    advances when any holds.
//!
//! Manual jumps go through the same transition path so the runtime and the
//! parameter snapshot are always rebuilt the same way.

use crate::error::{PulseError, Result};
use crate::math::lerp;
use crate::params::ParameterStore;
use crate::scene::{SceneDeck, SceneDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Global multiplier on every scene's authored duration
    pub time_scale: f64,
    /// Beat length for scenes that leave it at 0
    pub default_length_beats: u32,
    /// Inactivity timeout for scenes that leave it at 0
    pub default_fallback_seconds: f64,
    /// Signal level above which a tick counts as active
    pub activity_threshold: f64,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            time_scale: 0.35,
            default_length_beats: 16,
            default_fallback_seconds: 12.0,
            activity_threshold: 0.01,
        }
    }
}

impl DirectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.time_scale > 0.0 && self.time_scale.is_finite()) {
            return Err(PulseError::InvalidConfig(format!(
                "time scale must be positive, got {}",
                self.time_scale
            )));
        }
        if self.default_length_beats == 0 {
            return Err(PulseError::InvalidConfig(
                "default beat length must be at least 1".to_string(),
            ));
        }
        if !(self.default_fallback_seconds > 0.0) {
            return Err(PulseError::InvalidConfig(format!(
                "default fallback must be positive, got {}",
                self.default_fallback_seconds
            )));
        }
        Ok(())
    }
}

/// Why a scene ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// Effective duration elapsed
    Duration,
    /// Enough kicks counted
    BeatCount,
    /// No activity for the fallback window
    Inactivity,
    /// Requested through the control surface
    Manual,
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransitionReason::Duration => "duration",
            TransitionReason::BeatCount => "beat count",
            TransitionReason::Inactivity => "inactivity",
            TransitionReason::Manual => "manual",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTransition {
    pub from: usize,
    pub to: usize,
    pub reason: TransitionReason,
}

/// Live position within the deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRuntime {
    /// Always a valid deck index
    pub current_index: usize,
    pub scene_start: f64,
    /// Kicks since the scene began; zeroed on every transition
    pub beats_in_scene: u32,
    pub last_activity: f64,
}

impl SceneRuntime {
    pub fn new(now: f64) -> Self {
        Self {
            current_index: 0,
            scene_start: now,
            beats_in_scene: 0,
            last_activity: now,
        }
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.scene_start
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneDirector {
    config: DirectorConfig,
}

impl SceneDirector {
    pub fn new(config: DirectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Scaled duration in seconds, or `None` when the scene has no duration
    pub fn effective_duration(&self, scene: &SceneDefinition) -> Option<f64> {
        (scene.duration_seconds > 0.0).then(|| scene.duration_seconds * self.config.time_scale)
    }

    pub fn length_beats(&self, scene: &SceneDefinition) -> u32 {
        if scene.length_beats > 0 {
            scene.length_beats
        } else {
            self.config.default_length_beats
        }
    }

    pub fn fallback_seconds(&self, scene: &SceneDefinition) -> f64 {
        if scene.fallback_seconds > 0.0 {
            scene.fallback_seconds
        } else {
            self.config.default_fallback_seconds
        }
    }

    /// Whether a tick with this signal level counts as activity
    pub fn is_active(&self, kick_hit: bool, signal_level: f64) -> bool {
        kick_hit || signal_level > self.config.activity_threshold
    }

    /// Record this tick's kick and activity
    pub fn observe(&self, runtime: &mut SceneRuntime, kick_hit: bool, active: bool, now: f64) {
        if kick_hit {
            runtime.beats_in_scene += 1;
        }
        if active {
            runtime.last_activity = now;
        }
    }

    /// First exit condition that holds, checked in a fixed order
    pub fn check(
        &self,
        runtime: &SceneRuntime,
        scene: &SceneDefinition,
        now: f64,
    ) -> Option<TransitionReason> {
        if let Some(duration) = self.effective_duration(scene) {
            if runtime.elapsed(now) >= duration {
                return Some(TransitionReason::Duration);
            }
        }
        if runtime.beats_in_scene >= self.length_beats(scene) {
            return Some(TransitionReason::BeatCount);
        }
        if now - runtime.last_activity > self.fallback_seconds(scene) {
            return Some(TransitionReason::Inactivity);
        }
        None
    }

    /// Move to `target` (wrapped into the deck) or the next scene, restart the
    /// runtime and rebuild the snapshot from the new scene.
    pub fn transition(
        &self,
        runtime: &mut SceneRuntime,
        deck: &SceneDeck,
        params: &mut ParameterStore,
        target: Option<isize>,
        reason: TransitionReason,
        now: f64,
    ) -> SceneTransition {
        let from = runtime.current_index;
        let to = match target {
            Some(index) => deck.wrap_index(index),
            None => (from + 1) % deck.len(),
        };
        *runtime = SceneRuntime {
            current_index: to,
            scene_start: now,
            beats_in_scene: 0,
            last_activity: now,
        };
        let scene = deck.get(to);
        params.apply(&scene.parameter_set);
        info!(from, to, scene = %scene.name, %reason, "scene change");
        SceneTransition { from, to, reason }
    }

    /// Write interpolated values for every automated key of the active scene
    pub fn automate(
        &self,
        runtime: &SceneRuntime,
        scene: &SceneDefinition,
        params: &mut ParameterStore,
        now: f64,
    ) {
        if scene.automation_ranges.is_empty() {
            return;
        }
        let Some(duration) = self.effective_duration(scene) else {
            return;
        };
        let t = (runtime.elapsed(now) / duration).clamp(0.0, 1.0);
        for (key, [start, end]) in &scene.automation_ranges {
            if !params.automate(key, lerp(*start, *end, t)) {
                debug!(scene = %scene.name, key = %key, "automation skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::keys;

    fn deck() -> SceneDeck {
        SceneDeck::new(vec![
            SceneDefinition::new("one")
                .with_duration(100.0)
                .with_length_beats(4)
                .with_fallback(5.0)
                .with_param(keys::CHROMA_SENS, 2.0)
                .with_param(keys::STREAK_COUNT, 10.0)
                .with_automation(keys::CHROMA_SENS, 1.0, 3.0)
                .with_automation(keys::STREAK_COUNT, 10.0, 13.0),
            SceneDefinition::new("two").with_param(keys::CHROMA_SENS, 0.5),
            SceneDefinition::new("three"),
        ])
        .unwrap()
    }

    fn unit_scale() -> SceneDirector {
        SceneDirector::new(DirectorConfig {
            time_scale: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_effective_duration_scaled() {
        let director = SceneDirector::default();
        let deck = SceneDeck::builtin();
        let d = director.effective_duration(deck.get(0)).unwrap();
        assert!((d - 63.0).abs() < 1e-9);
        assert_eq!(director.effective_duration(&SceneDefinition::new("x")), None);
    }

    #[test]
    fn test_defaults_for_unset_thresholds() {
        let director = SceneDirector::default();
        let scene = SceneDefinition::new("bare");
        assert_eq!(director.length_beats(&scene), 16);
        assert_eq!(director.fallback_seconds(&scene), 12.0);
    }

    #[test]
    fn test_beat_count_transition() {
        let director = unit_scale();
        let deck = deck();
        let mut runtime = SceneRuntime::new(0.0);
        for beat in 1..=4 {
            let now = beat as f64 * 0.5;
            director.observe(&mut runtime, true, true, now);
            let reason = director.check(&runtime, deck.get(0), now);
            if beat < 4 {
                assert_eq!(reason, None);
            } else {
                assert_eq!(reason, Some(TransitionReason::BeatCount));
            }
        }
    }

    #[test]
    fn test_inactivity_transition() {
        let director = unit_scale();
        let deck = deck();
        let runtime = SceneRuntime::new(0.0);
        assert_eq!(director.check(&runtime, deck.get(0), 5.0), None);
        assert_eq!(
            director.check(&runtime, deck.get(0), 5.01),
            Some(TransitionReason::Inactivity)
        );
        // Unset fallback uses the 12 s default
        assert_eq!(director.check(&runtime, deck.get(1), 11.9), None);
        assert_eq!(
            director.check(&runtime, deck.get(1), 12.1),
            Some(TransitionReason::Inactivity)
        );
    }

    #[test]
    fn test_activity_defers_inactivity() {
        let director = unit_scale();
        let deck = deck();
        let mut runtime = SceneRuntime::new(0.0);
        for i in 1..=40 {
            let now = i as f64 * 0.25;
            let active = director.is_active(false, 0.2);
            director.observe(&mut runtime, false, active, now);
            assert_eq!(director.check(&runtime, deck.get(0), now), None);
        }
        assert!(!director.is_active(false, 0.005));
        assert!(director.is_active(true, 0.0));
    }

    #[test]
    fn test_duration_transition() {
        let director = unit_scale();
        let deck = deck();
        let mut runtime = SceneRuntime::new(0.0);
        runtime.last_activity = 100.0;
        assert_eq!(director.check(&runtime, deck.get(0), 99.9), None);
        assert_eq!(
            director.check(&runtime, deck.get(0), 100.0),
            Some(TransitionReason::Duration)
        );
    }

    #[test]
    fn test_transition_resets_runtime_and_params() {
        let director = unit_scale();
        let deck = deck();
        let mut params = ParameterStore::for_deck(&deck);
        let mut runtime = SceneRuntime::new(0.0);
        params.apply(&deck.get(0).parameter_set);
        runtime.beats_in_scene = 4;

        let change = director.transition(
            &mut runtime,
            &deck,
            &mut params,
            None,
            TransitionReason::BeatCount,
            7.5,
        );
        assert_eq!(
            change,
            SceneTransition {
                from: 0,
                to: 1,
                reason: TransitionReason::BeatCount
            }
        );
        assert_eq!(runtime.beats_in_scene, 0);
        assert_eq!(runtime.scene_start, 7.5);
        assert_eq!(runtime.last_activity, 7.5);
        assert_eq!(params.live().number(keys::CHROMA_SENS), Some(0.5));
        // Scene two leaves streak_count alone
        assert_eq!(params.live().number(keys::STREAK_COUNT), Some(10.0));
    }

    #[test]
    fn test_transition_wraps() {
        let director = unit_scale();
        let deck = deck();
        let mut params = ParameterStore::for_deck(&deck);
        let mut runtime = SceneRuntime::new(0.0);
        runtime.current_index = 2;
        let change = director.transition(
            &mut runtime,
            &deck,
            &mut params,
            None,
            TransitionReason::Duration,
            1.0,
        );
        assert_eq!(change.to, 0);

        let change = director.transition(
            &mut runtime,
            &deck,
            &mut params,
            Some(-1),
            TransitionReason::Manual,
            2.0,
        );
        assert_eq!(change.to, 2);
        let change = director.transition(
            &mut runtime,
            &deck,
            &mut params,
            Some(7),
            TransitionReason::Manual,
            3.0,
        );
        assert_eq!(change.to, 1);
    }

    #[test]
    fn test_automation_midpoint_and_rounding() {
        let director = unit_scale();
        let deck = deck();
        let mut params = ParameterStore::for_deck(&deck);
        let runtime = SceneRuntime::new(0.0);

        director.automate(&runtime, deck.get(0), &mut params, 50.0);
        assert_eq!(params.live().number(keys::CHROMA_SENS), Some((1.0 + 3.0) / 2.0));
        // 11.5 rounds half away from zero
        assert_eq!(params.live().number(keys::STREAK_COUNT), Some(12.0));

        director.automate(&runtime, deck.get(0), &mut params, 40.0);
        assert_eq!(params.live().number(keys::STREAK_COUNT), Some(11.0));

        director.automate(&runtime, deck.get(0), &mut params, 500.0);
        assert_eq!(params.live().number(keys::CHROMA_SENS), Some(3.0));
    }

    #[test]
    fn test_automation_leaves_other_keys() {
        let director = unit_scale();
        let deck = deck();
        let mut params = ParameterStore::for_deck(&deck);
        let before = params.live().number(keys::GLITCH_CHANCE);
        director.automate(&SceneRuntime::new(0.0), deck.get(0), &mut params, 10.0);
        assert_eq!(params.live().number(keys::GLITCH_CHANCE), before);
    }

    #[test]
    fn test_automation_skips_missing_keys() {
        let director = unit_scale();
        let scene = SceneDefinition::new("odd")
            .with_duration(10.0)
            .with_automation("not_declared", 0.0, 1.0)
            .with_automation(keys::WIRE_STYLE, 0.0, 1.0);
        let deck = SceneDeck::new(vec![scene]).unwrap();
        let mut params = ParameterStore::for_deck(&deck);
        let before = params.clone();
        director.automate(&SceneRuntime::new(0.0), deck.get(0), &mut params, 5.0);
        assert_eq!(params, before);
    }
}
