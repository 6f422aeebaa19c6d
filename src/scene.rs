//! Scene Definitions
//!
//! A scene is an authored bundle: a partial parameter override, linear
//! automation ranges, and the thresholds that end it. A [`SceneDeck`] is the
//! ordered, non-empty cycle the director walks through.

use crate::error::{PulseError, Result};
use crate::params::{
    keys, BlendMode, Flicker, Palette, ParamValue, StreakDirection, StreakTheme,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An authored scene. Immutable once loaded into a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDefinition {
    pub name: String,
    /// Authored length in seconds before the global time scale; 0 disables
    /// both the duration condition and automation
    #[serde(default)]
    pub duration_seconds: f64,
    /// Keys this scene overrides
    #[serde(default)]
    pub parameter_set: BTreeMap<String, ParamValue>,
    /// `key -> [start, end]` swept across the scene's effective duration
    #[serde(default)]
    pub automation_ranges: BTreeMap<String, [f64; 2]>,
    /// Kicks that end the scene; 0 means the director default
    #[serde(default)]
    pub length_beats: u32,
    /// Seconds without activity before a forced advance; 0 means the
    /// director default
    #[serde(default)]
    pub fallback_seconds: f64,
    /// Image paths for the renderer
    #[serde(default)]
    pub asset_refs: Vec<String>,
}

impl SceneDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration_seconds: 0.0,
            parameter_set: BTreeMap::new(),
            automation_ranges: BTreeMap::new(),
            length_beats: 0,
            fallback_seconds: 0.0,
            asset_refs: Vec::new(),
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_length_beats(mut self, beats: u32) -> Self {
        self.length_beats = beats;
        self
    }

    pub fn with_fallback(mut self, seconds: f64) -> Self {
        self.fallback_seconds = seconds;
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.parameter_set.insert(key.to_string(), value.into());
        self
    }

    pub fn with_automation(mut self, key: &str, start: f64, end: f64) -> Self {
        self.automation_ranges.insert(key.to_string(), [start, end]);
        self
    }

    pub fn with_assets<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asset_refs = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| PulseError::InvalidScene {
            scene: self.name.clone(),
            reason,
        };
        if !(self.duration_seconds.is_finite() && self.duration_seconds >= 0.0) {
            return Err(invalid(format!(
                "duration must be finite and non-negative, got {}",
                self.duration_seconds
            )));
        }
        if !(self.fallback_seconds.is_finite() && self.fallback_seconds >= 0.0) {
            return Err(invalid(format!(
                "fallback must be finite and non-negative, got {}",
                self.fallback_seconds
            )));
        }
        for (key, [start, end]) in &self.automation_ranges {
            if !(start.is_finite() && end.is_finite()) {
                return Err(invalid(format!("automation range for '{}' is not finite", key)));
            }
        }
        Ok(())
    }
}

/// Ordered, validated, non-empty list of scenes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SceneDefinition>", into = "Vec<SceneDefinition>")]
pub struct SceneDeck {
    scenes: Vec<SceneDefinition>,
}

impl SceneDeck {
    pub fn new(scenes: Vec<SceneDefinition>) -> Result<Self> {
        if scenes.is_empty() {
            return Err(PulseError::EmptyDeck);
        }
        for scene in &scenes {
            scene.validate()?;
        }
        Ok(Self { scenes })
    }

    pub fn scenes(&self) -> &[SceneDefinition] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always `false`; decks are validated non-empty
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Map any signed index onto the deck, wrapping in both directions
    pub fn wrap_index(&self, index: isize) -> usize {
        index.rem_euclid(self.scenes.len() as isize) as usize
    }

    /// Scene at `index` modulo the deck length
    pub fn get(&self, index: usize) -> &SceneDefinition {
        &self.scenes[index % self.scenes.len()]
    }

    /// Strict lookup
    pub fn scene(&self, index: usize) -> Result<&SceneDefinition> {
        self.scenes
            .get(index)
            .ok_or(PulseError::SceneIndexOutOfRange {
                index,
                len: self.scenes.len(),
            })
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a deck
    pub fn from_json(json: &str) -> Result<Self> {
        let scenes: Vec<SceneDefinition> = serde_json::from_str(json)?;
        Self::new(scenes)
    }

    /// The four scenes shipped with the crate
    pub fn builtin() -> Self {
        Self {
            scenes: vec![
                neon_tunnel(),
                kalei_cathedral(),
                glitch_storm(),
                warm_drift(),
            ],
        }
    }
}

impl Default for SceneDeck {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<SceneDefinition>> for SceneDeck {
    type Error = PulseError;

    fn try_from(scenes: Vec<SceneDefinition>) -> Result<Self> {
        Self::new(scenes)
    }
}

impl From<SceneDeck> for Vec<SceneDefinition> {
    fn from(deck: SceneDeck) -> Self {
        deck.scenes
    }
}

// =============================================================================
// Built-in Scenes
// =============================================================================

fn neon_tunnel() -> SceneDefinition {
    SceneDefinition::new("Neon Tunnel Marathon")
        .with_duration(180.0)
        .with_length_beats(16)
        .with_fallback(20.0)
        .with_assets(["assets/paul.png", "assets/paola.png", "assets/justi.png"])
        .with_param(keys::REACTIVITY_MUL, 0.75)
        .with_param(keys::SPRITE_SCALE, 0.72)
        .with_param(keys::EDGE_BOOST_MULT, 1.8)
        .with_param(keys::EDGE_BOOST_POW, 1.1)
        .with_param(keys::STREAK_ENABLED, true)
        .with_param(keys::STREAK_COUNT, 96.0)
        .with_param(keys::STREAK_SPEED_MIN, 0.006)
        .with_param(keys::STREAK_SPEED_MAX, 0.012)
        .with_param(keys::STREAK_BASE_WIDTH, 2.0)
        .with_param(keys::STREAK_EDGE_WIDTH_MULT, 7.0)
        .with_param(keys::WIRE_ENABLED, true)
        .with_param(keys::WIRE_STYLE, "WHITE_DIM")
        .with_param(keys::WIRE_SPOKES, 18.0)
        .with_param(keys::WIRE_CIRCLES, 22.0)
        .with_param(keys::WIRE_ROT_SPEED, 0.10)
        .with_param(keys::WIRE_SCROLL_SPEED, 0.10)
        .with_param(keys::WIRE_DASHED, false)
        .with_param(keys::WIRE_THICKNESS, 1.3)
        .with_param(
            keys::STREAK_THEME,
            StreakTheme {
                palette: Palette::Rainbow,
                hue_drift: 1.2,
                sat: 95.0,
                alpha_base: 0.20,
                alpha_edge_boost: 0.40,
                direction: StreakDirection::Both,
                reverse_prob: 0.25,
                ..Default::default()
            },
        )
        .with_param(keys::STROBE_PROBABILITY, 0.05)
        .with_param(keys::CHROMA_SENS, 2.4)
        .with_param(keys::FEEDBACK_STRENGTH, 0.02)
        .with_param(keys::KALEI_SEGMENTS, 0.0)
        .with_param(keys::GLITCH_CHANCE, 0.03)
        .with_param(keys::CAM_SHAKE_MUL, 0.8)
        .with_param(keys::CAM_ZOOM_MUL, 0.9)
        .with_automation(keys::STROBE_PROBABILITY, 0.03, 0.12)
        .with_automation(keys::CHROMA_SENS, 1.8, 3.2)
        .with_automation(keys::FEEDBACK_STRENGTH, 0.00, 0.06)
}

fn kalei_cathedral() -> SceneDefinition {
    SceneDefinition::new("Kalei Cathedral (Blue Drift)")
        .with_duration(240.0)
        .with_length_beats(16)
        .with_fallback(20.0)
        .with_assets(["assets/paola.png", "assets/justi.png", "assets/paul.png"])
        .with_param(keys::REACTIVITY_MUL, 0.80)
        .with_param(keys::SPRITE_SCALE, 0.65)
        .with_param(keys::EDGE_BOOST_MULT, 0.8)
        .with_param(keys::EDGE_BOOST_POW, 1.6)
        .with_param(keys::STREAK_ENABLED, true)
        .with_param(keys::STREAK_COUNT, 36.0)
        .with_param(keys::STREAK_SPEED_MIN, 0.004)
        .with_param(keys::STREAK_SPEED_MAX, 0.008)
        .with_param(keys::STREAK_EDGE_WIDTH_MULT, 3.0)
        .with_param(keys::WIRE_ENABLED, true)
        .with_param(keys::WIRE_STYLE, "BLUE_ONLY")
        .with_param(keys::WIRE_SPOKES, 14.0)
        .with_param(keys::WIRE_CIRCLES, 20.0)
        .with_param(keys::WIRE_ROT_SPEED, -0.22)
        .with_param(keys::WIRE_SCROLL_SPEED, -0.18)
        .with_param(keys::WIRE_DASHED, true)
        .with_param(keys::WIRE_THICKNESS, 1.6)
        .with_param(
            keys::STREAK_THEME,
            StreakTheme {
                palette: Palette::Blue,
                hue_base: Some(205.0),
                hue_range: Some(20.0),
                hue_drift: 0.25,
                sat: 80.0,
                alpha_base: 0.14,
                alpha_edge_boost: 0.25,
                flicker: Flicker {
                    enabled: true,
                    prob: 0.02,
                    min_mul: 0.35,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .with_param(keys::KALEI_SEGMENTS, 10.0)
        .with_param(keys::FEEDBACK_STRENGTH, 0.10)
        .with_param(keys::CHROMA_SENS, 1.4)
        .with_param(keys::STROBE_PROBABILITY, 0.02)
        .with_param(keys::GLITCH_CHANCE, 0.02)
        .with_param(keys::CAM_SHAKE_MUL, 0.5)
        .with_param(keys::CAM_ZOOM_MUL, 0.7)
        .with_automation(keys::FEEDBACK_STRENGTH, 0.06, 0.14)
        .with_automation(keys::CHROMA_SENS, 1.0, 2.2)
}

fn glitch_storm() -> SceneDefinition {
    SceneDefinition::new("Glitch Storm (Strobe Lines)")
        .with_duration(150.0)
        .with_length_beats(8)
        .with_fallback(16.0)
        .with_assets(["assets/justi.png", "assets/paul.png"])
        .with_param(keys::REACTIVITY_MUL, 0.9)
        .with_param(keys::SPRITE_SCALE, 0.78)
        .with_param(keys::EDGE_BOOST_MULT, 1.2)
        .with_param(keys::EDGE_BOOST_POW, 1.2)
        .with_param(keys::STREAK_ENABLED, true)
        .with_param(keys::STREAK_COUNT, 64.0)
        .with_param(keys::STREAK_SPEED_MIN, 0.007)
        .with_param(keys::STREAK_SPEED_MAX, 0.013)
        .with_param(keys::STREAK_EDGE_WIDTH_MULT, 6.0)
        .with_param(keys::WIRE_ENABLED, true)
        .with_param(keys::WIRE_STYLE, "STROBE")
        .with_param(keys::WIRE_SPOKES, 9.0)
        .with_param(keys::WIRE_CIRCLES, 12.0)
        .with_param(keys::WIRE_ROT_SPEED, 0.0)
        .with_param(keys::WIRE_SCROLL_SPEED, 0.28)
        .with_param(keys::WIRE_DASHED, false)
        .with_param(keys::WIRE_THICKNESS, 2.4)
        .with_param(
            keys::STREAK_THEME,
            StreakTheme {
                palette: Palette::White,
                hue_drift: 0.0,
                sat: 0.0,
                alpha_base: 0.10,
                alpha_edge_boost: 0.50,
                flicker: Flicker {
                    enabled: true,
                    prob: 0.0,
                    link_strobe: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .with_param(keys::STROBE_PROBABILITY, 0.20)
        .with_param(keys::CHROMA_SENS, 3.6)
        .with_param(keys::FEEDBACK_STRENGTH, 0.00)
        .with_param(keys::KALEI_SEGMENTS, 0.0)
        .with_param(keys::GLITCH_CHANCE, 0.18)
        .with_param(keys::CAM_SHAKE_MUL, 1.4)
        .with_param(keys::CAM_ZOOM_MUL, 1.2)
        .with_automation(keys::GLITCH_CHANCE, 0.06, 0.25)
        .with_automation(keys::STROBE_PROBABILITY, 0.08, 0.45)
        .with_automation(keys::CHROMA_SENS, 2.8, 4.2)
}

fn warm_drift() -> SceneDefinition {
    SceneDefinition::new("Warm Drift (Inward Flow)")
        .with_duration(210.0)
        .with_length_beats(24)
        .with_fallback(20.0)
        .with_assets(["assets/paul.png", "assets/paola.png"])
        .with_param(keys::REACTIVITY_MUL, 0.70)
        .with_param(keys::SPRITE_SCALE, 0.62)
        .with_param(keys::EDGE_BOOST_MULT, 0.9)
        .with_param(keys::EDGE_BOOST_POW, 1.8)
        .with_param(keys::STREAK_ENABLED, true)
        .with_param(keys::STREAK_COUNT, 28.0)
        .with_param(keys::STREAK_SPEED_MIN, 0.004)
        .with_param(keys::STREAK_SPEED_MAX, 0.009)
        .with_param(keys::STREAK_EDGE_WIDTH_MULT, 4.0)
        .with_param(keys::WIRE_ENABLED, true)
        .with_param(keys::WIRE_STYLE, "NEON_RAINBOW")
        .with_param(keys::WIRE_SPOKES, 22.0)
        .with_param(keys::WIRE_CIRCLES, 24.0)
        .with_param(keys::WIRE_ROT_SPEED, 0.35)
        .with_param(keys::WIRE_SCROLL_SPEED, 0.32)
        .with_param(keys::WIRE_DASHED, false)
        .with_param(keys::WIRE_THICKNESS, 1.4)
        .with_param(
            keys::STREAK_THEME,
            StreakTheme {
                palette: Palette::Mono,
                hue_base: Some(34.0),
                hue_range: Some(8.0),
                hue_drift: 0.2,
                sat: 85.0,
                alpha_base: 0.16,
                alpha_edge_boost: 0.30,
                blend: BlendMode::Add,
                flicker: Flicker {
                    enabled: true,
                    prob: 0.04,
                    min_mul: 0.4,
                    ..Default::default()
                },
                direction: StreakDirection::In,
                ..Default::default()
            },
        )
        .with_param(keys::STROBE_PROBABILITY, 0.03)
        .with_param(keys::CHROMA_SENS, 1.8)
        .with_param(keys::FEEDBACK_STRENGTH, 0.08)
        .with_param(keys::KALEI_SEGMENTS, 6.0)
        .with_param(keys::GLITCH_CHANCE, 0.01)
        .with_param(keys::CAM_SHAKE_MUL, 0.4)
        .with_param(keys::CAM_ZOOM_MUL, 0.8)
        .with_automation(keys::SPRITE_SCALE, 0.56, 0.80)
        .with_automation(keys::FEEDBACK_STRENGTH, 0.04, 0.12)
        .with_automation(keys::CHROMA_SENS, 1.4, 2.6)
}
