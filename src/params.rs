//! Live Parameters
//!
//! The renderer reads one flat key/value snapshot per tick. Scenes only name
//! the keys they change, so every scene switch is a partial override of the
//! previous snapshot via [`merge`], and the key set is fixed once at
//! initialization: nothing is ever added or dropped afterwards.

use crate::scene::SceneDeck;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Standard parameter keys
pub mod keys {
    pub const STROBE_PROBABILITY: &str = "strobe_probability";
    pub const CHROMA_SENS: &str = "chroma_sens";
    pub const FEEDBACK_STRENGTH: &str = "feedback_strength";
    pub const KALEI_SEGMENTS: &str = "kalei_segments";
    pub const GLITCH_CHANCE: &str = "glitch_chance";
    pub const SPRITE_SCALE: &str = "sprite_scale";
    pub const REACTIVITY_MUL: &str = "reactivity_mul";
    pub const CAM_SHAKE_MUL: &str = "cam_shake_mul";
    pub const CAM_ZOOM_MUL: &str = "cam_zoom_mul";
    pub const EDGE_BOOST_MULT: &str = "edge_boost_mult";
    pub const EDGE_BOOST_POW: &str = "edge_boost_pow";
    pub const STREAK_ENABLED: &str = "streak_enabled";
    pub const STREAK_COUNT: &str = "streak_count";
    pub const STREAK_SPEED_MIN: &str = "streak_speed_min";
    pub const STREAK_SPEED_MAX: &str = "streak_speed_max";
    pub const STREAK_BASE_WIDTH: &str = "streak_base_width";
    pub const STREAK_EDGE_WIDTH_MULT: &str = "streak_edge_width_mult";
    pub const WIRE_ENABLED: &str = "wire_enabled";
    pub const WIRE_STYLE: &str = "wire_style";
    pub const WIRE_SPOKES: &str = "wire_spokes";
    pub const WIRE_CIRCLES: &str = "wire_circles";
    pub const WIRE_ROT_SPEED: &str = "wire_rot_speed";
    pub const WIRE_SCROLL_SPEED: &str = "wire_scroll_speed";
    pub const WIRE_DASHED: &str = "wire_dashed";
    pub const WIRE_THICKNESS: &str = "wire_thickness";
    pub const STREAK_THEME: &str = "streak_theme";
}

/// Keys holding counts; automation rounds them to the nearest integer
pub const DISCRETE_KEYS: [&str; 4] = [
    keys::KALEI_SEGMENTS,
    keys::STREAK_COUNT,
    keys::WIRE_SPOKES,
    keys::WIRE_CIRCLES,
];

pub fn is_discrete(key: &str) -> bool {
    DISCRETE_KEYS.contains(&key)
}

// =============================================================================
// Values
// =============================================================================

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Flag(bool),
    Text(String),
    Theme(StreakTheme),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_theme(&self) -> Option<&StreakTheme> {
        match self {
            ParamValue::Theme(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Flag(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<StreakTheme> for ParamValue {
    fn from(v: StreakTheme) -> Self {
        ParamValue::Theme(v)
    }
}

// =============================================================================
// Streak Theme
// =============================================================================

/// Hue selection for streaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// Any hue, drifting around the wheel
    #[default]
    Rainbow,
    /// Hues jittered around a blue base
    Blue,
    /// Hues jittered around an arbitrary base
    Mono,
    /// Desaturated
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlendMode {
    #[default]
    Add,
    Blend,
}

/// Travel direction of newly seeded streaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakDirection {
    /// From the centre toward the edges
    #[default]
    Out,
    /// From the edges toward the centre
    In,
    /// Each streak picks inward with `reverse_prob`
    Both,
}

/// Alpha flicker applied to streaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flicker {
    pub enabled: bool,
    /// Per-frame probability of a flicker
    pub prob: f64,
    pub min_mul: f64,
    pub max_mul: f64,
    /// Follow the strobe pulse instead of random flicker
    pub link_strobe: bool,
}

impl Default for Flicker {
    fn default() -> Self {
        Self {
            enabled: false,
            prob: 0.02,
            min_mul: 0.2,
            max_mul: 1.0,
            link_strobe: false,
        }
    }
}

/// Look and motion of the streak field.
///
/// A scene that sets a theme replaces the live theme wholesale; fields the
/// scene omits take these defaults rather than the previous scene's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakTheme {
    pub palette: Palette,
    /// Centre hue in degrees; palette-dependent when unset
    pub hue_base: Option<f64>,
    /// Jitter around `hue_base`; palette-dependent when unset
    pub hue_range: Option<f64>,
    /// Per-frame hue movement
    pub hue_drift: f64,
    pub sat: f64,
    pub bri: f64,
    pub alpha_base: f64,
    pub alpha_edge_boost: f64,
    pub blend: BlendMode,
    pub flicker: Flicker,
    pub direction: StreakDirection,
    /// Inward probability when `direction` is `Both`
    pub reverse_prob: f64,
}

impl Default for StreakTheme {
    fn default() -> Self {
        Self {
            palette: Palette::Rainbow,
            hue_base: None,
            hue_range: None,
            hue_drift: 0.6,
            sat: 90.0,
            bri: 100.0,
            alpha_base: 0.18,
            alpha_edge_boost: 0.35,
            blend: BlendMode::Add,
            flicker: Flicker::default(),
            direction: StreakDirection::Out,
            reverse_prob: 0.5,
        }
    }
}

impl StreakTheme {
    pub fn hue_base(&self) -> f64 {
        self.hue_base.unwrap_or(match self.palette {
            Palette::Blue => 205.0,
            _ => 0.0,
        })
    }

    pub fn hue_range(&self) -> f64 {
        self.hue_range.unwrap_or(match self.palette {
            Palette::Blue => 20.0,
            _ => 0.0,
        })
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// The flat key/value snapshot handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveParameters {
    values: BTreeMap<String, ParamValue>,
}

impl LiveParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values used before any scene has been applied
    pub fn baseline() -> Self {
        let theme = StreakTheme {
            alpha_base: 0.22,
            reverse_prob: 0.4,
            flicker: Flicker {
                min_mul: 0.15,
                prob: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let entries: [(&str, ParamValue); 26] = [
            (keys::STROBE_PROBABILITY, ParamValue::Number(0.08)),
            (keys::CHROMA_SENS, ParamValue::Number(4.0)),
            (keys::FEEDBACK_STRENGTH, ParamValue::Number(0.06)),
            (keys::KALEI_SEGMENTS, ParamValue::Number(0.0)),
            (keys::GLITCH_CHANCE, ParamValue::Number(0.06)),
            (keys::SPRITE_SCALE, ParamValue::Number(0.75)),
            (keys::REACTIVITY_MUL, ParamValue::Number(0.85)),
            (keys::CAM_SHAKE_MUL, ParamValue::Number(1.0)),
            (keys::CAM_ZOOM_MUL, ParamValue::Number(1.0)),
            (keys::EDGE_BOOST_MULT, ParamValue::Number(1.0)),
            (keys::EDGE_BOOST_POW, ParamValue::Number(1.4)),
            (keys::STREAK_ENABLED, true.into()),
            (keys::STREAK_COUNT, ParamValue::Number(20.0)),
            (keys::STREAK_SPEED_MIN, ParamValue::Number(0.004)),
            (keys::STREAK_SPEED_MAX, ParamValue::Number(0.010)),
            (keys::STREAK_BASE_WIDTH, ParamValue::Number(2.0)),
            (keys::STREAK_EDGE_WIDTH_MULT, ParamValue::Number(5.0)),
            (keys::WIRE_ENABLED, true.into()),
            (keys::WIRE_STYLE, "WHITE_DIM".into()),
            (keys::WIRE_SPOKES, ParamValue::Number(16.0)),
            (keys::WIRE_CIRCLES, ParamValue::Number(18.0)),
            (keys::WIRE_ROT_SPEED, ParamValue::Number(0.25)),
            (keys::WIRE_SCROLL_SPEED, ParamValue::Number(0.30)),
            (keys::WIRE_DASHED, false.into()),
            (keys::WIRE_THICKNESS, ParamValue::Number(1.5)),
            (keys::STREAK_THEME, theme.into()),
        ];
        entries.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParamValue::as_number)
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(ParamValue::as_flag).unwrap_or(default)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_text)
    }

    /// The live streak theme, or the default theme if none is declared
    pub fn theme(&self) -> StreakTheme {
        self.get(keys::STREAK_THEME)
            .and_then(ParamValue::as_theme)
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite an existing key. Returns `false` (and changes nothing) for
    /// undeclared keys.
    pub fn set(&mut self, key: &str, value: ParamValue) -> bool {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Add a key if it is not already present
    fn declare(&mut self, key: &str, value: &ParamValue) {
        if !self.values.contains_key(key) {
            self.values.insert(key.to_string(), value.clone());
        }
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for LiveParameters {
    fn from_iter<I: IntoIterator<Item = (K, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Overlay `overrides` onto `previous`.
///
/// The result has exactly the keys of `previous`. Keys present in both take
/// the override; override keys unknown to `previous` are ignored.
pub fn merge(previous: &LiveParameters, overrides: &BTreeMap<String, ParamValue>) -> LiveParameters {
    let mut next = previous.clone();
    for (key, value) in overrides {
        if !next.set(key, value.clone()) {
            debug!(key = %key, "override for undeclared parameter ignored");
        }
    }
    next
}

// =============================================================================
// Store
// =============================================================================

/// Owner of the live snapshot across scene switches and automation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    live: LiveParameters,
}

impl ParameterStore {
    /// Declare the full key set for `deck`: the baseline keys plus every key
    /// any scene sets, seeded from the first scene that declares it.
    pub fn for_deck(deck: &SceneDeck) -> Self {
        let mut live = LiveParameters::baseline();
        for scene in deck.scenes() {
            for (key, value) in &scene.parameter_set {
                live.declare(key, value);
            }
        }
        Self { live }
    }

    pub fn live(&self) -> &LiveParameters {
        &self.live
    }

    /// Replace the snapshot with `overrides` merged over it
    pub fn apply(&mut self, overrides: &BTreeMap<String, ParamValue>) {
        self.live = merge(&self.live, overrides);
    }

    /// Write an automated value. Non-numeric and undeclared targets are
    /// skipped.
    pub fn automate(&mut self, key: &str, value: f64) -> bool {
        match self.live.get(key) {
            Some(ParamValue::Number(_)) => {
                let value = if is_discrete(key) { value.round() } else { value };
                self.live.set(key, ParamValue::Number(value))
            }
            Some(_) => {
                debug!(key, "automation target is not numeric, skipped");
                false
            }
            None => {
                debug!(key, "automation target not declared, skipped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneDefinition;

    fn overrides(pairs: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_baseline_covers_standard_keys() {
        let live = LiveParameters::baseline();
        assert_eq!(live.len(), 26);
        assert_eq!(live.number(keys::STREAK_COUNT), Some(20.0));
        assert_eq!(live.text(keys::WIRE_STYLE), Some("WHITE_DIM"));
        assert!(live.flag_or(keys::STREAK_ENABLED, false));
        assert_eq!(live.theme().reverse_prob, 0.4);
    }

    #[test]
    fn test_merge_overrides_and_retains() {
        let prev = LiveParameters::baseline();
        let next = merge(
            &prev,
            &overrides(&[
                (keys::CHROMA_SENS, ParamValue::Number(2.4)),
                (keys::WIRE_DASHED, true.into()),
            ]),
        );
        assert_eq!(next.number(keys::CHROMA_SENS), Some(2.4));
        assert!(next.flag_or(keys::WIRE_DASHED, false));
        assert_eq!(next.number(keys::SPRITE_SCALE), Some(0.75));
        assert_eq!(next.len(), prev.len());
        // Pure: the input is untouched
        assert_eq!(prev.number(keys::CHROMA_SENS), Some(4.0));
    }

    #[test]
    fn test_merge_ignores_unknown_keys() {
        let prev = LiveParameters::baseline();
        let next = merge(&prev, &overrides(&[("bogus", ParamValue::Number(1.0))]));
        assert!(!next.contains("bogus"));
        assert_eq!(next, prev);
    }

    #[test]
    fn test_set_rejects_undeclared() {
        let mut live = LiveParameters::baseline();
        assert!(!live.set("nope", ParamValue::Number(1.0)));
        assert!(live.set(keys::GLITCH_CHANCE, ParamValue::Number(0.5)));
        assert_eq!(live.number(keys::GLITCH_CHANCE), Some(0.5));
    }

    #[test]
    fn test_discrete_keys() {
        assert!(is_discrete(keys::KALEI_SEGMENTS));
        assert!(is_discrete(keys::WIRE_SPOKES));
        assert!(!is_discrete(keys::CHROMA_SENS));
    }

    #[test]
    fn test_automate_rounds_discrete() {
        let mut store = ParameterStore {
            live: LiveParameters::baseline(),
        };
        assert!(store.automate(keys::STREAK_COUNT, 40.5));
        assert_eq!(store.live().number(keys::STREAK_COUNT), Some(41.0));
        assert!(store.automate(keys::KALEI_SEGMENTS, 7.4));
        assert_eq!(store.live().number(keys::KALEI_SEGMENTS), Some(7.0));
        assert!(store.automate(keys::CHROMA_SENS, 2.25));
        assert_eq!(store.live().number(keys::CHROMA_SENS), Some(2.25));
    }

    #[test]
    fn test_automate_skips_bad_targets() {
        let mut store = ParameterStore {
            live: LiveParameters::baseline(),
        };
        let before = store.clone();
        assert!(!store.automate("missing", 1.0));
        assert!(!store.automate(keys::WIRE_STYLE, 1.0));
        assert!(!store.automate(keys::STREAK_ENABLED, 0.0));
        assert_eq!(store, before);
    }

    #[test]
    fn test_for_deck_declares_scene_keys() {
        let deck = SceneDeck::new(vec![
            SceneDefinition::new("a").with_param("custom_glow", 0.3),
            SceneDefinition::new("b").with_param("custom_glow", 0.9),
        ])
        .unwrap();
        let store = ParameterStore::for_deck(&deck);
        assert_eq!(store.live().number("custom_glow"), Some(0.3));
        assert_eq!(store.live().len(), 27);
    }

    #[test]
    fn test_theme_defaults_by_palette() {
        let blue = StreakTheme {
            palette: Palette::Blue,
            ..Default::default()
        };
        assert_eq!(blue.hue_base(), 205.0);
        assert_eq!(blue.hue_range(), 20.0);
        let mono = StreakTheme {
            palette: Palette::Mono,
            hue_base: Some(34.0),
            ..Default::default()
        };
        assert_eq!(mono.hue_base(), 34.0);
        assert_eq!(mono.hue_range(), 0.0);
    }

    #[test]
    fn test_param_value_json_untagged() {
        let parsed: BTreeMap<String, ParamValue> = serde_json::from_str(
            r#"{"a": 1.5, "b": true, "c": "STROBE", "d": {"palette": "white", "direction": "both"}}"#,
        )
        .unwrap();
        assert_eq!(parsed["a"], ParamValue::Number(1.5));
        assert_eq!(parsed["b"], ParamValue::Flag(true));
        assert_eq!(parsed["c"], ParamValue::Text("STROBE".into()));
        let theme = parsed["d"].as_theme().unwrap();
        assert_eq!(theme.palette, Palette::White);
        assert_eq!(theme.direction, StreakDirection::Both);
        assert_eq!(theme.sat, 90.0);
    }
}
