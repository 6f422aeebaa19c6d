//! Engine
//!
//! Wires the stages into one per-frame tick:
//!
//! ```text
//! spectrum ─► SpectrumSampler ─► BeatDetector ─► ReactivitySmoother
//!                                      │                 │
//!                                      ▼                 ▼
//!                               SceneDirector ◄── Strobe / Burst / Glitch
//!                                      │
//!                                      ▼
//!                               ParameterStore ─► StreakField
//! ```
//!
//! [`Engine`] is immutable: it holds the deck, the configuration and the
//! stateless stage objects. Everything that changes between frames lives in an
//! [`EngineState`] owned by the caller and passed into every call, together
//! with the random source used for that call.

use crate::beat::{BeatConfig, BeatDetector, BeatState};
use crate::diagnostics::{Diagnostics, Overlay};
use crate::director::{DirectorConfig, SceneDirector, SceneRuntime, SceneTransition, TransitionReason};
use crate::error::{PulseError, Result};
use crate::glitch::{GlitchConfig, GlitchScheduler, GlitchState};
use crate::params::{keys, LiveParameters, ParameterStore};
use crate::reactivity::{ReactivityConfig, ReactivityGains, ReactivitySmoother, ReactivityState};
use crate::rng::RandomSource;
use crate::scene::{SceneDeck, SceneDefinition};
use crate::spectrum::{FeatureSet, SamplerConfig, SpectrumSampler};
use crate::streaks::{StreakConfig, StreakField, StreakParams};
use crate::strobe::{BurstConfig, BurstScheduler, BurstState, StrobeConfig, StrobeScheduler, StrobeState};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Lowest accepted user sensitivity
pub const MIN_SENSITIVITY: f64 = 0.2;
/// Highest accepted user sensitivity
pub const MAX_SENSITIVITY: f64 = 3.0;

// =============================================================================
// Configuration
// =============================================================================

/// Every tunable constant of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sampler: SamplerConfig,
    pub beat: BeatConfig,
    pub reactivity: ReactivityConfig,
    pub strobe: StrobeConfig,
    pub burst: BurstConfig,
    pub glitch: GlitchConfig,
    pub streaks: StreakConfig,
    pub director: DirectorConfig,
    /// User gain on reactivity
    pub sensitivity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            beat: BeatConfig::default(),
            reactivity: ReactivityConfig::default(),
            strobe: StrobeConfig::default(),
            burst: BurstConfig::default(),
            glitch: GlitchConfig::default(),
            streaks: StreakConfig::default(),
            director: DirectorConfig::default(),
            sensitivity: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.sampler.validate()?;
        self.beat.validate()?;
        self.reactivity.validate()?;
        self.strobe.validate()?;
        self.burst.validate()?;
        self.glitch.validate()?;
        self.streaks.validate()?;
        self.director.validate()?;
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&self.sensitivity) {
            return Err(PulseError::InvalidConfig(format!(
                "sensitivity must be in [{}, {}], got {}",
                MIN_SENSITIVITY, MAX_SENSITIVITY, self.sensitivity
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate; omitted sections take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Capture Boundary
// =============================================================================

/// The audio-capture collaborator
pub trait CaptureSource {
    /// Current magnitude spectrum, `None` until capture is running
    fn spectrum_frame(&mut self) -> Option<&[u8]>;

    /// Overall envelope level in `[0, 1]`
    fn amplitude_level(&mut self) -> f64;
}

/// One frame of input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput<'a> {
    /// Seconds on the caller's clock
    pub now: f64,
    pub spectrum: Option<&'a [u8]>,
    pub amplitude: f64,
}

impl<'a> TickInput<'a> {
    pub fn new(now: f64, spectrum: Option<&'a [u8]>, amplitude: f64) -> Self {
        Self {
            now,
            spectrum,
            amplitude,
        }
    }

    /// No spectrum and no amplitude
    pub fn silent(now: f64) -> Self {
        Self::new(now, None, 0.0)
    }
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub features: FeatureSet,
    pub kick: bool,
    pub bpm: f64,
    pub strobe_fired: bool,
    pub burst_flash: bool,
    pub glitch: bool,
    pub transition: Option<SceneTransition>,
}

// =============================================================================
// State
// =============================================================================

/// All mutable per-session state
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Capture is running; while false every tick sees silence
    pub ready: bool,
    pub beat: BeatState,
    pub signals: ReactivityState,
    pub strobe: StrobeState,
    pub burst: BurstState,
    pub glitch: GlitchState,
    pub scene: SceneRuntime,
    pub params: ParameterStore,
    pub streaks: StreakField,
    pub overlay: Overlay,
    /// Features of the most recent tick
    pub features: FeatureSet,
    /// Amplitude of the most recent tick
    pub amplitude: f64,
}

impl EngineState {
    pub fn live(&self) -> &LiveParameters {
        self.params.live()
    }

    pub fn current_scene(&self) -> usize {
        self.scene.current_index
    }

    pub fn beats_in_scene(&self) -> u32 {
        self.scene.beats_in_scene
    }

    pub fn bpm(&self) -> f64 {
        self.beat.bpm_estimate
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone)]
pub struct Engine {
    deck: SceneDeck,
    config: EngineConfig,
    sampler: SpectrumSampler,
    detector: BeatDetector,
    smoother: ReactivitySmoother,
    strobe: StrobeScheduler,
    burst: BurstScheduler,
    glitch: GlitchScheduler,
    director: SceneDirector,
}

impl Engine {
    pub fn new(deck: SceneDeck, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(deck, config))
    }

    fn assemble(deck: SceneDeck, config: EngineConfig) -> Self {
        Self {
            sampler: SpectrumSampler::new(config.sampler.clone()),
            detector: BeatDetector::new(config.beat.clone()),
            smoother: ReactivitySmoother::new(config.reactivity.clone()),
            strobe: StrobeScheduler::new(config.strobe.clone()),
            burst: BurstScheduler::new(config.burst.clone()),
            glitch: GlitchScheduler::new(config.glitch.clone()),
            director: SceneDirector::new(config.director.clone()),
            deck,
            config,
        }
    }

    pub fn deck(&self) -> &SceneDeck {
        &self.deck
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn director(&self) -> &SceneDirector {
        &self.director
    }

    pub fn current_scene<'a>(&'a self, state: &EngineState) -> &'a SceneDefinition {
        self.deck.get(state.scene.current_index)
    }

    /// Fresh state on the first scene, capture not yet started
    pub fn init(&self, now: f64, rng: &mut impl RandomSource) -> EngineState {
        let mut params = ParameterStore::for_deck(&self.deck);
        params.apply(&self.deck.get(0).parameter_set);
        let mut streaks = StreakField::new();
        streaks.reseed(
            &StreakParams::from_params(params.live()),
            &self.config.streaks,
            rng,
        );
        EngineState {
            ready: false,
            beat: self.detector.initial_state(),
            signals: ReactivityState::new(),
            strobe: StrobeState::default(),
            burst: BurstState::default(),
            glitch: GlitchState::default(),
            scene: SceneRuntime::new(now),
            params,
            streaks,
            overlay: Overlay::default(),
            features: FeatureSet::SILENT,
            amplitude: 0.0,
        }
    }

    /// Back to the first scene with clean signals. Capture readiness and the
    /// overlay flags are kept.
    pub fn reset(&self, state: &mut EngineState, now: f64, rng: &mut impl RandomSource) {
        let ready = state.ready;
        let overlay = state.overlay;
        *state = self.init(now, rng);
        state.ready = ready;
        state.overlay = overlay;
    }

    /// Capture is live: start from a clean baseline
    pub fn start(&self, state: &mut EngineState, now: f64) {
        self.clear_signals(state);
        state.ready = true;
        state.scene.last_activity = now;
        info!(now, "capture started");
    }

    /// Capture stopped: drop readiness and every decaying value
    pub fn stop(&self, state: &mut EngineState) {
        self.clear_signals(state);
        state.ready = false;
        info!("capture stopped");
    }

    fn clear_signals(&self, state: &mut EngineState) {
        state.beat.reset(self.detector.config());
        state.signals.reset();
        state.strobe = StrobeState::default();
        state.burst.reset();
        state.glitch.reset();
        state.features = FeatureSet::SILENT;
        state.amplitude = 0.0;
    }

    /// Run one frame
    pub fn tick(
        &self,
        state: &mut EngineState,
        input: &TickInput<'_>,
        rng: &mut impl RandomSource,
    ) -> TickOutput {
        let now = input.now;
        self.director.automate(
            &state.scene,
            self.deck.get(state.scene.current_index),
            &mut state.params,
            now,
        );

        let (spectrum, amplitude) = if state.ready {
            (input.spectrum, input.amplitude.clamp(0.0, 1.0))
        } else {
            (None, 0.0)
        };
        let features = self.sampler.extract(spectrum);
        let beat = self.detector.update(&mut state.beat, features.bass, now);

        let live = state.params.live();
        let gains = ReactivityGains::from_params(live, self.config.sensitivity);
        let strobe_probability = live.number_or(keys::STROBE_PROBABILITY, 0.0);
        let glitch_chance = live.number_or(keys::GLITCH_CHANCE, 0.0);
        let kalei_segments = live.number_or(keys::KALEI_SEGMENTS, 0.0);

        self.smoother
            .update(&mut state.signals, &features, &beat, &gains);
        self.glitch
            .on_kick(&mut state.glitch, beat.kick_hit, kalei_segments, rng);
        let strobe_fired = self.strobe.tick(
            &mut state.strobe,
            &mut state.signals,
            strobe_probability,
            now,
            rng,
        );
        let burst_flash = self.burst.tick(
            &mut state.burst,
            state.signals.reactivity,
            strobe_probability,
            now,
            rng,
        );
        let glitch = self
            .glitch
            .tick(&mut state.glitch, features.treble, glitch_chance, rng);

        let active = self
            .director
            .is_active(beat.kick_hit, amplitude.max(features.level));
        self.director
            .observe(&mut state.scene, beat.kick_hit, active, now);
        let transition = self
            .director
            .check(&state.scene, self.deck.get(state.scene.current_index), now)
            .map(|reason| self.apply_transition(state, None, reason, now, rng));

        let streak_params = StreakParams::from_params(state.params.live());
        if streak_params.enabled {
            state.streaks.advance(
                state.signals.reactivity,
                state.signals.kick_pulse,
                &streak_params,
                &self.config.streaks,
                rng,
            );
        }

        state.features = features;
        state.amplitude = amplitude;

        TickOutput {
            features,
            kick: beat.kick_hit,
            bpm: beat.bpm,
            strobe_fired,
            burst_flash,
            glitch,
            transition,
        }
    }

    /// Pull one frame from a capture source and tick
    pub fn tick_from(
        &self,
        state: &mut EngineState,
        source: &mut impl CaptureSource,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> TickOutput {
        let amplitude = source.amplitude_level();
        let spectrum = source.spectrum_frame();
        self.tick(state, &TickInput::new(now, spectrum, amplitude), rng)
    }

    pub fn next_scene(
        &self,
        state: &mut EngineState,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> SceneTransition {
        let target = state.scene.current_index as isize + 1;
        self.apply_transition(state, Some(target), TransitionReason::Manual, now, rng)
    }

    pub fn previous_scene(
        &self,
        state: &mut EngineState,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> SceneTransition {
        let target = state.scene.current_index as isize - 1;
        self.apply_transition(state, Some(target), TransitionReason::Manual, now, rng)
    }

    /// Jump to `index`, wrapped into the deck in either direction
    pub fn jump_to_scene(
        &self,
        state: &mut EngineState,
        index: isize,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> SceneTransition {
        self.apply_transition(state, Some(index), TransitionReason::Manual, now, rng)
    }

    fn apply_transition(
        &self,
        state: &mut EngineState,
        target: Option<isize>,
        reason: TransitionReason,
        now: f64,
        rng: &mut impl RandomSource,
    ) -> SceneTransition {
        let transition = self.director.transition(
            &mut state.scene,
            &self.deck,
            &mut state.params,
            target,
            reason,
            now,
        );
        let live = state.params.live();
        state.signals.strobe_pulse = 1.0;
        state.glitch.kalei_mix = if live.number_or(keys::KALEI_SEGMENTS, 0.0) > 0.0 {
            1.0
        } else {
            0.5
        };
        state.streaks.reseed(
            &StreakParams::from_params(live),
            &self.config.streaks,
            rng,
        );
        transition
    }

    pub fn diagnostics(&self, state: &EngineState) -> Diagnostics {
        Diagnostics {
            ready: state.ready,
            scene_index: state.scene.current_index,
            scene_name: self.current_scene(state).name.clone(),
            bpm: state.beat.bpm_estimate,
            level: state.features.level,
            bass: state.features.bass,
            reactivity: state.signals.reactivity,
            kick: state.signals.kick_pulse,
            beats_in_scene: state.scene.beats_in_scene,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::assemble(SceneDeck::builtin(), EngineConfig::default())
    }
}
