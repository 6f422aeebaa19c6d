//! # Pulsedeck: Audio-Reactive Scene Automation
//!
//! `pulsedeck` turns a live magnitude spectrum into the control signals that
//! drive generative visuals, and steps through a deck of authored scenes whose
//! parameters drift over time.
//!
//! ## Architecture
//!
//! Each frame flows one way through the pipeline:
//!
//! - **Features** - [`SpectrumSampler`] reduces a spectrum frame to level,
//!   bass, mid and treble
//! - **Beats** - [`BeatDetector`] flags kicks against an adaptive baseline and
//!   tracks tempo
//! - **Signals** - [`ReactivitySmoother`], [`StrobeScheduler`],
//!   [`BurstScheduler`] and [`GlitchScheduler`] derive the pulses the renderer
//!   maps onto light and motion
//! - **Scenes** - [`SceneDirector`] advances on duration, beat count or
//!   inactivity, and automates the [`ParameterStore`]
//!
//! The [`Engine`] is immutable; all per-session state lives in an
//! [`EngineState`] the caller owns. Every probabilistic trigger draws from a
//! caller-supplied [`RandomSource`], so sessions replay exactly from a seed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsedeck::prelude::*;
//!
//! let engine = Engine::default();
//! let mut rng = EntropyRng::new();
//! let mut state = engine.init(0.0, &mut rng);
//! engine.start(&mut state, 0.0);
//!
//! let frame = vec![0u8; 1024];
//! let out = engine.tick(&mut state, &TickInput::new(0.016, Some(&frame[..]), 0.2), &mut rng);
//! if let Some(change) = out.transition {
//!     println!("scene {} -> {}", change.from, change.to);
//! }
//! println!("{}", engine.diagnostics(&state));
//! ```

pub mod beat;
pub mod diagnostics;
pub mod director;
pub mod engine;
pub mod error;
pub mod glitch;
pub mod math;
pub mod params;
pub mod reactivity;
pub mod rng;
pub mod scene;
pub mod spectrum;
pub mod streaks;
pub mod strobe;

/// Prelude module for convenient imports
pub mod prelude {
    // Engine
    pub use crate::engine::{
        CaptureSource, Engine, EngineConfig, EngineState, TickInput, TickOutput,
    };
    pub use crate::error::{PulseError, Result};

    // Signal stages
    pub use crate::beat::{BeatConfig, BeatDetector, BeatEvent, BeatState};
    pub use crate::glitch::{GlitchConfig, GlitchScheduler, GlitchState};
    pub use crate::reactivity::{
        ReactivityConfig, ReactivityGains, ReactivitySmoother, ReactivityState,
    };
    pub use crate::spectrum::{FeatureSet, SamplerConfig, SpectrumSampler};
    pub use crate::strobe::{
        BurstConfig, BurstScheduler, BurstState, StrobeConfig, StrobeScheduler, StrobeState,
    };

    // Scenes and parameters
    pub use crate::director::{
        DirectorConfig, SceneDirector, SceneRuntime, SceneTransition, TransitionReason,
    };
    pub use crate::params::{
        keys, merge, LiveParameters, ParamValue, ParameterStore, StreakTheme,
    };
    pub use crate::scene::{SceneDeck, SceneDefinition};
    pub use crate::streaks::{Streak, StreakConfig, StreakField, StreakParams};

    // Diagnostics
    pub use crate::diagnostics::{Diagnostics, Overlay};

    // Randomness
    pub use crate::rng::{EntropyRng, RandomSource, Rng, ScriptedRng};
}

// Re-export key types at crate root for convenience
pub use prelude::*;
