//! Scripted Session
//!
//! Drives the engine for a little over a minute of simulated audio: a steady
//! four-on-the-floor section, a breakdown with no kicks, then silence long
//! enough to trip the inactivity fallback.
//!
//! Run with `RUST_LOG=pulsedeck=debug` to see scene changes and streak
//! re-seeding as they happen.

use pulsedeck::prelude::*;
use tracing_subscriber::EnvFilter;

const BINS: usize = 1024;
const FPS: f64 = 60.0;
const BPM: f64 = 128.0;

/// Synthesised capture: kicks at a fixed tempo over a noise bed
struct DrumMachine {
    frame: Vec<u8>,
    noise: Rng,
    now: f64,
    amplitude: f64,
}

impl DrumMachine {
    fn new() -> Self {
        Self {
            frame: vec![0; BINS],
            noise: Rng::from_seed(0xd12u64),
            now: 0.0,
            amplitude: 0.0,
        }
    }

    /// Render the frame for `now`
    fn render(&mut self, now: f64) {
        self.now = now;
        let (kick, bed) = match now {
            t if t < 30.0 => (kick_envelope(t), 60.0),
            t if t < 45.0 => (0.0, 90.0),
            _ => (0.0, 0.0),
        };
        for (bin, value) in self.frame.iter_mut().enumerate() {
            let noise = if bed > 0.0 { self.noise.range(0.0, bed) } else { 0.0 };
            let bass = if (2..48).contains(&bin) { kick * 255.0 } else { 0.0 };
            *value = (noise + bass).min(255.0) as u8;
        }
        self.amplitude = if bed > 0.0 { 0.2 + 0.6 * kick } else { 0.0 };
    }
}

/// Sharp attack at each beat, gone within a sixth of a beat
fn kick_envelope(t: f64) -> f64 {
    let beat = 60.0 / BPM;
    let phase = (t % beat) / beat;
    if phase < 1.0 / 6.0 {
        1.0 - phase * 6.0
    } else {
        0.0
    }
}

impl CaptureSource for DrumMachine {
    fn spectrum_frame(&mut self) -> Option<&[u8]> {
        (self.now > 0.0).then_some(&self.frame[..])
    }

    fn amplitude_level(&mut self) -> f64 {
        self.amplitude
    }
}

fn main() -> pulsedeck::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Pulsedeck Scripted Session ===\n");

    let config = EngineConfig::default().with_sensitivity(1.2);
    let engine = Engine::new(SceneDeck::builtin(), config)?;
    let mut rng = Rng::from_seed(7);
    let mut state = engine.init(0.0, &mut rng);
    engine.start(&mut state, 0.0);

    let mut capture = DrumMachine::new();
    let mut kicks = 0u32;
    let mut strobes = 0u32;

    for frame in 1..=(75.0 * FPS) as usize {
        let now = frame as f64 / FPS;
        capture.render(now);
        let out = engine.tick_from(&mut state, &mut capture, now, &mut rng);

        kicks += out.kick as u32;
        strobes += (out.strobe_fired || out.burst_flash) as u32;

        if let Some(change) = out.transition {
            println!(
                "{:>6.2}s  {} -> {} ({})",
                now,
                engine.deck().get(change.from).name,
                engine.deck().get(change.to).name,
                change.reason
            );
        }
        if frame % (5 * FPS as usize) == 0 {
            println!("{:>6.2}s  {}", now, engine.diagnostics(&state));
        }
    }

    println!("\nKicks: {}  Flashes: {}", kicks, strobes);
    println!("Final scene: {}", engine.current_scene(&state).name);
    println!("Live parameters:\n{}", serde_json::to_string_pretty(state.live())?);

    Ok(())
}
