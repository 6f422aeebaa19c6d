//! Diagnostic snapshot and overlay visibility for the HUD line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the HUD prints once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub ready: bool,
    pub scene_index: usize,
    pub scene_name: String,
    pub bpm: f64,
    pub level: f64,
    pub bass: f64,
    pub reactivity: f64,
    pub kick: f64,
    pub beats_in_scene: u32,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "started:{}  scene:{}  bpm:{:.1}  lvl:{:.3}  bass:{:.3}  react:{:.3}  kick:{:.3}  beats:{}",
            self.ready,
            self.scene_name,
            self.bpm,
            self.level,
            self.bass,
            self.reactivity,
            self.kick,
            self.beats_in_scene
        )
    }
}

/// Two independent overlay flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    /// Show the HUD at all
    pub show_debug: bool,
    /// Keep it visible in fullscreen too
    pub force_show: bool,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            show_debug: true,
            force_show: false,
        }
    }
}

impl Overlay {
    pub fn toggle_debug(&mut self) -> bool {
        self.show_debug = !self.show_debug;
        self.show_debug
    }

    pub fn toggle_force_show(&mut self) -> bool {
        self.force_show = !self.force_show;
        self.force_show
    }

    pub fn visible(&self, fullscreen: bool) -> bool {
        self.show_debug && (!fullscreen || self.force_show)
    }
}
