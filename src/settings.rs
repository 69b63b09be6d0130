//! Movement tuning
//!
//! Loaded from JSON so the authoritative server and every predicting peer can
//! share one file. Missing fields fall back to the `consts` defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Tick;
use crate::consts::*;

/// Errors raised while loading a tuning file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Movement and timing parameters for one simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Movement ===
    /// Horizontal speed (pixels/s)
    pub speed_x: f32,
    /// Downward velocity floor while grounded
    pub snap_force: f32,
    /// Jump impulse (applied upward)
    pub jump_force: f32,

    // === Input windows (ticks) ===
    pub coyote_time: Tick,
    pub input_buffer_ticks: Tick,
    pub drop_window: Tick,

    // === Transient state expiry (ticks) ===
    pub ground_expiry: Tick,
    pub ignore_expiry: Tick,

    // === Forces ===
    /// Gravity in meters/s²
    pub gravity: f32,
    pub pixels_per_meter: f32,
    pub friction: f32,
    /// Horizontal velocity multiplier applied every tick
    pub damping: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            speed_x: SPEED_X,
            snap_force: SNAP_FORCE,
            jump_force: JUMP_FORCE,

            coyote_time: COYOTE_TIME,
            input_buffer_ticks: INPUT_BUFFER_TICKS,
            drop_window: DROP_WINDOW_TICKS,

            ground_expiry: GROUND_EXPIRY,
            ignore_expiry: IGNORE_EXPIRY,

            gravity: GRAVITY,
            pixels_per_meter: PIXELS_PER_METER,
            friction: FRICTION,
            damping: DAMPING,
        }
    }
}

impl Tuning {
    /// Parse tuning from a JSON document
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        if tuning.ground_expiry <= tuning.coyote_time {
            log::warn!(
                "ground_expiry ({}) does not exceed coyote_time ({}); \
                 coyote jumps will be cut short",
                tuning.ground_expiry,
                tuning.coyote_time
            );
        }
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Serialize to pretty JSON (for writing a template file)
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Gravity acceleration in pixels/s²
    pub fn gravity_px(&self) -> f32 {
        self.gravity * self.pixels_per_meter
    }
}
