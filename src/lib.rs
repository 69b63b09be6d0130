//! Tick Platformer - deterministic movement and terrain core for a 2D platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, terrain collision, expiry)
//! - `settings`: Data-driven movement tuning
//! - `scene`: Terrain and player composition helpers
//! - `bot`: Seeded input scripts for demos and replay checks

pub mod bot;
pub mod scene;
pub mod settings;
pub mod sim;

pub use settings::{SettingsError, Tuning};
pub use sim::{Simulation, SimError, World};

/// Simulation tick index. Signed so window arithmetic can go negative.
pub type Tick = i64;

/// Game configuration constants
pub mod consts {
    use crate::Tick;

    /// Fixed simulation timestep (60 Hz, one network tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Horizontal movement speed (pixels/s)
    pub const SPEED_X: f32 = 120.0;
    /// Downward velocity floor while grounded, keeps the player glued to bumps
    pub const SNAP_FORCE: f32 = 40.0;
    /// Upward velocity applied on jump
    pub const JUMP_FORCE: f32 = 320.0;

    /// Ticks after the last ground touch during which a jump is still honored
    pub const COYOTE_TIME: Tick = 10;
    /// Ticks before landing during which a jump press is remembered
    pub const INPUT_BUFFER_TICKS: Tick = 5;
    /// Maximum age of a Down press that still triggers a drop-through
    pub const DROP_WINDOW_TICKS: Tick = 5;

    /// Grounded records older than this are swept (must exceed COYOTE_TIME)
    pub const GROUND_EXPIRY: Tick = 15;
    /// Platform ignore entries older than this are swept
    pub const IGNORE_EXPIRY: Tick = 15;

    /// Gravity in meters/s²
    pub const GRAVITY: f32 = 9.8;
    pub const PIXELS_PER_METER: f32 = 50.0;
    /// Horizontal friction coefficient
    pub const FRICTION: f32 = 0.5;
    /// Horizontal velocity damping per tick
    pub const DAMPING: f32 = 0.9;

    /// Capacity of a player's platform ignore list
    pub const IGNORE_SLOTS: usize = 60;
    /// Number of past positions kept for approach detection
    pub const HISTORY_CAPACITY: usize = 60;
}
