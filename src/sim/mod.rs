//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (entity slot order)
//! - Structural changes deferred to the end of each system pass
//! - No rendering, networking or platform dependencies

pub mod commands;
pub mod dynamics;
pub mod entity;
pub mod error;
pub mod expiry;
pub mod input;
pub mod movement;
pub mod platform;
pub mod shape;
pub mod state;
pub mod terrain;
pub mod tick;

pub use commands::{Command, CommandBuffer};
pub use dynamics::Dynamics;
pub use entity::{EntityId, EntityStore};
pub use error::{SimError, SimResult};
pub use input::{Action, ActionBuffer, Direction, StampedAction};
pub use movement::can_jump;
pub use platform::approached_from_above;
pub use shape::{Contact, Shape, SurfaceKind, classify_normal};
pub use state::{
    Body, Entity, EntityKind, Ground, Grounded, IgnoreEntry, IgnoreList, JumpState, NEVER,
    Player, PositionHistory, WallSide, World,
};
pub use tick::{ErrorPolicy, Simulation, System};
