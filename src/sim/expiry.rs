//! End-of-tick sweepers for transient player state
//!
//! Both run after collisions so a contact this tick always refreshes its
//! record before the age check. Running either twice in one tick changes
//! nothing the second time.

use super::commands::CommandBuffer;
use super::error::SimResult;
use super::state::World;
use super::tick::System;
use crate::settings::Tuning;

/// Drops `Grounded` once the last touch is older than `ground_expiry`
pub struct GroundExpirySystem {
    tuning: Tuning,
    commands: CommandBuffer,
}

impl GroundExpirySystem {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            commands: CommandBuffer::new(),
        }
    }
}

impl System for GroundExpirySystem {
    fn name(&self) -> &'static str {
        "ground_expiry"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        self.commands = CommandBuffer::new();
        let tick = world.tick();

        for id in world.players() {
            let player = world.player(id)?;
            let Some(g) = player.ground.grounded() else {
                continue;
            };
            if tick - g.last_touch > self.tuning.ground_expiry {
                log::trace!("{id} airborne (last touch {})", g.last_touch);
                self.commands.clear_ground(id);
            }
        }

        self.commands.flush(world)
    }
}

/// Clears expired ignore slots and drops lists with nothing left
pub struct IgnoreExpirySystem {
    tuning: Tuning,
    commands: CommandBuffer,
}

impl IgnoreExpirySystem {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            commands: CommandBuffer::new(),
        }
    }
}

impl System for IgnoreExpirySystem {
    fn name(&self) -> &'static str {
        "ignore_expiry"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        self.commands = CommandBuffer::new();
        let tick = world.tick();

        for id in world.players() {
            let player = world.player_mut(id)?;
            let Some(list) = player.ignore.as_mut() else {
                continue;
            };
            // Slots are cleared in place; only the list removal is deferred
            if !list.sweep(tick, self.tuning.ignore_expiry) {
                self.commands.remove_ignore_list(id);
            }
        }

        self.commands.flush(world)
    }
}
