//! Deferred structural mutations
//!
//! Systems never change an entity's ground state or drop its ignore list while
//! walking a snapshot. They queue a command instead, and the buffer is flushed
//! once the pass over all entities has finished.

use super::entity::EntityId;
use super::error::{SimError, SimResult};
use super::state::{Ground, Grounded, World};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start a fresh grounded episode
    Land { id: EntityId, grounded: Grounded },
    ClearGround { id: EntityId },
    /// Attach an empty ignore list (kept as-is if one already exists)
    AddIgnoreList { id: EntityId },
    RemoveIgnoreList { id: EntityId },
}

impl Command {
    pub fn target(&self) -> EntityId {
        match *self {
            Command::Land { id, .. }
            | Command::ClearGround { id }
            | Command::AddIgnoreList { id }
            | Command::RemoveIgnoreList { id } => id,
        }
    }
}

/// Commands queued during one system pass, applied in push order
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    queue: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    pub fn land(&mut self, id: EntityId, grounded: Grounded) {
        self.push(Command::Land { id, grounded });
    }

    pub fn clear_ground(&mut self, id: EntityId) {
        self.push(Command::ClearGround { id });
    }

    pub fn add_ignore_list(&mut self, id: EntityId) {
        self.push(Command::AddIgnoreList { id });
    }

    pub fn remove_ignore_list(&mut self, id: EntityId) {
        self.push(Command::RemoveIgnoreList { id });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply and drain every queued command
    ///
    /// Stops at the first command whose target is gone; the rest are dropped.
    pub fn flush(&mut self, world: &mut World) -> SimResult {
        for command in self.queue.drain(..) {
            let id = command.target();
            let player = world
                .player_mut(id)
                .map_err(|_| SimError::StructuralMutation {
                    id,
                    reason: "entity no longer alive",
                })?;
            match command {
                Command::Land { grounded, .. } => {
                    log::trace!("{id} landed at tick {}", grounded.landed);
                    player.ground = Ground::Grounded(grounded);
                }
                Command::ClearGround { .. } => player.ground = Ground::Airborne,
                Command::AddIgnoreList { .. } => {
                    player.ignore.get_or_insert_with(Box::default);
                }
                Command::RemoveIgnoreList { .. } => player.ignore = None,
            }
        }
        Ok(())
    }
}
