//! Seeded input script
//!
//! Wanders left and right with idle pauses and every so often presses Down or
//! Jump. Same seed, same presses on the same ticks, so two simulations driven
//! by equal bots must end in identical states.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::Tick;
use crate::sim::{Action, EntityId, SimResult, World};

/// Ticks between two presses
pub const ACTION_INTERVAL: Tick = 6;
/// State durations (ticks)
pub const MIN_STATE_TICKS: Tick = 30;
pub const MAX_STATE_TICKS: Tick = 180;

/// Chance per press that it becomes a Down
pub const DOWN_CHANCE: f32 = 0.1;
/// Chance per press that it becomes a Jump
pub const JUMP_CHANCE: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Idle,
    MovingLeft,
    MovingRight,
}

pub struct Bot {
    rng: Pcg32,
    state: BotState,
    state_ends: Tick,
}

impl Bot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            state: BotState::Idle,
            state_ends: Tick::MIN,
        }
    }

    fn choose_state(&mut self, tick: Tick) {
        let roll: f32 = self.rng.random();
        self.state = if roll < 0.35 {
            BotState::MovingLeft
        } else if roll < 0.70 {
            BotState::MovingRight
        } else {
            BotState::Idle
        };
        let duration = self.rng.random_range(MIN_STATE_TICKS..MAX_STATE_TICKS);
        self.state_ends = tick + duration;
        log::debug!("bot entering {:?} for {duration} ticks", self.state);
    }

    /// Press that the bot makes on `tick`, if any
    pub fn next_action(&mut self, tick: Tick) -> Option<Action> {
        if tick >= self.state_ends {
            self.choose_state(tick);
        }
        if tick.rem_euclid(ACTION_INTERVAL) != 0 {
            return None;
        }

        let mut action = match self.state {
            BotState::MovingLeft => Some(Action::Left),
            BotState::MovingRight => Some(Action::Right),
            BotState::Idle => None,
        };

        let roll: f32 = self.rng.random();
        if roll < DOWN_CHANCE {
            action = Some(Action::Down);
        } else if roll < DOWN_CHANCE + JUMP_CHANCE {
            action = Some(Action::Jump);
        }
        action
    }

    /// Queue this tick's press for `player`, stamped with the tick about to run
    pub fn drive(&mut self, world: &mut World, player: EntityId) -> SimResult {
        let tick = world.tick() + 1;
        if let Some(action) = self.next_action(tick) {
            world.push_action(player, action, tick)?;
        }
        Ok(())
    }
}
