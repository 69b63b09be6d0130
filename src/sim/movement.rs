//! Player movement: horizontal steering, jumping and drop-through requests
//!
//! Runs before integration, so everything here only touches velocity and
//! bookkeeping. Three passes in order: horizontal, jump, down.

use glam::Vec2;

use super::commands::CommandBuffer;
use super::entity::EntityId;
use super::error::{SimError, SimResult};
use super::input::{Action, Direction, StampedAction};
use super::shape::{SurfaceKind, classify_normal};
use super::state::{Body, Grounded, JumpState, Player, World};
use super::tick::System;
use crate::Tick;
use crate::settings::Tuning;

/// Jump gate: no double jump, then either a coyote-time press or a buffered one
///
/// - coyote: pressed at or after the last touch, within `coyote_time` of it
/// - buffered: pressed at most `input_buffer_ticks` before the last touch
pub fn can_jump(
    tick: Tick,
    grounded: &Grounded,
    jump: &JumpState,
    stamped: &StampedAction,
    tuning: &Tuning,
) -> bool {
    let not_jumped_since_touch = jump.last_jump < grounded.last_touch;

    let within_coyote = tick - grounded.last_touch <= tuning.coyote_time;
    let direct = stamped.tick >= grounded.last_touch;

    let buffered = stamped.tick <= grounded.last_touch
        && grounded.last_touch - stamped.tick <= tuning.input_buffer_ticks;

    not_jumped_since_touch && ((within_coyote && direct) || buffered)
}

/// Velocity to apply when moving along a slope
///
/// Uphill only steers X and lets the contact push the body up; downhill steers
/// both axes so the body follows the surface instead of skipping off it.
pub fn slope_velocity(normal: Vec2, direction: Direction, speed: f32, current: Vec2) -> Vec2 {
    let sign = direction.sign();
    let tangent = Vec2::new(normal.y, -normal.x) * sign;
    let uphill = sign * normal.x > 0.0;

    if uphill {
        Vec2::new(tangent.x * speed, current.y)
    } else {
        tangent * speed
    }
}

pub struct MovementSystem {
    tuning: Tuning,
    commands: CommandBuffer,
}

impl MovementSystem {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            commands: CommandBuffer::new(),
        }
    }

    fn player_parts(world: &mut World, id: EntityId) -> SimResult<(&mut Body, &mut Player)> {
        world
            .get_mut(id)?
            .split_player_mut()
            .ok_or(SimError::EntityLookup { id })
    }

    fn handle_horizontal(&self, world: &mut World, players: &[EntityId]) -> SimResult {
        let tick = world.tick();
        let tuning = &self.tuning;

        for &id in players {
            let (body, player) = Self::player_parts(world, id)?;
            let vel = &mut body.dynamics.vel;

            let pressed_left = player.actions.consume(Action::Left).is_some();
            if pressed_left {
                player.direction = Direction::Left;
            }
            let pressed_right = player.actions.consume(Action::Right).is_some();
            if pressed_right {
                player.direction = Direction::Right;
            }
            let moving = pressed_left || pressed_right;
            let steer = player.direction.sign() * tuning.speed_x;

            let normal = match player.ground.grounded() {
                Some(g) if g.last_touch == tick - 1 => g.slope_normal,
                // Airborne, or lingering only for coyote time
                _ => {
                    if moving {
                        vel.x = steer;
                    }
                    continue;
                }
            };

            vel.y = vel.y.max(tuning.snap_force);

            if !moving {
                continue;
            }
            if classify_normal(normal) == SurfaceKind::Flat {
                vel.x = steer;
            } else {
                *vel = slope_velocity(normal, player.direction, tuning.speed_x, *vel);
            }
        }
        Ok(())
    }

    fn handle_jump(&self, world: &mut World, players: &[EntityId]) -> SimResult {
        let tick = world.tick();

        for &id in players {
            let (body, player) = Self::player_parts(world, id)?;
            let Some(grounded) = player.ground.grounded().copied() else {
                continue;
            };
            let Some(stamped) = player.actions.consume(Action::Jump) else {
                continue;
            };

            if can_jump(tick, &grounded, &player.jump, &stamped, &self.tuning) {
                body.dynamics.vel.y = -self.tuning.jump_force;
                body.dynamics.accel.y = -self.tuning.jump_force;
                player.jump.last_jump = tick;
                log::debug!("{id} jumped at tick {tick} (pressed {})", stamped.tick);
            } else {
                log::trace!("{id} jump refused at tick {tick} (pressed {})", stamped.tick);
            }
        }
        Ok(())
    }

    fn handle_down(&mut self, world: &mut World, players: &[EntityId]) -> SimResult {
        let tick = world.tick();

        for &id in players {
            let (_, player) = Self::player_parts(world, id)?;
            if !player.ground.touched_last_tick(tick) || player.jump.last_jump == tick {
                continue;
            }
            let Some(stamped) = player.actions.consume(Action::Down) else {
                continue;
            };
            if tick - stamped.tick > self.tuning.drop_window {
                log::trace!("{id} stale down press from tick {} dropped", stamped.tick);
                continue;
            }
            log::debug!("{id} requested drop-through at tick {tick}");
            self.commands.add_ignore_list(id);
        }
        Ok(())
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        self.commands = CommandBuffer::new();
        let players = world.players();

        self.handle_horizontal(world, &players)?;
        self.handle_jump(world, &players)?;
        self.handle_down(world, &players)?;

        self.commands.flush(world)
    }
}
