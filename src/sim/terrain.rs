//! Solid terrain collision
//!
//! Blocks are solid from every side. Ramps resolve vertically so a player
//! standing on them does not slide, and top contacts ground the player.

use super::commands::CommandBuffer;
use super::entity::EntityId;
use super::error::{SimError, SimResult};
use super::shape::{self, Contact, SurfaceKind};
use super::state::{Body, WallSide, World};
use super::tick::System;

/// How a block contact should be corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Skip: corner snag while rising, or ceiling while falling
    Reject,
    /// Separate along Y only (sloped contact)
    Vertical,
    /// Separate along the contact normal
    Full,
}

/// Decide how to correct a player/block contact
///
/// The contact is oriented from the player (A) toward the block (B).
pub fn classify_correction(contact: &Contact, player_vel_y: f32) -> Correction {
    let sloped = contact.surface() == SurfaceKind::Sloped;

    if contact.is_top_b() && player_vel_y < 0.0 && !sloped {
        return Correction::Reject;
    }
    if contact.is_top_a() && player_vel_y > 0.0 {
        return Correction::Reject;
    }
    if sloped {
        Correction::Vertical
    } else {
        Correction::Full
    }
}

#[derive(Default)]
pub struct BlockCollisionSystem {
    commands: CommandBuffer,
}

impl BlockCollisionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_pair(
        &mut self,
        world: &mut World,
        block_id: EntityId,
        block: &mut Body,
        player_id: EntityId,
    ) -> SimResult {
        let tick = world.tick();
        let (body, player) = world
            .get_mut(player_id)?
            .split_player_mut()
            .ok_or(SimError::EntityLookup { id: player_id })?;

        let Some(contact) = shape::check(&body.shape, &block.shape) else {
            return Ok(());
        };

        match classify_correction(&contact, body.dynamics.vel.y) {
            Correction::Reject => {
                log::trace!("{player_id} contact with block {block_id} rejected");
                return Ok(());
            }
            Correction::Vertical => shape::resolve_vertical(
                &mut body.pos,
                &mut block.pos,
                &mut body.dynamics,
                &mut block.dynamics,
                &contact,
            ),
            Correction::Full => shape::resolve(
                &mut body.pos,
                &mut block.pos,
                &mut body.dynamics,
                &mut block.dynamics,
                &contact,
            ),
        }
        body.refresh_shape();

        if !contact.is_top_a() && !contact.is_top_b() {
            player.wall = Some(WallSide::of(body.pos, block.pos));
        }

        if contact.is_top_b()
            && player.touch_ground(player_id, tick, contact.normal, &mut self.commands)
        {
            log::debug!("{player_id} landed on block {block_id} at tick {tick}");
        }
        Ok(())
    }
}

impl System for BlockCollisionSystem {
    fn name(&self) -> &'static str {
        "block_collision"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        self.commands = CommandBuffer::new();
        let blocks = world.blocks();
        let players = world.players();

        for &id in &players {
            world.player_mut(id)?.wall = None;
        }

        for &block_id in &blocks {
            let mut block = world.get(block_id)?.body.clone();
            let movable = !block.dynamics.is_static();

            for &player_id in &players {
                self.resolve_pair(world, block_id, &mut block, player_id)?;
            }

            if movable {
                block.refresh_shape();
                world.get_mut(block_id)?.body = block;
            }
        }

        self.commands.flush(world)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::Tick;
    use crate::scene;
    use crate::sim::dynamics::Dynamics;
    use crate::sim::shape::Shape;
    use crate::sim::state::{EntityKind, Ground, Grounded, Player};

    const DT: f32 = 1.0 / 60.0;

    fn floor(world: &mut World) -> EntityId {
        world.spawn(
            Body::new(
                Vec2::new(400.0, 500.0),
                0.0,
                Shape::rectangle(800.0, 40.0),
                Dynamics::fixed(),
            ),
            EntityKind::Block,
        )
    }

    fn player_at(world: &mut World, pos: Vec2, vel: Vec2) -> EntityId {
        let mut dynamics = Dynamics::new(10.0);
        dynamics.vel = vel;
        world.spawn(
            Body::new(pos, 0.0, Shape::rectangle(18.0, 58.0), dynamics),
            EntityKind::Player(Player::default()),
        )
    }

    fn run_at(world: &mut World, tick: Tick) {
        world.set_tick(tick);
        BlockCollisionSystem::new().run(world, DT).unwrap();
    }

    #[test]
    fn test_classify_correction() {
        let flat_top = Contact {
            normal: Vec2::Y,
            depth: 1.0,
        };
        assert_eq!(classify_correction(&flat_top, 10.0), Correction::Full);
        assert_eq!(classify_correction(&flat_top, -10.0), Correction::Reject);

        let slope = Contact {
            normal: Vec2::new(0.6, 0.8),
            depth: 1.0,
        };
        assert_eq!(classify_correction(&slope, -10.0), Correction::Vertical);

        let ceiling = Contact {
            normal: Vec2::NEG_Y,
            depth: 1.0,
        };
        assert_eq!(classify_correction(&ceiling, 10.0), Correction::Reject);
        assert_eq!(classify_correction(&ceiling, -10.0), Correction::Full);

        let wall = Contact {
            normal: Vec2::X,
            depth: 1.0,
        };
        assert_eq!(classify_correction(&wall, 0.0), Correction::Full);
    }

    #[test]
    fn test_landing_pushes_out_and_grounds() {
        let mut world = World::new();
        floor(&mut world);
        // Bottom at 482, floor top at 480
        let id = player_at(&mut world, Vec2::new(100.0, 453.0), Vec2::new(0.0, 100.0));
        run_at(&mut world, 30);

        let body = &world.get(id).unwrap().body;
        assert!((body.pos.y - 451.0).abs() < 1e-3);
        assert!(body.dynamics.vel.y.abs() < 1e-3);

        let ground = world.player(id).unwrap().ground;
        let g = ground.grounded().unwrap();
        assert_eq!((g.last_touch, g.landed), (30, 30));
        assert_eq!(g.slope_normal, Vec2::Y);
    }

    #[test]
    fn test_continuing_contact_refreshes_last_touch() {
        let mut world = World::new();
        floor(&mut world);
        let id = player_at(&mut world, Vec2::new(100.0, 452.0), Vec2::new(0.0, 40.0));
        world.player_mut(id).unwrap().ground = Ground::Grounded(Grounded {
            last_touch: 30,
            landed: 20,
            slope_normal: Vec2::Y,
        });
        run_at(&mut world, 31);

        let g = *world.player(id).unwrap().ground.grounded().unwrap();
        assert_eq!((g.last_touch, g.landed), (31, 20));
    }

    #[test]
    fn test_missed_tick_is_fresh_landing() {
        let mut world = World::new();
        floor(&mut world);
        let id = player_at(&mut world, Vec2::new(100.0, 452.0), Vec2::new(0.0, 40.0));
        world.player_mut(id).unwrap().ground = Ground::Grounded(Grounded {
            last_touch: 28,
            landed: 20,
            slope_normal: Vec2::Y,
        });
        run_at(&mut world, 31);

        let g = *world.player(id).unwrap().ground.grounded().unwrap();
        assert_eq!((g.last_touch, g.landed), (31, 31));
    }

    #[test]
    fn test_rising_through_top_edge_is_ignored() {
        let mut world = World::new();
        floor(&mut world);
        let id = player_at(&mut world, Vec2::new(100.0, 452.0), Vec2::new(0.0, -200.0));
        run_at(&mut world, 5);

        let body = &world.get(id).unwrap().body;
        assert_eq!(body.pos, Vec2::new(100.0, 452.0));
        assert_eq!(world.player(id).unwrap().ground, Ground::Airborne);
    }

    #[test]
    fn test_ramp_slope_resolves_vertically() {
        let mut world = World::new();
        scene::spawn_ramp(&mut world, Vec2::ZERO);
        // Bottom-left corner about 1.8 px under the right-hand slope
        let start = Vec2::new(80.0, -29.0);
        let id = player_at(&mut world, start, Vec2::new(0.0, 60.0));
        run_at(&mut world, 12);

        let body = &world.get(id).unwrap().body;
        assert_eq!(body.pos.x, start.x);
        assert!(body.pos.y < start.y);
        assert!(body.dynamics.vel.y.abs() < 1e-3);

        let player = world.player(id).unwrap();
        assert_eq!(player.wall, None);
        let g = *player.ground.grounded().unwrap();
        assert_eq!((g.last_touch, g.landed), (12, 12));
        // Slope rises 46 over 100 toward the flat top
        let slope = Vec2::new(-46.0, 100.0).normalize();
        assert!((g.slope_normal - slope).length() < 1e-3);
    }

    #[test]
    fn test_wall_contact_records_side() {
        let mut world = World::new();
        world.spawn(
            Body::new(
                Vec2::new(200.0, 300.0),
                0.0,
                Shape::rectangle(40.0, 200.0),
                Dynamics::fixed(),
            ),
            EntityKind::Block,
        );
        // Player's right edge at 182, wall's left edge at 180
        let id = player_at(&mut world, Vec2::new(173.0, 300.0), Vec2::new(120.0, 0.0));
        run_at(&mut world, 5);

        let body = &world.get(id).unwrap().body;
        assert!((body.pos.x - 171.0).abs() < 1e-3);
        assert!(body.dynamics.vel.x.abs() < 1e-3);
        let player = world.player(id).unwrap();
        assert_eq!(player.wall, Some(WallSide::Right));
        assert_eq!(player.ground, Ground::Airborne);
    }
}
