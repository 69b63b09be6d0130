//! Scene composition helpers
//!
//! Sizes match the stock art: an 18x58 player, 144x16 one-way platforms and
//! 250x46 double ramps.

use glam::Vec2;

use crate::sim::dynamics::Dynamics;
use crate::sim::entity::EntityId;
use crate::sim::shape::Shape;
use crate::sim::state::{Body, EntityKind, Player, World};

pub const PLAYER_WIDTH: f32 = 18.0;
pub const PLAYER_HEIGHT: f32 = 58.0;
pub const PLAYER_MASS: f32 = 10.0;

pub const PLATFORM_WIDTH: f32 = 144.0;
pub const PLATFORM_HEIGHT: f32 = 16.0;

pub const RAMP_WIDTH: f32 = 250.0;
pub const RAMP_HEIGHT: f32 = 46.0;
/// Flat top of a ramp as a fraction of its base
pub const RAMP_TOP_RATIO: f32 = 0.2;

/// Player centered at `pos`, facing right, airborne
pub fn spawn_player(world: &mut World, pos: Vec2) -> EntityId {
    let body = Body::new(
        pos,
        0.0,
        Shape::rectangle(PLAYER_WIDTH, PLAYER_HEIGHT),
        Dynamics::new(PLAYER_MASS),
    );
    world.spawn(body, EntityKind::Player(Player::default()))
}

/// Solid rectangle of `size` centered at `pos`
pub fn spawn_block(world: &mut World, pos: Vec2, size: Vec2) -> EntityId {
    let body = Body::new(pos, 0.0, Shape::rectangle(size.x, size.y), Dynamics::fixed());
    world.spawn(body, EntityKind::Block)
}

/// Solid double ramp resting with its base centered under `pos`
pub fn spawn_ramp(world: &mut World, pos: Vec2) -> EntityId {
    let body = Body::new(
        pos,
        0.0,
        Shape::double_ramp(RAMP_WIDTH, RAMP_HEIGHT, RAMP_TOP_RATIO),
        Dynamics::fixed(),
    );
    world.spawn(body, EntityKind::Block)
}

/// One-way platform; `rotation` in radians tilts its top edge
pub fn spawn_platform(world: &mut World, pos: Vec2, rotation: f32) -> EntityId {
    let body = Body::new(
        pos,
        rotation,
        Shape::triangular_platform(PLATFORM_WIDTH, PLATFORM_HEIGHT),
        Dynamics::fixed(),
    );
    world.spawn(body, EntityKind::Platform)
}

/// Small test level: a walled floor, a ramp, and a few platforms to drop through
///
/// Returns the world and the player.
pub fn demo_scene() -> (World, EntityId) {
    let mut world = World::new();

    // Floor (top at y = 580) and walls
    spawn_block(&mut world, Vec2::new(480.0, 600.0), Vec2::new(960.0, 40.0));
    spawn_block(&mut world, Vec2::new(-20.0, 300.0), Vec2::new(40.0, 640.0));
    spawn_block(&mut world, Vec2::new(980.0, 300.0), Vec2::new(40.0, 640.0));

    spawn_ramp(&mut world, Vec2::new(640.0, 557.0));

    spawn_platform(&mut world, Vec2::new(200.0, 480.0), 0.0);
    spawn_platform(&mut world, Vec2::new(360.0, 400.0), 0.0);
    spawn_platform(&mut world, Vec2::new(560.0, 420.0), -0.2);
    spawn_platform(&mut world, Vec2::new(780.0, 340.0), 0.15);

    let player = spawn_player(&mut world, Vec2::new(200.0, 380.0));
    log::info!("Demo scene ready: {} entities", world.len());
    (world, player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::shape::{SurfaceKind, check};

    #[test]
    fn test_demo_scene_composition() {
        let (world, player) = demo_scene();
        assert_eq!(world.players(), vec![player]);
        assert_eq!(world.blocks().len(), 4);
        assert_eq!(world.platforms().len(), 4);
    }

    #[test]
    fn test_ramp_surfaces() {
        let mut world = World::new();
        let ramp = spawn_ramp(&mut world, Vec2::new(0.0, 0.0));
        let ramp_shape = &world.get(ramp).unwrap().body.shape;

        // Flat middle section
        let mut player = Shape::rectangle(PLAYER_WIDTH, PLAYER_HEIGHT);
        player.refresh(Vec2::new(0.0, -51.0), 0.0);
        let top = check(&player, ramp_shape).unwrap();
        assert_eq!(top.surface(), SurfaceKind::Flat);
        assert!(top.is_top_b());

        // Right-hand slope, bottom-left corner just under the surface
        player.refresh(Vec2::new(80.0, -29.0), 0.0);
        let slope = check(&player, ramp_shape).unwrap();
        assert_eq!(slope.surface(), SurfaceKind::Sloped);
        assert!(slope.is_top_b());
        // Surface falls away to the right
        assert!(slope.normal.x < 0.0);
    }
}
