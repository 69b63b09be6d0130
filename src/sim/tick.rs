//! Fixed timestep simulation tick
//!
//! Every tick runs the same ordered pipeline of systems over the world:
//! forces, player movement, integration, shape refresh, terrain and platform
//! collision, then the expiry sweepers. The order is part of the behavior:
//! collisions must see integrated positions, and the sweepers must run after
//! collisions had a chance to refresh this tick's contacts.

use super::dynamics::{apply_horizontal_damping, gravity_force, horizontal_friction_force};
use super::error::SimResult;
use super::expiry::{GroundExpirySystem, IgnoreExpirySystem};
use super::movement::MovementSystem;
use super::platform::PlatformCollisionSystem;
use super::state::World;
use super::terrain::BlockCollisionSystem;
use crate::Tick;
use crate::settings::Tuning;

/// One stage of the per-tick pipeline
pub trait System {
    fn name(&self) -> &'static str;

    /// Transform the world for the current tick
    fn run(&mut self, world: &mut World, dt: f32) -> SimResult;
}

// === Force and motion stages ===

/// Adds weight to every dynamic body
pub struct GravitySystem {
    tuning: Tuning,
}

impl System for GravitySystem {
    fn name(&self) -> &'static str {
        "gravity"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        for id in world.iter_ids() {
            let dynamics = &mut world.get_mut(id)?.body.dynamics;
            if dynamics.is_static() {
                continue;
            }
            dynamics.add_force(gravity_force(dynamics.mass(), self.tuning.gravity_px()));
        }
        Ok(())
    }
}

/// Horizontal friction force plus velocity damping
pub struct FrictionSystem {
    tuning: Tuning,
}

impl System for FrictionSystem {
    fn name(&self) -> &'static str {
        "friction"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        for id in world.iter_ids() {
            let dynamics = &mut world.get_mut(id)?.body.dynamics;
            if dynamics.is_static() {
                continue;
            }
            dynamics.add_force(horizontal_friction_force(dynamics.vel, self.tuning.friction));
            apply_horizontal_damping(dynamics, self.tuning.damping);
        }
        Ok(())
    }
}

pub struct IntegrationSystem;

impl System for IntegrationSystem {
    fn name(&self) -> &'static str {
        "integration"
    }

    fn run(&mut self, world: &mut World, dt: f32) -> SimResult {
        for id in world.iter_ids() {
            let body = &mut world.get_mut(id)?.body;
            body.dynamics.integrate(&mut body.pos, dt);
        }
        Ok(())
    }
}

/// Brings world-space shapes in line with integrated positions
pub struct TransformSystem;

impl System for TransformSystem {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        for id in world.iter_ids() {
            world.get_mut(id)?.body.refresh_shape();
        }
        Ok(())
    }
}

// === Simulation loop ===

/// What `Simulation::step` does when a system fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the tick and return the error
    #[default]
    Halt,
    /// Log the failure and carry on with the next system
    LogAndContinue,
}

/// The ordered default pipeline
pub fn default_pipeline(tuning: Tuning) -> Vec<Box<dyn System + Send>> {
    vec![
        Box::new(GravitySystem { tuning }),
        Box::new(FrictionSystem { tuning }),
        Box::new(MovementSystem::new(tuning)),
        Box::new(IntegrationSystem),
        Box::new(TransformSystem),
        Box::new(BlockCollisionSystem::new()),
        Box::new(PlatformCollisionSystem::new(tuning)),
        Box::new(GroundExpirySystem::new(tuning)),
        Box::new(IgnoreExpirySystem::new(tuning)),
    ]
}

/// A world plus the pipeline that advances it
pub struct Simulation {
    world: World,
    tuning: Tuning,
    pipeline: Vec<Box<dyn System + Send>>,
    policy: ErrorPolicy,
}

impl Simulation {
    pub fn new(tuning: Tuning) -> Self {
        Self::with_world(World::new(), tuning)
    }

    pub fn with_world(world: World, tuning: Tuning) -> Self {
        Self {
            world,
            tuning,
            pipeline: default_pipeline(tuning),
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn tick(&self) -> Tick {
        self.world.tick()
    }

    /// Tick the next `step` will simulate (stamp inputs with this)
    pub fn next_tick(&self) -> Tick {
        self.world.tick() + 1
    }

    /// Advance the tick counter and run every system once
    pub fn step(&mut self, dt: f32) -> SimResult {
        let tick = self.world.advance_tick();

        for system in self.pipeline.iter_mut() {
            if let Err(err) = system.run(&mut self.world, dt) {
                match self.policy {
                    ErrorPolicy::Halt => {
                        log::error!("{} failed at tick {tick}: {err}", system.name());
                        return Err(err);
                    }
                    ErrorPolicy::LogAndContinue => {
                        log::warn!("{} failed at tick {tick}: {err}", system.name());
                    }
                }
            }
        }
        Ok(())
    }

    /// Step `ticks` times, stopping at the first error
    pub fn run_for(&mut self, ticks: u32, dt: f32) -> SimResult {
        for _ in 0..ticks {
            self.step(dt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::bot::Bot;
    use crate::consts::SIM_DT;
    use crate::scene;
    use crate::sim::entity::EntityId;
    use crate::sim::error::SimError;
    use crate::sim::input::Action;
    use crate::sim::state::Ground;

    /// Floor top at y = 480
    fn floor_scene() -> (Simulation, EntityId) {
        let mut sim = Simulation::new(Tuning::default());
        let world = sim.world_mut();
        scene::spawn_block(world, Vec2::new(400.0, 500.0), Vec2::new(800.0, 40.0));
        let player = scene::spawn_player(world, Vec2::new(100.0, 400.0));
        (sim, player)
    }

    fn bottom(sim: &Simulation, id: EntityId) -> f32 {
        let body = &sim.world().get(id).unwrap().body;
        body.pos.y + body.shape.half_extents().y
    }

    fn ground(sim: &Simulation, id: EntityId) -> Ground {
        sim.world().player(id).unwrap().ground
    }

    #[test]
    fn test_player_falls_and_lands_on_floor() {
        let (mut sim, player) = floor_scene();
        sim.run_for(60, SIM_DT).unwrap();

        assert_eq!(sim.tick(), 60);
        assert!((bottom(&sim, player) - 480.0).abs() < 1.5);
        let g = *ground(&sim, player).grounded().unwrap();
        assert_eq!(g.last_touch, 60);
        assert!(g.landed < 40);
    }

    #[test]
    fn test_jump_after_landing() {
        let (mut sim, player) = floor_scene();
        sim.run_for(60, SIM_DT).unwrap();
        let y_before = sim.world().get(player).unwrap().body.pos.y;

        let stamp = sim.next_tick();
        sim.world_mut().push_action(player, Action::Jump, stamp).unwrap();
        sim.step(SIM_DT).unwrap();
        assert_eq!(sim.world().player(player).unwrap().jump.last_jump, stamp);
        assert!(sim.world().get(player).unwrap().body.pos.y < y_before);

        // Still inside the coyote window, but already jumped since the last touch
        let again = sim.next_tick();
        sim.world_mut().push_action(player, Action::Jump, again).unwrap();
        sim.step(SIM_DT).unwrap();
        assert_eq!(sim.world().player(player).unwrap().jump.last_jump, stamp);
    }

    #[test]
    fn test_ground_expires_after_leaving() {
        let (mut sim, player) = floor_scene();
        sim.run_for(60, SIM_DT).unwrap();

        let stamp = sim.next_tick();
        sim.world_mut().push_action(player, Action::Jump, stamp).unwrap();
        sim.step(SIM_DT).unwrap();
        let last_touch = ground(&sim, player).grounded().unwrap().last_touch;
        assert_eq!(last_touch, stamp - 1);

        // Airborne for the whole window: the record lingers through +15
        while sim.tick() < last_touch + 15 {
            sim.step(SIM_DT).unwrap();
            assert!(ground(&sim, player).grounded().is_some(), "tick {}", sim.tick());
        }
        sim.step(SIM_DT).unwrap();
        assert_eq!(ground(&sim, player), Ground::Airborne);
    }

    #[test]
    fn test_walks_across_floor() {
        let (mut sim, player) = floor_scene();
        sim.run_for(60, SIM_DT).unwrap();
        let x_before = sim.world().get(player).unwrap().body.pos.x;

        for _ in 0..30 {
            let stamp = sim.next_tick();
            sim.world_mut().push_action(player, Action::Right, stamp).unwrap();
            sim.step(SIM_DT).unwrap();
        }

        let x_after = sim.world().get(player).unwrap().body.pos.x;
        assert!(x_after > x_before + 30.0);
        assert!((bottom(&sim, player) - 480.0).abs() < 1.5);
        assert!(ground(&sim, player).touched_last_tick(sim.tick() + 1));
    }

    #[test]
    fn test_drop_through_platform() {
        let mut sim = Simulation::new(Tuning::default());
        let world = sim.world_mut();
        scene::spawn_block(world, Vec2::new(400.0, 700.0), Vec2::new(800.0, 40.0));
        let platform = scene::spawn_platform(world, Vec2::new(100.0, 380.0), 0.0);
        let player = scene::spawn_player(world, Vec2::new(100.0, 300.0));

        sim.run_for(40, SIM_DT).unwrap();
        assert!((bottom(&sim, player) - 372.0).abs() < 1.5);
        assert!(ground(&sim, player).grounded().is_some());

        let stamp = sim.next_tick();
        sim.world_mut().push_action(player, Action::Down, stamp).unwrap();
        sim.step(SIM_DT).unwrap();
        let entry = *sim
            .world()
            .player(player)
            .unwrap()
            .ignore
            .as_ref()
            .unwrap()
            .entry(platform)
            .unwrap();
        assert_eq!(entry.last_active, stamp);

        sim.run_for(15, SIM_DT).unwrap();
        assert!(bottom(&sim, player) > 372.0 + 15.0);

        // Keeps falling once the window closes and lands on the floor below
        sim.run_for(120, SIM_DT).unwrap();
        assert!((bottom(&sim, player) - 680.0).abs() < 1.5);
        assert!(sim.world().player(player).unwrap().ignore.is_none());
    }

    struct Fails;

    impl System for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }

        fn run(&mut self, _world: &mut World, _dt: f32) -> SimResult {
            Err(SimError::StructuralMutation {
                id: EntityId {
                    index: 0,
                    generation: 0,
                },
                reason: "test",
            })
        }
    }

    #[test]
    fn test_halt_policy_stops_the_tick() {
        let (mut sim, player) = floor_scene();
        sim.pipeline.insert(0, Box::new(Fails));

        assert!(matches!(
            sim.step(SIM_DT),
            Err(SimError::StructuralMutation { reason: "test", .. })
        ));
        // Counter advanced, nothing after the failure ran
        assert_eq!(sim.tick(), 1);
        assert_eq!(
            sim.world().get(player).unwrap().body.pos,
            Vec2::new(100.0, 400.0)
        );
    }

    #[test]
    fn test_log_and_continue_policy_finishes_tick() {
        let (sim, player) = floor_scene();
        let mut sim = sim.with_policy(ErrorPolicy::LogAndContinue);
        sim.pipeline.insert(0, Box::new(Fails));

        assert!(sim.step(SIM_DT).is_ok());
        assert!(sim.world().get(player).unwrap().body.pos.y > 400.0);
    }

    fn bot_run(seed: u64, ticks: u32) -> u64 {
        let (world, player) = scene::demo_scene();
        let mut sim = Simulation::with_world(world, Tuning::default());
        let mut bot = Bot::new(seed);
        for _ in 0..ticks {
            bot.drive(sim.world_mut(), player).unwrap();
            sim.step(SIM_DT).unwrap();
        }
        sim.world().digest()
    }

    #[test]
    fn test_determinism() {
        assert_eq!(bot_run(7, 600), bot_run(7, 600));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_same_inputs_same_state(seed in any::<u64>(), ticks in 1u32..240) {
            prop_assert_eq!(bot_run(seed, ticks), bot_run(seed, ticks));
        }
    }
}
