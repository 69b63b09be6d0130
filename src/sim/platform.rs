//! One-way platform collision
//!
//! Platforms only hold a player that comes down onto them from above. A single
//! overlap test can't tell "falling onto" from "pushed into from below", so
//! each player carries a short history of past positions and the resolver
//! looks for any sample that was above the platform's top edge.

use glam::Vec2;

use super::commands::CommandBuffer;
use super::entity::EntityId;
use super::error::{SimError, SimResult};
use super::shape;
use super::state::{Body, PositionHistory, World};
use super::tick::System;
use crate::settings::Tuning;

// === Approach detection ===

/// Minimum height above a rotated top edge that counts as "above"
const MIN_ABOVE: f32 = 1.0;
/// Samples this far above the edge or more are ignored
const MAX_ABOVE: f32 = 75.0;
/// Slack past either end of the edge
const EDGE_MARGIN: f32 = 10.0;
/// Shorter edges are degenerate
const MIN_EDGE_LENGTH: f32 = 1e-3;

/// Rounding slack for the flat check
///
/// A player resolved onto a flat top sits at `top` up to float error, and must
/// still count as above on the next tick.
const FLAT_TOLERANCE: f32 = 1e-3;

/// Whether any historical position puts the player above the platform's top edge
///
/// The top edge runs from world vertex 0 to vertex 1.
pub fn approached_from_above(
    history: &PositionHistory,
    platform: &Body,
    player_half_extents: Vec2,
) -> bool {
    let verts = platform.shape.world_vertices();
    if verts.len() < 2 {
        return false;
    }

    if platform.rotation == 0.0 {
        let top = verts[0].y;
        return history
            .iter()
            .any(|p| p.y + player_half_extents.y <= top + FLAT_TOLERANCE);
    }

    let (start, end) = (verts[0], verts[1]);
    let edge = end - start;
    let length = edge.length();
    if length < MIN_EDGE_LENGTH {
        return false;
    }
    let tangent = edge / length;
    let mut normal = Vec2::new(-tangent.y, tangent.x);
    if normal.dot(Vec2::NEG_Y) < 0.0 {
        normal = -normal;
    }

    let Vec2 { x: hw, y: hh } = player_half_extents;
    history.iter().any(|p| {
        let bottom = p.y + hh;
        [p.x, p.x - hw, p.x + hw].into_iter().any(|x| {
            let offset = Vec2::new(x, bottom) - start;
            let above = offset.dot(normal);
            let along = offset.dot(tangent);
            (MIN_ABOVE..MAX_ABOVE).contains(&above)
                && (-EDGE_MARGIN..=length + EDGE_MARGIN).contains(&along)
        })
    })
}

pub struct PlatformCollisionSystem {
    tuning: Tuning,
    commands: CommandBuffer,
}

impl PlatformCollisionSystem {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            commands: CommandBuffer::new(),
        }
    }

    fn resolve_pair(
        &mut self,
        world: &mut World,
        platform_id: EntityId,
        platform: &mut Body,
        player_id: EntityId,
    ) -> SimResult {
        let tick = world.tick();
        let (body, player) = world
            .get_mut(player_id)?
            .split_player_mut()
            .ok_or(SimError::EntityLookup { id: player_id })?;

        let Some(contact) = shape::check(&body.shape, &platform.shape) else {
            return Ok(());
        };

        if player
            .ignore
            .as_ref()
            .is_some_and(|list| list.is_ignoring(platform_id, tick, self.tuning.ignore_expiry))
        {
            // Samples from before the drop would re-land the player once the window closes
            player.history.clear();
            log::trace!("{player_id} passing through platform {platform_id}");
            return Ok(());
        }

        if body.dynamics.vel.y <= 0.0 || !contact.is_top_b() {
            return Ok(());
        }
        if !approached_from_above(&player.history, platform, body.shape.half_extents()) {
            log::trace!("{player_id} below platform {platform_id}, not resolving");
            return Ok(());
        }

        shape::resolve_vertical(
            &mut body.pos,
            &mut platform.pos,
            &mut body.dynamics,
            &mut platform.dynamics,
            &contact,
        );
        body.refresh_shape();

        if player.touch_ground(player_id, tick, contact.normal, &mut self.commands) {
            log::debug!("{player_id} landed on platform {platform_id} at tick {tick}");
        }

        // Re-landing while dropping through something else: mark this one too
        if let Some(slot) = player
            .ignore
            .as_mut()
            .and_then(|list| list.claim(platform_id, tick))
        {
            log::debug!(
                "{player_id} ignoring platform {platform_id} (slot {slot}) from tick {tick}"
            );
        }
        Ok(())
    }
}

impl System for PlatformCollisionSystem {
    fn name(&self) -> &'static str {
        "platform_collision"
    }

    fn run(&mut self, world: &mut World, _dt: f32) -> SimResult {
        self.commands = CommandBuffer::new();
        let platforms = world.platforms();
        let players = world.players();

        for &platform_id in &platforms {
            let mut platform = world.get(platform_id)?.body.clone();
            let movable = !platform.dynamics.is_static();

            for &player_id in &players {
                self.resolve_pair(world, platform_id, &mut platform, player_id)?;
            }

            if movable {
                platform.refresh_shape();
                world.get_mut(platform_id)?.body = platform;
            }
        }

        for &player_id in &players {
            let (body, player) = world
                .get_mut(player_id)?
                .split_player_mut()
                .ok_or(SimError::EntityLookup { id: player_id })?;
            player.history.push(body.pos);
        }

        self.commands.flush(world)
    }
}
