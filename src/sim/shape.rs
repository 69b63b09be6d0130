//! Convex polygon shapes and overlap detection
//!
//! Screen coordinates: +Y points down. A contact normal points from shape A
//! toward shape B, so a player (A) standing on terrain (B) gets a normal of
//! roughly (0, 1).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::dynamics::Dynamics;

/// Normals with a smaller vertical component are corrected on both axes
const MIN_VERTICAL_NORMAL: f32 = 1e-3;

/// A convex polygon in local space with its cached world-space vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    local: Vec<Vec2>,
    world: Vec<Vec2>,
    /// Half size of the local axis-aligned bounding box
    half_extents: Vec2,
}

impl Shape {
    /// Build from local vertices (at least three, convex, consistent winding)
    pub fn from_vertices(local: Vec<Vec2>) -> Self {
        let (min, max) = local.iter().fold(
            (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
            |(min, max), v| (min.min(*v), max.max(*v)),
        );
        let half_extents = if local.is_empty() {
            Vec2::ZERO
        } else {
            (max - min) / 2.0
        };
        Self {
            world: local.clone(),
            local,
            half_extents,
        }
    }

    /// Axis-aligned rectangle centered on the origin
    pub fn rectangle(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::from_vertices(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Downward-pointing triangle; vertices 0 and 1 form the walkable top edge
    pub fn triangular_platform(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::from_vertices(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(0.0, hh),
        ])
    }

    /// Trapezoid with a flat top and a slope on each side
    ///
    /// `top_ratio` is the top width as a fraction of the base width.
    pub fn double_ramp(width: f32, height: f32, top_ratio: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let top_hw = hw * top_ratio.clamp(0.0, 1.0);
        Self::from_vertices(vec![
            Vec2::new(-top_hw, -hh),
            Vec2::new(top_hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Recompute world vertices for a body at `pos` rotated by `rotation` radians
    pub fn refresh(&mut self, pos: Vec2, rotation: f32) {
        if rotation == 0.0 {
            for (w, l) in self.world.iter_mut().zip(&self.local) {
                *w = *l + pos;
            }
        } else {
            let rot = Vec2::from_angle(rotation);
            for (w, l) in self.world.iter_mut().zip(&self.local) {
                *w = rot.rotate(*l) + pos;
            }
        }
    }

    #[inline]
    pub fn world_vertices(&self) -> &[Vec2] {
        &self.world
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    /// Mean of the world vertices
    pub fn centroid(&self) -> Vec2 {
        if self.world.is_empty() {
            return Vec2::ZERO;
        }
        self.world.iter().copied().sum::<Vec2>() / self.world.len() as f32
    }

    /// Min/max of the world vertices projected on `axis`
    fn project(&self, axis: Vec2) -> (f32, f32) {
        self.world
            .iter()
            .fold((f32::MAX, f32::MIN), |(min, max), v| {
                let d = v.dot(axis);
                (min.min(d), max.max(d))
            })
    }

    /// Unit edge normals (unoriented)
    fn axes(&self) -> impl Iterator<Item = Vec2> + '_ {
        let n = self.world.len();
        (0..n).filter_map(move |i| {
            let edge = self.world[(i + 1) % n] - self.world[i];
            let len = edge.length();
            // Divide instead of normalize() so axis-aligned edges give exact unit normals
            (len > f32::EPSILON).then(|| Vec2::new(-edge.y, edge.x) / len)
        })
    }
}

/// How a contact normal is classified for terrain resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Normal is exactly (0, ±1)
    Flat,
    /// Normal is exactly (±1, 0)
    Wall,
    /// Anything else
    Sloped,
}

/// Classify a contact normal
pub fn classify_normal(normal: Vec2) -> SurfaceKind {
    if normal.x == 0.0 && (normal.y == 1.0 || normal.y == -1.0) {
        SurfaceKind::Flat
    } else if normal.y == 0.0 && (normal.x == 1.0 || normal.x == -1.0) {
        SurfaceKind::Wall
    } else {
        SurfaceKind::Sloped
    }
}

/// Result of an overlap test between shape A and shape B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Minimum separation axis, pointing from A toward B
    pub normal: Vec2,
    /// Penetration depth along `normal`
    pub depth: f32,
}

impl Contact {
    /// B pushes into A from above (contact on A's top side)
    #[inline]
    pub fn is_top_a(&self) -> bool {
        self.normal.y < 0.0
    }

    /// A rests on B (contact on B's top side)
    #[inline]
    pub fn is_top_b(&self) -> bool {
        self.normal.y > 0.0
    }

    #[inline]
    pub fn surface(&self) -> SurfaceKind {
        classify_normal(self.normal)
    }
}

/// Separating-axis overlap test between two convex shapes
///
/// Returns `None` when the shapes are separated or only touching. Ties between
/// axes resolve to the first axis found (A's edges before B's), which keeps the
/// result stable across peers.
pub fn check(a: &Shape, b: &Shape) -> Option<Contact> {
    if a.world.len() < 2 || b.world.len() < 2 {
        return None;
    }

    let mut best: Option<Contact> = None;
    for axis in a.axes().chain(b.axes()) {
        let (min_a, max_a) = a.project(axis);
        let (min_b, max_b) = b.project(axis);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return None;
        }
        if best.is_none_or(|c| overlap < c.depth) {
            best = Some(Contact {
                normal: axis,
                depth: overlap,
            });
        }
    }

    best.map(|mut contact| {
        if (b.centroid() - a.centroid()).dot(contact.normal) < 0.0 {
            contact.normal = -contact.normal;
        }
        contact
    })
}

/// Full positional correction along the contact normal, split by inverse mass
///
/// Also removes the approaching component of the relative velocity.
pub fn resolve(
    pos_a: &mut Vec2,
    pos_b: &mut Vec2,
    dyn_a: &mut Dynamics,
    dyn_b: &mut Dynamics,
    contact: &Contact,
) {
    let total = dyn_a.inverse_mass + dyn_b.inverse_mass;
    if total <= 0.0 {
        return;
    }
    let n = contact.normal;

    let correction = n * (contact.depth / total);
    *pos_a -= correction * dyn_a.inverse_mass;
    *pos_b += correction * dyn_b.inverse_mass;

    let approach = (dyn_a.vel - dyn_b.vel).dot(n);
    if approach > 0.0 {
        let impulse = n * (approach / total);
        dyn_a.vel -= impulse * dyn_a.inverse_mass;
        dyn_b.vel += impulse * dyn_b.inverse_mass;
    }
}

/// Vertical-only correction: separates along Y and cancels vertical approach
///
/// Keeps a body on a ramp from sliding sideways. Falls back to [`resolve`] when
/// the normal is too close to horizontal to separate vertically.
pub fn resolve_vertical(
    pos_a: &mut Vec2,
    pos_b: &mut Vec2,
    dyn_a: &mut Dynamics,
    dyn_b: &mut Dynamics,
    contact: &Contact,
) {
    let total = dyn_a.inverse_mass + dyn_b.inverse_mass;
    if total <= 0.0 {
        return;
    }
    let ny = contact.normal.y;
    if ny.abs() < MIN_VERTICAL_NORMAL {
        resolve(pos_a, pos_b, dyn_a, dyn_b, contact);
        return;
    }

    // Vertical distance whose projection on the normal equals the depth
    let dy = contact.depth / ny;
    pos_a.y -= dy * dyn_a.inverse_mass / total;
    pos_b.y += dy * dyn_b.inverse_mass / total;

    let approach = (dyn_a.vel.y - dyn_b.vel.y) * ny.signum();
    if approach > 0.0 {
        let impulse = (dyn_a.vel.y - dyn_b.vel.y) / total;
        dyn_a.vel.y -= impulse * dyn_a.inverse_mass;
        dyn_b.vel.y += impulse * dyn_b.inverse_mass;
    }
}
