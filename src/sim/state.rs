//! World state and per-entity records
//!
//! Everything a peer needs to reproduce a tick lives here. Transient player
//! state is modelled explicitly (`Ground`, `Option<IgnoreList>`) rather than
//! by the presence of loose components.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::commands::CommandBuffer;
use super::dynamics::Dynamics;
use super::entity::{EntityId, EntityStore};
use super::error::{SimError, SimResult};
use super::input::{Action, ActionBuffer, Direction};
use super::shape::Shape;
use crate::Tick;
use crate::consts::{HISTORY_CAPACITY, IGNORE_SLOTS};

/// Sentinel for "never happened"
pub const NEVER: Tick = Tick::MIN;

/// Contact with walkable ground
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grounded {
    /// Last tick a top contact refreshed this record
    pub last_touch: Tick,
    /// Tick this grounded episode started
    pub landed: Tick,
    /// Contact normal of the last touch
    pub slope_normal: Vec2,
}

/// Ground state of a player
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Ground {
    #[default]
    Airborne,
    Grounded(Grounded),
}

impl Ground {
    pub fn grounded(&self) -> Option<&Grounded> {
        match self {
            Ground::Grounded(g) => Some(g),
            Ground::Airborne => None,
        }
    }

    pub fn grounded_mut(&mut self) -> Option<&mut Grounded> {
        match self {
            Ground::Grounded(g) => Some(g),
            Ground::Airborne => None,
        }
    }

    /// Touched ground on the previous tick (not just lingering for coyote time)
    pub fn touched_last_tick(&self, tick: Tick) -> bool {
        self.grounded().is_some_and(|g| g.last_touch == tick - 1)
    }
}

/// Jump bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpState {
    pub last_jump: Tick,
}

impl Default for JumpState {
    fn default() -> Self {
        Self { last_jump: NEVER }
    }
}

/// A platform the player currently falls through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreEntry {
    pub platform: EntityId,
    pub last_active: Tick,
}

impl IgnoreEntry {
    #[inline]
    pub fn is_active(&self, tick: Tick, expiry: Tick) -> bool {
        tick - self.last_active <= expiry
    }
}

/// Fixed-capacity set of ignored platforms
///
/// Slots are cleared in place and never compacted, so a slot index is stable
/// for the whole tick.
#[derive(Debug, Clone, PartialEq)]
pub struct IgnoreList {
    slots: [Option<IgnoreEntry>; IGNORE_SLOTS],
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self {
            slots: [None; IGNORE_SLOTS],
        }
    }
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[Option<IgnoreEntry>] {
        &self.slots
    }

    pub fn entry(&self, platform: EntityId) -> Option<&IgnoreEntry> {
        self.slots.iter().flatten().find(|e| e.platform == platform)
    }

    /// Collisions with `platform` must be skipped this tick
    pub fn is_ignoring(&self, platform: EntityId, tick: Tick, expiry: Tick) -> bool {
        self.entry(platform)
            .is_some_and(|e| e.is_active(tick, expiry))
    }

    /// Take a slot for `platform`: the first free one, else the least recently active
    ///
    /// Returns the slot index, or `None` if the platform already has a slot.
    pub fn claim(&mut self, platform: EntityId, tick: Tick) -> Option<usize> {
        if self.entry(platform).is_some() {
            return None;
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .or_else(|| {
                self.slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, slot)| slot.map_or(NEVER, |e| e.last_active))
                    .map(|(i, _)| i)
            })?;
        self.slots[index] = Some(IgnoreEntry {
            platform,
            last_active: tick,
        });
        Some(index)
    }

    /// Clear expired slots in place; returns whether any slot is still occupied
    pub fn sweep(&mut self, tick: Tick, expiry: Tick) -> bool {
        let mut any_active = false;
        for slot in self.slots.iter_mut() {
            match slot {
                Some(entry) if !entry.is_active(tick, expiry) => *slot = None,
                Some(_) => any_active = true,
                None => {}
            }
        }
        any_active
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

/// Recent player positions, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionHistory {
    positions: VecDeque<Vec2>,
}

impl PositionHistory {
    pub fn push(&mut self, pos: Vec2) {
        if self.positions.len() == HISTORY_CAPACITY {
            self.positions.pop_front();
        }
        self.positions.push_back(pos);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec2> {
        self.positions.iter()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn latest(&self) -> Option<Vec2> {
        self.positions.back().copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Which side of the player a wall contact is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
}

impl WallSide {
    /// Side of `block` relative to `player` (ties count as left)
    pub fn of(player: Vec2, block: Vec2) -> Self {
        if block.x > player.x {
            WallSide::Right
        } else {
            WallSide::Left
        }
    }
}

/// Player-only state
#[derive(Debug, Clone, Default)]
pub struct Player {
    pub actions: ActionBuffer,
    pub direction: Direction,
    pub ground: Ground,
    /// Wall touched during this tick's terrain pass, if any
    pub wall: Option<WallSide>,
    pub jump: JumpState,
    pub ignore: Option<Box<IgnoreList>>,
    pub history: PositionHistory,
}

impl Player {
    /// Record a top contact: refresh an ongoing episode in place, or queue a fresh landing
    ///
    /// An episode continues only if the previous touch was last tick or earlier
    /// this tick. Returns `true` when a landing was queued.
    pub fn touch_ground(
        &mut self,
        id: EntityId,
        tick: Tick,
        normal: Vec2,
        commands: &mut CommandBuffer,
    ) -> bool {
        match self.ground.grounded_mut() {
            Some(g) if g.last_touch >= tick - 1 => {
                g.last_touch = tick;
                g.slope_normal = normal;
                false
            }
            _ => {
                commands.land(
                    id,
                    Grounded {
                        last_touch: tick,
                        landed: tick,
                        slope_normal: normal,
                    },
                );
                true
            }
        }
    }
}

/// Physical body shared by every entity
#[derive(Debug, Clone)]
pub struct Body {
    pub pos: Vec2,
    /// Radians; zero means the shape is axis-aligned as authored
    pub rotation: f32,
    pub shape: Shape,
    pub dynamics: Dynamics,
}

impl Body {
    pub fn new(pos: Vec2, rotation: f32, shape: Shape, dynamics: Dynamics) -> Self {
        let mut body = Self {
            pos,
            rotation,
            shape,
            dynamics,
        };
        body.refresh_shape();
        body
    }

    pub fn refresh_shape(&mut self) {
        self.shape.refresh(self.pos, self.rotation);
    }
}

/// What an entity is
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// Solid terrain
    Block,
    /// One-way platform
    Platform,
    Player(Player),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub body: Body,
    pub kind: EntityKind,
}

impl Entity {
    pub fn player(&self) -> Option<&Player> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow body and player state at the same time
    pub fn split_player_mut(&mut self) -> Option<(&mut Body, &mut Player)> {
        match &mut self.kind {
            EntityKind::Player(p) => Some((&mut self.body, p)),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, EntityKind::Block)
    }

    pub fn is_platform(&self) -> bool {
        matches!(self.kind, EntityKind::Platform)
    }
}

/// Complete simulation state for one scene
#[derive(Debug, Clone, Default)]
pub struct World {
    tick: Tick,
    entities: EntityStore<Entity>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Jump to a tick (replay and tests)
    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    pub(crate) fn advance_tick(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }

    pub fn spawn(&mut self, body: Body, kind: EntityKind) -> EntityId {
        self.entities.spawn(Entity { body, kind })
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.despawn(id)
    }

    pub fn get(&self, id: EntityId) -> SimResult<&Entity> {
        self.entities.get(id).ok_or(SimError::EntityLookup { id })
    }

    pub fn get_mut(&mut self, id: EntityId) -> SimResult<&mut Entity> {
        self.entities.get_mut(id).ok_or(SimError::EntityLookup { id })
    }

    pub fn player(&self, id: EntityId) -> SimResult<&Player> {
        self.get(id)?.player().ok_or(SimError::EntityLookup { id })
    }

    pub fn player_mut(&mut self, id: EntityId) -> SimResult<&mut Player> {
        self.get_mut(id)?
            .player_mut()
            .ok_or(SimError::EntityLookup { id })
    }

    /// Frozen snapshot of matching ids, in slot order
    ///
    /// Mutations queued while walking the snapshot never change its length.
    pub fn ids_matching(&self, predicate: impl Fn(&Entity) -> bool) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| predicate(e))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn players(&self) -> Vec<EntityId> {
        self.ids_matching(Entity::is_player)
    }

    pub fn blocks(&self) -> Vec<EntityId> {
        self.ids_matching(Entity::is_block)
    }

    pub fn platforms(&self) -> Vec<EntityId> {
        self.ids_matching(Entity::is_platform)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn iter_ids(&self) -> Vec<EntityId> {
        self.ids_matching(|_| true)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Input collaborator entry point: buffer a press stamped with its issue tick
    pub fn push_action(&mut self, id: EntityId, action: Action, stamped: Tick) -> SimResult {
        self.player_mut(id)?.actions.push(action, stamped);
        Ok(())
    }

    /// Order-sensitive FNV-1a digest of the gameplay-relevant state
    ///
    /// Two peers that processed the same inputs produce the same digest.
    pub fn digest(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0100_0000_01b3;

        let mut hash = OFFSET;
        let mut feed = |value: u64| {
            for byte in value.to_le_bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(PRIME);
            }
        };

        feed(self.tick as u64);
        for (id, entity) in self.entities.iter() {
            feed(((id.index as u64) << 32) | id.generation as u64);
            let body = &entity.body;
            for v in [body.pos, body.dynamics.vel] {
                feed(((v.x.to_bits() as u64) << 32) | v.y.to_bits() as u64);
            }
            if let Some(player) = entity.player() {
                match player.ground {
                    Ground::Airborne => feed(0),
                    Ground::Grounded(g) => {
                        feed(g.last_touch as u64);
                        feed(g.landed as u64);
                    }
                }
                feed(player.jump.last_jump as u64);
                feed(player.direction.sign().to_bits() as u64);
                for pending in player.actions.iter() {
                    feed(pending.action as u64);
                    feed(pending.tick as u64);
                }
                feed(player.history.len() as u64);
                if let Some(latest) = player.history.latest() {
                    feed(((latest.x.to_bits() as u64) << 32) | latest.y.to_bits() as u64);
                }
                match &player.ignore {
                    None => feed(0),
                    Some(list) => {
                        feed(1);
                        for (slot, entry) in list.slots().iter().enumerate() {
                            if let Some(entry) = entry {
                                feed(slot as u64);
                                feed(
                                    ((entry.platform.index as u64) << 32)
                                        | entry.platform.generation as u64,
                                );
                                feed(entry.last_active as u64);
                            }
                        }
                    }
                }
            }
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn id(index: u32, generation: u32) -> EntityId {
        EntityId { index, generation }
    }

    #[test]
    fn test_ignore_claim_prefers_free_slot() {
        let mut list = IgnoreList::new();
        assert_eq!(list.claim(id(3, 0), 100), Some(0));
        assert_eq!(list.claim(id(4, 0), 101), Some(1));
        // Same platform again is a no-op
        assert_eq!(list.claim(id(3, 0), 102), None);
        assert_eq!(list.entry(id(3, 0)).unwrap().last_active, 100);
        assert_eq!(list.occupied(), 2);
    }

    #[test]
    fn test_ignore_claim_evicts_least_recent_when_full() {
        let mut list = IgnoreList::new();
        for i in 0..IGNORE_SLOTS as u32 {
            list.claim(id(i + 10, 0), 200 + i as Tick);
        }
        assert_eq!(list.occupied(), IGNORE_SLOTS);

        let slot = list.claim(id(999, 0), 300).unwrap();
        assert_eq!(slot, 0);
        assert!(list.entry(id(10, 0)).is_none());
        assert_eq!(list.entry(id(999, 0)).unwrap().last_active, 300);
    }

    #[test]
    fn test_ignore_generation_mismatch_does_not_match() {
        let mut list = IgnoreList::new();
        list.claim(id(7, 0), 50);
        assert!(list.is_ignoring(id(7, 0), 50, 15));
        assert!(!list.is_ignoring(id(7, 1), 50, 15));
    }

    #[test]
    fn test_ignore_sweep_clears_in_place() {
        let mut list = IgnoreList::new();
        list.claim(id(1, 0), 100);
        list.claim(id(2, 0), 110);

        assert!(list.sweep(116, 15));
        assert!(list.slots()[0].is_none());
        assert_eq!(list.slots()[1].unwrap().platform, id(2, 0));

        assert!(!list.sweep(126, 15));
        assert_eq!(list.occupied(), 0);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = PositionHistory::default();
        for i in 0..(HISTORY_CAPACITY + 5) {
            history.push(Vec2::new(i as f32, 0.0));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.iter().next().unwrap().x, 5.0);
        assert_eq!(
            history.latest(),
            Some(Vec2::new((HISTORY_CAPACITY + 4) as f32, 0.0))
        );
    }

    #[test]
    fn test_touch_ground_refreshes_continuing_episode() {
        let mut player = Player {
            ground: Ground::Grounded(Grounded {
                last_touch: 99,
                landed: 90,
                slope_normal: Vec2::Y,
            }),
            ..Default::default()
        };
        let mut commands = CommandBuffer::default();
        let landed = player.touch_ground(id(0, 0), 100, Vec2::new(0.6, 0.8), &mut commands);

        assert!(!landed);
        assert!(commands.is_empty());
        let g = player.ground.grounded().unwrap();
        assert_eq!((g.last_touch, g.landed), (100, 90));
        assert_eq!(g.slope_normal, Vec2::new(0.6, 0.8));

        // A second contact in the same tick is still the same episode
        assert!(!player.touch_ground(id(0, 0), 100, Vec2::Y, &mut commands));
    }

    #[test]
    fn test_touch_ground_after_gap_is_fresh_landing() {
        let mut player = Player {
            ground: Ground::Grounded(Grounded {
                last_touch: 95,
                landed: 90,
                slope_normal: Vec2::Y,
            }),
            ..Default::default()
        };
        let mut commands = CommandBuffer::default();
        assert!(player.touch_ground(id(0, 0), 100, Vec2::Y, &mut commands));
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_world_lookup_errors() {
        let mut world = World::new();
        let block = world.spawn(
            Body::new(Vec2::ZERO, 0.0, Shape::rectangle(10.0, 10.0), Dynamics::fixed()),
            EntityKind::Block,
        );
        assert!(world.get(block).is_ok());
        assert_eq!(
            world.player(block).unwrap_err(),
            SimError::EntityLookup { id: block }
        );

        world.despawn(block);
        assert_eq!(
            world.get(block).unwrap_err(),
            SimError::EntityLookup { id: block }
        );
    }

    #[test]
    fn test_digest_covers_next_tick_inputs() {
        let mut world = World::new();
        let player = world.spawn(
            Body::new(Vec2::ZERO, 0.0, Shape::rectangle(18.0, 58.0), Dynamics::new(10.0)),
            EntityKind::Player(Player::default()),
        );
        let base = world.digest();

        let mut with_history = world.clone();
        with_history
            .player_mut(player)
            .unwrap()
            .history
            .push(Vec2::new(0.0, -40.0));
        assert_ne!(with_history.digest(), base);

        let mut with_action = world.clone();
        with_action.push_action(player, Action::Jump, 1).unwrap();
        assert_ne!(with_action.digest(), base);

        let mut ignoring = IgnoreList::new();
        ignoring.claim(id(5, 0), 40);
        let mut first = world.clone();
        first.player_mut(player).unwrap().ignore = Some(Box::new(ignoring.clone()));
        assert_ne!(first.digest(), base);

        // Same slot count, different platform and activity
        let mut other = IgnoreList::new();
        other.claim(id(6, 0), 41);
        let mut second = world.clone();
        second.player_mut(player).unwrap().ignore = Some(Box::new(other));
        assert_ne!(first.digest(), second.digest());

        assert_eq!(world.clone().digest(), base);
    }

    proptest! {
        #[test]
        fn prop_history_keeps_latest_samples(count in 0usize..200) {
            let mut history = PositionHistory::default();
            for i in 0..count {
                history.push(Vec2::new(i as f32, 0.0));
            }
            prop_assert_eq!(history.len(), count.min(HISTORY_CAPACITY));
            let first = count.saturating_sub(HISTORY_CAPACITY);
            for (offset, p) in history.iter().enumerate() {
                prop_assert_eq!(p.x, (first + offset) as f32);
            }
        }
    }
}
