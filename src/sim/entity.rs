//! Generational entity storage
//!
//! Indices are recycled after despawn; the generation counter is bumped on
//! every reuse so a stale `EntityId` never resolves to the new occupant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable entity handle: slot index plus reuse generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Slot storage with a free list
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    slots: Vec<(EntityId, Option<T>)>,
    freed: Vec<u32>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            freed: Vec::new(),
        }
    }
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value into a recycled slot (generation bumped) or a new one
    pub fn spawn(&mut self, value: T) -> EntityId {
        if let Some(index) = self.freed.pop() {
            let (id, slot) = &mut self.slots[index as usize];
            id.generation += 1;
            *slot = Some(value);
            *id
        } else {
            let id = EntityId {
                index: self.slots.len() as u32,
                generation: 0,
            };
            self.slots.push((id, Some(value)));
            id
        }
    }

    /// Remove a live entity, returning its value
    pub fn despawn(&mut self, id: EntityId) -> Option<T> {
        let (slot_id, slot) = self.slots.get_mut(id.index as usize)?;
        if *slot_id != id {
            return None;
        }
        let value = slot.take()?;
        self.freed.push(id.index);
        Some(value)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|(slot_id, _)| *slot_id == id)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|(slot_id, _)| *slot_id == id)
            .and_then(|(_, value)| value.as_mut())
    }

    /// Live entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots
            .iter()
            .filter_map(|(id, value)| value.as_ref().map(|v| (*id, v)))
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|(_, value)| value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
