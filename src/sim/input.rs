//! Stamped player actions
//!
//! Every press carries the tick at which the client issued it. Consuming an
//! action removes it from the buffer, so a press is delivered exactly once.

use serde::{Deserialize, Serialize};

use crate::Tick;

/// Player input actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Left,
    Right,
    Down,
    Jump,
}

/// An action together with the tick it was issued on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampedAction {
    pub action: Action,
    pub tick: Tick,
}

/// Pending actions for one player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionBuffer {
    pending: Vec<StampedAction>,
}

impl ActionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action, tick: Tick) {
        self.pending.push(StampedAction { action, tick });
    }

    /// Remove every pending press of `action`, returning the most recent one
    ///
    /// Ties on the stamp resolve to the press that was pushed last.
    pub fn consume(&mut self, action: Action) -> Option<StampedAction> {
        let mut latest: Option<StampedAction> = None;
        self.pending.retain(|stamped| {
            if stamped.action != action {
                return true;
            }
            if latest.is_none_or(|l| stamped.tick >= l.tick) {
                latest = Some(*stamped);
            }
            false
        });
        latest
    }

    /// Check for a pending press without consuming it
    pub fn has(&self, action: Action) -> bool {
        self.pending.iter().any(|s| s.action == action)
    }

    /// Pending presses in push order
    pub fn iter(&self) -> impl Iterator<Item = &StampedAction> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    /// -1.0 for left, 1.0 for right
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}
