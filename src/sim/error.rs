//! Simulation errors
//!
//! Both kinds are programming/structural faults rather than transient ones.
//! Systems return them to the caller; the simulation loop picks the policy.

use thiserror::Error;

use super::entity::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A snapshot handle no longer resolves to a live entity of the expected kind
    #[error("entity lookup failed for {id}")]
    EntityLookup { id: EntityId },

    /// A queued add/remove could not be applied
    #[error("structural mutation on {id} failed: {reason}")]
    StructuralMutation { id: EntityId, reason: &'static str },
}

pub type SimResult<T = ()> = Result<T, SimError>;
