//! Error types for the simulation.

use thiserror::Error;

use crate::entity::EntityId;

/// Errors that can occur while driving a battle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Referenced an entity id that does not exist in the world.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// A spawn request failed validation; no entity was created.
    #[error("invalid spawn request from entity {sender}: {message}")]
    InvalidSpawnRequest {
        /// The entity the spawn was requested for.
        sender: EntityId,
        /// Why validation rejected the request.
        message: String,
    },

    /// A position is off the board or overlaps another space-taking entity.
    #[error("invalid grid position: {0}")]
    InvalidGridPosition(String),

    /// An entity is missing a component the operation requires.
    #[error("entity {entity} is missing component {component}")]
    MissingComponent {
        /// The entity that was inspected.
        entity: EntityId,
        /// Name of the missing component.
        component: &'static str,
    },

    /// The world is in a state the operation cannot run in.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A serialized snapshot could not be decoded.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SimError::EntityNotFound(7);
        assert_eq!(err.to_string(), "entity 7 not found");

        let err = SimError::MissingComponent {
            entity: 3,
            component: "Position",
        };
        assert!(err.to_string().contains("missing component Position"));
    }
}
