//! Error taxonomy for the simulation core
//!
//! Capacity exhaustion on a single spawn is not an error (it returns `None`);
//! stale ids are no-ops. Only batch overflow and bad configuration surface here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A bulk spawn asked for more slots than are free; nothing was written
    #[error("bulk spawn of {requested} rows exceeds {available} free slots")]
    CapacityExceeded { requested: usize, available: usize },

    /// Both ends of a portal pair were placed at the same point
    #[error("portal pair endpoints coincide at ({x}, {y})")]
    CoincidentPortal { x: f32, y: f32 },

    /// Every portal pair slot is taken
    #[error("no free portal pair slots (capacity {capacity})")]
    PortalCapacity { capacity: usize },

    /// The enemy manager was asked for a kind it was not built with
    #[error("enemy variant {0:?} is not registered")]
    UnregisteredVariant(crate::sim::enemies::EnemyKind),

    /// Bad tunable name or unparsable tunables document
    #[error("invalid tunables: {0}")]
    InvalidTunables(String),
}
