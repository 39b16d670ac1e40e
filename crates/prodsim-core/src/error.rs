//! Runtime errors raised by buffers, blocks and the simulation.
//!
//! Idle and blocked conditions are ordinary state-machine outcomes and never
//! appear here. Every variant is fatal to the operation that raised it.

use crate::id::BufferId;

/// Errors that can occur while assembling or ticking a network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("can't add part {part}: buffer {buffer} is full")]
    CapacityExceeded { buffer: String, part: String },
    #[error("block {block} doesn't produce part {part}")]
    UnauthorizedPart { block: String, part: String },
    #[error("block {block} can't make part {part}: input {part_missing} missing from buffer {buffer}")]
    InventoryInconsistency {
        block: String,
        part: String,
        part_missing: String,
        buffer: String,
    },
    #[error("buffer {buffer} must have a capacity greater than zero")]
    InvalidCapacity { buffer: String },
    #[error("buffer not found: {0:?}")]
    UnknownBuffer(BufferId),
    #[error("no block produces part {part}")]
    NoProducer { part: String },
}
