//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types are owned copies with parts referenced by name -- no
//! references into simulation storage. Build them with
//! [`Simulation::snapshot_block`](crate::sim::Simulation::snapshot_block)
//! and [`Simulation::snapshot_buffer`](crate::sim::Simulation::snapshot_buffer).

use crate::block::BlockState;
use crate::id::{BlockId, BufferId};
use crate::sim::Ticks;

// ---------------------------------------------------------------------------
// Block snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub id: BlockId,
    pub name: String,
    /// Idle, Producing or Blocked.
    pub state: BlockState,
    /// The part being built or waiting for output space.
    pub current_part: Option<String>,
    /// Inputs consumed for the current part.
    pub stock_parts: Vec<String>,
    /// Units left in the block's backlog.
    pub backlog_remaining: u64,
    pub ticks: Ticks,
    pub idle_ticks: Ticks,
    pub input: BufferId,
    pub output: BufferId,
}

// ---------------------------------------------------------------------------
// Buffer snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub id: BufferId,
    pub name: String,
    pub capacity: u32,
    /// Stored part names, oldest first.
    pub contents: Vec<String>,
}

impl BufferSnapshot {
    pub fn is_full(&self) -> bool {
        self.contents.len() >= self.capacity as usize
    }
}
