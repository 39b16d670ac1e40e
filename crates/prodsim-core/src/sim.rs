//! The simulation orchestrator.
//!
//! A [`Simulation`] owns a frozen network of blocks and buffers and advances
//! every block exactly once per [`Simulation::tick`], in block insertion
//! order. It aggregates idle time from per-block deltas and exposes the
//! derived buffer and part views a serializer or UI needs.

use crate::block::Block;
use crate::buffer::Buffer;
use crate::builder::BuildError;
use crate::error::SimError;
use crate::id::{BlockId, BufferId};
use crate::log::{LogEvent, LogSource, NullLogger, SimLogger};
use crate::network::{BlockArena, BufferArena, Network};
use crate::part::{Part, PartMatch, push_unique};
use crate::query::{BlockSnapshot, BufferSnapshot};
use crate::records::{NetworkRecords, build_records};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Simulation time, in ticks.
pub type Ticks = u64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Network-wide settings, fixed when the network is assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// How buffers match stored parts against recipe entries.
    #[serde(default)]
    pub part_match: PartMatch,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    buffers: BufferArena,
    blocks: BlockArena,

    /// Buffers wired to any block, in first-seen order. Cached because the
    /// block set can't change after construction.
    buffer_view: Vec<BufferId>,
    /// Parts produced or used by any block, in first-seen order.
    part_view: Vec<Arc<Part>>,

    ticks: Ticks,
    idle_ticks: Ticks,
    logger: Box<dyn SimLogger>,
}

impl Simulation {
    /// Freeze `network` into a simulation with no log sink.
    pub fn new(network: Network) -> Self {
        Self::with_logger(network, NullLogger)
    }

    /// Freeze `network` and report construction of every block and of the
    /// simulation itself to `logger`.
    pub fn with_logger(network: Network, logger: impl SimLogger + 'static) -> Self {
        let Network {
            config,
            buffers,
            blocks,
        } = network;

        let mut buffer_view = Vec::new();
        let mut part_view = Vec::new();
        for (_, block) in &blocks {
            for id in [block.input(), block.output()] {
                if !buffer_view.contains(&id) {
                    buffer_view.push(id);
                }
            }
            for part in block.produces().iter().chain(block.uses()) {
                push_unique(&mut part_view, part);
            }
        }

        let sim = Self {
            config,
            buffers,
            blocks,
            buffer_view,
            part_view,
            ticks: 0,
            idle_ticks: 0,
            logger: Box::new(logger),
        };
        for (_, block) in &sim.blocks {
            block.emit(sim.logger.as_ref(), LogEvent::Created);
        }
        sim.emit(LogEvent::Created);
        sim
    }

    /// Replace the log sink.
    pub fn set_logger(&mut self, logger: impl SimLogger + 'static) {
        self.logger = Box::new(logger);
    }

    pub fn config(&self) -> SimConfig {
        self.config
    }

    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    /// Idle ticks summed over all blocks since construction or the last
    /// reset.
    pub fn idle_ticks(&self) -> Ticks {
        self.idle_ticks
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advance every block once.
    ///
    /// The first error aborts the round. Blocks ticked before the failing one
    /// keep their changes.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.ticks += 1;
        self.emit(LogEvent::Tick { tick: self.ticks });

        for block in self.blocks.values_mut() {
            let before = block.idle_ticks();
            block.tick(&mut self.buffers, self.logger.as_ref())?;
            self.idle_ticks += block.idle_ticks() - before;
        }
        Ok(())
    }

    /// Run `n` ticks, stopping at the first error.
    pub fn run(&mut self, n: Ticks) -> Result<(), SimError> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Zero all counters, clear every block's progress and empty every
    /// wired buffer. Backlogs are left as they are, so units already taken
    /// for parts in progress are discarded.
    pub fn reset_state(&mut self) {
        self.ticks = 0;
        self.idle_ticks = 0;
        for block in self.blocks.values_mut() {
            block.reset_state(self.logger.as_ref());
        }
        for &id in &self.buffer_view {
            if let Some(buffer) = self.buffers.get_mut(id) {
                buffer.clear();
            }
        }
        self.emit(LogEvent::Reset);
    }

    /// Queue `count` units of `part` on the first block able to produce it.
    pub fn order(&mut self, part: &Arc<Part>, count: u32) -> Result<BlockId, SimError> {
        let Some((id, block)) = self
            .blocks
            .iter_mut()
            .find(|(_, b)| b.can_produce(part))
        else {
            return Err(SimError::NoProducer {
                part: part.name().to_string(),
            });
        };
        block.enqueue(part, count)?;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Blocks in tick order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Mutable block access. Wiring and capabilities can't be changed
    /// through it, so the derived views stay valid.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, b)| b.name() == name)
            .map(|(id, _)| id)
    }

    /// Buffers used as any block's input or output.
    pub fn buffers(&self) -> impl Iterator<Item = (BufferId, &Buffer)> {
        self.buffer_view
            .iter()
            .filter_map(|&id| self.buffers.get(id).map(|b| (id, b)))
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }

    /// Direct buffer access for seeding or draining inventory between ticks.
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(id)
    }

    pub fn find_buffer(&self, name: &str) -> Option<BufferId> {
        self.buffers()
            .find(|(_, b)| b.name() == name)
            .map(|(id, _)| id)
    }

    /// Parts any block produces or uses.
    pub fn parts(&self) -> &[Arc<Part>] {
        &self.part_view
    }

    pub fn snapshot_block(&self, id: BlockId) -> Option<BlockSnapshot> {
        let block = self.blocks.get(id)?;
        Some(BlockSnapshot {
            id,
            name: block.name().to_string(),
            state: block.state(),
            current_part: block.current_part().map(|p| p.name().to_string()),
            stock_parts: block
                .stock_parts()
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            backlog_remaining: block.backlog().remaining(),
            ticks: block.ticks(),
            idle_ticks: block.idle_ticks(),
            input: block.input(),
            output: block.output(),
        })
    }

    pub fn snapshot_all_blocks(&self) -> Vec<BlockSnapshot> {
        self.blocks
            .keys()
            .filter_map(|id| self.snapshot_block(id))
            .collect()
    }

    pub fn snapshot_buffer(&self, id: BufferId) -> Option<BufferSnapshot> {
        let buffer = self.buffers.get(id)?;
        Some(BufferSnapshot {
            id,
            name: buffer.name().to_string(),
            capacity: buffer.capacity(),
            contents: buffer
                .contents()
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
        })
    }

    /// Deterministic hash of counters, block progress, backlogs and buffer
    /// contents. Two runs from the same initial state agree tick for tick.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.ticks);
        h.write_u64(self.idle_ticks);
        for block in self.blocks.values() {
            h.write_str(block.name());
            h.write_u64(block.ticks());
            h.write_u64(block.idle_ticks());
            h.write_u64(block.ticks_remaining());
            h.write_u64(block.backlog().remaining());
            match block.current_part() {
                Some(part) => h.write_str(part.name()),
                None => h.write(&[0]),
            }
        }
        for (_, buffer) in self.buffers() {
            h.write_str(buffer.name());
            h.write_u64(buffer.len() as u64);
            for part in buffer.contents() {
                h.write_str(part.name());
            }
        }
        h.finish()
    }

    /// Records for the blocks, their wired buffers and every part reachable
    /// from them. Backlogs are written as they currently stand. Two different
    /// parts sharing a name fail with [`BuildError::DuplicateName`].
    pub fn to_records(&self) -> Result<NetworkRecords, BuildError> {
        build_records(&self.blocks, &self.buffers, self.buffer_view.iter().copied())
    }

    /// Hand the block set back, e.g. to rebuild a simulation with the
    /// current backlogs and inventory.
    pub fn into_network(self) -> Network {
        Network {
            config: self.config,
            buffers: self.buffers,
            blocks: self.blocks,
        }
    }

    fn emit(&self, event: LogEvent) {
        self.logger.log(&LogSource::Simulation, &event);
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// FNV-1a digest of tick counters, block progress and buffer contents.
///
/// Two simulations built from the same records and ticked the same number
/// of times must agree; comparing digests tick by tick finds the first
/// round where they drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Length-prefixed, so `("ab", "c")` and `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
