//! Network assembly.
//!
//! A [`Network`] is the mutable arena used while wiring blocks to buffers.
//! Blocks refer to buffers by [`BufferId`] handle, never by pointer, so a
//! buffer can be one block's output and another's input without shared
//! ownership. Once assembled, the network is handed to
//! [`Simulation::new`](crate::sim::Simulation::new) and its topology is
//! frozen.

use crate::block::Block;
use crate::buffer::Buffer;
use crate::error::SimError;
use crate::id::{BlockId, BufferId};
use crate::sim::SimConfig;
use slotmap::SlotMap;

/// Arena of buffers keyed by handle.
pub type BufferArena = SlotMap<BufferId, Buffer>;

/// Arena of blocks keyed by handle. Iteration follows insertion order as
/// long as nothing is removed.
pub type BlockArena = SlotMap<BlockId, Block>;

#[derive(Debug, Clone, Default)]
pub struct Network {
    pub(crate) config: SimConfig,
    pub(crate) buffers: BufferArena,
    pub(crate) blocks: BlockArena,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> SimConfig {
        self.config
    }

    /// Create a buffer using the network's part matching policy.
    pub fn add_buffer(&mut self, name: impl Into<String>, capacity: u32) -> Result<BufferId, SimError> {
        let buffer = Buffer::new(name, capacity)?.with_part_match(self.config.part_match);
        Ok(self.buffers.insert(buffer))
    }

    /// Add a block, switching it to the network's part matching policy.
    ///
    /// Both buffer handles must be present in this network's arena. Handles
    /// carry no owner, so one minted by another network passes whenever the
    /// same slot is occupied here.
    pub fn add_block(&mut self, block: Block) -> Result<BlockId, SimError> {
        for id in [block.input(), block.output()] {
            if !self.buffers.contains_key(id) {
                return Err(SimError::UnknownBuffer(id));
            }
        }
        let block = block.with_part_match(self.config.part_match);
        Ok(self.blocks.insert(block))
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Mutable access, e.g. to queue production orders.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter()
    }

    pub fn buffers(&self) -> impl Iterator<Item = (BufferId, &Buffer)> {
        self.buffers.iter()
    }

    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, b)| b.name() == name)
            .map(|(id, _)| id)
    }

    pub fn find_buffer(&self, name: &str) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|(_, b)| b.name() == name)
            .map(|(id, _)| id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}
