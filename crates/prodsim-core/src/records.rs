//! Flat, name-referencing records of a network.
//!
//! These are the shapes a document serializer reads and writes. Parts,
//! buffers and blocks refer to each other by name; [`GraphBuilder`]
//! resolves them back into a [`Network`].
//!
//! [`GraphBuilder`]: crate::builder::GraphBuilder

use crate::block::Block;
use crate::builder::BuildError;
use crate::id::BufferId;
use crate::network::{BlockArena, BufferArena, Network};
use crate::part::Part;
use crate::sim::Ticks;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub name: String,
    pub manufacture_time: Ticks,
    /// Component part names; repeats mean several units.
    #[serde(default)]
    pub made_from: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferRecord {
    pub name: String,
    pub capacity: u32,
}

/// One backlog step, by part name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogRecord {
    pub part: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub name: String,
    pub produces: Vec<String>,
    pub input_buffer: String,
    pub output_buffer: String,
    /// Steps in push order; the last one is served first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backlog: Vec<BacklogRecord>,
}

/// The three flat lists describing a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecords {
    #[serde(default)]
    pub parts: Vec<PartRecord>,
    #[serde(default)]
    pub buffers: Vec<BufferRecord>,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

impl PartRecord {
    pub fn new(name: &str, manufacture_time: Ticks, made_from: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            manufacture_time,
            made_from: made_from.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BufferRecord {
    pub fn new(name: &str, capacity: u32) -> Self {
        Self {
            name: name.to_string(),
            capacity,
        }
    }
}

impl BlockRecord {
    pub fn new(name: &str, produces: &[&str], input_buffer: &str, output_buffer: &str) -> Self {
        Self {
            name: name.to_string(),
            produces: produces.iter().map(|s| s.to_string()).collect(),
            input_buffer: input_buffer.to_string(),
            output_buffer: output_buffer.to_string(),
            backlog: Vec::new(),
        }
    }

    pub fn with_backlog(mut self, part: &str, count: u32) -> Self {
        self.backlog.push(BacklogRecord {
            part: part.to_string(),
            count,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Walking a network
// ---------------------------------------------------------------------------

impl Network {
    /// Records for every part, buffer and block in the arena.
    ///
    /// Fails with [`BuildError::DuplicateName`] when two different parts
    /// share a name, since records refer to parts by name alone.
    pub fn to_records(&self) -> Result<NetworkRecords, BuildError> {
        build_records(&self.blocks, &self.buffers, self.buffers.keys())
    }
}

/// Records for `blocks`, the buffers named by `buffer_ids` and every part
/// reachable from the blocks' capabilities.
pub(crate) fn build_records(
    blocks: &BlockArena,
    buffers: &BufferArena,
    buffer_ids: impl Iterator<Item = BufferId>,
) -> Result<NetworkRecords, BuildError> {
    let mut parts = Vec::new();
    for block in blocks.values() {
        for part in block.produces() {
            collect_part(part, &mut parts)?;
        }
    }

    let buffer_name = |id: BufferId| {
        buffers
            .get(id)
            .map(|b| b.name().to_string())
            .unwrap_or_default()
    };

    Ok(NetworkRecords {
        parts: parts.iter().map(|p| part_record(p)).collect(),
        buffers: buffer_ids
            .filter_map(|id| buffers.get(id))
            .map(|b| BufferRecord::new(b.name(), b.capacity()))
            .collect(),
        blocks: blocks
            .values()
            .map(|block| {
                block_record(
                    block,
                    buffer_name(block.input()),
                    buffer_name(block.output()),
                )
            })
            .collect(),
    })
}

/// Post-order walk so every part follows its components.
fn collect_part(part: &Arc<Part>, out: &mut Vec<Arc<Part>>) -> Result<(), BuildError> {
    if already_collected(part, out)? {
        return Ok(());
    }
    for component in part.made_from() {
        collect_part(component, out)?;
    }
    // A component may have taken the name on the way down.
    if !already_collected(part, out)? {
        out.push(Arc::clone(part));
    }
    Ok(())
}

/// Whether a part named like `part` is in `out`. A same-named part with a
/// different time or recipe can't be told apart once written by name.
fn already_collected(part: &Arc<Part>, out: &[Arc<Part>]) -> Result<bool, BuildError> {
    let Some(seen) = out.iter().find(|p| p.name() == part.name()) else {
        return Ok(false);
    };
    if Arc::ptr_eq(seen, part) || seen.structurally_eq(part) {
        Ok(true)
    } else {
        Err(BuildError::DuplicateName {
            kind: "part",
            name: part.name().to_string(),
        })
    }
}

fn part_record(part: &Part) -> PartRecord {
    PartRecord {
        name: part.name().to_string(),
        manufacture_time: part.manufacture_time(),
        made_from: part.made_from().iter().map(|p| p.name().to_string()).collect(),
    }
}

fn block_record(block: &Block, input_buffer: String, output_buffer: String) -> BlockRecord {
    let backlog = block.backlog();
    BlockRecord {
        name: block.name().to_string(),
        produces: block.produces().iter().map(|p| p.name().to_string()).collect(),
        input_buffer,
        output_buffer,
        // The step being drained is served before anything queued, so it
        // goes last.
        backlog: backlog
            .queued_steps()
            .iter()
            .chain(backlog.current_step())
            .map(|step| BacklogRecord {
                part: step.part.name().to_string(),
                count: step.remaining,
            })
            .collect(),
    }
}
