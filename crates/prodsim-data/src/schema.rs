//! On-disk shape of a network document.
//!
//! A document is the network's [`SimConfig`] plus the three flat record
//! lists from [`prodsim_core::records`]. Every section is optional, so a
//! document with only parts is valid (if not very useful).

use prodsim_core::records::{BlockRecord, BufferRecord, NetworkRecords, PartRecord};
use prodsim_core::sim::SimConfig;
use serde::{Deserialize, Serialize};

/// A network definition as written in a RON, JSON or TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub parts: Vec<PartRecord>,
    #[serde(default)]
    pub buffers: Vec<BufferRecord>,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

impl NetworkDocument {
    pub fn new(config: SimConfig, records: NetworkRecords) -> Self {
        let NetworkRecords {
            parts,
            buffers,
            blocks,
        } = records;
        Self {
            config,
            parts,
            buffers,
            blocks,
        }
    }

    /// Split into the settings and the records the graph builder consumes.
    pub fn into_parts(self) -> (SimConfig, NetworkRecords) {
        (
            self.config,
            NetworkRecords {
                parts: self.parts,
                buffers: self.buffers,
                blocks: self.blocks,
            },
        )
    }
}
