//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::builder::GraphBuilder;
use crate::records::{BlockRecord, BufferRecord, NetworkRecords, PartRecord};
use crate::sim::{Simulation, Ticks};

// ===========================================================================
// Record sets
// ===========================================================================

/// Two blocks in series: `b1` makes raw `R` (1 tick) from `feed` into `X`,
/// `b2` turns one `R` into `P` (2 ticks) from `X` into `Y`. Every buffer
/// holds one part. Each block has one unit queued.
pub fn chain_records() -> NetworkRecords {
    NetworkRecords {
        parts: vec![PartRecord::new("R", 1, &[]), PartRecord::new("P", 2, &["R"])],
        buffers: vec![
            BufferRecord::new("feed", 1),
            BufferRecord::new("X", 1),
            BufferRecord::new("Y", 1),
        ],
        blocks: vec![
            BlockRecord::new("b1", &["R"], "feed", "X").with_backlog("R", 1),
            BlockRecord::new("b2", &["P"], "X", "Y").with_backlog("P", 1),
        ],
    }
}

/// A six-block assembly network. `b1`..`b3` make raw `A`, `B`, `C`; `b4`
/// assembles `D` from `A + B`; `b5` assembles `E` from `D + C` into
/// `final`. `b6` can make `F` from `E + D` but `E` never reaches its input,
/// so it has nothing queued.
pub fn assembly_records(units: u32) -> NetworkRecords {
    NetworkRecords {
        parts: vec![
            PartRecord::new("F", 3, &["E", "D"]),
            PartRecord::new("E", 5, &["D", "C"]),
            PartRecord::new("D", 4, &["A", "B"]),
            PartRecord::new("A", 0, &[]),
            PartRecord::new("B", 0, &[]),
            PartRecord::new("C", 0, &[]),
        ],
        buffers: vec![
            BufferRecord::new("inB1", 1),
            BufferRecord::new("inB2", 1),
            BufferRecord::new("inB3", 1),
            BufferRecord::new("inB4", 100),
            BufferRecord::new("inB5B6", 100),
            BufferRecord::new("final", 1000),
        ],
        blocks: vec![
            BlockRecord::new("b1", &["A"], "inB1", "inB4").with_backlog("A", units),
            BlockRecord::new("b2", &["B"], "inB2", "inB4").with_backlog("B", units),
            BlockRecord::new("b3", &["C"], "inB3", "inB5B6").with_backlog("C", units),
            BlockRecord::new("b4", &["D"], "inB4", "inB5B6").with_backlog("D", units),
            BlockRecord::new("b5", &["E"], "inB5B6", "final").with_backlog("E", units),
            BlockRecord::new("b6", &["F"], "inB5B6", "final"),
        ],
    }
}

/// `lines` independent two-stage lines (`raw{i}` then `made{i}`), each with
/// `units` queued on both stages. Line `i` uses buffers of capacity
/// `1 + i % 3` so some lines block and some don't.
pub fn wide_records(lines: usize, units: u32) -> NetworkRecords {
    let mut records = NetworkRecords::default();
    for i in 0..lines {
        let raw = format!("raw{i}");
        let made = format!("made{i}");
        let (src, mid, out) = (format!("src{i}"), format!("mid{i}"), format!("out{i}"));
        let capacity = 1 + (i % 3) as u32;

        records.parts.push(PartRecord::new(&raw, (i % 2) as Ticks, &[]));
        records.parts.push(PartRecord::new(&made, 1 + (i % 4) as Ticks, &[raw.as_str()]));
        records.buffers.push(BufferRecord::new(&src, 1));
        records.buffers.push(BufferRecord::new(&mid, capacity));
        records.buffers.push(BufferRecord::new(&out, capacity));
        records.blocks.push(
            BlockRecord::new(&format!("cut{i}"), &[raw.as_str()], &src, &mid).with_backlog(&raw, units),
        );
        records.blocks.push(
            BlockRecord::new(&format!("fit{i}"), &[made.as_str()], &mid, &out).with_backlog(&made, units),
        );
    }
    records
}

// ===========================================================================
// Simulation helpers
// ===========================================================================

/// Build `records` with default settings and wrap them in a simulation.
pub fn simulate(records: &NetworkRecords) -> Simulation {
    let network = GraphBuilder::new()
        .build(records)
        .expect("test records must build");
    Simulation::new(network)
}

pub fn two_block_chain() -> Simulation {
    simulate(&chain_records())
}

/// Number of parts in the buffer named `name`.
pub fn buffer_len(sim: &Simulation, name: &str) -> usize {
    let id = sim.find_buffer(name).expect("buffer exists");
    sim.buffer(id).map_or(0, |b| b.len())
}

/// Idle ticks of the block named `name`.
pub fn block_idle(sim: &Simulation, name: &str) -> Ticks {
    let id = sim.find_block(name).expect("block exists");
    sim.block(id).map_or(0, |b| b.idle_ticks())
}

/// Assert every wired buffer is within capacity.
pub fn assert_within_capacity(sim: &Simulation) {
    for (_, buffer) in sim.buffers() {
        assert!(
            buffer.len() <= buffer.capacity() as usize,
            "buffer {} holds {} of {}",
            buffer.name(),
            buffer.len(),
            buffer.capacity()
        );
    }
}
