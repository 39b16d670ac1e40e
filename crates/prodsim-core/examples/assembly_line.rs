//! Assembly line example: six blocks building a two-level product.
//!
//! Raw parts A, B and C are made by three feeder blocks. `b4` assembles D
//! from A + B, `b5` assembles E from D + C. Transitions are logged through
//! `tracing`; set `RUST_LOG=prodsim=trace` to see every tick.
//!
//! Run with: `cargo run -p prodsim-core --example assembly_line`

use prodsim_core::block::Block;
use prodsim_core::log::TracingLogger;
use prodsim_core::network::Network;
use prodsim_core::part::Part;
use prodsim_core::sim::Simulation;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prodsim=debug".parse()?))
        .init();

    // --- Step 1: Define the bill of materials ---

    let a = Part::raw("A", 0);
    let b = Part::raw("B", 0);
    let c = Part::raw("C", 0);
    let d = Part::new("D", 4, vec![a.clone(), b.clone()]);
    let e = Part::new("E", 5, vec![d.clone(), c.clone()]);

    // --- Step 2: Wire blocks to buffers ---

    let mut net = Network::new();
    let in_b1 = net.add_buffer("inB1", 1)?;
    let in_b2 = net.add_buffer("inB2", 1)?;
    let in_b3 = net.add_buffer("inB3", 1)?;
    let in_b4 = net.add_buffer("inB4", 100)?;
    let in_b5 = net.add_buffer("inB5", 100)?;
    let finished = net.add_buffer("final", 1000)?;

    net.add_block(Block::new("b1", vec![a], in_b1, in_b4))?;
    net.add_block(Block::new("b2", vec![b], in_b2, in_b4))?;
    net.add_block(Block::new("b3", vec![c], in_b3, in_b5))?;
    net.add_block(Block::new("b4", vec![d], in_b4, in_b5))?;
    net.add_block(Block::new("b5", vec![e.clone()], in_b5, finished))?;

    // --- Step 3: Order three E and everything it takes ---

    let mut sim = Simulation::with_logger(net, TracingLogger);
    let parts: Vec<_> = sim.parts().to_vec();
    for part in &parts {
        sim.order(part, 3)?;
    }

    // --- Step 4: Run until E is delivered ---

    while sim.buffer(finished).map_or(0, |buf| buf.count(&e)) < 3 {
        sim.tick()?;
    }

    println!("delivered 3 x {} after {} ticks", e, sim.ticks());
    for snapshot in sim.snapshot_all_blocks() {
        println!(
            "  {:<3} ticks={:<3} idle={:<3} state={:?}",
            snapshot.name, snapshot.ticks, snapshot.idle_ticks, snapshot.state
        );
    }
    println!("  total idle ticks: {}", sim.idle_ticks());

    Ok(())
}
