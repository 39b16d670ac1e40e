//! Prodsim Core -- a discrete-time production network simulator.
//!
//! A network is made of [`block::Block`]s (production units) wired through
//! capacity-bounded [`buffer::Buffer`]s. Each block draws its next target
//! from a [`backlog::ProductionBacklog`], waits for the input buffer to hold
//! the part's recipe, works for the part's manufacture time and deposits the
//! result into its output buffer.
//!
//! # Tick Semantics
//!
//! Each call to [`sim::Simulation::tick`] advances every block once, in
//! insertion order. A block in a single tick either:
//!
//! 1. **Starts** -- consumes a full recipe from its input and commits to the
//!    next backlog part.
//! 2. **Works** -- counts down the current part's manufacture time.
//! 3. **Completes** -- moves the finished part into its output buffer.
//! 4. **Idles** -- no work queued, inputs missing or output full. Idle ticks
//!    are counted per block and summed by the simulation.
//!
//! Idle and blocked conditions are values ([`block::TickOutcome`]), not
//! errors. Only broken invariants surface as [`error::SimError`].
//!
//! # Building a Network
//!
//! Wire blocks by hand through a [`network::Network`], or describe parts,
//! buffers and blocks as flat [`records::NetworkRecords`] and let
//! [`builder::GraphBuilder`] resolve them:
//!
//! ```rust,ignore
//! let network = GraphBuilder::new().build(&records)?;
//! let mut sim = Simulation::with_logger(network, TracingLogger);
//! sim.run(100)?;
//! ```
//!
//! # Key Types
//!
//! - [`part::Part`] -- Immutable bill-of-materials node, shared by `Arc`.
//! - [`buffer::Buffer`] -- Bounded store between two blocks.
//! - [`backlog::ProductionBacklog`] -- Stack of `(part, count)` steps.
//! - [`block::Block`] -- The production state machine.
//! - [`sim::Simulation`] -- Owns the block and buffer arenas and ticks them.
//! - [`builder::GraphBuilder`] -- Dependency-ordered construction with cycle
//!   detection.
//! - [`log::SimLogger`] -- Injected sink for structured log events.

pub mod backlog;
pub mod block;
pub mod buffer;
pub mod builder;
pub mod error;
pub mod id;
pub mod log;
pub mod network;
pub mod part;
pub mod query;
pub mod records;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
