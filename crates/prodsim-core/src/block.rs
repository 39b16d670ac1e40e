//! The block production state machine.
//!
//! A block pulls its next target from its [`ProductionBacklog`], waits until
//! the input buffer holds the whole recipe, consumes it, works for the part's
//! manufacture time and finally deposits the part into its output buffer.
//!
//! # States
//!
//! - **Idle** -- nothing in progress. Either the backlog is empty or the
//!   input buffer can't supply the next recipe.
//! - **Producing** -- a part is assigned and ticks remain.
//! - **Blocked** -- the part is finished but the output buffer is full. The
//!   deposit is retried every tick; inputs are not consumed again.
//!
//! Idle and blocked ticks are counted in `idle_ticks`. They are normal
//! outcomes, reported through [`TickOutcome`], never as errors.

use crate::backlog::{BacklogStep, ProductionBacklog};
use crate::error::SimError;
use crate::id::BufferId;
use crate::log::{LogEvent, LogSource, SimLogger};
use crate::network::BufferArena;
use crate::part::{Part, PartMatch, push_unique};
use crate::sim::Ticks;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// State and outcome types
// ---------------------------------------------------------------------------

/// Why a block made no progress during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdleReason {
    /// The backlog is empty.
    NoWork,
    /// The input buffer can't supply the next part's recipe.
    MissingInputs,
    /// The finished part doesn't fit in the output buffer.
    OutputFull,
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdleReason::NoWork => "no work queued",
            IdleReason::MissingInputs => "inputs unavailable",
            IdleReason::OutputFull => "output full",
        })
    }
}

/// Observable production state, derived from the current part and its
/// remaining ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    #[default]
    Idle,
    Producing { ticks_left: Ticks },
    Blocked,
}

/// What a single [`Block::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No progress. Counted as an idle tick.
    Idle(IdleReason),
    /// Inputs were consumed and a new part assigned.
    Started,
    /// The current part advanced but isn't finished.
    Working,
    /// A part was deposited into the output buffer.
    Completed,
}

impl TickOutcome {
    pub fn is_idle(self) -> bool {
        matches!(self, TickOutcome::Idle(_))
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A production unit wired to exactly one input and one output buffer.
#[derive(Debug, Clone)]
pub struct Block {
    name: String,
    produces: Vec<Arc<Part>>,
    uses: Vec<Arc<Part>>,
    input: BufferId,
    output: BufferId,
    backlog: ProductionBacklog,
    /// How orders are matched against `produces`.
    part_match: PartMatch,

    current: Option<Arc<Part>>,
    ticks_remaining: Ticks,
    /// Inputs consumed for `current`.
    stock_parts: Vec<Arc<Part>>,
    ticks: Ticks,
    idle_ticks: Ticks,
}

impl Block {
    /// Create a block permitted to produce `produces`. Duplicate parts are
    /// collapsed; the parts it uses are the union of their recipes.
    pub fn new(
        name: impl Into<String>,
        produces: impl IntoIterator<Item = Arc<Part>>,
        input: BufferId,
        output: BufferId,
    ) -> Self {
        let mut unique = Vec::new();
        for part in produces {
            push_unique(&mut unique, &part);
        }
        let mut uses = Vec::new();
        for part in &unique {
            for component in part.made_from() {
                push_unique(&mut uses, component);
            }
        }

        Self {
            name: name.into(),
            produces: unique,
            uses,
            input,
            output,
            backlog: ProductionBacklog::new(),
            part_match: PartMatch::default(),
            current: None,
            ticks_remaining: 0,
            stock_parts: Vec::new(),
            ticks: 0,
            idle_ticks: 0,
        }
    }

    /// Match orders with `part_match`. [`Network::add_block`] sets this from
    /// the network's config.
    ///
    /// [`Network::add_block`]: crate::network::Network::add_block
    pub fn with_part_match(mut self, part_match: PartMatch) -> Self {
        self.part_match = part_match;
        self
    }

    /// Queue every step in order (the last one is served first).
    pub fn with_backlog(
        mut self,
        steps: impl IntoIterator<Item = BacklogStep>,
    ) -> Result<Self, SimError> {
        for step in steps {
            self.enqueue(&step.part, step.remaining)?;
        }
        Ok(self)
    }

    /// Queue `count` units of `part`. Fails with `UnauthorizedPart` if this
    /// block can't produce it.
    ///
    /// The block's own instance of the part is queued, so production always
    /// follows the recipe the block was built with.
    pub fn enqueue(&mut self, part: &Part, count: u32) -> Result<(), SimError> {
        let Some(own) = self.own_part(part).cloned() else {
            return Err(SimError::UnauthorizedPart {
                block: self.name.clone(),
                part: part.name().to_string(),
            });
        };
        self.backlog.push(BacklogStep::new(own, count));
        Ok(())
    }

    pub fn can_produce(&self, part: &Part) -> bool {
        self.own_part(part).is_some()
    }

    fn own_part(&self, part: &Part) -> Option<&Arc<Part>> {
        self.produces
            .iter()
            .find(|p| self.part_match.matches(p, part))
    }

    pub fn part_match(&self) -> PartMatch {
        self.part_match
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn produces(&self) -> &[Arc<Part>] {
        &self.produces
    }

    pub fn uses(&self) -> &[Arc<Part>] {
        &self.uses
    }

    pub fn input(&self) -> BufferId {
        self.input
    }

    pub fn output(&self) -> BufferId {
        self.output
    }

    pub fn backlog(&self) -> &ProductionBacklog {
        &self.backlog
    }

    /// The part being built (or waiting for output space).
    pub fn current_part(&self) -> Option<&Arc<Part>> {
        self.current.as_ref()
    }

    pub fn ticks_remaining(&self) -> Ticks {
        self.ticks_remaining
    }

    pub fn stock_parts(&self) -> &[Arc<Part>] {
        &self.stock_parts
    }

    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    pub fn idle_ticks(&self) -> Ticks {
        self.idle_ticks
    }

    pub fn state(&self) -> BlockState {
        match self.current {
            None => BlockState::Idle,
            Some(_) if self.ticks_remaining > 0 => BlockState::Producing {
                ticks_left: self.ticks_remaining,
            },
            Some(_) => BlockState::Blocked,
        }
    }

    /// Zero the counters and drop any part in progress. The backlog is kept
    /// as it stands; the unit taken from it for the dropped part is not
    /// returned, and neither are the inputs it consumed.
    pub fn reset_state(&mut self, log: &dyn SimLogger) {
        self.ticks = 0;
        self.idle_ticks = 0;
        self.ticks_remaining = 0;
        self.current = None;
        self.stock_parts.clear();
        self.emit(log, LogEvent::Reset);
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the block by one tick against the buffers in `buffers`.
    ///
    /// Errors are invariant violations and abort the tick; nothing is rolled
    /// back.
    pub fn tick(
        &mut self,
        buffers: &mut BufferArena,
        log: &dyn SimLogger,
    ) -> Result<TickOutcome, SimError> {
        self.ticks += 1;
        self.emit(log, LogEvent::Tick { tick: self.ticks });

        let Some(part) = self.current.clone() else {
            return self.try_start(buffers, log);
        };

        if self.ticks_remaining > 0 {
            self.ticks_remaining -= 1;
            self.emit(
                log,
                LogEvent::Progress {
                    part: part.name().to_string(),
                    ticks_left: self.ticks_remaining,
                },
            );
            if self.ticks_remaining > 0 {
                return Ok(TickOutcome::Working);
            }
        }

        self.try_deposit(part, buffers, log, true)
    }

    /// Idle path: commit to the next backlog part if its recipe is available.
    fn try_start(
        &mut self,
        buffers: &mut BufferArena,
        log: &dyn SimLogger,
    ) -> Result<TickOutcome, SimError> {
        let Some(next) = self.backlog.next_part().cloned() else {
            return Ok(self.idle(IdleReason::NoWork, log));
        };

        let Some(input) = buffers.get_mut(self.input) else {
            return Err(self.fault(log, SimError::UnknownBuffer(self.input)));
        };
        if !input.can_supply(next.made_from()) {
            return Ok(self.idle(IdleReason::MissingInputs, log));
        }

        let part = self.backlog.take_part().unwrap_or(next);
        let mut stock = Vec::with_capacity(part.made_from().len());
        for needed in part.made_from() {
            if !input.remove(needed) {
                let err = SimError::InventoryInconsistency {
                    block: self.name.clone(),
                    part: part.name().to_string(),
                    part_missing: needed.name().to_string(),
                    buffer: input.name().to_string(),
                };
                return Err(self.fault(log, err));
            }
            stock.push(Arc::clone(needed));
        }

        self.ticks_remaining = part.manufacture_time();
        self.stock_parts = stock;
        self.current = Some(Arc::clone(&part));
        self.emit(
            log,
            LogEvent::PartStarted {
                part: part.name().to_string(),
                ticks: self.ticks_remaining,
            },
        );

        if self.ticks_remaining == 0 {
            // Instant parts go out on the accept tick when there is room.
            return self.try_deposit(part, buffers, log, false);
        }
        Ok(TickOutcome::Started)
    }

    /// Finished path: move `part` to the output buffer, or stay blocked.
    fn try_deposit(
        &mut self,
        part: Arc<Part>,
        buffers: &mut BufferArena,
        log: &dyn SimLogger,
        count_idle: bool,
    ) -> Result<TickOutcome, SimError> {
        let Some(output) = buffers.get_mut(self.output) else {
            return Err(self.fault(log, SimError::UnknownBuffer(self.output)));
        };

        if output.is_full() {
            self.emit(
                log,
                LogEvent::OutputBlocked {
                    part: part.name().to_string(),
                    buffer: output.name().to_string(),
                },
            );
            if count_idle {
                return Ok(self.idle(IdleReason::OutputFull, log));
            }
            return Ok(TickOutcome::Started);
        }

        if let Err(err) = output.add(Arc::clone(&part)) {
            return Err(self.fault(log, err));
        }
        self.current = None;
        self.stock_parts.clear();
        self.emit(
            log,
            LogEvent::PartCompleted {
                part: part.name().to_string(),
            },
        );
        Ok(TickOutcome::Completed)
    }

    fn idle(&mut self, reason: IdleReason, log: &dyn SimLogger) -> TickOutcome {
        self.idle_ticks += 1;
        self.emit(
            log,
            LogEvent::Idle {
                idle_ticks: self.idle_ticks,
                reason,
            },
        );
        TickOutcome::Idle(reason)
    }

    fn fault(&self, log: &dyn SimLogger, err: SimError) -> SimError {
        self.emit(
            log,
            LogEvent::Fault {
                message: err.to_string(),
            },
        );
        err
    }

    pub(crate) fn emit(&self, log: &dyn SimLogger, event: LogEvent) {
        log.log(&LogSource::Block(self.name.clone()), &event);
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::log::{NullLogger, RecordingLogger};

    struct Rig {
        buffers: BufferArena,
        input: BufferId,
        output: BufferId,
    }

    fn rig(input_capacity: u32, output_capacity: u32) -> Rig {
        let mut buffers = BufferArena::with_key();
        let input = buffers.insert(Buffer::new("in", input_capacity).unwrap());
        let output = buffers.insert(Buffer::new("out", output_capacity).unwrap());
        Rig {
            buffers,
            input,
            output,
        }
    }

    #[test]
    fn uses_is_union_of_recipes() {
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let c = Part::raw("C", 0);
        let d = Part::new("D", 4, vec![a.clone(), b.clone()]);
        let e = Part::new("E", 5, vec![d.clone(), c.clone(), a.clone()]);
        let r = rig(1, 1);
        let block = Block::new("b", vec![d.clone(), e, d], r.input, r.output);

        assert_eq!(block.produces().len(), 2);
        let names: Vec<_> = block.uses().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn enqueue_rejects_foreign_parts() {
        let a = Part::raw("A", 0);
        let r = rig(1, 1);
        let mut block = Block::new("b1", vec![a.clone()], r.input, r.output);
        assert!(block.enqueue(&a, 1).is_ok());

        let err = block.enqueue(&Part::raw("Z", 0), 1).unwrap_err();
        assert_eq!(
            err,
            SimError::UnauthorizedPart {
                block: "b1".to_string(),
                part: "Z".to_string()
            }
        );

        let result = Block::new("b2", vec![Part::raw("A", 0)], r.input, r.output)
            .with_backlog([BacklogStep::new(Part::raw("A", 9), 1)]);
        assert!(matches!(result, Err(SimError::UnauthorizedPart { .. })));
    }

    #[test]
    fn idle_without_work() {
        let mut r = rig(1, 1);
        let mut block = Block::new("b", vec![Part::raw("A", 1)], r.input, r.output);

        let outcome = block.tick(&mut r.buffers, &NullLogger).unwrap();
        assert_eq!(outcome, TickOutcome::Idle(IdleReason::NoWork));
        assert_eq!(block.ticks(), 1);
        assert_eq!(block.idle_ticks(), 1);
        assert_eq!(block.state(), BlockState::Idle);
    }

    #[test]
    fn idle_until_inputs_arrive_then_consumes_them() {
        let mut r = rig(4, 1);
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let d = Part::new("D", 2, vec![a.clone(), b.clone()]);
        let mut block = Block::new("b", vec![d.clone()], r.input, r.output)
            .with_backlog([BacklogStep::new(d.clone(), 1)])
            .unwrap();

        r.buffers[r.input].add(a.clone()).unwrap();
        let outcome = block.tick(&mut r.buffers, &NullLogger).unwrap();
        assert_eq!(outcome, TickOutcome::Idle(IdleReason::MissingInputs));
        assert_eq!(r.buffers[r.input].len(), 1);

        r.buffers[r.input].add(b.clone()).unwrap();
        let outcome = block.tick(&mut r.buffers, &NullLogger).unwrap();
        assert_eq!(outcome, TickOutcome::Started);
        assert!(r.buffers[r.input].is_empty());
        assert_eq!(block.current_part(), Some(&d));
        assert_eq!(block.stock_parts().len(), 2);
        assert_eq!(block.state(), BlockState::Producing { ticks_left: 2 });
        assert!(block.backlog().is_empty());

        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Working
        );
        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Completed
        );
        assert_eq!(r.buffers[r.output].count(&d), 1);
        assert_eq!(block.current_part(), None);
        assert!(block.stock_parts().is_empty());
        assert_eq!(block.idle_ticks(), 1);
        assert_eq!(block.ticks(), 4);
    }

    #[test]
    fn blocked_output_retries_without_reconsuming() {
        let mut r = rig(4, 1);
        let a = Part::raw("A", 0);
        let p = Part::new("P", 1, vec![a.clone()]);
        let mut block = Block::new("b", vec![p.clone()], r.input, r.output)
            .with_backlog([BacklogStep::new(p.clone(), 2)])
            .unwrap();
        r.buffers[r.input].add(a.clone()).unwrap();
        r.buffers[r.input].add(a.clone()).unwrap();
        r.buffers[r.output].add(Part::raw("junk", 0)).unwrap();

        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Started
        );
        for expected_idle in 1..=3 {
            let outcome = block.tick(&mut r.buffers, &NullLogger).unwrap();
            assert_eq!(outcome, TickOutcome::Idle(IdleReason::OutputFull));
            assert_eq!(block.idle_ticks(), expected_idle);
            assert_eq!(block.state(), BlockState::Blocked);
            assert_eq!(block.ticks_remaining(), 0);
        }
        // Only the first unit's input was taken.
        assert_eq!(r.buffers[r.input].len(), 1);

        r.buffers[r.output].clear();
        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Completed
        );
        assert_eq!(r.buffers[r.output].count(&p), 1);
        assert_eq!(r.buffers[r.input].len(), 1);
    }

    #[test]
    fn zero_time_part_deposits_on_accept_tick() {
        let mut r = rig(1, 2);
        let a = Part::raw("A", 0);
        let mut block = Block::new("b", vec![a.clone()], r.input, r.output)
            .with_backlog([BacklogStep::new(a.clone(), 3)])
            .unwrap();

        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Completed
        );
        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Completed
        );
        assert!(r.buffers[r.output].is_full());

        // Third unit is accepted but has nowhere to go.
        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Started
        );
        assert_eq!(block.state(), BlockState::Blocked);
        assert_eq!(block.idle_ticks(), 0);

        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Idle(IdleReason::OutputFull)
        );
        r.buffers[r.output].remove(&a);
        assert_eq!(
            block.tick(&mut r.buffers, &NullLogger).unwrap(),
            TickOutcome::Completed
        );
        assert_eq!(block.idle_ticks(), 1);
    }

    #[test]
    fn unknown_buffer_is_a_fault() {
        let r = rig(1, 1);
        let mut other = BufferArena::with_key();
        let a = Part::raw("A", 0);
        let mut block = Block::new("b", vec![a.clone()], r.input, r.output)
            .with_backlog([BacklogStep::new(a, 1)])
            .unwrap();
        let logger = RecordingLogger::new();

        let err = block.tick(&mut other, &logger).unwrap_err();
        assert_eq!(err, SimError::UnknownBuffer(r.input));
        let events = logger.events_from(&LogSource::Block("b".to_string()));
        assert!(matches!(events.last(), Some(LogEvent::Fault { .. })));
    }

    #[test]
    fn reset_clears_progress_but_keeps_backlog() {
        let mut r = rig(1, 1);
        let a = Part::raw("A", 3);
        let mut block = Block::new("b", vec![a.clone()], r.input, r.output)
            .with_backlog([BacklogStep::new(a, 2)])
            .unwrap();
        block.tick(&mut r.buffers, &NullLogger).unwrap();
        block.tick(&mut r.buffers, &NullLogger).unwrap();

        block.reset_state(&NullLogger);
        assert_eq!(block.ticks(), 0);
        assert_eq!(block.idle_ticks(), 0);
        assert_eq!(block.ticks_remaining(), 0);
        assert_eq!(block.current_part(), None);
        assert_eq!(block.state(), BlockState::Idle);
        // The unit in progress is gone; only the queued one is left.
        assert_eq!(block.backlog().remaining(), 1);
    }

    #[test]
    fn emits_transition_events() {
        let mut r = rig(1, 1);
        let a = Part::raw("A", 1);
        let mut block = Block::new("b", vec![a.clone()], r.input, r.output)
            .with_backlog([BacklogStep::new(a, 1)])
            .unwrap();
        let logger = RecordingLogger::new();

        block.tick(&mut r.buffers, &logger).unwrap();
        block.tick(&mut r.buffers, &logger).unwrap();
        block.tick(&mut r.buffers, &logger).unwrap();

        let events = logger.events_from(&LogSource::Block("b".to_string()));
        assert_eq!(
            events,
            vec![
                LogEvent::Tick { tick: 1 },
                LogEvent::PartStarted {
                    part: "A".to_string(),
                    ticks: 1
                },
                LogEvent::Tick { tick: 2 },
                LogEvent::Progress {
                    part: "A".to_string(),
                    ticks_left: 0
                },
                LogEvent::PartCompleted {
                    part: "A".to_string()
                },
                LogEvent::Tick { tick: 3 },
                LogEvent::Idle {
                    idle_ticks: 1,
                    reason: IdleReason::NoWork
                },
            ]
        );
    }

    #[test]
    fn enqueue_stores_the_blocks_own_part() {
        let r = rig(1, 1);
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let d = Part::new("D", 2, vec![a.clone(), b]);
        let look_alike = Part::new("D", 2, vec![a.clone(), a]);
        let mut block = Block::new("b", vec![d.clone()], r.input, r.output);

        // Equal by name and time, so accepted, but the block's recipe is kept.
        block.enqueue(&look_alike, 1).unwrap();
        assert!(Arc::ptr_eq(block.backlog().next_part().unwrap(), &d));
    }

    #[test]
    fn structural_blocks_reject_look_alike_recipes() {
        let r = rig(1, 1);
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let d = Part::new("D", 2, vec![a.clone(), b.clone()]);
        let look_alike = Part::new("D", 2, vec![a.clone(), a.clone()]);
        let twin = Part::new("D", 2, vec![Part::raw("A", 0), Part::raw("B", 0)]);
        let mut block = Block::new("b", vec![d.clone()], r.input, r.output)
            .with_part_match(PartMatch::Structural);

        assert!(!block.can_produce(&look_alike));
        assert!(matches!(
            block.enqueue(&look_alike, 1),
            Err(SimError::UnauthorizedPart { .. })
        ));
        assert!(block.backlog().is_empty());

        // A separately built part with the same recipe tree is fine.
        assert!(block.can_produce(&twin));
        block.enqueue(&twin, 1).unwrap();
        assert!(Arc::ptr_eq(block.backlog().next_part().unwrap(), &d));
    }
}
