//! Per-block production backlog.
//!
//! The backlog is a stack of queued steps plus the step currently being
//! drained. Units are taken one at a time from the current step; once it is
//! exhausted the most recently queued step becomes current. Steps pushed
//! while a step is being drained wait until that step is finished.

use crate::part::Part;
use std::sync::Arc;

/// A production order: `remaining` more units of `part`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogStep {
    pub part: Arc<Part>,
    pub remaining: u32,
}

impl BacklogStep {
    pub fn new(part: Arc<Part>, remaining: u32) -> Self {
        Self { part, remaining }
    }
}

/// Ordered work queue consumed last-to-first.
#[derive(Debug, Clone, Default)]
pub struct ProductionBacklog {
    /// Step being drained. Always has `remaining > 0` when set.
    current: Option<BacklogStep>,
    /// Queued steps; the top of the stack is the last element.
    queued: Vec<BacklogStep>,
}

impl ProductionBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backlog by pushing `steps` in order, so the last step is
    /// served first.
    pub fn from_steps(steps: impl IntoIterator<Item = BacklogStep>) -> Self {
        let mut backlog = Self::new();
        for step in steps {
            backlog.push(step);
        }
        backlog
    }

    /// Queue a step on top of the stack. Steps with a zero count are dropped.
    pub fn push(&mut self, step: BacklogStep) {
        if step.remaining > 0 {
            self.queued.push(step);
        }
    }

    /// The part the next [`take_part`](Self::take_part) would return.
    pub fn next_part(&self) -> Option<&Arc<Part>> {
        self.current
            .as_ref()
            .or_else(|| self.queued.last())
            .map(|step| &step.part)
    }

    /// Consume one unit, moving to the newest queued step when the current
    /// one is exhausted.
    pub fn take_part(&mut self) -> Option<Arc<Part>> {
        if self.current.is_none() {
            self.current = self.queued.pop();
        }
        let step = self.current.as_mut()?;
        step.remaining -= 1;
        let part = Arc::clone(&step.part);
        if step.remaining == 0 {
            self.current = None;
        }
        Some(part)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.queued.is_empty()
    }

    /// Units left across the current and queued steps.
    pub fn remaining(&self) -> u64 {
        self.current
            .iter()
            .chain(&self.queued)
            .map(|s| u64::from(s.remaining))
            .sum()
    }

    /// The step being drained, if any.
    pub fn current_step(&self) -> Option<&BacklogStep> {
        self.current.as_ref()
    }

    /// Steps waiting behind the current one, bottom of the stack first.
    pub fn queued_steps(&self) -> &[BacklogStep] {
        &self.queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_order() {
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let mut backlog = ProductionBacklog::from_steps([
            BacklogStep::new(a.clone(), 2),
            BacklogStep::new(b.clone(), 1),
        ]);

        assert_eq!(backlog.take_part().as_deref(), Some(&*b));
        assert_eq!(backlog.take_part().as_deref(), Some(&*a));
        assert_eq!(backlog.take_part().as_deref(), Some(&*a));
        assert_eq!(backlog.take_part(), None);
        assert!(backlog.is_empty());
    }

    #[test]
    fn next_part_peeks_without_consuming() {
        let a = Part::raw("A", 0);
        let mut backlog = ProductionBacklog::from_steps([BacklogStep::new(a.clone(), 2)]);
        assert_eq!(backlog.next_part(), Some(&a));
        assert_eq!(backlog.next_part(), Some(&a));
        assert_eq!(backlog.remaining(), 2);

        backlog.take_part();
        assert_eq!(backlog.next_part(), Some(&a));
        backlog.take_part();
        assert_eq!(backlog.next_part(), None);
    }

    #[test]
    fn next_part_follows_current_step_then_queued() {
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let mut backlog = ProductionBacklog::from_steps([
            BacklogStep::new(a.clone(), 1),
            BacklogStep::new(b.clone(), 2),
        ]);

        assert_eq!(backlog.next_part(), Some(&b));
        backlog.take_part();
        assert_eq!(backlog.next_part(), Some(&b));
        backlog.take_part();
        assert_eq!(backlog.next_part(), Some(&a));
    }

    #[test]
    fn zero_count_steps_are_never_served() {
        let a = Part::raw("A", 0);
        let z = Part::raw("Z", 0);
        let mut backlog = ProductionBacklog::from_steps([
            BacklogStep::new(a.clone(), 1),
            BacklogStep::new(z, 0),
        ]);

        assert_eq!(backlog.next_part(), Some(&a));
        assert_eq!(backlog.take_part(), Some(a));
        assert_eq!(backlog.take_part(), None);
    }

    #[test]
    fn empty_backlog() {
        let mut backlog = ProductionBacklog::new();
        assert_eq!(backlog.next_part(), None);
        assert_eq!(backlog.take_part(), None);
        assert_eq!(backlog.remaining(), 0);
    }

    #[test]
    fn current_step_finishes_before_new_pushes() {
        let a = Part::raw("A", 0);
        let b = Part::raw("B", 0);
        let mut backlog = ProductionBacklog::from_steps([BacklogStep::new(a.clone(), 3)]);
        backlog.take_part();
        backlog.push(BacklogStep::new(b.clone(), 1));

        assert_eq!(backlog.next_part(), Some(&a));
        assert_eq!(backlog.current_step().map(|s| s.remaining), Some(2));
        assert_eq!(backlog.queued_steps().len(), 1);

        assert_eq!(backlog.take_part(), Some(a.clone()));
        assert_eq!(backlog.take_part(), Some(a));
        assert_eq!(backlog.take_part(), Some(b));
        assert_eq!(backlog.take_part(), None);
    }
}
