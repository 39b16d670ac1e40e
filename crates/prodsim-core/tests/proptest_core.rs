//! Property-based tests for the production simulator.
//!
//! Uses proptest to generate random networks, backlogs and part graphs,
//! then verify structural invariants hold.

use prodsim_core::backlog::{BacklogStep, ProductionBacklog};
use prodsim_core::builder::{BuildError, GraphBuilder};
use prodsim_core::part::Part;
use prodsim_core::records::PartRecord;
use prodsim_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Backlog steps as (part index, count). Counts include zero.
fn arb_steps(max_steps: usize) -> impl Strategy<Value = Vec<(usize, u32)>> {
    proptest::collection::vec((0..4usize, 0..4u32), 0..=max_steps)
}

/// An acyclic part graph: part `i` may depend only on parts `j < i`.
/// Returned records are shuffled so dependencies come in arbitrary order.
fn arb_dag(max_parts: usize) -> impl Strategy<Value = Vec<PartRecord>> {
    (1..=max_parts)
        .prop_flat_map(|n| {
            let deps = proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), n);
            (deps, Just(n))
        })
        .prop_map(|(deps, n)| {
            (0..n)
                .map(|i| {
                    let made_from: Vec<String> = if i == 0 {
                        Vec::new()
                    } else {
                        deps[i].iter().map(|d| format!("p{}", d % i)).collect()
                    };
                    PartRecord {
                        name: format!("p{i}"),
                        manufacture_time: (i % 3) as u64,
                        made_from,
                    }
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Capacity and idle accounting hold after every tick.
    #[test]
    fn capacity_and_idle_accounting(lines in 1..8usize, units in 0..6u32, ticks in 1..60usize) {
        let mut sim = simulate(&wide_records(lines, units));
        for _ in 0..ticks {
            sim.tick().unwrap();
            for (_, buffer) in sim.buffers() {
                prop_assert!(buffer.len() <= buffer.capacity() as usize);
            }
            let sum: u64 = sim.blocks().map(|(_, b)| b.idle_ticks()).sum();
            prop_assert_eq!(sim.idle_ticks(), sum);
        }
    }

    /// Determinism: two simulations from identical records stay in lockstep.
    #[test]
    fn deterministic_simulation(lines in 1..8usize, units in 0..6u32, ticks in 1..40usize) {
        let mut a = simulate(&wide_records(lines, units));
        let mut b = simulate(&wide_records(lines, units));
        for _ in 0..ticks {
            a.tick().unwrap();
            b.tick().unwrap();
            prop_assert_eq!(a.state_hash(), b.state_hash());
        }
    }

    /// A second reset changes nothing.
    #[test]
    fn reset_is_idempotent(units in 0..6u32, ticks in 0..40u64) {
        let mut sim = simulate(&assembly_records(units));
        sim.run(ticks).unwrap();

        sim.reset_state();
        let hash = sim.state_hash();
        let blocks = sim.snapshot_all_blocks();
        sim.reset_state();

        prop_assert_eq!(sim.state_hash(), hash);
        prop_assert_eq!(sim.snapshot_all_blocks(), blocks);
        prop_assert_eq!(sim.idle_ticks(), 0);
        for (_, buffer) in sim.buffers() {
            prop_assert!(buffer.is_empty());
        }
    }

    /// Steps are served last-pushed first, each drained before the next.
    #[test]
    fn backlog_serves_in_stack_order(steps in arb_steps(8)) {
        let parts: Vec<_> = (0..4).map(|i| Part::raw(format!("p{i}"), 0)).collect();
        let mut backlog = ProductionBacklog::from_steps(
            steps.iter().map(|&(i, n)| BacklogStep::new(parts[i].clone(), n)),
        );

        let expected: Vec<String> = steps
            .iter()
            .rev()
            .flat_map(|&(i, n)| std::iter::repeat_n(format!("p{i}"), n as usize))
            .collect();
        prop_assert_eq!(backlog.remaining(), expected.len() as u64);

        let mut served = Vec::new();
        while let Some(part) = backlog.take_part() {
            served.push(part.name().to_string());
        }
        prop_assert_eq!(served, expected);
        prop_assert!(backlog.is_empty());
        prop_assert!(backlog.next_part().is_none());
    }

    /// Any acyclic record set resolves, whatever its order, with one
    /// instance per name and recipes matching the records.
    #[test]
    fn acyclic_parts_always_resolve(records in arb_dag(12)) {
        let parts = GraphBuilder::new().resolve_parts(&records).unwrap();
        prop_assert_eq!(parts.len(), records.len());
        for (part, record) in parts.iter().zip(&records) {
            prop_assert_eq!(part.name(), record.name.as_str());
            let deps: Vec<&str> = part.made_from().iter().map(|p| p.name()).collect();
            prop_assert_eq!(deps, record.made_from.iter().map(String::as_str).collect::<Vec<_>>());
            for component in part.made_from() {
                let shared = parts.iter().find(|p| p.name() == component.name()).unwrap();
                prop_assert!(std::sync::Arc::ptr_eq(shared, component));
            }
        }
    }

    /// Closing a loop back to the root always reports a cycle.
    #[test]
    fn closed_loops_are_cycles(len in 1..8usize) {
        let records: Vec<PartRecord> = (0..len)
            .map(|i| PartRecord {
                name: format!("p{i}"),
                manufacture_time: 1,
                made_from: vec![format!("p{}", (i + 1) % len)],
            })
            .collect();
        let err = GraphBuilder::new().resolve_parts(&records).unwrap_err();
        match err {
            BuildError::CyclicDependency { cycle } => {
                prop_assert_eq!(cycle.len(), len + 1);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            other => prop_assert!(false, "expected a cycle, got {other}"),
        }
    }
}
