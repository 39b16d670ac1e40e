//! Network construction from flat records.
//!
//! Part records may list their dependencies in any order. The builder first
//! indexes every record by name, rejects unknown references, then walks the
//! dependency graph depth-first with three-colour marking. A grey node met
//! again is a cycle and is reported as [`BuildError::CyclicDependency`]
//! instead of recursing forever. Parts are materialized in the resulting
//! post-order, so each part is created once and after all of its
//! components.

use crate::block::Block;
use crate::error::SimError;
use crate::id::BufferId;
use crate::network::Network;
use crate::part::Part;
use crate::records::{NetworkRecords, PartRecord};
use crate::sim::SimConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{referrer} references unknown {kind} '{name}'")]
    UnresolvedReference {
        kind: &'static str,
        name: String,
        referrer: String,
    },
    #[error("cyclic part dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Builds a [`Network`] from [`NetworkRecords`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    config: SimConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Networks built by this builder use `config`.
    pub fn with_config(config: SimConfig) -> Self {
        Self { config }
    }

    /// Resolve parts, then buffers, then blocks (with any recorded backlog).
    pub fn build(&self, records: &NetworkRecords) -> Result<Network, BuildError> {
        let parts = self.resolve_parts(&records.parts)?;
        let part_by_name: HashMap<&str, &Arc<Part>> =
            parts.iter().map(|p| (p.name(), p)).collect();
        let find_part = |name: &str, referrer: &str| {
            part_by_name
                .get(name)
                .map(|p| Arc::clone(p))
                .ok_or_else(|| BuildError::UnresolvedReference {
                    kind: "part",
                    name: name.to_string(),
                    referrer: referrer.to_string(),
                })
        };

        let mut network = Network::with_config(self.config);
        let mut buffer_by_name: HashMap<&str, BufferId> = HashMap::new();
        for record in &records.buffers {
            if buffer_by_name.contains_key(record.name.as_str()) {
                return Err(BuildError::DuplicateName {
                    kind: "buffer",
                    name: record.name.clone(),
                });
            }
            let id = network.add_buffer(record.name.clone(), record.capacity)?;
            buffer_by_name.insert(record.name.as_str(), id);
        }
        let find_buffer = |name: &str, referrer: &str| {
            buffer_by_name
                .get(name)
                .copied()
                .ok_or_else(|| BuildError::UnresolvedReference {
                    kind: "buffer",
                    name: name.to_string(),
                    referrer: referrer.to_string(),
                })
        };

        let mut block_names = HashSet::new();
        for record in &records.blocks {
            if !block_names.insert(record.name.as_str()) {
                return Err(BuildError::DuplicateName {
                    kind: "block",
                    name: record.name.clone(),
                });
            }
            let produces = record
                .produces
                .iter()
                .map(|name| find_part(name, &record.name))
                .collect::<Result<Vec<_>, _>>()?;
            let input = find_buffer(&record.input_buffer, &record.name)?;
            let output = find_buffer(&record.output_buffer, &record.name)?;

            let mut block = Block::new(record.name.clone(), produces, input, output)
                .with_part_match(self.config.part_match);
            for step in &record.backlog {
                block.enqueue(&*find_part(&step.part, &record.name)?, step.count)?;
            }
            network.add_block(block)?;
        }

        Ok(network)
    }

    /// Materialize every part record, returned in record order. Parts that
    /// share a component share the same instance of it.
    pub fn resolve_parts(&self, records: &[PartRecord]) -> Result<Vec<Arc<Part>>, BuildError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.name.as_str(), i).is_some() {
                return Err(BuildError::DuplicateName {
                    kind: "part",
                    name: record.name.clone(),
                });
            }
        }

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(records.len());
        for record in records {
            let resolved = record
                .made_from
                .iter()
                .map(|name| {
                    index
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| BuildError::UnresolvedReference {
                            kind: "part",
                            name: name.clone(),
                            referrer: record.name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            deps.push(resolved);
        }

        let mut built: Vec<Option<Arc<Part>>> = vec![None; records.len()];
        for i in dependency_order(records, &deps)? {
            let made_from: Vec<Arc<Part>> =
                deps[i].iter().filter_map(|&j| built[j].clone()).collect();
            let record = &records[i];
            built[i] = Some(Part::new(
                record.name.clone(),
                record.manufacture_time,
                made_from,
            ));
        }
        Ok(built.into_iter().flatten().collect())
    }
}

/// Post-order over `deps`: every index appears after all of its
/// dependencies. Iterative, so deep recipes can't overflow the stack.
fn dependency_order(records: &[PartRecord], deps: &[Vec<usize>]) -> Result<Vec<usize>, BuildError> {
    let mut marks = vec![Mark::Unvisited; records.len()];
    let mut order = Vec::with_capacity(records.len());
    // (node, index of the next dependency to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..records.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&dep) = deps[node].get(frame.1) else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[dep] {
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push((dep, 0));
                }
                Mark::InProgress => {
                    let start = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..]
                        .iter()
                        .map(|&(n, _)| records[n].name.clone())
                        .collect();
                    cycle.push(records[dep].name.clone());
                    return Err(BuildError::CyclicDependency { cycle });
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
