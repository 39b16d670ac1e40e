//! Capacity-bounded inventory sitting between blocks.

use crate::error::SimError;
use crate::part::{Part, PartMatch};
use std::fmt;
use std::sync::Arc;

/// An ordered multiset of parts that never holds more than `capacity` items.
///
/// Only the blocks wired to a buffer mutate it during a tick. Matching of
/// stored parts against requested ones follows the buffer's [`PartMatch`].
#[derive(Debug, Clone)]
pub struct Buffer {
    name: String,
    capacity: u32,
    contents: Vec<Arc<Part>>,
    part_match: PartMatch,
}

impl Buffer {
    /// Create an empty buffer. A capacity of 0 is rejected.
    pub fn new(name: impl Into<String>, capacity: u32) -> Result<Self, SimError> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimError::InvalidCapacity { buffer: name });
        }
        Ok(Self {
            name,
            capacity,
            contents: Vec::with_capacity(capacity as usize),
            part_match: PartMatch::default(),
        })
    }

    /// Replace the matching policy.
    pub fn with_part_match(mut self, part_match: PartMatch) -> Self {
        self.part_match = part_match;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn part_match(&self) -> PartMatch {
        self.part_match
    }

    /// Stored parts, oldest first.
    pub fn contents(&self) -> &[Arc<Part>] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.contents.len() >= self.capacity as usize
    }

    /// Number of stored parts matching `part`.
    pub fn count(&self, part: &Part) -> usize {
        self.contents
            .iter()
            .filter(|p| self.part_match.matches(p, part))
            .count()
    }

    /// Append a part. Fails with `CapacityExceeded` when the buffer is full.
    pub fn add(&mut self, part: Arc<Part>) -> Result<(), SimError> {
        if self.is_full() {
            return Err(SimError::CapacityExceeded {
                buffer: self.name.clone(),
                part: part.name().to_string(),
            });
        }
        self.contents.push(part);
        Ok(())
    }

    /// Remove the first stored part matching `part`. Returns whether one was
    /// found.
    pub fn remove(&mut self, part: &Part) -> bool {
        match self
            .contents
            .iter()
            .position(|p| self.part_match.matches(p, part))
        {
            Some(index) => {
                self.contents.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether every part of `required` (as a multiset) could be taken from
    /// the current contents. The buffer itself is not touched.
    pub fn can_supply(&self, required: &[Arc<Part>]) -> bool {
        if required.len() > self.contents.len() {
            return false;
        }
        let mut taken = vec![false; self.contents.len()];
        required.iter().all(|wanted| {
            let slot = self
                .contents
                .iter()
                .enumerate()
                .position(|(i, p)| !taken[i] && self.part_match.matches(p, wanted));
            match slot {
                Some(i) => {
                    taken[i] = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Drop every stored part.
    pub fn clear(&mut self) {
        self.contents.clear();
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
