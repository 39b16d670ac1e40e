//! Bill-of-materials nodes.
//!
//! A [`Part`] is immutable once built and shared through [`Arc`] by every
//! buffer, block and backlog that refers to it. Recipes are assembled bottom
//! up, so the `made_from` graph is always acyclic.
//!
//! # Equality
//!
//! `Part`'s `PartialEq` and `Hash` look only at `(name, manufacture_time)`;
//! the recipe is ignored. Two parts with the same name and duration but
//! different recipes are therefore interchangeable in sets and maps. Buffers
//! choose how they match parts through [`PartMatch`], which can opt into
//! comparing recipes as well.

use crate::sim::Ticks;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A raw material (empty recipe) or an assembly built from other parts.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    manufacture_time: Ticks,
    made_from: Vec<Arc<Part>>,
}

impl Part {
    /// Build a shared part from its recipe.
    pub fn new(
        name: impl Into<String>,
        manufacture_time: Ticks,
        made_from: impl IntoIterator<Item = Arc<Part>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            manufacture_time,
            made_from: made_from.into_iter().collect(),
        })
    }

    /// Build a raw material (no recipe).
    pub fn raw(name: impl Into<String>, manufacture_time: Ticks) -> Arc<Self> {
        Self::new(name, manufacture_time, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticks required to produce one unit.
    pub fn manufacture_time(&self) -> Ticks {
        self.manufacture_time
    }

    /// The recipe, in declaration order. Repeated entries mean several units.
    pub fn made_from(&self) -> &[Arc<Part>] {
        &self.made_from
    }

    pub fn is_raw(&self) -> bool {
        self.made_from.is_empty()
    }

    /// Compare name, manufacture time and the full recipe tree.
    pub fn structurally_eq(&self, other: &Part) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self == other
            && self.made_from.len() == other.made_from.len()
            && self
                .made_from
                .iter()
                .zip(&other.made_from)
                .all(|(a, b)| a.structurally_eq(b))
    }
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.manufacture_time == other.manufacture_time
    }
}

impl Eq for Part {}

impl Hash for Part {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.manufacture_time.hash(state);
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Matching policy
// ---------------------------------------------------------------------------

/// How a buffer decides that a stored part satisfies a requested one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartMatch {
    /// Same name and manufacture time; recipes are not compared.
    #[default]
    NameAndTime,
    /// Same name, manufacture time and recipe tree.
    Structural,
}

impl PartMatch {
    pub fn matches(self, stored: &Part, wanted: &Part) -> bool {
        match self {
            PartMatch::NameAndTime => stored == wanted,
            PartMatch::Structural => stored.structurally_eq(wanted),
        }
    }
}

/// Append `part` to `parts` unless an equal part is already present.
pub(crate) fn push_unique(parts: &mut Vec<Arc<Part>>, part: &Arc<Part>) {
    if !parts.iter().any(|p| p == part) {
        parts.push(Arc::clone(part));
    }
}
