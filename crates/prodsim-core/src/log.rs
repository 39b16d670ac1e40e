//! Structured log events and the sink they are emitted through.
//!
//! The simulation and its blocks report construction, ticks, idle ticks and
//! every state transition to an injected [`SimLogger`]. The default sink is
//! [`NullLogger`]. [`TracingLogger`] forwards to the `tracing` ecosystem and
//! [`RecordingLogger`] keeps events in memory for inspection.

use crate::block::IdleReason;
use crate::sim::Ticks;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Who emitted an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Simulation,
    Block(String),
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Simulation => f.write_str("simulation"),
            LogSource::Block(name) => write!(f, "block {name}"),
        }
    }
}

/// Something worth reporting. Part and buffer references are by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Created,
    Tick {
        tick: Ticks,
    },
    Idle {
        idle_ticks: Ticks,
        reason: IdleReason,
    },
    /// Inputs consumed; production of `part` begins.
    PartStarted {
        part: String,
        ticks: Ticks,
    },
    Progress {
        part: String,
        ticks_left: Ticks,
    },
    /// `part` was deposited into the output buffer.
    PartCompleted {
        part: String,
    },
    /// `part` is finished but `buffer` has no room for it.
    OutputBlocked {
        part: String,
        buffer: String,
    },
    Reset,
    Fault {
        message: String,
    },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Created => f.write_str("created"),
            LogEvent::Tick { tick } => write!(f, "tick {tick}"),
            LogEvent::Idle { idle_ticks, reason } => {
                write!(f, "idle ({reason}), idle ticks {idle_ticks}")
            }
            LogEvent::PartStarted { part, ticks } => {
                write!(f, "started part {part}, {ticks} ticks to go")
            }
            LogEvent::Progress { part, ticks_left } => {
                write!(f, "ticks left to make part {part}: {ticks_left}")
            }
            LogEvent::PartCompleted { part } => write!(f, "made part {part}"),
            LogEvent::OutputBlocked { part, buffer } => {
                write!(f, "part {part} finished but buffer {buffer} is full")
            }
            LogEvent::Reset => f.write_str("state reset"),
            LogEvent::Fault { message } => write!(f, "fault: {message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// A destination for simulation log events.
pub trait SimLogger: fmt::Debug + Send {
    fn log(&self, source: &LogSource, event: &LogEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl SimLogger for NullLogger {
    fn log(&self, _source: &LogSource, _event: &LogEvent) {}
}

// ---------------------------------------------------------------------------
// tracing bridge
// ---------------------------------------------------------------------------

/// Forwards events to `tracing` under the `prodsim` target.
///
/// Lifecycle events go out at `info`, state transitions at `debug`, per-tick
/// chatter at `trace` and faults at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl SimLogger for TracingLogger {
    fn log(&self, source: &LogSource, event: &LogEvent) {
        match event {
            LogEvent::Created => tracing::info!(target: "prodsim", %source, "created"),
            LogEvent::Reset => tracing::info!(target: "prodsim", %source, "state reset"),
            LogEvent::Tick { tick } => {
                tracing::trace!(target: "prodsim", %source, tick = *tick, "tick")
            }
            LogEvent::Progress { part, ticks_left } => tracing::trace!(
                target: "prodsim",
                %source,
                part = %part,
                ticks_left = *ticks_left,
                "progress"
            ),
            LogEvent::Idle { idle_ticks, reason } => tracing::debug!(
                target: "prodsim",
                %source,
                idle_ticks = *idle_ticks,
                reason = %reason,
                "idle"
            ),
            LogEvent::PartStarted { part, ticks } => tracing::debug!(
                target: "prodsim",
                %source,
                part = %part,
                ticks = *ticks,
                "part started"
            ),
            LogEvent::PartCompleted { part } => {
                tracing::debug!(target: "prodsim", %source, part = %part, "part completed")
            }
            LogEvent::OutputBlocked { part, buffer } => tracing::debug!(
                target: "prodsim",
                %source,
                part = %part,
                buffer = %buffer,
                "output blocked"
            ),
            LogEvent::Fault { message } => {
                tracing::warn!(target: "prodsim", %source, message = %message, "fault")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory recorder
// ---------------------------------------------------------------------------

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub source: LogSource,
    pub event: LogEvent,
}

/// Stores every event in a shared list. Clones share the same list, so a
/// caller can keep one handle and give another to the simulation.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        // A panic while pushing can't leave the Vec half-written.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Recorded events from one source, in order.
    pub fn events_from(&self, source: &LogSource) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|r| &r.source == source)
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl SimLogger for RecordingLogger {
    fn log(&self, source: &LogSource, event: &LogEvent) {
        self.lock().push(LogRecord {
            source: source.clone(),
            event: event.clone(),
        });
    }
}
