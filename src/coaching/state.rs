use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LoopStatus {
    Idle,
    Scheduled,
    InFlight,
}

impl Default for LoopStatus {
    fn default() -> Self {
        LoopStatus::Idle
    }
}

/// Mutable loop bookkeeping. Only the worker task of the current run writes
/// `status` and the counters; `start`/`stop` flip `running` and bump
/// `generation` so a draining worker from an earlier run can tell it has been
/// superseded.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoopState {
    pub status: LoopStatus,
    pub running: bool,
    pub generation: u64,
    pub last_analysis_at: Option<Instant>,
    pub last_analysis_wall: Option<DateTime<Utc>>,
    pub completed_cycles: u64,
    pub failed_cycles: u64,
    pub skipped_cycles: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoopSnapshot {
    pub status: LoopStatus,
    pub running: bool,
    pub last_analysis_at: Option<DateTime<Utc>>,
    pub completed_cycles: u64,
    pub failed_cycles: u64,
    pub skipped_cycles: u64,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run; returns its generation.
    pub fn begin_run(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.running = true;
        self.status = LoopStatus::Scheduled;
        self.generation
    }

    pub fn halt(&mut self) {
        self.running = false;
        self.status = LoopStatus::Idle;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }

    pub fn mark_analysis_started(&mut self, now: Instant) {
        self.status = LoopStatus::InFlight;
        self.last_analysis_at = Some(now);
        self.last_analysis_wall = Some(Utc::now());
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            status: self.status,
            running: self.running,
            last_analysis_at: self.last_analysis_wall,
            completed_cycles: self.completed_cycles,
            failed_cycles: self.failed_cycles,
            skipped_cycles: self.skipped_cycles,
        }
    }
}
