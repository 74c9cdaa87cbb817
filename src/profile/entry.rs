//! One measurement round of a profile
//!
//! Producers disagree on field names, so the decode time is read from
//! `decoding_time`, then `round_time`, then `events.decoded`; the defect count
//! from `defect_num`, then `syndrome_num`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event name carrying the decode time when no scalar field is present
pub const DECODED_EVENT: &str = "decoded";

/// Timestamps of one unit on the shared monotonic clock (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventTime {
    /// Unit started
    pub start: f64,

    /// Unit finished
    pub end: f64,

    /// Both children of the unit had finished (equals `start` for leaves)
    pub children_return: f64,
}

impl EventTime {
    /// Wall-clock time of the job: `end - start`
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Time spent computing after the children returned: `end - children_return`
    #[inline]
    pub fn computation(&self) -> f64 {
        self.end - self.children_return
    }
}

/// Primal-module section of a solver profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimalProfile {
    /// Per-unit timestamps indexed by unit
    #[serde(default)]
    pub event_time_vec: Vec<EventTime>,
}

/// Solver section of an entry (present for tree-fused runs)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverProfile {
    /// Primal module timings
    #[serde(default)]
    pub primal: Option<PrimalProfile>,
}

/// Summary of one measurement round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Decode time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoding_time: Option<f64>,

    /// Decode time as written by the benchmark profiler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_time: Option<f64>,

    /// Defect count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_num: Option<u64>,

    /// Defect count under its older name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syndrome_num: Option<u64>,

    /// Named events, seconds since the round began
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<String, f64>,

    /// Solver timings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_profile: Option<SolverProfile>,
}

impl Entry {
    /// Entry with a decode time and defect count only
    pub fn new(decoding_time: f64, defect_num: u64) -> Self {
        Self {
            decoding_time: Some(decoding_time),
            defect_num: Some(defect_num),
            ..Self::default()
        }
    }

    /// Attach per-unit timestamps
    pub fn with_event_times(mut self, event_time_vec: Vec<EventTime>) -> Self {
        self.solver_profile = Some(SolverProfile {
            primal: Some(PrimalProfile { event_time_vec }),
        });
        self
    }

    /// Decode time from the first field that is present
    pub fn decode_time(&self) -> Option<f64> {
        self.decoding_time
            .or(self.round_time)
            .or_else(|| self.events.get(DECODED_EVENT).copied())
    }

    /// Defect count from the first field that is present
    pub fn defect_count(&self) -> Option<u64> {
        self.defect_num.or(self.syndrome_num)
    }

    /// Per-unit timestamps, if the round was tree-fused
    pub fn event_times(&self) -> Option<&[EventTime]> {
        self.solver_profile
            .as_ref()
            .and_then(|solver| solver.primal.as_ref())
            .map(|primal| primal.event_time_vec.as_slice())
    }
}
