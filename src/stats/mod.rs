//! Aggregation over retained profile entries
//!
//! Every statistic is a pure function of a [`Profile`]. Zero retained entries
//! or a zero denominator is reported as [`AnalysisError::EmptyData`]; no
//! statistic ever returns NaN or infinity for those cases.

mod summary;

pub use summary::Summary;

use crate::profile::{Entry, EventTime, Profile};
use crate::{AnalysisError, Result};

fn require_entries(profile: &Profile, statistic: &str) -> Result<usize> {
    if profile.is_empty() {
        return Err(AnalysisError::EmptyData(format!(
            "{statistic} over zero retained entries"
        )));
    }
    Ok(profile.len())
}

fn event_times(index: usize, entry: &Entry) -> Result<&[EventTime]> {
    entry.event_times().ok_or_else(|| AnalysisError::MissingData {
        entry: index,
        what: "solver_profile.primal.event_time_vec".into(),
    })
}

/// Decode time of every retained entry
pub fn decode_times(profile: &Profile) -> Result<Vec<f64>> {
    profile
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry.decode_time().ok_or_else(|| AnalysisError::MissingData {
                entry: index,
                what: "decode time".into(),
            })
        })
        .collect()
}

/// Total decode time across retained entries
pub fn sum_decoding_time(profile: &Profile) -> Result<f64> {
    Ok(decode_times(profile)?.iter().sum())
}

/// Total defect count across retained entries
pub fn sum_defect_num(profile: &Profile) -> Result<u64> {
    profile
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry.defect_count().ok_or_else(|| AnalysisError::MissingData {
                entry: index,
                what: "defect count".into(),
            })
        })
        .sum()
}

/// Mean decode time
pub fn average_decoding_time(profile: &Profile) -> Result<f64> {
    let count = require_entries(profile, "average decoding time")?;
    Ok(sum_decoding_time(profile)? / count as f64)
}

/// Population standard deviation of decode time divided by its mean
pub fn decoding_time_relative_dev(profile: &Profile) -> Result<f64> {
    require_entries(profile, "decoding time deviation")?;
    Summary::from_samples(&decode_times(profile)?)?.relative_dev()
}

/// Total decode time divided by total defect count
pub fn average_decoding_time_per_defect(profile: &Profile) -> Result<f64> {
    require_entries(profile, "decoding time per defect")?;
    let defects = sum_defect_num(profile)?;
    if defects == 0 {
        return Err(AnalysisError::EmptyData(
            "decoding time per defect with zero defects".into(),
        ));
    }
    Ok(sum_decoding_time(profile)? / defects as f64)
}

/// Mean decode time spread over `noisy_measurements + 1` measurement rounds
pub fn average_decoding_time_per_round(profile: &Profile, noisy_measurements: u64) -> Result<f64> {
    Ok(average_decoding_time(profile)? / (noisy_measurements as f64 + 1.0))
}

/// Mean `end - start` of one unit
///
/// Fails with `MissingData` if any entry's timestamps do not reach `unit`,
/// which happens when the profile was captured against a different tree.
pub fn average_job_time(profile: &Profile, unit: usize) -> Result<f64> {
    let count = require_entries(profile, "average job time")?;
    let mut total = 0.0;
    for (index, entry) in profile.entries().iter().enumerate() {
        let times = event_times(index, entry)?;
        let event = times.get(unit).ok_or_else(|| AnalysisError::MissingData {
            entry: index,
            what: format!(
                "timestamps for unit {unit} (event_time_vec has {} units)",
                times.len()
            ),
        })?;
        total += event.duration();
    }
    Ok(total / count as f64)
}

/// Mean over entries of the summed `end - children_return` of every unit
///
/// Counts only time a unit spent computing after its children finished,
/// excluding time blocked waiting on them.
pub fn average_computation_cpu_seconds(profile: &Profile) -> Result<f64> {
    let count = require_entries(profile, "average computation cpu seconds")?;
    let mut total = 0.0;
    for (index, entry) in profile.entries().iter().enumerate() {
        total += event_times(index, entry)?
            .iter()
            .map(EventTime::computation)
            .sum::<f64>();
    }
    Ok(total / count as f64)
}

/// Per-entry latency of a streamed run
///
/// The root unit's `end` minus the moment the last input became available
/// (`syndrome_ready_time`, 0 for batch runs).
pub fn stream_latencies(profile: &Profile, syndrome_ready_time: f64) -> Result<Vec<f64>> {
    let root = profile.partition_config().root();
    profile
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let times = event_times(index, entry)?;
            let event = times.get(root).ok_or_else(|| AnalysisError::MissingData {
                entry: index,
                what: format!("timestamps for root unit {root}"),
            })?;
            Ok(event.end - syndrome_ready_time)
        })
        .collect()
}
