//! Per-unit duration samples keyed by children count

use crate::fit::Table;
use crate::profile::Profile;
use crate::stats::Summary;
use crate::{AnalysisError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Raw `end - start` durations grouped by the number of leaves under the unit
///
/// Bucket 1 holds leaf decoding times; every larger key holds fusion times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketedSamples {
    buckets: BTreeMap<usize, Vec<f64>>,
}

impl BucketedSamples {
    /// No samples
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one duration for a unit with `children_count` leaves
    pub fn push(&mut self, children_count: usize, duration: f64) {
        self.buckets.entry(children_count).or_default().push(duration);
    }

    /// Collect every unit of every retained entry
    ///
    /// Each entry must carry one timestamp triple per unit of the profile's
    /// tree; a vector of any other length is a `ShapeMismatch`, and an entry
    /// without timestamps is `MissingData`.
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let tree = profile.partition_config();
        let counts = tree.children_counts();
        let mut samples = Self::new();

        for (index, entry) in profile.entries().iter().enumerate() {
            let times = entry.event_times().ok_or_else(|| AnalysisError::MissingData {
                entry: index,
                what: "solver_profile.primal.event_time_vec".into(),
            })?;
            if times.len() != counts.len() {
                return Err(AnalysisError::ShapeMismatch {
                    context: format!("event_time_vec of entry {index}"),
                    expected: counts.len(),
                    found: times.len(),
                });
            }
            for (event, &count) in times.iter().zip(counts) {
                samples.push(count, event.duration());
            }
        }

        debug!(
            entries = profile.len(),
            buckets = samples.buckets.len(),
            "bucketed unit durations"
        );
        Ok(samples)
    }

    /// Samples for `children_count`, if any were recorded
    pub fn bucket(&self, children_count: usize) -> Option<&[f64]> {
        self.buckets
            .get(&children_count)
            .map(Vec::as_slice)
            .filter(|samples| !samples.is_empty())
    }

    /// Children counts with at least one sample, ascending
    pub fn children_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(&count, _)| count)
    }

    /// Number of non-empty buckets
    pub fn len(&self) -> usize {
        self.children_counts().count()
    }

    /// True when no sample was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean duration for `children_count`
    pub fn average(&self, children_count: usize) -> Result<f64> {
        let samples = self.bucket(children_count).ok_or_else(|| {
            AnalysisError::EmptyData(format!("no samples with children count {children_count}"))
        })?;
        Ok(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// One summary per non-empty bucket, ascending by children count
    pub fn summaries(&self) -> Result<Vec<(usize, Summary)>> {
        self.children_counts()
            .map(|count| Ok((count, Summary::from_samples(&self.buckets[&count])?)))
            .collect()
    }

    /// The `<children_count> <average_time> <stddev_time> <count>` table
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(["children_count", "average_time", "stddev_time", "count"]);
        for (count, summary) in self.summaries()? {
            table.push_row([
                count.to_string(),
                format!("{:.5e}", summary.mean),
                format!("{:.3e}", summary.stddev),
                summary.count.to_string(),
            ]);
        }
        Ok(table)
    }
}

impl Extend<(usize, f64)> for BucketedSamples {
    fn extend<I: IntoIterator<Item = (usize, f64)>>(&mut self, iter: I) {
        for (count, duration) in iter {
            self.push(count, duration);
        }
    }
}

impl FromIterator<(usize, f64)> for BucketedSamples {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        let mut samples = Self::new();
        samples.extend(iter);
        samples
    }
}
