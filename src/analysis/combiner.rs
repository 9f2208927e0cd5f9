//! Combination of structure metrics into tract-group metrics.
//!
//! Streamlines and volume are summed. FA is averaged with each structure
//! weighted by its streamline count, so a sparse bundle can't drag the
//! group value as far as a dense one.

use crate::config::StatKeys;
use crate::models::{StatRecord, TractMetric};

/// Totals produced by combining one or more stat records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedMetrics {
    pub streamlines: f64,
    pub volume_mm3: f64,
    pub mean_fa: Option<f64>,
}

impl CombinedMetrics {
    /// Attach the subject and tract name.
    pub fn into_metric(self, subject: &str, tract: &str) -> TractMetric {
        TractMetric {
            subject: subject.to_string(),
            tract: tract.to_string(),
            streamlines: self.streamlines,
            mean_fa: self.mean_fa,
            volume_mm3: self.volume_mm3,
        }
    }
}

/// Combine the records of one tract group for one subject.
///
/// Missing counts read as zero; negative or NaN counts are clamped to zero.
/// A record contributes to the FA numerator only when it has a defined FA
/// and a positive streamline count, but every record's streamlines go into
/// the denominator. With no streamlines at all, FA is undefined.
pub fn combine_metrics(records: &[StatRecord], keys: &StatKeys) -> CombinedMetrics {
    let mut total_streamlines = 0.0;
    let mut total_volume = 0.0;
    let mut weighted_fa = 0.0;

    for record in records {
        let streamlines = record.get_or(&keys.streamlines, 0.0).max(0.0);
        let volume = record.get_or(&keys.volume_mm3, 0.0).max(0.0);

        total_streamlines += streamlines;
        total_volume += volume;

        if let Some(fa) = defined_fa(record, keys) {
            if streamlines > 0.0 {
                weighted_fa += fa * streamlines;
            }
        }
    }

    let mean_fa = if total_streamlines > 0.0 {
        Some(weighted_fa / total_streamlines)
    } else {
        None
    };

    CombinedMetrics {
        streamlines: total_streamlines,
        volume_mm3: total_volume,
        mean_fa,
    }
}

/// Read a single record as-is, without weighting.
///
/// Used for whole-brain summaries, whose FA is reported even when the
/// streamline count is zero or missing.
pub fn single_record_metrics(record: &StatRecord, keys: &StatKeys) -> CombinedMetrics {
    CombinedMetrics {
        streamlines: record.get_or(&keys.streamlines, 0.0).max(0.0),
        volume_mm3: record.get_or(&keys.volume_mm3, 0.0).max(0.0),
        mean_fa: defined_fa(record, keys),
    }
}

fn defined_fa(record: &StatRecord, keys: &StatKeys) -> Option<f64> {
    record.get(&keys.mean_fa).filter(|fa| !fa.is_nan())
}
