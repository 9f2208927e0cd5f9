//! Cross-subject statistics.
//!
//! Standard deviations use the sample (n - 1) form and are 0.0 for fewer
//! than two observations.

use crate::models::{ChangeRow, SubjectInfo, SummaryRow, TractMetric, WideTable};

/// Mean and sample standard deviation of `values`.
///
/// Returns `None` for an empty slice.
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return Some((mean, 0.0));
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// Summarise metrics per tract, in order of first appearance.
///
/// FA statistics cover only subjects whose FA is defined.
pub fn summarize(metrics: &[TractMetric]) -> Vec<SummaryRow> {
    let mut tracts: Vec<&str> = Vec::new();
    for metric in metrics {
        if !tracts.contains(&metric.tract.as_str()) {
            tracts.push(&metric.tract);
        }
    }

    tracts
        .into_iter()
        .filter_map(|tract| {
            let rows: Vec<&TractMetric> = metrics.iter().filter(|m| m.tract == tract).collect();

            let streamlines: Vec<f64> = rows.iter().map(|m| m.streamlines).collect();
            let volumes: Vec<f64> = rows.iter().map(|m| m.volume_mm3).collect();
            let fas: Vec<f64> = rows.iter().filter_map(|m| m.mean_fa).collect();

            let (mean_streamlines, std_streamlines) = mean_and_std(&streamlines)?;
            let (mean_volume_mm3, std_volume_mm3) = mean_and_std(&volumes)?;
            let (mean_fa, std_fa) = match mean_and_std(&fas) {
                Some((mean, std)) => (Some(mean), std),
                None => (None, 0.0),
            };

            Some(SummaryRow {
                tract: tract.to_string(),
                mean_streamlines,
                std_streamlines,
                mean_fa,
                std_fa,
                mean_volume_mm3,
                std_volume_mm3,
            })
        })
        .collect()
}

/// Percent deviation of each subject's FA from the tract mean.
///
/// Tracts are visited in sorted order and `subjects` in the order given.
/// Cells without a recorded FA produce no row and don't count toward the
/// mean. A zero mean yields 0.0 for every member.
pub fn compute_change_rates(subjects: &[SubjectInfo], table: &WideTable) -> Vec<ChangeRow> {
    let mut rows = Vec::new();

    for tract in table.tracts() {
        let values: Vec<(&SubjectInfo, f64)> = subjects
            .iter()
            .filter_map(|s| table.value(&s.id, &tract).map(|v| (s, v)))
            .collect();
        if values.is_empty() {
            continue;
        }

        let mean = values.iter().map(|(_, v)| v).sum::<f64>() / values.len() as f64;

        for (subject, value) in values {
            rows.push(ChangeRow {
                subject: subject.id.clone(),
                age_group: subject.age_group.clone(),
                age_bin: subject.age_bin.clone(),
                sex: subject.sex.clone(),
                tract: tract.clone(),
                mean_fa: value,
                percent_change_from_group_mean: percent_change(value, mean),
            });
        }
    }

    rows
}

/// `(value - mean) / mean * 100`, or 0.0 when the mean is zero.
pub fn percent_change(value: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        0.0
    } else {
        (value - mean) / mean * 100.0
    }
}
