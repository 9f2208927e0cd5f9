//! Data models for tract statistics.
//!
//! This module contains the records that flow through the pipeline:
//! parsed stat files, combined per-subject tract metrics, the wide
//! subject x tract table, and the summary/change rows written out at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metrics parsed from one stat file, keyed by the tool's metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatRecord {
    values: BTreeMap<String, f64>,
}

impl StatRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a metric. A repeated key replaces the earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Returns the value for `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

}

impl<K: Into<String>> FromIterator<(K, f64)> for StatRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut record = StatRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Combined metrics for one (subject, tract) pair.
///
/// Field order matches the flat output table:
/// `subject, tract, streamlines, mean_fa, volume_mm3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractMetric {
    pub subject: String,
    pub tract: String,
    /// Total streamline count, never negative.
    pub streamlines: f64,
    /// Streamline-weighted mean FA. `None` when no streamlines contributed.
    pub mean_fa: Option<f64>,
    /// Total volume in mm^3, never negative.
    pub volume_mm3: f64,
}

/// A named logical bundle and the structures it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TractGroup {
    /// Reported tract name, e.g. `CST`.
    pub name: String,
    /// Atlas structure names, combined in this order.
    pub structures: Vec<String>,
}

impl TractGroup {
    pub fn new(name: &str, structures: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            structures: structures.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One entry of the ordered structure -> label table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TractLabel {
    /// Substring searched for in result file paths.
    pub structure: String,
    /// Canonical label reported for matching files.
    pub label: String,
}

impl TractLabel {
    pub fn new(structure: &str, label: &str) -> Self {
        Self {
            structure: structure.to_string(),
            label: label.to_string(),
        }
    }
}

/// Demographic metadata for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub id: String,
    #[serde(default)]
    pub age_group: String,
    #[serde(default)]
    pub age_bin: String,
    #[serde(default)]
    pub sex: String,
}

impl SubjectInfo {
    pub fn new(id: &str, age_group: &str, age_bin: &str, sex: &str) -> Self {
        Self {
            id: id.to_string(),
            age_group: age_group.to_string(),
            age_bin: age_bin.to_string(),
            sex: sex.to_string(),
        }
    }

    /// A subject with no known metadata.
    pub fn unknown(id: &str) -> Self {
        Self::new(id, "", "", "")
    }

    /// 0 for the younger cohort, 1 for everyone else.
    pub fn group_rank(&self) -> u8 {
        if self.age_group.to_lowercase().starts_with("young") {
            0
        } else {
            1
        }
    }
}

/// Sorts subjects younger group first, then by identifier.
pub fn order_subjects(subjects: &mut [SubjectInfo]) {
    subjects.sort_by(|a, b| {
        a.group_rank()
            .cmp(&b.group_rank())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Subject x tract table of mean FA values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WideTable {
    /// Subjects in presentation order.
    pub subjects: Vec<SubjectInfo>,
    /// Cells keyed by subject, then tract. `None` marks an undefined FA.
    pub cells: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl WideTable {
    /// Returns the recorded FA for a cell; absent and undefined both yield `None`.
    pub fn value(&self, subject: &str, tract: &str) -> Option<f64> {
        self.cells
            .get(subject)
            .and_then(|row| row.get(tract))
            .copied()
            .flatten()
    }

    /// Whether a cell exists for (subject, tract), defined or not.
    #[allow(dead_code)] // Used by table consistency checks
    pub fn has_cell(&self, subject: &str, tract: &str) -> bool {
        self.cells
            .get(subject)
            .is_some_and(|row| row.contains_key(tract))
    }

    /// All tract names present in any row, sorted.
    pub fn tracts(&self) -> Vec<String> {
        let mut tracts: Vec<String> = self
            .cells
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect();
        tracts.sort();
        tracts.dedup();
        tracts
    }

    pub fn cell_count(&self) -> usize {
        self.cells.values().map(|row| row.len()).sum()
    }
}

/// Per-tract aggregate across subjects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub tract: String,
    pub mean_streamlines: f64,
    pub std_streamlines: f64,
    /// Mean over subjects with a defined FA; `None` when there are none.
    pub mean_fa: Option<f64>,
    pub std_fa: f64,
    pub mean_volume_mm3: f64,
    pub std_volume_mm3: f64,
}

/// Percent deviation of one subject's FA from the tract's cross-subject mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRow {
    pub subject: String,
    pub age_group: String,
    pub age_bin: String,
    pub sex: String,
    pub tract: String,
    pub mean_fa: f64,
    pub percent_change_from_group_mean: f64,
}

/// Where the wide comparison table draws its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonSource {
    /// Combined tract groups (plus whole-brain).
    #[default]
    Groups,
    /// Individual labelled structures found anywhere under the results root.
    Structures,
}

impl fmt::Display for ComparisonSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonSource::Groups => write!(f, "groups"),
            ComparisonSource::Structures => write!(f, "structures"),
        }
    }
}

/// Metadata about an aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// Root directory the stat files were read from.
    pub results_dir: String,
    /// Date and time of the run.
    pub run_date: DateTime<Utc>,
    /// Subjects processed, in configured order.
    pub subjects: Vec<String>,
    /// Tract groups combined for every subject.
    pub tract_groups: Vec<String>,
    /// Source of the comparison table.
    pub comparison_source: ComparisonSource,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Everything a run produces, as rendered into the JSON and Markdown reports.
#[derive(Debug, Clone, Serialize)]
pub struct TractReport {
    pub metadata: RunMetadata,
    pub metrics: Vec<TractMetric>,
    pub summary: Vec<SummaryRow>,
    pub comparison: WideTable,
    pub change_rates: Vec<ChangeRow>,
}
