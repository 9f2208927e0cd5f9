//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tractstat.toml` files. Every table defaults to the study layout,
//! so a run with no config file reproduces the standard outputs.

use crate::models::{ComparisonSource, SubjectInfo, TractGroup, TractLabel};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".tractstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// File naming conventions of the tractography output.
    #[serde(default)]
    pub naming: NamingConfig,

    /// Metric keys looked up in each stat file.
    #[serde(default)]
    pub stat_keys: StatKeys,

    /// Subjects to aggregate, in processing order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<SubjectInfo>,

    /// Tract groups combined for each subject, in output order.
    #[serde(default = "default_tract_groups")]
    pub tract_groups: Vec<TractGroup>,

    /// Structure -> label table. The first matching entry wins.
    #[serde(default = "default_tract_labels")]
    pub tract_labels: Vec<TractLabel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            naming: NamingConfig::default(),
            stat_keys: StatKeys::default(),
            subjects: default_subjects(),
            tract_groups: default_tract_groups(),
            tract_labels: default_tract_labels(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the tractography results.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Directory the tables are written to. Defaults to `results_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Source of the wide comparison table.
    #[serde(default)]
    pub comparison_source: ComparisonSource,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            output_dir: None,
            comparison_source: ComparisonSource::default(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Naming conventions used to locate and label result files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Prefix that marks a subject token, e.g. `sub-`.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Delimiter that ends the subject identifier inside a token.
    #[serde(default = "default_subject_delimiter")]
    pub subject_delimiter: char,

    /// Suffix of the per-subject tract directory (`<subject><suffix>`).
    #[serde(default = "default_tracts_dir_suffix")]
    pub tracts_dir_suffix: String,

    /// Suffix shared by all stat files.
    #[serde(default = "default_stat_suffix")]
    pub stat_suffix: String,

    /// Suffix of the whole-brain stat file (`<subject><suffix>`).
    #[serde(default = "default_wholebrain_suffix")]
    pub wholebrain_suffix: String,

    /// Tract name reported for whole-brain rows.
    #[serde(default = "default_wholebrain_label")]
    pub wholebrain_label: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            subject_prefix: default_subject_prefix(),
            subject_delimiter: default_subject_delimiter(),
            tracts_dir_suffix: default_tracts_dir_suffix(),
            stat_suffix: default_stat_suffix(),
            wholebrain_suffix: default_wholebrain_suffix(),
            wholebrain_label: default_wholebrain_label(),
        }
    }
}

fn default_subject_prefix() -> String {
    "sub-".to_string()
}

fn default_subject_delimiter() -> char {
    '_'
}

fn default_tracts_dir_suffix() -> String {
    "_tracts".to_string()
}

fn default_stat_suffix() -> String {
    ".stat.txt".to_string()
}

fn default_wholebrain_suffix() -> String {
    "_wholebrain.tt.gz.stat.txt".to_string()
}

fn default_wholebrain_label() -> String {
    "WholeBrain".to_string()
}

/// Keys of the metrics the pipeline reads out of a stat file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatKeys {
    #[serde(default = "default_streamlines_key")]
    pub streamlines: String,

    #[serde(default = "default_volume_key")]
    pub volume_mm3: String,

    #[serde(default = "default_fa_key")]
    pub mean_fa: String,
}

impl Default for StatKeys {
    fn default() -> Self {
        Self {
            streamlines: default_streamlines_key(),
            volume_mm3: default_volume_key(),
            mean_fa: default_fa_key(),
        }
    }
}

fn default_streamlines_key() -> String {
    "number of tracts".to_string()
}

fn default_volume_key() -> String {
    "total volume(mm^3)".to_string()
}

fn default_fa_key() -> String {
    "fa".to_string()
}

fn default_subjects() -> Vec<SubjectInfo> {
    vec![
        SubjectInfo::new("sub-010002", "Older", "65-70", "F"),
        SubjectInfo::new("sub-010005", "Young", "25-30", "M"),
        SubjectInfo::new("sub-010019", "Young", "20-25", "F"),
        SubjectInfo::new("sub-010039", "Older", "70-75", "M"),
    ]
}

fn default_tract_groups() -> Vec<TractGroup> {
    vec![
        TractGroup::new("CorpusCallosum", &["Commissure_CorpusCallosum"]),
        TractGroup::new(
            "SLF",
            &[
                "Association_SuperiorLongitudinalFasciculusL",
                "Association_SuperiorLongitudinalFasciculusR",
            ],
        ),
        TractGroup::new(
            "CST",
            &[
                "ProjectionBrainstem_CorticospinalTractL",
                "ProjectionBrainstem_CorticospinalTractR",
            ],
        ),
        TractGroup::new(
            "Uncinate",
            &[
                "Association_UncinateFasciculusL",
                "Association_UncinateFasciculusR",
            ],
        ),
    ]
}

fn default_tract_labels() -> Vec<TractLabel> {
    vec![
        TractLabel::new("Commissure_CorpusCallosum", "Corpus_Callosum"),
        TractLabel::new("Association_SuperiorLongitudinalFasciculusL", "SLF_L"),
        TractLabel::new("Association_SuperiorLongitudinalFasciculusR", "SLF_R"),
        TractLabel::new("ProjectionBrainstem_CorticospinalTractL", "CST_L"),
        TractLabel::new("ProjectionBrainstem_CorticospinalTractR", "CST_R"),
        TractLabel::new("Association_UncinateFasciculusL", "UF_L"),
        TractLabel::new("Association_UncinateFasciculusR", "UF_R"),
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref results_dir) = args.results_dir {
            self.general.results_dir = results_dir.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = Some(output_dir.clone());
        }
        if let Some(source) = args.comparison {
            self.general.comparison_source = source;
        }
    }

    /// Directory the output tables are written to.
    pub fn output_dir(&self) -> &Path {
        self.general
            .output_dir
            .as_deref()
            .unwrap_or(&self.general.results_dir)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.results_dir, PathBuf::from("results"));
        assert_eq!(config.subjects.len(), 4);
        assert_eq!(config.tract_groups.len(), 4);
        assert_eq!(config.tract_labels.len(), 7);
        assert_eq!(config.stat_keys.streamlines, "number of tracts");
        assert_eq!(config.stat_keys.volume_mm3, "total volume(mm^3)");
        assert_eq!(config.stat_keys.mean_fa, "fa");
        assert_eq!(config.output_dir(), Path::new("results"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
results_dir = "/data/results"
output_dir = "/data/tables"
comparison_source = "structures"

[naming]
wholebrain_suffix = "_wb.stat.txt"

[[subjects]]
id = "sub-000001"
age_group = "Young"

[[tract_groups]]
name = "AF"
structures = ["Association_ArcuateFasciculusL", "Association_ArcuateFasciculusR"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.results_dir, PathBuf::from("/data/results"));
        assert_eq!(config.output_dir(), Path::new("/data/tables"));
        assert_eq!(
            config.general.comparison_source,
            ComparisonSource::Structures
        );
        assert_eq!(config.naming.wholebrain_suffix, "_wb.stat.txt");
        assert_eq!(config.naming.subject_prefix, "sub-");
        assert_eq!(config.subjects.len(), 1);
        assert_eq!(config.subjects[0].sex, "");
        assert_eq!(config.tract_groups[0].structures.len(), 2);
        // Unspecified tables keep their defaults
        assert_eq!(config.tract_labels.len(), 7);
    }

    #[test]
    fn test_tract_labels_keep_file_order() {
        let toml_content = r#"
[[tract_labels]]
structure = "Foo"
label = "A"

[[tract_labels]]
structure = "FooBar"
label = "B"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        let structures: Vec<_> = config
            .tract_labels
            .iter()
            .map(|l| l.structure.as_str())
            .collect();
        assert_eq!(structures, vec!["Foo", "FooBar"]);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[naming]"));
        assert!(toml_str.contains("[[tract_groups]]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.tract_groups, Config::default().tract_groups);
    }
}
