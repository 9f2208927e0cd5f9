//! Result file resolution.
//!
//! This module maps result file paths to subjects and tract labels using
//! the naming conventions from the configuration, and locates the stat
//! files belonging to a subject's structures.

use crate::config::{Config, NamingConfig};
use crate::error::{Result, TractStatError};
use crate::models::{TractGroup, TractLabel};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Resolves subjects, labels, and stat file locations under a results root.
#[derive(Debug, Clone)]
pub struct TractResolver {
    results_dir: PathBuf,
    naming: NamingConfig,
    labels: Vec<TractLabel>,
}

impl TractResolver {
    /// Create a new resolver. `labels` is searched in order.
    pub fn new(results_dir: PathBuf, naming: NamingConfig, labels: Vec<TractLabel>) -> Self {
        Self {
            results_dir,
            naming,
            labels,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.general.results_dir.clone(),
            config.naming.clone(),
            config.tract_labels.clone(),
        )
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    /// Fail unless the results root is an existing directory.
    pub fn check_results_root(&self) -> Result<()> {
        if self.results_dir.is_dir() {
            Ok(())
        } else {
            Err(TractStatError::ResultsRootMissing {
                path: self.results_dir.clone(),
            })
        }
    }

    /// Extract the subject identifier from `path`.
    ///
    /// The file name is checked first, then parent directories from the
    /// nearest outward. Within a component, each `.`-separated token that
    /// starts with the subject prefix is cut at the subject delimiter.
    pub fn identify_subject(&self, path: &Path) -> Result<String> {
        let components = path.components().rev().filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        });

        for component in components {
            for token in component.split('.') {
                if token.starts_with(&self.naming.subject_prefix) {
                    let subject = token
                        .split(self.naming.subject_delimiter)
                        .next()
                        .unwrap_or(token);
                    return Ok(subject.to_string());
                }
            }
        }

        Err(TractStatError::UnknownSubject {
            path: path.to_path_buf(),
        })
    }

    /// Resolve the structure name and canonical label for `path`.
    ///
    /// Returns `None` for files outside every configured structure, which
    /// callers skip. When several structure names occur in the path, the
    /// earliest table entry wins.
    pub fn identify_tract(&self, path: &Path) -> Option<(String, String)> {
        let path_str = path.to_string_lossy();
        self.labels
            .iter()
            .find(|entry| path_str.contains(entry.structure.as_str()))
            .map(|entry| (entry.structure.clone(), entry.label.clone()))
    }

    /// Path of the whole-brain stat file for `subject`.
    pub fn wholebrain_path(&self, subject: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{}", subject, self.naming.wholebrain_suffix))
    }

    /// Directory holding one structure's results for `subject`.
    pub fn structure_dir(&self, subject: &str, structure: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{}", subject, self.naming.tracts_dir_suffix))
            .join(structure)
    }

    /// Find the stat files of one structure for `subject`, sorted by path.
    ///
    /// Immediate children of the structure directory are tried first; the
    /// recursive search only runs when that finds nothing.
    pub fn discover_stat_files(&self, subject: &str, structure: &str) -> Result<Vec<PathBuf>> {
        let base = self.structure_dir(subject, structure);

        let hits = self.immediate_stat_files(&base);
        if !hits.is_empty() {
            debug!("{} {}: {} immediate stat files", subject, structure, hits.len());
            return Ok(hits);
        }

        let hits = self.recursive_stat_files(&base);
        if !hits.is_empty() {
            debug!("{} {}: {} nested stat files", subject, structure, hits.len());
            return Ok(hits);
        }

        Err(TractStatError::NotFound {
            subject: subject.to_string(),
            tract: structure.to_string(),
            pattern: format!(
                "{}/**/*{}",
                base.display(),
                self.naming.stat_suffix
            ),
        })
    }

    /// Stat files of every structure in `group`, in structure order.
    pub fn discover_group_files(&self, subject: &str, group: &TractGroup) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for structure in &group.structures {
            files.extend(self.discover_stat_files(subject, structure)?);
        }
        Ok(files)
    }

    /// Every stat file anywhere under the results root, sorted by path.
    pub fn scan_all_stat_files(&self) -> Result<Vec<PathBuf>> {
        self.check_results_root()?;
        Ok(self.recursive_stat_files(&self.results_dir))
    }

    fn immediate_stat_files(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                debug!("Cannot read directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.is_stat_file(path))
            .collect();
        files.sort();
        files
    }

    fn recursive_stat_files(&self, dir: &Path) -> Vec<PathBuf> {
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_stat_file(entry.path()))
            .map(DirEntry::into_path)
            .collect();
        files.sort();
        files
    }

    /// Check if a file name carries the stat suffix.
    fn is_stat_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| !name.starts_with('.') && name.ends_with(&self.naming.stat_suffix))
    }
}

/// Hidden files and directories are never part of the results.
fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
