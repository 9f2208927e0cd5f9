//! Per-subject aggregation.
//!
//! This module drives discovery, parsing, and combination for every
//! subject, producing the flat metric list and its wide reshaping.

use crate::analysis::combiner::{combine_metrics, single_record_metrics};
use crate::config::{Config, StatKeys};
use crate::error::{Result, TractStatError};
use crate::models::{order_subjects, SubjectInfo, TractGroup, TractMetric, WideTable};
use crate::parser::parse_stat_file;
use crate::resolver::TractResolver;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Builds tract metrics from the files under a results root.
pub struct Aggregator {
    resolver: TractResolver,
    keys: StatKeys,
    wholebrain_label: String,
    show_progress: bool,
}

impl Aggregator {
    /// Create a new aggregator.
    pub fn new(resolver: TractResolver, keys: StatKeys) -> Self {
        let wholebrain_label = resolver.naming().wholebrain_label.clone();
        Self {
            resolver,
            keys,
            wholebrain_label,
            show_progress: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TractResolver::from_config(config),
            config.stat_keys.clone(),
        )
    }

    /// Show a progress bar over subjects while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn resolver(&self) -> &TractResolver {
        &self.resolver
    }

    /// Aggregate every subject.
    ///
    /// Each subject yields its whole-brain row followed by one row per group,
    /// in group order. The first missing input aborts the run.
    pub fn run(&self, subjects: &[String], groups: &[TractGroup]) -> Result<Vec<TractMetric>> {
        self.resolver.check_results_root()?;

        let progress = self.progress_bar(subjects.len() as u64);
        let mut metrics = Vec::with_capacity(subjects.len() * (groups.len() + 1));

        for subject in subjects {
            if let Some(ref pb) = progress {
                pb.set_message(subject.clone());
            }

            metrics.extend(self.subject_metrics(subject, groups)?);

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!(
            "Aggregated {} rows for {} subjects",
            metrics.len(),
            subjects.len()
        );
        Ok(metrics)
    }

    /// Whole-brain row plus one row per group for a single subject.
    pub fn subject_metrics(&self, subject: &str, groups: &[TractGroup]) -> Result<Vec<TractMetric>> {
        let mut metrics = Vec::with_capacity(groups.len() + 1);
        metrics.push(self.wholebrain_metric(subject)?);

        for group in groups {
            metrics.push(self.group_metric(subject, group)?);
        }

        Ok(metrics)
    }

    /// Read the mandatory whole-brain summary for `subject`.
    pub fn wholebrain_metric(&self, subject: &str) -> Result<TractMetric> {
        let path = self.resolver.wholebrain_path(subject);
        if !path.is_file() {
            return Err(TractStatError::MissingWholeBrain {
                subject: subject.to_string(),
                path,
            });
        }

        let record = parse_stat_file(&path)?;
        let combined = single_record_metrics(&record, &self.keys);
        if combined.streamlines <= 0.0 {
            warn!(
                "Wholebrain stat for {} reports no streamlines: {}",
                subject,
                path.display()
            );
        }

        Ok(combined.into_metric(subject, &self.wholebrain_label))
    }

    /// Combine every structure of `group` for `subject`.
    pub fn group_metric(&self, subject: &str, group: &TractGroup) -> Result<TractMetric> {
        let files = self.resolver.discover_group_files(subject, group)?;

        let records = files
            .iter()
            .map(|path| parse_stat_file(path))
            .collect::<Result<Vec<_>>>()?;

        let combined = combine_metrics(&records, &self.keys);
        debug!(
            "{} {}: {} files, {} streamlines",
            subject,
            group.name,
            records.len(),
            combined.streamlines
        );

        Ok(combined.into_metric(subject, &group.name))
    }

    /// One row per labelled stat file found anywhere under the results root.
    ///
    /// Files without a label or without an FA value are skipped. The tract
    /// name is the canonical label rather than a group name.
    pub fn collect_structure_metrics(&self) -> Result<Vec<TractMetric>> {
        let mut metrics = Vec::new();

        for path in self.resolver.scan_all_stat_files()? {
            let Some((structure, label)) = self.resolver.identify_tract(&path) else {
                continue;
            };

            let record = parse_stat_file(&path)?;
            if !record.contains_key(&self.keys.mean_fa) {
                debug!("No FA in {}, skipped", path.display());
                continue;
            }

            let subject = self.resolver.identify_subject(&path)?;
            debug!("{} {} -> {}", subject, structure, label);
            metrics.push(single_record_metrics(&record, &self.keys).into_metric(&subject, &label));
        }

        info!("Collected {} labelled structure rows", metrics.len());
        Ok(metrics)
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    }
}

/// Reshape metrics into a subject x tract table of mean FA.
///
/// Subjects are taken from the metrics themselves; `known` only supplies
/// their metadata and so their presentation order. A repeated
/// (subject, tract) pair keeps the later value.
pub fn to_wide_table(metrics: &[TractMetric], known: &[SubjectInfo]) -> WideTable {
    let mut table = WideTable::default();
    let mut ids = BTreeSet::new();

    for metric in metrics {
        ids.insert(metric.subject.as_str());
        table
            .cells
            .entry(metric.subject.clone())
            .or_default()
            .insert(metric.tract.clone(), metric.mean_fa);
    }

    let mut subjects: Vec<SubjectInfo> = ids
        .into_iter()
        .map(|id| {
            known
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .unwrap_or_else(|| SubjectInfo::unknown(id))
        })
        .collect();
    order_subjects(&mut subjects);
    table.subjects = subjects;

    table
}
