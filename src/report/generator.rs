//! Markdown and JSON run reports.
//!
//! This module renders a finished [`TractReport`] for people to read.
//! The CSV tables remain the machine-readable output.

use crate::error::{Result, TractStatError};
use crate::models::{ChangeRow, RunMetadata, SummaryRow, TractReport, WideTable};
use std::path::{Path, PathBuf};

pub const MARKDOWN_FILE: &str = "tract_report.md";
pub const JSON_FILE: &str = "tract_report.json";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &TractReport) -> String {
    let mut output = String::new();

    output.push_str("# Tract Statistics Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_comparison_section(&report.comparison));
    output.push_str(&generate_change_section(&report.change_rates));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Results:** `{}`\n", metadata.results_dir));
    section.push_str(&format!(
        "- **Run Date:** {}\n",
        metadata.run_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Subjects:** {}\n",
        metadata.subjects.join(", ")
    ));
    section.push_str(&format!(
        "- **Tract Groups:** {}\n",
        metadata.tract_groups.join(", ")
    ));
    section.push_str(&format!(
        "- **Comparison Source:** {}\n",
        metadata.comparison_source
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the per-tract summary table.
fn generate_summary_section(summary: &[SummaryRow]) -> String {
    let mut section = String::new();

    section.push_str("## Summary by Tract\n\n");
    if summary.is_empty() {
        section.push_str("No tract metrics were aggregated.\n\n");
        return section;
    }

    section.push_str("| Tract | Streamlines | FA | Volume (mm³) |\n");
    section.push_str("|:---|---:|---:|---:|\n");
    for row in summary {
        section.push_str(&format!(
            "| {} | {:.1} ± {:.1} | {} ± {:.4} | {:.1} ± {:.1} |\n",
            row.tract,
            row.mean_streamlines,
            row.std_streamlines,
            format_fa(row.mean_fa),
            row.std_fa,
            row.mean_volume_mm3,
            row.std_volume_mm3,
        ));
    }
    section.push('\n');

    section
}

/// Generate the subject x tract FA table.
fn generate_comparison_section(table: &WideTable) -> String {
    let mut section = String::new();
    let tracts = table.tracts();

    section.push_str("## Mean FA by Subject\n\n");
    if tracts.is_empty() {
        section.push_str("No FA values to compare.\n\n");
        return section;
    }

    section.push_str(&format!("| Subject | Group | {} |\n", tracts.join(" | ")));
    section.push_str(&format!("|:---|:---|{}\n", "---:|".repeat(tracts.len())));
    for subject in &table.subjects {
        let cells: Vec<String> = tracts
            .iter()
            .map(|tract| format_fa(table.value(&subject.id, tract)))
            .collect();
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            subject.id,
            subject.age_group,
            cells.join(" | ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the change-rate table.
fn generate_change_section(rows: &[ChangeRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Change from Group Mean\n\n");
    section.push_str("| Tract | Subject | FA | Change |\n");
    section.push_str("|:---|:---|---:|---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {:.4} | {:+.2}% |\n",
            row.tract, row.subject, row.mean_fa, row.percent_change_from_group_mean
        ));
    }
    section.push('\n');

    section
}

fn format_fa(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "n/a".to_string(),
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by tractstat*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &TractReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the Markdown report into `dir`.
pub fn write_markdown_report(report: &TractReport, dir: &Path) -> Result<PathBuf> {
    write_report_file(dir.join(MARKDOWN_FILE), &generate_markdown_report(report))
}

/// Write the JSON report into `dir`.
pub fn write_json_report(report: &TractReport, dir: &Path) -> Result<PathBuf> {
    write_report_file(dir.join(JSON_FILE), &generate_json_report(report)?)
}

fn write_report_file(path: PathBuf, content: &str) -> Result<PathBuf> {
    std::fs::write(&path, content).map_err(|source| TractStatError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{compute_change_rates, summarize, to_wide_table};
    use crate::models::{ComparisonSource, TractMetric};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_report() -> TractReport {
        let metrics = vec![
            TractMetric {
                subject: "sub-010002".to_string(),
                tract: "CST".to_string(),
                streamlines: 400.0,
                mean_fa: Some(0.60),
                volume_mm3: 3500.0,
            },
            TractMetric {
                subject: "sub-010005".to_string(),
                tract: "CST".to_string(),
                streamlines: 500.0,
                mean_fa: Some(0.70),
                volume_mm3: 3900.0,
            },
            TractMetric {
                subject: "sub-010005".to_string(),
                tract: "Uncinate".to_string(),
                streamlines: 0.0,
                mean_fa: None,
                volume_mm3: 0.0,
            },
        ];
        let comparison = to_wide_table(&metrics, &crate::config::Config::default().subjects);
        let change_rates = compute_change_rates(&comparison.subjects, &comparison);

        TractReport {
            metadata: RunMetadata {
                results_dir: "results".to_string(),
                run_date: Utc::now(),
                subjects: vec!["sub-010002".to_string(), "sub-010005".to_string()],
                tract_groups: vec!["CST".to_string(), "Uncinate".to_string()],
                comparison_source: ComparisonSource::Groups,
                duration_seconds: 0.25,
            },
            summary: summarize(&metrics),
            metrics,
            comparison,
            change_rates,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Tract Statistics Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary by Tract"));
        assert!(markdown.contains("## Mean FA by Subject"));
        assert!(markdown.contains("## Change from Group Mean"));
        assert!(markdown.contains("| CST | 450.0 ± 70.7 | 0.6500 ± 0.0707 |"));
        assert!(markdown.contains("| Uncinate | 0.0 ± 0.0 | n/a ± 0.0000 |"));
        assert!(markdown.contains("-7.69%"));
        assert!(markdown.contains("+7.69%"));
    }

    #[test]
    fn test_comparison_section_orders_young_first() {
        let report = create_test_report();
        let section = generate_comparison_section(&report.comparison);

        let young = section.find("sub-010005").unwrap();
        let older = section.find("sub-010002").unwrap();
        assert!(young < older);
        assert!(section.contains("| Subject | Group | CST | Uncinate |"));
    }

    #[test]
    fn test_empty_sections() {
        assert!(generate_summary_section(&[]).contains("No tract metrics"));
        assert!(generate_comparison_section(&WideTable::default()).contains("No FA values"));
        assert!(generate_change_section(&[]).is_empty());
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"results_dir\""));
        assert!(json.contains("\"metrics\""));
        assert!(json.contains("\"percent_change_from_group_mean\""));
        assert!(json.contains("\"comparison_source\": \"groups\""));
        assert!(json.contains("\"mean_fa\": null"));
    }

    #[test]
    fn test_write_reports() {
        let temp_dir = TempDir::new().unwrap();
        let report = create_test_report();

        let md = write_markdown_report(&report, temp_dir.path()).unwrap();
        let json = write_json_report(&report, temp_dir.path()).unwrap();

        assert!(md.ends_with(MARKDOWN_FILE));
        assert!(json.ends_with(JSON_FILE));
        assert!(std::fs::read_to_string(json).unwrap().starts_with('{'));
    }
}
