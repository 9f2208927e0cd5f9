//! CSV table output.
//!
//! Undefined FA values are written as empty fields.

use crate::error::{Result, TractStatError};
use crate::models::{ChangeRow, SummaryRow, TractMetric, WideTable};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

pub const METRICS_FILE: &str = "tract_metrics.csv";
pub const SUMMARY_FILE: &str = "tract_metrics_summary.csv";
pub const COMPARISON_FILE: &str = "tract_fa_comparison.csv";
pub const CHANGE_RATES_FILE: &str = "tract_fa_change_rates.csv";

/// Writes the pipeline's tables into one output directory.
pub struct TableWriter {
    output_dir: PathBuf,
}

impl TableWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Flat per-subject/tract metrics.
    pub fn write_metrics(&self, metrics: &[TractMetric]) -> Result<PathBuf> {
        self.write_to(METRICS_FILE, |w| write_rows(w, metrics))
    }

    /// Per-tract summary statistics.
    pub fn write_summary(&self, summary: &[SummaryRow]) -> Result<PathBuf> {
        self.write_to(SUMMARY_FILE, |w| write_rows(w, summary))
    }

    /// Wide subject x tract FA comparison.
    pub fn write_comparison(&self, table: &WideTable) -> Result<PathBuf> {
        self.write_to(COMPARISON_FILE, |w| write_wide_table(w, table))
    }

    /// Percent change from the tract mean.
    pub fn write_change_rates(&self, rows: &[ChangeRow]) -> Result<PathBuf> {
        self.write_to(CHANGE_RATES_FILE, |w| write_rows(w, rows))
    }

    fn write_to<F>(&self, file_name: &str, write: F) -> Result<PathBuf>
    where
        F: FnOnce(BufWriter<File>) -> Result<()>,
    {
        fs::create_dir_all(&self.output_dir).map_err(|source| TractStatError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let path = self.output_dir.join(file_name);
        let file = File::create(&path).map_err(|source| TractStatError::Io {
            path: path.clone(),
            source,
        })?;

        write(BufWriter::new(file))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Serialize rows with a header derived from the row type.
///
/// An empty slice writes nothing at all.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// One row per subject in presentation order, one column per tract.
pub fn write_wide_table<W: Write>(writer: W, table: &WideTable) -> Result<()> {
    let tracts = table.tracts();
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["subject", "age_group", "age_bin", "sex"];
    header.extend(tracts.iter().map(String::as_str));
    csv_writer.write_record(&header)?;

    for subject in &table.subjects {
        let mut record = vec![
            subject.id.clone(),
            subject.age_group.clone(),
            subject.age_bin.clone(),
            subject.sex.clone(),
        ];
        record.extend(tracts.iter().map(|tract| {
            table
                .value(&subject.id, tract)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::to_wide_table;
    use crate::models::SubjectInfo;
    use tempfile::TempDir;

    fn metrics() -> Vec<TractMetric> {
        vec![
            TractMetric {
                subject: "sub-010002".to_string(),
                tract: "CST".to_string(),
                streamlines: 400.0,
                mean_fa: Some(0.65),
                volume_mm3: 3500.0,
            },
            TractMetric {
                subject: "sub-010005".to_string(),
                tract: "Uncinate".to_string(),
                streamlines: 0.0,
                mean_fa: None,
                volume_mm3: 0.0,
            },
        ]
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_metrics_schema() {
        let csv = render(|buf| write_rows(buf, &metrics()));
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "subject,tract,streamlines,mean_fa,volume_mm3");
        assert_eq!(lines[1], "sub-010002,CST,400.0,0.65,3500.0");
        assert_eq!(lines[2], "sub-010005,Uncinate,0.0,,0.0");
    }

    #[test]
    fn test_summary_schema() {
        let row = SummaryRow {
            tract: "CST".to_string(),
            mean_streamlines: 200.0,
            std_streamlines: 0.0,
            mean_fa: None,
            std_fa: 0.0,
            mean_volume_mm3: 1.5,
            std_volume_mm3: 0.0,
        };
        let csv = render(|buf| write_rows(buf, &[row]));

        assert_eq!(
            csv.lines().next().unwrap(),
            "tract,mean_streamlines,std_streamlines,mean_fa,std_fa,mean_volume_mm3,std_volume_mm3"
        );
    }

    #[test]
    fn test_change_rates_schema() {
        let row = ChangeRow {
            subject: "sub-010019".to_string(),
            age_group: "Young".to_string(),
            age_bin: "20-25".to_string(),
            sex: "F".to_string(),
            tract: "SLF_L".to_string(),
            mean_fa: 0.5,
            percent_change_from_group_mean: -2.5,
        };
        let csv = render(|buf| write_rows(buf, &[row]));
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "subject,age_group,age_bin,sex,tract,mean_fa,percent_change_from_group_mean"
        );
        assert_eq!(lines[1], "sub-010019,Young,20-25,F,SLF_L,0.5,-2.5");
    }

    #[test]
    fn test_wide_table_layout() {
        let known = vec![
            SubjectInfo::new("sub-010002", "Older", "65-70", "F"),
            SubjectInfo::new("sub-010005", "Young", "25-30", "M"),
        ];
        let table = to_wide_table(&metrics(), &known);
        let csv = render(|buf| write_wide_table(buf, &table));
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "subject,age_group,age_bin,sex,CST,Uncinate");
        assert_eq!(lines[1], "sub-010005,Young,25-30,M,,");
        assert_eq!(lines[2], "sub-010002,Older,65-70,F,0.65,");
    }

    #[test]
    fn test_table_writer_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TableWriter::new(temp_dir.path().join("tables"));

        let path = writer.write_metrics(&metrics()).unwrap();

        assert_eq!(path, temp_dir.path().join("tables").join(METRICS_FILE));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
