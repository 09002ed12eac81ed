use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use super::{ReportTable, COLUMNS};
use crate::kpi::NAN;

/// Round to 4 decimal places.
fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

impl ReportTable {
    /// Serialize to CSV text: one header row with a leading empty field,
    /// then one row per record with a contiguous 0-based index. Bandwidth
    /// is rounded to 4 decimal places; absent values render as `NaN`.
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());

        let mut header = vec![""];
        header.extend(COLUMNS);
        wtr.write_record(&header).context("writing CSV header")?;

        for (idx, row) in self.rows().iter().enumerate() {
            wtr.write_record(&[
                idx.to_string(),
                row.backend.clone(),
                row.driver.clone(),
                row.format.clone(),
                row.test_type.clone(),
                row.msize.map_or_else(|| NAN.to_string(), |m| m.to_string()),
                row.round.clone(),
                row.bw
                    .map_or_else(|| NAN.to_string(), |b| round4(b).to_string()),
            ])
            .context("writing CSV row")?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow!("flushing CSV writer: {}", e))?;
        String::from_utf8(bytes).context("CSV text is not UTF-8")
    }
}

/// Write the report to `report_csv`, fully replacing any existing file.
pub fn write_report(table: &ReportTable, report_csv: &Path) -> Result<()> {
    info!("dumping report into {}", report_csv.display());
    let content = table.to_csv()?;
    fs::write(report_csv, content)
        .with_context(|| format!("writing report to {}", report_csv.display()))?;
    info!("finished writing report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::{self, KpiRecord};
    use crate::load;
    use tempfile::tempdir;

    const HEADER: &str = ",Backend,Driver,Format,Type,MSize(Kbits),Round,BW(Mbits/s)";

    #[test]
    fn rounds_to_four_decimal_places() {
        assert_eq!(round4(123.456789).to_string(), "123.4568");
        assert_eq!(round4(941.23456).to_string(), "941.2346");
        assert_eq!(round4(100.0).to_string(), "100");
    }

    #[test]
    fn empty_report_is_header_only() -> Result<()> {
        let table = ReportTable::from_kpis(Vec::new());
        assert_eq!(table.to_csv()?, format!("{}\n", HEADER));
        Ok(())
    }

    #[test]
    fn rows_carry_contiguous_indices() -> Result<()> {
        let rows = vec![
            KpiRecord {
                test_type: "tcp_up".to_string(),
                msize: Some(64),
                bw: Some(1.5),
                ..KpiRecord::default()
            },
            KpiRecord {
                test_type: "tcp_up".to_string(),
                msize: Some(64),
                bw: Some(2.5),
                ..KpiRecord::default()
            },
        ];
        let table = ReportTable::from_kpis(rows);
        let csv = table.to_csv()?;
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,"));
        assert!(lines[2].starts_with("1,"));
        Ok(())
    }

    #[test]
    fn write_report_fails_on_missing_parent() {
        let dir = tempdir().unwrap();
        let table = ReportTable::from_kpis(Vec::new());
        let target = dir.path().join("no/such/dir/report.csv");
        assert!(write_report(&table, &target).is_err());
    }

    #[test]
    fn end_to_end_single_flent_file() -> Result<()> {
        let dir = tempdir()?;
        let log = r#"{
            "metadata": {
                "SERIES_META": {
                    "TCP upload": {
                        "COMMAND": "flent -t tcp_up -H example.com tcp_upload",
                        "UNITS": "Mbits/s",
                        "MEAN_VALUE": 941.23456,
                        "SEND_SIZE": 131072
                    }
                }
            }
        }"#;
        std::fs::write(dir.path().join("run1.flent"), log)?;

        let raw_records = load::load_raw_records(dir.path())?;
        let kpis = kpi::extract_kpis(&raw_records)?;
        let mut table = ReportTable::from_kpis(kpis);
        table.format();

        let report_csv = dir.path().join("flent_report.csv");
        write_report(&table, &report_csv)?;

        let content = std::fs::read_to_string(&report_csv)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "0,NaN,NaN,NaN,tcp_up,128,NaN,941.2346");
        Ok(())
    }

    #[test]
    fn end_to_end_empty_directory_yields_header_only() -> Result<()> {
        let dir = tempdir()?;
        let raw_records = load::load_raw_records(dir.path())?;
        let kpis = kpi::extract_kpis(&raw_records)?;
        let mut table = ReportTable::from_kpis(kpis);
        table.format();

        let report_csv = dir.path().join("flent_report.csv");
        write_report(&table, &report_csv)?;

        assert_eq!(
            std::fs::read_to_string(&report_csv)?,
            format!("{}\n", HEADER)
        );
        Ok(())
    }
}
