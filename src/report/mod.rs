// src/report/mod.rs

use crate::kpi::KpiRecord;

mod write;
pub use write::write_report;

/// Display labels for the report columns, in fixed order. The serialized
/// CSV carries one extra unlabeled index column in front of these.
pub const COLUMNS: [&str; 7] = [
    "Backend",
    "Driver",
    "Format",
    "Type",
    "MSize(Kbits)",
    "Round",
    "BW(Mbits/s)",
];

/// The assembled report: one row per KPI record. Assembly does not sort or
/// round; that happens in [`ReportTable::format`] and at serialization.
pub struct ReportTable {
    rows: Vec<KpiRecord>,
}

impl ReportTable {
    pub fn from_kpis(kpis: Vec<KpiRecord>) -> Self {
        Self { rows: kpis }
    }

    /// Sort the rows ascending on every column except bandwidth, with
    /// absent message sizes after present ones. Row indices are assigned
    /// contiguously from zero at serialization, so the pre-sort order
    /// leaves no trace in the output.
    pub fn format(&mut self) {
        self.rows.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    }

    pub fn rows(&self) -> &[KpiRecord] {
        &self.rows
    }
}

fn sort_key(r: &KpiRecord) -> (&str, &str, &str, &str, (bool, i64), &str) {
    (
        r.backend.as_str(),
        r.driver.as_str(),
        r.format.as_str(),
        r.test_type.as_str(),
        (r.msize.is_none(), r.msize.unwrap_or(0)),
        r.round.as_str(),
    )
}
