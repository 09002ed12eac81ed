// src/kpi/mod.rs

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::error;

/// Sentinel for any field the raw record does not provide. The literal
/// string is part of the report contract, not a numeric NaN.
pub const NAN: &str = "NaN";

const SERIES_TCP_UPLOAD: &str = "TCP upload";
const SERIES_TCP_DOWNLOAD: &str = "TCP download";
const SERIES_PING_ICMP: &str = "Ping (ms) ICMP";
const BANDWIDTH_UNIT: &str = "Mbits/s";

/// Matches the test type token following the `-t` flag in a flent command
/// line, e.g. `flent -t tcp_up -H example.com tcp_upload`.
static TEST_TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s-t\s(.*?)\s").unwrap());

/// One flat performance record per flent result.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiRecord {
    pub backend: String,
    pub driver: String,
    pub format: String,
    pub test_type: String,
    pub msize: Option<i64>,
    pub round: String,
    pub bw: Option<f64>,
}

impl Default for KpiRecord {
    fn default() -> Self {
        Self {
            backend: NAN.to_string(),
            driver: NAN.to_string(),
            format: NAN.to_string(),
            test_type: NAN.to_string(),
            msize: None,
            round: NAN.to_string(),
            bw: None,
        }
    }
}

fn series_str<'a>(series: &'a Value, name: &str, key: &str) -> Result<&'a str> {
    series
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("series {:?} has no {} string", name, key))
}

/// Extract the performance KPIs from one raw record.
///
/// The record must carry a `metadata.SERIES_META` mapping. Throughput series
/// (`TCP upload` / `TCP download`) contribute the test type, bandwidth and
/// message size; when both are present the later one in series order wins.
/// The ICMP latency series is ignored. Context tags ride in on the
/// free-form description metadata as `key=value` tokens.
pub fn extract_kpi(raw: &Value) -> Result<KpiRecord> {
    let series_meta = raw
        .pointer("/metadata/SERIES_META")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("missing metadata.SERIES_META mapping"))?;

    let mut kpi = KpiRecord::default();

    for (name, series) in series_meta {
        if name == SERIES_PING_ICMP {
            continue;
        }
        if name != SERIES_TCP_UPLOAD && name != SERIES_TCP_DOWNLOAD {
            continue;
        }

        // Test type, from the token after `-t` on the command line.
        let command = series_str(series, name, "COMMAND")?;
        let caps = TEST_TYPE_RE
            .captures(command)
            .ok_or_else(|| anyhow!("no -t flag in command {:?}", command))?;
        kpi.test_type = caps[1].to_string();

        // The harness always reports bandwidth in Mbits/s; anything else is
        // a broken data contract, not something to convert.
        let unit = series_str(series, name, "UNITS")?;
        if unit != BANDWIDTH_UNIT {
            bail!("Bandwidth unit is not \"{}\"", BANDWIDTH_UNIT);
        }
        kpi.bw = Some(
            series
                .get("MEAN_VALUE")
                .and_then(Value::as_f64)
                .ok_or_else(|| anyhow!("series {:?} has no numeric MEAN_VALUE", name))?,
        );

        // Literal bytes / 1024, kept as-is for report compatibility even
        // though the column label says Kbits.
        kpi.msize = Some(
            series
                .get("SEND_SIZE")
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow!("series {:?} has no integer SEND_SIZE", name))?
                / 1024,
        );
    }

    apply_description_tags(raw, &mut kpi);

    Ok(kpi)
}

/// Populate the context tags (`driver`, `format`, `round`, `backend`) from
/// `metadata.DESCRIPTION`, a whitespace-separated list of `key=value`
/// tokens passed via `flent --description`. Tags not present keep their
/// `NaN` default; unknown keys are ignored.
fn apply_description_tags(raw: &Value, kpi: &mut KpiRecord) {
    let desc = match raw.pointer("/metadata/DESCRIPTION").and_then(Value::as_str) {
        Some(d) => d,
        None => return,
    };
    for token in desc.split_whitespace() {
        let (key, value) = match token.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        match key {
            "driver" => kpi.driver = value.to_string(),
            "format" => kpi.format = value.to_string(),
            "round" => kpi.round = value.to_string(),
            "backend" => kpi.backend = value.to_string(),
            _ => {}
        }
    }
}

/// Extract KPIs for every raw record, in order.
///
/// A single malformed record aborts the whole batch: the error is logged
/// and propagated, and no partial KPI list is returned.
pub fn extract_kpis(raw_records: &[Value]) -> Result<Vec<KpiRecord>> {
    let mut kpis = Vec::with_capacity(raw_records.len());
    for raw in raw_records {
        match extract_kpi(raw) {
            Ok(kpi) => kpis.push(kpi),
            Err(e) => {
                error!("extracting performance KPIs failed: {:#}", e);
                return Err(e).context("KPI extraction aborted");
            }
        }
    }
    Ok(kpis)
}
