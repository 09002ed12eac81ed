use anyhow::{bail, Result};
use clap::Parser;
use flent_report::{kpi, load, report};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Summarize flent throughput results into a CSV report"
)]
struct Args {
    /// Directory where *.flent result files (or *.tar.gz bundles) are stored.
    #[arg(long)]
    result_path: PathBuf,

    /// Destination CSV file. Defaults to <result-path>/flent_report.csv.
    #[arg(long)]
    report_csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) parse and check parameters ───────────────────────────────
    let args = Args::parse();
    if !args.result_path.is_dir() {
        bail!(
            "result path {} does not exist or is not a directory",
            args.result_path.display()
        );
    }
    let report_csv = args.report_csv.unwrap_or_else(|| {
        let default = args.result_path.join("flent_report.csv");
        warn!("no report CSV specified, using {}", default.display());
        default
    });

    // ─── 3) load raw data from *.flent files ─────────────────────────
    let raw_records = load::load_raw_records(&args.result_path)?;

    // ─── 4) extract performance KPIs for each test ───────────────────
    let kpis = kpi::extract_kpis(&raw_records)?;
    info!("extracted {} KPI records", kpis.len());

    // ─── 5) assemble, sort and dump the report ───────────────────────
    let mut table = report::ReportTable::from_kpis(kpis);
    table.format();
    report::write_report(&table, &report_csv)?;

    Ok(())
}
