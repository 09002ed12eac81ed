// src/load/mod.rs

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tempfile::TempDir;
use tracing::{error, info};

mod bundle;
pub use bundle::unpack_bundle;

/// Extension of a bare flent result file.
pub const FLENT_EXT: &str = ".flent";

/// Extension of an archived bundle expected to contain the equivalent
/// `.flent` member.
pub const BUNDLE_EXT: &str = ".tar.gz";

/// Parse one flent log into its JSON tree.
fn read_flent_log(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let raw = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing JSON from {}", path.display()))?;
    Ok(raw)
}

/// Scan `result_path` for flent logs, either bare `*.flent` files or
/// `*.tar.gz` bundles, and parse each into a raw record.
///
/// Bundles are unpacked into a scratch directory that is unique to this
/// invocation and removed when loading completes. Files that fail to unpack
/// or parse are skipped with an error log; the scan itself only fails when
/// `result_path` cannot be read. Listing order is whatever the filesystem
/// returns.
pub fn load_raw_records(result_path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let result_path = result_path.as_ref();
    let scratch = TempDir::new().context("creating scratch directory for bundles")?;

    let entries = fs::read_dir(result_path)
        .with_context(|| format!("reading result directory {}", result_path.display()))?;

    let mut raw_records = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!("skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let fname = match path.file_name().and_then(|n| n.to_str()) {
            Some(f) => f.to_string(),
            None => continue,
        };

        // Bundle support: unpack, then load the member in its place.
        let target = if let Some(stem) = fname.strip_suffix(BUNDLE_EXT) {
            if !path.is_file() {
                continue;
            }
            match bundle::unpack_bundle(&path, scratch.path()) {
                Ok(()) => {
                    let member = scratch.path().join(format!("{}{}", stem, FLENT_EXT));
                    if !member.is_file() {
                        error!(
                            "bundle {} has no {}{} member, skipping",
                            path.display(),
                            stem,
                            FLENT_EXT
                        );
                        continue;
                    }
                    member
                }
                Err(e) => {
                    error!("skipping bundle {}: {:#}", path.display(), e);
                    continue;
                }
            }
        } else {
            path
        };

        let is_flent = target
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |f| f.ends_with(FLENT_EXT));
        if is_flent && target.is_file() {
            match read_flent_log(&target) {
                Ok(raw) => raw_records.push(raw),
                Err(e) => error!("skipping {}: {:#}", target.display(), e),
            }
        }
    }

    info!(
        "loaded {} raw records from {}",
        raw_records.len(),
        result_path.display()
    );
    Ok(raw_records)
}
