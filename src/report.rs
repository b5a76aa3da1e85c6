//! Data quality report
//!
//! Renders the per-feed metrics as a plain-text report and writes it
//! atomically: the text goes to a temporary file next to the destination,
//! which is then persisted over it.

use crate::constants::report::{DUPLICATES, LOADED, MISSING, PROCESSED, TITLE, UNDERLINE};
use crate::error::{EtlError, PipelineStage, Result};
use crate::extract::FeedPaths;
use crate::metrics::RunMetrics;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Render the report text for a run
pub fn render_report(metrics: &RunMetrics, feeds: &FeedPaths) -> String {
    let mut report = format!("{TITLE}\n{UNDERLINE}\n");

    for (feed, bucket) in metrics.iter() {
        // `write!` into a String cannot fail
        let _ = write!(
            report,
            "\nFILE: {}\n{PROCESSED}{}\n{DUPLICATES}{}\n{MISSING}{}\n{LOADED}{}\n",
            feeds.file_name(feed),
            bucket.processed,
            bucket.duplicates,
            bucket.missing,
            bucket.loaded,
        );
    }

    report
}

/// Write the report to `path`, replacing any previous report
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    write_atomically(path, contents).map_err(|e| e.in_stage(PipelineStage::Report))?;
    info!("Report '{}' generated successfully", path.display());
    Ok(())
}

fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| EtlError::Io(e.error))?;
    Ok(())
}
