//! Selective ZIP extraction for bulk downloads.

use anyhow::Result;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::PipelineError;

/// Entry extensions worth extracting (compared case-insensitively).
pub const EXTRACTABLE: &[&str] = &["csv", "txt", "xlsx", "xls"];

fn is_extractable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTRACTABLE.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Extracts the data files of `zip_path` under `dest_dir`, keeping their
/// relative paths. Other entries, and entries whose path would escape
/// `dest_dir`, are skipped.
#[tracing::instrument(fields(zip = %zip_path.display(), dest = %dest_dir.display()))]
pub fn extract_archive(zip_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| PipelineError::parse(zip_path.display().to_string(), e))?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| PipelineError::parse(zip_path.display().to_string(), e))?;
        if !entry.is_file() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "Skipping entry with unsafe path");
            continue;
        };
        if !is_extractable(&relative) {
            debug!(entry = entry.name(), "Skipping non-data entry");
            continue;
        }

        let target = dest_dir.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        extracted.push(target);
    }

    info!(files = extracted.len(), "Archive extracted");
    Ok(extracted)
}
