//! Plain-text logs from bundles written by Xcode 10 and earlier.
//!
//! Those bundles predate xcresulttool's JSON object store and keep each
//! action's log as a `.txt` file somewhere inside the bundle directory.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// All `.txt` files under `bundle`, oldest first.
pub fn find_legacy_log_files(bundle: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in WalkDir::new(bundle) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || entry.path().extension() != Some(OsStr::new("txt")) {
            continue;
        }
        let mtime = entry.metadata().map_err(std::io::Error::from)?.modified()?;
        found.push((mtime, entry.into_path()));
    }

    // Stable sort: equal times keep walk order.
    found.sort_by_key(|(t, _)| *t);
    tracing::debug!(bundle = %bundle.display(), count = found.len(), "found legacy log files");
    Ok(found.into_iter().map(|(_, p)| p).collect())
}

/// Copy the contents of `files`, in order, to `output`.
pub fn cat_files(files: &[PathBuf], output: &mut dyn Write) -> std::io::Result<()> {
    for file in files {
        let mut fd = std::fs::File::open(file)?;
        std::io::copy(&mut fd, output)?;
    }
    Ok(())
}
