//! Zipped snapshot of the local job package.

use crate::constants::EXCLUDED_CODE_DIRECTORIES;
use crate::error::{LaunchError, LaunchResult};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_CODE_DIRECTORIES.contains(&name))
            .unwrap_or(false)
}

/// Zip every regular file under `root`, stored relative to `root`.
///
/// Entries are added in file-name order so the same tree always produces the
/// same archive layout. VCS, build output, and bytecode cache directories are
/// skipped, as are symlinks.
pub fn build_code_zip(root: &Path) -> LaunchResult<Vec<u8>> {
    if !root.is_dir() {
        return Err(LaunchError::packaging(format!(
            "job package path is not a directory: {}",
            root.display()
        )));
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry = entry
            .map_err(|err| LaunchError::packaging(format!("failed to walk job package: {err}")))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).map_err(|_| {
            LaunchError::packaging(format!(
                "failed to relativize {}",
                entry.path().display()
            ))
        })?;
        let name = relative.to_string_lossy().replace('\\', "/");

        writer
            .start_file(name, options)
            .map_err(|err| LaunchError::packaging(err.to_string()))?;
        let mut source = File::open(entry.path())
            .map_err(|err| LaunchError::packaging(format!("{}: {err}", entry.path().display())))?;
        std::io::copy(&mut source, &mut writer)
            .map_err(|err| LaunchError::packaging(format!("{}: {err}", entry.path().display())))?;
    }

    let cursor = writer
        .finish()
        .map_err(|err| LaunchError::packaging(err.to_string()))?;
    Ok(cursor.into_inner())
}
