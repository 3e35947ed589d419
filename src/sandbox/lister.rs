//! PDF discovery within the sandbox

use crate::error::{Error, Result};
use crate::sandbox::Sandbox;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One PDF file found during a directory scan
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PdfFileEntry {
    /// Path relative to the scanned directory
    pub path: String,
    /// File name
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Scan options resolved at the tool boundary
#[derive(Debug, Default)]
pub struct ListOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Optional file-name filter, e.g. "report*"
    pub pattern: Option<glob::Pattern>,
}

/// Enumerate PDF files under an already-resolved directory.
///
/// `dir` must come from [`Sandbox::resolve_dir`]. Matching is by
/// case-insensitive `.pdf` extension; returned paths are relative to `dir`
/// and sorted lexicographically. Symlinks whose targets fall outside the
/// sandbox are skipped, as are entries that cannot be read. Recursive scans
/// visit each canonical directory once, so symlink cycles cannot loop.
pub fn list_pdfs(sandbox: &Sandbox, dir: &Path, options: &ListOptions) -> Result<Vec<PdfFileEntry>> {
    let mut files = Vec::new();
    let mut visited = HashSet::from([dir.to_path_buf()]);
    collect_pdfs(sandbox, dir, dir, options, &mut visited, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn collect_pdfs(
    sandbox: &Sandbox,
    base: &Path,
    dir: &Path,
    options: &ListOptions,
    visited: &mut HashSet<PathBuf>,
    files: &mut Vec<PdfFileEntry>,
) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(Error::Io)?;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue, // Skip entries we can't read
        };

        let path = entry.path();

        // Symlink targets must stay inside the sandbox.
        let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
        if is_symlink && !sandbox.contains(&path) {
            continue;
        }

        if path.is_dir() {
            if options.recursive {
                // A directory symlink can point back at an ancestor; each
                // canonical directory is descended into once.
                if let Ok(canonical) = path.canonicalize() {
                    if visited.insert(canonical) {
                        // Unreadable subdirectories are skipped, not fatal
                        let _ = collect_pdfs(sandbox, base, &path, options, visited, files);
                    }
                }
            }
        } else if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.eq_ignore_ascii_case("pdf") {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();

                    if let Some(ref pat) = options.pattern {
                        if !pat.matches(&name) {
                            continue;
                        }
                    }

                    let relative = path
                        .strip_prefix(base)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .to_string();

                    let metadata = std::fs::metadata(&path).ok();
                    let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
                    let modified = metadata
                        .as_ref()
                        .and_then(|m| m.modified().ok())
                        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| {
                            chrono::DateTime::from_timestamp(d.as_secs() as i64, 0)
                                .map(|dt| dt.to_rfc3339())
                                .unwrap_or_default()
                        });

                    files.push(PdfFileEntry {
                        path: relative,
                        name,
                        size,
                        modified,
                    });
                }
            }
        }
    }

    Ok(())
}
