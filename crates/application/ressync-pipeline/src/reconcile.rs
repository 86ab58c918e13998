use camino::{Utf8Path, Utf8PathBuf};
use ressync_core::{Disposition, ModEntry, TargetFile};
use ressync_infra::hashing::{digest_matches, file_md5};
use tracing::{info, warn};

use crate::layout;

/// Map a manifest entry plus current directory state to a disposition.
///
/// With an empty expected hash only existence can be checked, so a stale
/// file under the correct name goes undetected. That matches the upstream
/// behavior and is deliberately not strengthened here.
///
/// The verdict is computed fresh on every call; the directory may have been
/// edited by the user since the last stage ran.
pub fn reconcile(dir: &Utf8Path, file_name: &str, expected_hash: &str) -> Disposition {
    let target = dir.join(file_name);
    let expected = expected_hash.trim();

    if expected.is_empty() {
        if target.is_file() {
            return Disposition::UpToDate(target);
        }
        return Disposition::NotFound;
    }

    if target.is_file() {
        match file_md5(&target) {
            Ok(actual) if digest_matches(&actual, expected) => {
                return Disposition::UpToDate(target)
            }
            Ok(_) => return Disposition::NeedsUpdate(target),
            Err(e) => {
                // Unreadable content cannot be trusted; treat as stale so the
                // caller replaces it.
                warn!(path = %target, error = %e, "failed to hash existing file");
                return Disposition::NeedsUpdate(target);
            }
        }
    }

    match find_digest_match(dir, expected) {
        Some(path) => Disposition::NeedsRename(path),
        None => Disposition::NotFound,
    }
}

/// Scan regular files directly in `dir` (non-recursive), hashing lazily and
/// stopping at the first digest match. Listing order is whatever the OS
/// returns; with duplicate matching content the winner is
/// implementation-defined, first match wins. An unreadable file is skipped,
/// never fatal to the scan.
fn find_digest_match(dir: &Utf8Path, expected: &str) -> Option<Utf8PathBuf> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir, error = %e, "cannot list directory for hash scan");
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .find_map(|entry| match file_md5(entry.path()) {
            Ok(digest) if digest_matches(&digest, expected) => Some(entry.path().to_owned()),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %entry.path(), error = %e, "skipping unreadable file in hash scan");
                None
            }
        })
}

/// Perform the directory mutation a disposition calls for. Returns whether
/// the caller still needs to download the entry.
///
/// A failed stale-delete is logged, not fatal: the download proceeds and
/// either overwrites or fails distinctly. A failed rename falls through to
/// re-download rather than aborting.
pub fn apply_disposition(disposition: &Disposition, target: &Utf8Path) -> bool {
    match disposition {
        Disposition::UpToDate(_) => false,
        Disposition::NotFound => true,
        Disposition::NeedsUpdate(stale) => {
            match std::fs::remove_file(stale.as_std_path()) {
                Ok(()) => info!(path = %stale, "deleted outdated file"),
                Err(e) => warn!(path = %stale, error = %e, "failed to delete outdated file"),
            }
            true
        }
        Disposition::NeedsRename(existing) => {
            match std::fs::rename(existing.as_std_path(), target.as_std_path()) {
                Ok(()) => {
                    info!(from = %existing, to = %target, "renamed matching file");
                    false
                }
                Err(e) => {
                    warn!(from = %existing, to = %target, error = %e, "rename failed, falling back to download");
                    true
                }
            }
        }
    }
}

/// Reconcile one manifest entry against the base directory: resolves the
/// catalog directory (creating it if needed) and returns the exact target
/// path alongside the verdict.
pub fn reconcile_entry(
    base: &Utf8Path,
    entry: &ModEntry,
) -> std::io::Result<(Utf8PathBuf, Disposition)> {
    let target = TargetFile::for_entry(entry);
    let dir = layout::resolve_catalog_dir(base, &entry.catalog)?;
    let target_path = dir.join(&target.file_name);
    let disposition = reconcile(&dir, &target.file_name, &entry.hash);
    Ok((target_path, disposition))
}
