use camino::{Utf8Path, Utf8PathBuf};
use ressync_core::target::catalog_dir_name;
use tracing::debug;

/// Resolve the local directory for a catalog under the configured base,
/// creating it (and parents) if absent. Idempotent.
pub fn resolve_catalog_dir(base: &Utf8Path, catalog: &str) -> std::io::Result<Utf8PathBuf> {
    let dir = base.join(catalog_dir_name(catalog));
    if !dir.exists() {
        std::fs::create_dir_all(dir.as_std_path())?;
        debug!(dir = %dir, "created catalog directory");
    }
    Ok(dir)
}
