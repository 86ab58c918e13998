pub mod layout;
pub mod reconcile;
pub mod session;

pub use reconcile::{apply_disposition, reconcile, reconcile_entry};
pub use session::{
    ItemOutcome, OptionalSelector, SelectAll, SelectNone, SessionConfig, StageReport, SyncEvent,
    SyncReport, SyncSession,
};

/// High-level error type for a synchronization session.
///
/// Per-item network and verification failures are tallied inside the stage
/// that hit them and never escalate here; only conditions that make the
/// whole session impossible surface as `SyncError`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("manifest unavailable: {0}")]
    ManifestUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
