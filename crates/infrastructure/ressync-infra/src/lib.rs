pub mod hashing;
pub mod net;

// Re-exports for convenience
pub use hashing::{digest_matches, file_md5, HashError};
pub use net::{
    default_http_client, load_modlist_file, DownloadEvent, FetchError, Fetcher, HttpManifestSource,
    ManifestError, ManifestSource,
};
