//! Central configuration constants for runtime limits and defaults.

/// User agent sent with every HTTP request.
pub const USER_AGENT: &str = "ressync/1.0";

/// Connect timeout for manifest and asset requests, in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Read timeout for in-flight transfers, in seconds.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Buffer size for streaming file reads (hashing and disk writes).
pub const IO_CHUNK_SIZE: usize = 8192;

/// Default manifest endpoint when none is configured.
pub const DEFAULT_MANIFEST_URL: &str = "https://api.galentwww.cn/items/modlist";

/// Minimum length of a plausible manifest URL.
pub const MIN_URL_LEN: usize = 10;

/// Basic endpoint validation: scheme plus a sane minimum length.
pub fn is_valid_endpoint(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://")) && url.len() > MIN_URL_LEN
}
