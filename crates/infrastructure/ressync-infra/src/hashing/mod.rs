use camino::Utf8Path;
use md5::Context;
use ressync_config::IO_CHUNK_SIZE;
use std::fs::File;
use std::io::{BufReader, Read};

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Streaming MD5 of a file, returned as lowercase hex.
///
/// This is a change-detection digest, not a security boundary; any byte
/// stream hashes successfully. Only open/read failures error.
pub fn file_md5(path: &Utf8Path) -> Result<String, HashError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Context::new();
    let mut buf = [0u8; IO_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest comparison is always case-insensitive; the manifest mixes cases.
pub fn digest_matches(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
