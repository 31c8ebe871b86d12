//! Cheap change-detection fingerprints for files.
//!
//! Small files are fingerprinted from their full content plus modification
//! time; files at or above [`FINGERPRINT_CONTENT_THRESHOLD`] bytes are
//! fingerprinted from size plus modification time so invalidating a cache
//! entry never requires reading a huge file.
//!
//! The digest is SHA-256, rendered as `sha256:<hex>` like lockfile checksums.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::constants::FINGERPRINT_CONTENT_THRESHOLD;
use crate::core::CodebaseError;

/// Compute the fingerprint of the file at `path`.
///
/// Deterministic for a given (content, mtime) pair, or (size, mtime) pair for
/// large files.
///
/// # Errors
///
/// Returns [`CodebaseError::Io`] if the file cannot be stat'ed or read.
/// Callers treat this as "cannot fingerprint" and must not trust any cached
/// value derived from the file.
pub async fn fingerprint(path: &Path) -> Result<String, CodebaseError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| CodebaseError::io("stat", path, &e))?;
    let modified = metadata
        .modified()
        .map_err(|e| CodebaseError::io("read modification time of", path, &e))?;
    let mtime = DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Nanos, true);

    let mut hasher = Sha256::new();
    if metadata.len() < FINGERPRINT_CONTENT_THRESHOLD {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| CodebaseError::io("read", path, &e))?;
        hasher.update(&content);
    } else {
        hasher.update(metadata.len().to_string().as_bytes());
    }
    hasher.update(mtime.as_bytes());

    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}
