//! Mailbox file I/O shared with the backend.
//!
//! Writers publish with tmp-file + rename so a reader never sees a partial
//! document. Readers consume a file by parsing it and then deleting it; a file
//! that does not parse is left in place.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use gem_core::{CoreError, ManualSummaryResponse, UserResponse};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("read {} failed: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("parse {} failed: {source}", .path.display())]
    Parse { path: PathBuf, source: CoreError },
    #[error("serialize failed: {0}")]
    Serialize(#[source] CoreError),
    #[error("create dir {} failed: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("tmp write {} failed: {source}", .path.display())]
    WriteTmp { path: PathBuf, source: io::Error },
    #[error("rename into {} failed: {source}", .path.display())]
    Rename { path: PathBuf, source: io::Error },
}

pub fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), MailboxError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| MailboxError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).map_err(|source| MailboxError::WriteTmp {
        path: tmp.clone(),
        source,
    })?;

    // Windows refuses to rename over an existing file.
    if cfg!(windows) && path.exists() {
        let _ = fs::remove_file(path);
    }

    fs::rename(&tmp, path).map_err(|source| MailboxError::Rename {
        path: path.to_path_buf(),
        source,
    })
}

/// [`write_atomic`] with a short exponential backoff for transient sharing
/// violations while the backend has the file open.
pub fn write_atomic_with_retry(path: &Path, payload: &[u8]) -> Result<(), MailboxError> {
    const MAX_ATTEMPTS: u32 = 3;
    const BACKOFF_BASE_MS: u64 = 50;

    let mut attempt = 1;
    loop {
        match write_atomic(path, payload) {
            Ok(()) => return Ok(()),
            Err(err) if attempt >= MAX_ATTEMPTS => return Err(err),
            Err(err) => {
                debug!(attempt, path = %path.display(), "mailbox write failed, retrying: {err}");
                let backoff_ms = BACKOFF_BASE_MS.saturating_mul(1_u64 << (attempt - 1));
                std::thread::sleep(Duration::from_millis(backoff_ms));
                attempt += 1;
            }
        }
    }
}

/// Reads, parses and deletes a mailbox file.
///
/// `Ok(None)` when the file does not exist. On a parse error the file is left
/// untouched so the next poll sees it again.
pub fn take_json<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, CoreError>,
) -> Result<Option<T>, MailboxError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(MailboxError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let value = parse(&data).map_err(|source| MailboxError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), "consumed mailbox file could not be removed: {err}");
    }
    Ok(Some(value))
}

pub fn write_user_response(path: &Path, response: &UserResponse) -> Result<(), MailboxError> {
    let payload = response.to_json_pretty().map_err(MailboxError::Serialize)?;
    write_atomic_with_retry(path, payload.as_bytes())
}

pub fn write_manual_summary(
    path: &Path,
    response: &ManualSummaryResponse,
) -> Result<(), MailboxError> {
    let payload = response.to_json_pretty().map_err(MailboxError::Serialize)?;
    write_atomic_with_retry(path, payload.as_bytes())
}
