use std::path::Path;

use crate::error::UsageError;

/// Raw certificate and key text as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPair {
    pub crt: String,
    pub key: String,
}

fn read(what: &'static str, path: &Path) -> Result<String, UsageError> {
    std::fs::read_to_string(path).map_err(|source| UsageError::Unreadable {
        what,
        path: path.display().to_string(),
        source,
    })
}

pub fn load_pair(crt_path: &Path, key_path: &Path) -> Result<RawPair, UsageError> {
    Ok(RawPair {
        crt: read("certificate", crt_path)?,
        key: read("key", key_path)?,
    })
}
