use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::store_context;

/// Serialize `data` next to `path` and rename it into place. A failure at
/// any point leaves the previous file untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize store")?;
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| store_context("create directory for", path))?;
    }

    if let Err(err) = fs::write(&temp_path, json) {
        let _ = fs::remove_file(&temp_path);
        return Err(err).with_context(|| store_context("write", &temp_path));
    }

    fs::rename(&temp_path, path).with_context(|| store_context("replace", path))?;
    Ok(())
}

/// Read and decode a JSON document; a missing file is `None`.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path).with_context(|| store_context("read", path))?;
    let data = serde_json::from_str(&json).with_context(|| {
        format!(
            "Failed to parse JSON from {:?}. First 200 chars: {}",
            path,
            json.chars().take(200).collect::<String>()
        )
    })?;
    Ok(Some(data))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
