//! API key loading.

use std::path::Path;

use tracing::info;

use crate::error::{AppError, ErrorKind};

/// Read the API key stored on `line` (0-based) of `path`.
///
/// The file is re-read on every call.
pub fn load_api_key(path: &Path, line: usize) -> Result<String, AppError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(
            ErrorKind::CredentialNotFound,
            format!("Failed to read API key file '{}': {e}", path.display()),
        )
    })?;

    let lines: Vec<&str> = contents.lines().collect();
    let raw = lines.get(line).ok_or_else(|| {
        AppError::new(
            ErrorKind::CredentialNotFound,
            format!(
                "API key line {line} is out of range: '{}' has {} line(s).",
                path.display(),
                lines.len()
            ),
        )
    })?;

    let key = raw.trim();
    if key.is_empty() {
        return Err(AppError::new(
            ErrorKind::CredentialNotFound,
            format!("API key line {line} of '{}' is blank.", path.display()),
        ));
    }

    info!(file = %path.display(), line, "loaded API key");
    Ok(key.to_string())
}
