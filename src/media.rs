use std::path::{Component, Path, PathBuf};

use crate::error::AppResult;

/// Public prefix under which stored files are served.
pub const UPLOADS_PREFIX: &str = "/uploads";

fn extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Writes an uploaded file under `dir` with a generated name and returns the
/// public reference (`/uploads/<name>`).
pub async fn store(dir: &Path, file_name: Option<&str>, bytes: &[u8]) -> AppResult<String> {
    tokio::fs::create_dir_all(dir).await?;

    let mut name = uuid::Uuid::now_v7().to_string();
    if let Some(ext) = extension(file_name) {
        name.push('.');
        name.push_str(&ext);
    }
    tokio::fs::write(dir.join(&name), bytes).await?;

    tracing::info!(file = %name, size = bytes.len(), "Stored upload");
    Ok(format!("{}/{}", UPLOADS_PREFIX, name))
}

/// Removes a file previously returned by [`store`]. Failures are logged only.
pub async fn discard(dir: &Path, url: &str) {
    let Some(file) = url
        .strip_prefix(UPLOADS_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|name| resolve(dir, name))
    else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&file).await {
        tracing::warn!(file = %file.display(), "Could not remove unused upload: {}", e);
    }
}

/// Maps a request path below `/uploads/` onto `dir`. Anything that is not a
/// plain relative path (`..`, absolute, prefixes) is refused.
pub fn resolve(dir: &Path, requested: &str) -> Option<PathBuf> {
    let requested = Path::new(requested);
    let mut resolved = dir.to_path_buf();
    let mut depth = 0;
    for component in requested.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    (depth > 0).then_some(resolved)
}
