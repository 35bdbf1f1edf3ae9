//! Artifact persistence: allocating file names and writing result bytes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{DispatchError, Result};

/// Per-scope file storage for generated artifacts
#[async_trait]
pub trait ArtifactStorage: Send + Sync + std::fmt::Debug {
    /// Next unused file name in `scope`, formatted `<prefix><n>.<extension>`
    async fn next_file_name(&self, scope: &str, prefix: &str, extension: &str) -> Result<String>;

    /// Persist `bytes` and return the stored path relative to the public root
    async fn save(&self, scope: &str, name: &str, bytes: &[u8]) -> Result<String>;
}

/// Stores artifacts under `<root>/<scope>/<name>` on the local filesystem
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStorage {
    root: PathBuf,
    /// Prefix of returned paths, e.g. `workspace/`
    public_prefix: String,
}

impl FilesystemArtifactStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope: &str) -> Result<PathBuf> {
        validate_segment("scope", scope)?;
        Ok(self.root.join(scope))
    }

    fn public_path(&self, scope: &str, name: &str) -> String {
        if self.public_prefix.is_empty() {
            format!("{scope}/{name}")
        } else {
            format!("{}/{scope}/{name}", self.public_prefix.trim_end_matches('/'))
        }
    }
}

#[async_trait]
impl ArtifactStorage for FilesystemArtifactStorage {
    async fn next_file_name(&self, scope: &str, prefix: &str, extension: &str) -> Result<String> {
        let dir = self.scope_dir(scope)?;
        let suffix = format!(".{extension}");
        let mut highest = 0u64;

        match fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| DispatchError::storage(format!("{}: {e}", dir.display())))?
                {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    let index = name
                        .strip_prefix(prefix)
                        .and_then(|rest| rest.strip_suffix(&suffix))
                        .and_then(|n| n.parse::<u64>().ok());
                    if let Some(index) = index {
                        highest = highest.max(index);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DispatchError::storage(format!("{}: {e}", dir.display())));
            }
        }

        Ok(format!("{prefix}{}{suffix}", highest + 1))
    }

    async fn save(&self, scope: &str, name: &str, bytes: &[u8]) -> Result<String> {
        validate_segment("file name", name)?;
        let dir = self.scope_dir(scope)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DispatchError::storage(format!("{}: {e}", dir.display())))?;

        // Write then rename so readers never see a partial file
        let target = dir.join(name);
        let staging = dir.join(format!(".{name}.partial"));
        fs::write(&staging, bytes)
            .await
            .map_err(|e| DispatchError::storage(format!("{}: {e}", staging.display())))?;
        fs::rename(&staging, &target)
            .await
            .map_err(|e| DispatchError::storage(format!("{}: {e}", target.display())))?;

        debug!(path = %target.display(), bytes = bytes.len(), "Artifact written");
        Ok(self.public_path(scope, name))
    }
}

fn validate_segment(kind: &str, segment: &str) -> Result<()> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DispatchError::storage(format!(
            "invalid {kind} for artifact storage: {segment:?}"
        )));
    }
    Ok(())
}
