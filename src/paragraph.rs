// src/paragraph.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

/// The day's reference paragraph, kept in a single UTF-8 file.
/// Replacing it overwrites the previous text; there is no history.
#[derive(Debug, Clone)]
pub struct ParagraphStore {
    path: Arc<PathBuf>,
}

impl ParagraphStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::new(path.as_ref().to_path_buf()),
        }
    }

    /// Current paragraph, or `None` if none has been uploaded.
    pub async fn current(&self) -> std::io::Result<Option<String>> {
        match fs::read_to_string(self.path.as_ref()).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replaces the paragraph. Readers see either the old or the new text.
    pub async fn replace(&self, text: &str) -> std::io::Result<()> {
        let mut staging = self.path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, text).await?;
        fs::rename(&staging, self.path.as_ref()).await?;
        tracing::info!(
            "Reference paragraph replaced ({} chars) at {}",
            text.chars().count(),
            self.path.display()
        );
        Ok(())
    }
}
