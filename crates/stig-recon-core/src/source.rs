use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ExtractError;

/// Abstraction over where a source document comes from, so inputs can be read
/// from disk or supplied in memory.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Name used for this document in logs and errors.
    fn describe(&self) -> String;

    /// Read the whole document.
    async fn load(&self) -> Result<String, ExtractError>;
}

/// Reads a document from the filesystem in one go.
#[derive(Debug, Clone)]
pub struct FileDocumentSource {
    path: PathBuf,
}

impl FileDocumentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<String, ExtractError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ExtractError::Io {
                path: self.path.clone(),
                source,
            })?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(path = %self.path.display(), "input is not valid UTF-8; replacing invalid bytes");
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
        }
    }
}
