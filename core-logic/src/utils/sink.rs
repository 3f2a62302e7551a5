use crate::error::SinkError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only line output shared by concurrent workers.
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Appends `line` followed by a newline as one uninterrupted write.
    async fn append(&self, line: &str) -> Result<(), SinkError>;
}

/// A text file opened in append mode for every write.
///
/// Writes through the same `FileSink` are serialized by an internal mutex.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LineSink for FileSink {
    async fn append(&self, line: &str) -> Result<(), SinkError> {
        let to_err = |source| SinkError::Append {
            path: self.path.display().to_string(),
            source,
        };

        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(to_err)?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        file.write_all(buf.as_bytes()).await.map_err(to_err)?;
        file.flush().await.map_err(to_err)?;
        Ok(())
    }
}
