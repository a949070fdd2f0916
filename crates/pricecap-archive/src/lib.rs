//! Durable store for submitted capture sessions.
//!
//! Sessions are appended to a JSON-lines file, one object per line, in
//! submit order. The file is only ever appended to.

pub mod error;

use std::path::{Path, PathBuf};

use pricecap_core::CaptureSession;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

pub use error::ArchiveError;

#[derive(Debug)]
pub struct JsonlArchive {
    path: PathBuf,
    /// Serializes appends from concurrent submits.
    write_lock: Mutex<()>,
}

impl JsonlArchive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one session as a single line, creating the file and its
    /// parent directories if needed.
    ///
    /// If an earlier write was cut off before its newline, the torn line is
    /// terminated first so the new session starts on a line of its own.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the session cannot be serialized or the
    /// file cannot be written.
    pub async fn append(&self, session: &CaptureSession) -> Result<(), ArchiveError> {
        let mut line = serde_json::to_string(session)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        if ends_mid_line(&mut file).await.map_err(|e| self.io_error(e))? {
            tracing::warn!(
                path = %self.path.display(),
                "archive: last line was not terminated; starting a new line"
            );
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;

        tracing::debug!(
            path = %self.path.display(),
            session_id = %session.id(),
            "session archived"
        );
        Ok(())
    }

    /// Reads every archived session in file order.
    ///
    /// A missing file is an empty archive. Lines that do not decode are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the file exists but cannot be read.
    pub async fn load(&self) -> Result<Vec<CaptureSession>, ArchiveError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let sessions = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| {
                serde_json::from_str::<CaptureSession>(line)
                    .map_err(|e| {
                        tracing::warn!(
                            path = %self.path.display(),
                            line = idx + 1,
                            error = %e,
                            "archive: skipping malformed session line"
                        );
                    })
                    .ok()
            })
            .collect();

        Ok(sessions)
    }

    fn io_error(&self, source: std::io::Error) -> ArchiveError {
        ArchiveError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// True when the file is non-empty and its last byte is not a newline.
async fn ends_mid_line(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(std::io::SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}
