//! Incremental JSON array writer for merged records.
//!
//! The output file is a single JSON array that grows one record at a time:
//!
//! ```text
//! [
//! {record},
//! {record}
//! ]
//! ```
//!
//! Every record is flushed as soon as it is appended, so an interrupted run
//! leaves all completed records on disk. The closing `]` is only written by
//! [`StreamingWriter::finish`]; until then the file is not valid JSON.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

const OPEN: &[u8] = b"[\n";
const SEPARATOR: &[u8] = b",\n";
const CLOSE: &[u8] = b"\n]";

/// Totals reported once the array is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub records: usize,
    pub bytes: u64,
}

/// Append-only writer producing a JSON array on disk.
pub struct StreamingWriter {
    path: PathBuf,
    file: File,
    pretty: bool,
    sync_each_record: bool,
    records: usize,
    bytes: u64,
}

impl StreamingWriter {
    /// Truncate `path` and write the opening marker.
    pub async fn create(
        path: impl AsRef<Path>,
        pretty: bool,
        sync_each_record: bool,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(&path).await?;
        file.write_all(OPEN).await?;
        file.flush().await?;

        Ok(Self {
            path,
            file,
            pretty,
            sync_each_record,
            records: 0,
            bytes: OPEN.len() as u64,
        })
    }

    /// Append one record and flush it.
    pub async fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let body = if self.pretty {
            serde_json::to_vec_pretty(record)?
        } else {
            serde_json::to_vec(record)?
        };

        if self.records > 0 {
            self.file.write_all(SEPARATOR).await?;
            self.bytes += SEPARATOR.len() as u64;
        }
        self.file.write_all(&body).await?;
        self.file.flush().await?;
        if self.sync_each_record {
            self.file.sync_data().await?;
        }

        self.bytes += body.len() as u64;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Bytes written so far, opening marker included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Write the closing marker, completing the array.
    pub async fn finish(mut self) -> Result<WriteSummary> {
        self.file.write_all(CLOSE).await?;
        self.file.flush().await?;
        self.file
            .sync_all()
            .await
            .map_err(|e| AppError::writer(format!("{}: {e}", self.path.display())))?;

        Ok(WriteSummary {
            path: self.path,
            records: self.records,
            bytes: self.bytes + CLOSE.len() as u64,
        })
    }
}
