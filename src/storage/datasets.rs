//! Local cache of reference dataset archives.
//!
//! ## Cache Layout
//!
//! ```text
//! {cache_dir}/
//! ├── foundation.zip
//! ├── sr_legacy.zip
//! └── branded.zip        # only when enabled
//! ```
//!
//! Archives are downloaded once and reused by later runs. A `url` that is
//! not `http(s)` is read as a local path, which may be a `.zip` or a plain
//! `.json` document.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::DatasetSource;
use crate::utils::{log, mebibytes};

/// Downloads and opens reference dataset archives.
#[derive(Clone)]
pub struct DatasetStore {
    cache_dir: PathBuf,
    client: Client,
}

impl DatasetStore {
    pub fn new(cache_dir: impl Into<PathBuf>, client: Client) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            client,
        }
    }

    /// Cached archive path of a dataset.
    pub fn archive_path(&self, dataset: &DatasetSource) -> PathBuf {
        self.cache_dir.join(format!("{}.zip", dataset.name))
    }

    /// Local file holding the dataset, downloading it first if needed.
    pub async fn ensure_archive(&self, dataset: &DatasetSource) -> Result<PathBuf> {
        if !is_remote(&dataset.url) {
            let path = PathBuf::from(&dataset.url);
            if !path.exists() {
                return Err(AppError::dataset(
                    &dataset.name,
                    format!("{} does not exist", path.display()),
                ));
            }
            return Ok(path);
        }

        let path = self.archive_path(dataset);
        if path.exists() {
            log::debug(&format!("Using cached {}", path.display()));
            return Ok(path);
        }

        log::info(&format!("Downloading {} dataset...", dataset.name));
        self.download(&dataset.url, &path)
            .await
            .map_err(|e| AppError::dataset(&dataset.name, e))?;
        Ok(path)
    }

    /// Stream a remote file to `dest` (write to temp, then rename).
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::status(url, response.status().as_u16()));
        }
        let total = response.content_length();

        let tmp = dest.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, dest).await?;
        log::info(&format!(
            "Downloaded {:.1} MB{}",
            mebibytes(received),
            total
                .map(|t| format!(" of {:.1} MB", mebibytes(t)))
                .unwrap_or_default()
        ));
        Ok(())
    }

    /// Parse the dataset document held in `path`.
    ///
    /// For archives, the first `.json` entry is used.
    pub async fn open_document(&self, dataset: &DatasetSource, path: &Path) -> Result<Value> {
        let path = path.to_path_buf();
        let name = dataset.name.clone();
        tokio::task::spawn_blocking(move || read_document(&path))
            .await
            .map_err(|e| AppError::dataset(&name, e))?
            .map_err(|e| AppError::dataset(&name, e))
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn read_document(path: &Path) -> Result<Value> {
    let size = std::fs::metadata(path)?.len();
    log::info(&format!(
        "Reading {} ({:.1} MB)",
        path.display(),
        mebibytes(size)
    ));

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let reader = BufReader::new(File::open(path)?);
        return Ok(serde_json::from_reader(reader)?);
    }

    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let entry_name = archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".json"))
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::validation(format!("{} contains no .json entry", path.display()))
        })?;

    log::debug(&format!("Decompressing {entry_name}"));
    let entry = archive.by_name(&entry_name)?;
    Ok(serde_json::from_reader(BufReader::new(entry))?)
}
