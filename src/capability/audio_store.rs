//! Audio staging over HTTP into a local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::AudioStore;
use crate::error::{IntakeError, Result};
use crate::util::timeout::with_timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloads audio into `dir`; each staged file gets a unique name.
#[derive(Debug, Clone)]
pub struct HttpAudioStore {
    dir: PathBuf,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpAudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Last path segment of `url`, used as the staged file's name.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| IntakeError::Validation(format!("Invalid audio URL '{url}': {e}")))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IntakeError::Validation(format!("Cannot infer filename from URL: {url}")))
}

#[async_trait]
impl AudioStore for HttpAudioStore {
    async fn download(&self, url: &str) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            IntakeError::AudioStore(format!(
                "Failed to create audio directory '{}': {e}",
                self.dir.display()
            ))
        })?;

        let bytes = with_timeout(self.timeout, async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(IntakeError::AudioStore(format!(
                    "Failed to download audio from {url}: HTTP {status}"
                )));
            }
            Ok(response.bytes().await?)
        })
        .await?;

        let dest = self
            .dir
            .join(format!("{}-{file_name}", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&dest, &bytes).await {
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(IntakeError::AudioStore(format!(
                "Failed to save audio file to '{}': {e}",
                dest.display()
            )));
        }

        tracing::debug!(url, path = %dest.display(), bytes = bytes.len(), "Staged audio");
        Ok(dest)
    }

    async fn delete(&self, local_path: &Path) -> Result<()> {
        match tokio::fs::remove_file(local_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(IntakeError::AudioStore(format!(
                "Audio file not found: {}",
                local_path.display()
            ))),
            Err(e) => Err(IntakeError::AudioStore(format!(
                "Failed to delete audio file '{}': {e}",
                local_path.display()
            ))),
        }
    }
}
