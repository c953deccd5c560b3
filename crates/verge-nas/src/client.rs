//! Volume browser facade: directory listings and single-entry lookups.

use crate::models::{BrowseRequest, DirectoryEntry, ListOptions};
use crate::normalize::normalize;
use crate::paths;
use crate::poller::{JobPoller, PollSettings, DEFAULT_POLL_INTERVAL};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use verge_core::{Error, ServiceClient, Transport, VergeClientConfig, VolumeKey};

/// Lists and looks up files on NAS volumes through the `volume_browser` API.
///
/// Every call submits one browse job and polls it to completion. Nothing is
/// cached between calls.
#[derive(Clone)]
pub struct VolumeBrowser {
    poller: JobPoller,
    poll_interval: Duration,
}

impl VolumeBrowser {
    /// Create a browser over an existing transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            poller: JobPoller::new(transport),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Build an HTTP-backed browser from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] or [`Error::ValidationError`] when the
    /// configuration cannot produce a client.
    pub fn from_config(config: &VergeClientConfig) -> Result<Self> {
        let client = ServiceClient::from_config(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Override the pause between job polls.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Pause between job polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Scope this browser to a single volume.
    #[must_use]
    pub fn files(&self, volume: VolumeKey) -> VolumeFiles {
        VolumeFiles {
            browser: self.clone(),
            volume,
            name: None,
        }
    }

    /// List the entries of a directory.
    ///
    /// `path` is `/`-rooted; `"/"` is the volume root.
    ///
    /// # Errors
    ///
    /// [`Error::TransportFailed`], [`Error::JobFailed`], [`Error::JobTimeout`]
    /// or [`Error::MalformedResult`].
    pub async fn list(
        &self,
        volume: &VolumeKey,
        path: &str,
        options: &ListOptions,
    ) -> Result<Vec<DirectoryEntry>> {
        self.list_cancellable(volume, path, options, &CancellationToken::new())
            .await
    }

    /// [`list`](Self::list), abandoning the wait when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As for [`list`](Self::list), plus [`Error::Cancelled`].
    pub async fn list_cancellable(
        &self,
        volume: &VolumeKey,
        path: &str,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<DirectoryEntry>> {
        self.browse(volume, None, path, options, cancel).await
    }

    /// Look up one entry by its full path.
    ///
    /// Lists the parent directory and scans it for a matching name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the parent listing has no such name,
    /// [`Error::InvalidRequest`] for the root, otherwise as for
    /// [`list`](Self::list).
    pub async fn get(&self, volume: &VolumeKey, path: &str) -> Result<DirectoryEntry> {
        self.get_cancellable(volume, path, &ListOptions::default(), &CancellationToken::new())
            .await
    }

    /// [`get`](Self::get) with explicit listing options and cancellation.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get), plus [`Error::Cancelled`].
    pub async fn get_cancellable(
        &self,
        volume: &VolumeKey,
        path: &str,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        self.find(volume, None, path, options, cancel).await
    }

    async fn browse(
        &self,
        volume: &VolumeKey,
        volume_name: Option<&str>,
        path: &str,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<DirectoryEntry>> {
        let dir = paths::logical_dir(path);
        let request = BrowseRequest::get_dir(volume, paths::wire_dir(&dir), options);

        let job = self
            .poller
            .submit_cancellable(serde_json::to_value(&request)?, cancel)
            .await?;
        info!(volume = %volume, dir = %dir, job = %job, "submitted directory listing");

        let settings = PollSettings::new(options.timeout, self.poll_interval);
        let result = self.poller.await_job(&job, settings, cancel).await?;
        let records = normalize(result)?;
        debug!(job = %job, entries = records.len(), "directory listing normalized");

        Ok(records
            .into_iter()
            .map(|raw| {
                let full_path = paths::join(&dir, &raw.name);
                DirectoryEntry::from_raw(
                    raw,
                    full_path,
                    volume.clone(),
                    volume_name.map(str::to_string),
                )
            })
            .collect())
    }

    async fn find(
        &self,
        volume: &VolumeKey,
        volume_name: Option<&str>,
        path: &str,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        let (parent, name) = paths::split_parent(path).ok_or_else(|| {
            Error::InvalidRequest("the volume root has no parent listing".to_string())
        })?;

        self.browse(volume, volume_name, &parent, options, cancel)
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| Error::NotFound(format!("File or directory not found: {path}")))
    }
}

/// File operations scoped to one volume.
#[derive(Clone)]
pub struct VolumeFiles {
    browser: VolumeBrowser,
    volume: VolumeKey,
    name: Option<String>,
}

impl VolumeFiles {
    /// Attach the volume's display name to every returned entry.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Volume this handle browses.
    #[must_use]
    pub const fn volume_key(&self) -> &VolumeKey {
        &self.volume
    }

    /// Display name, if one was attached.
    #[must_use]
    pub fn volume_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// List a directory of this volume.
    ///
    /// # Errors
    ///
    /// See [`VolumeBrowser::list`].
    pub async fn list(&self, path: &str, options: &ListOptions) -> Result<Vec<DirectoryEntry>> {
        self.list_cancellable(path, options, &CancellationToken::new())
            .await
    }

    /// List a directory, abandoning the wait when `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`VolumeBrowser::list_cancellable`].
    pub async fn list_cancellable(
        &self,
        path: &str,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<DirectoryEntry>> {
        self.browser
            .browse(&self.volume, self.volume_name(), path, options, cancel)
            .await
    }

    /// Look up one entry by its full path.
    ///
    /// # Errors
    ///
    /// See [`VolumeBrowser::get`].
    pub async fn get(&self, path: &str) -> Result<DirectoryEntry> {
        self.get_cancellable(path, &ListOptions::default(), &CancellationToken::new())
            .await
    }

    /// Look up one entry, abandoning the wait when `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`VolumeBrowser::get_cancellable`].
    pub async fn get_cancellable(
        &self,
        path: &str,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        self.browser
            .find(&self.volume, self.volume_name(), path, options, cancel)
            .await
    }
}
