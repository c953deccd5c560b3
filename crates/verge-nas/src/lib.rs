//! # verge-nas
//!
//! File browsing for VergeOS NAS volumes.
//!
//! Directory listings are served asynchronously by the `volume_browser`
//! endpoint: a listing request creates a browse job, and the client polls
//! that job until it reports a result. [`VolumeBrowser`] hides the job
//! round-trip behind plain `list`/`get` calls.
//!
//! ```no_run
//! # async fn demo() -> verge_nas::Result<()> {
//! use verge_core::{VergeClientConfig, VolumeKey};
//! use verge_nas::{ListOptions, VolumeBrowser};
//!
//! let config = VergeClientConfig::from_env()?;
//! let browser = VolumeBrowser::from_config(&config)?;
//! let volume = VolumeKey::parse_str("8f73f8bcc9c9f1aaba32f733bfc295acaf548554")?;
//!
//! for entry in browser.list(&volume, "/documents", &ListOptions::default()).await? {
//!     println!("{} {}", entry.full_path, entry.size_display());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod models;
pub mod normalize;
pub mod paths;
pub mod poller;

#[cfg(test)]
mod testing;

pub use client::{VolumeBrowser, VolumeFiles};
pub use models::{BrowseJob, DirectoryEntry, EntryKind, JobStatus, ListOptions};
pub use normalize::BrowseResult;
pub use poller::{JobPoller, JobState, PollSettings};

/// Convenient result alias that reuses the shared VergeOS error type.
pub type Result<T> = verge_core::Result<T>;
