//! Local model cache management
//!
//! Provides functionality for:
//! - Resolving cache paths and picking the newest snapshot
//! - Listing cached models with their size and completeness
//! - Classifying models as standard or custom, locally and remotely
//! - Downloading models with an accelerated tool or the hub client
//! - Verifying downloaded models and generating loading snippets
//! - Removing undersized cache entries

pub mod cache;
pub mod classify;
pub mod cleanup;
pub mod download;
pub mod hub;
pub mod listing;
pub mod metadata;
pub mod size;
pub mod snippet;
pub mod verify;

pub use cache::{CacheEntry, CacheLayout, default_cache_dir};
pub use classify::{Classification, classify_local, classify_remote};
pub use cleanup::{CleanupReport, cleanup_incomplete};
pub use download::{
    AcceleratedDownloader, AcquisitionPath, Aria2Downloader, DownloadError, DownloadHandle,
    DownloadManager, DownloadOutcome, FallbackDownloader, HfHubSnapshotDownloader,
};
pub use hub::{HfHubClient, HubClient, HubError, HubModelSummary, RemoteRepo};
pub use listing::{CachedModel, ListingOptions, list_cached_models};
pub use metadata::ConfigProbe;
pub use size::{Completeness, SizeReport, size_fmt};
pub use snippet::{Snippet, snippet_for};
pub use verify::{Verifier, VerifyReport};
