//! Hub Cache Manager - Local HuggingFace model cache service
//!
//! Lists, classifies, downloads, verifies and cleans up models stored in a
//! HuggingFace hub cache directory, behind a small HTTP API.

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod models;

pub use config::ManagerConfig;
pub use error::{ManagerError, ManagerResult};
pub use models::{CacheLayout, Classification, DownloadManager, Verifier};
