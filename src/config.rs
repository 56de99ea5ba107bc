//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main manager configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub api_port: u16,

    /// Root of the HuggingFace hub cache (`models--*` entries live here)
    pub cache_dir: PathBuf,

    /// Bearer token for private/gated repositories
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,

    pub hub_endpoint: String,

    /// Name or path of the multi-connection download tool
    pub accelerated_tool: String,
    pub download_connections: u32,
    pub download_chunk_size: String,

    pub remote_probe_timeout_secs: u64,

    /// Snapshots at or above this size are reported as complete
    pub complete_threshold_bytes: u64,

    /// Cache entries below this size are removed by cleanup
    pub cleanup_threshold_bytes: u64,

    /// Load `config.json` when verifying standard models
    pub verify_load_config: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            cache_dir: crate::models::cache::default_cache_dir(),
            hf_token: None,
            hub_endpoint: default_hub_endpoint(),
            accelerated_tool: default_accelerated_tool(),
            download_connections: default_download_connections(),
            download_chunk_size: default_download_chunk_size(),
            remote_probe_timeout_secs: default_remote_probe_timeout(),
            complete_threshold_bytes: crate::models::size::COMPLETE_THRESHOLD_BYTES,
            cleanup_threshold_bytes: crate::models::cleanup::CLEANUP_THRESHOLD_BYTES,
            verify_load_config: true,
        }
    }
}

impl ManagerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        config.apply_env()?;

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("HUB_MANAGER_API_PORT") {
            self.api_port = port.parse().context("Invalid HUB_MANAGER_API_PORT value")?;
        }
        if let Ok(cache_dir) = std::env::var("HUB_MANAGER_CACHE_DIR") {
            self.cache_dir = PathBuf::from(cache_dir);
        }
        if let Ok(endpoint) = std::env::var("HF_ENDPOINT") {
            self.hub_endpoint = endpoint;
        }
        if let Ok(tool) = std::env::var("HUB_MANAGER_ACCELERATED_TOOL") {
            self.accelerated_tool = tool;
        }

        let token = std::env::var("HF_TOKEN")
            .or_else(|_| std::env::var("HUGGINGFACE_HUB_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_some() {
            self.hf_token = token;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_port < 1024 {
            anyhow::bail!("API port must be >= 1024 (got {})", self.api_port);
        }
        if self.download_connections == 0 {
            anyhow::bail!("download_connections must be at least 1");
        }
        if self.download_chunk_size.trim().is_empty() {
            anyhow::bail!("download_chunk_size cannot be empty");
        }
        if self.remote_probe_timeout_secs == 0 {
            anyhow::bail!("remote_probe_timeout_secs must be at least 1");
        }
        if self.cleanup_threshold_bytes > self.complete_threshold_bytes {
            anyhow::bail!(
                "cleanup threshold ({}) cannot exceed completeness threshold ({})",
                self.cleanup_threshold_bytes,
                self.complete_threshold_bytes
            );
        }
        if self.hub_endpoint.trim_end_matches('/').is_empty() {
            anyhow::bail!("hub_endpoint cannot be empty");
        }

        Ok(())
    }

    /// Hub endpoint without a trailing slash
    pub fn endpoint(&self) -> &str {
        self.hub_endpoint.trim_end_matches('/')
    }
}

// Default functions
fn default_api_port() -> u16 {
    8000
}
fn default_hub_endpoint() -> String {
    "https://huggingface.co".to_string()
}
fn default_accelerated_tool() -> String {
    "aria2c".to_string()
}
fn default_download_connections() -> u32 {
    16
}
fn default_download_chunk_size() -> String {
    "1M".to_string()
}
fn default_remote_probe_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.download_connections, 16);
        assert_eq!(config.download_chunk_size, "1M");
        assert_eq!(config.remote_probe_timeout_secs, 5);
        assert_eq!(config.complete_threshold_bytes, 10 * 1024 * 1024);
        assert_eq!(config.cleanup_threshold_bytes, 1024 * 1024);
        assert!(config.verify_load_config);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_validation() {
        let config = ManagerConfig {
            api_port: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_ordering_validation() {
        let config = ManagerConfig {
            cleanup_threshold_bytes: 20 * 1024 * 1024,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_connections_rejected() {
        let config = ManagerConfig {
            download_connections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = ManagerConfig {
            hub_endpoint: "http://localhost:9999/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:9999");
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
            api_port = 9100
            cache_dir = "/srv/hub"
            accelerated_tool = "/usr/local/bin/aria2c"
        "#;
        let config: ManagerConfig = toml::from_str(content).unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.cache_dir, PathBuf::from("/srv/hub"));
        assert_eq!(config.accelerated_tool, "/usr/local/bin/aria2c");
        // Unset fields keep their defaults
        assert_eq!(config.download_connections, 16);
    }

    #[test]
    fn test_token_not_serialized() {
        let config = ManagerConfig {
            hf_token: Some("hf_secret".to_string()),
            ..Default::default()
        };
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("hf_secret"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var("HUB_MANAGER_API_PORT", "9200");
            std::env::set_var("HUB_MANAGER_CACHE_DIR", "/tmp/hub-cache-test");
            std::env::set_var("HF_TOKEN", "hf_from_env");
        }

        let config = ManagerConfig::load(None).unwrap();

        unsafe {
            std::env::remove_var("HUB_MANAGER_API_PORT");
            std::env::remove_var("HUB_MANAGER_CACHE_DIR");
            std::env::remove_var("HF_TOKEN");
        }

        assert_eq!(config.api_port, 9200);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/hub-cache-test"));
        assert_eq!(config.hf_token.as_deref(), Some("hf_from_env"));
    }

    #[test]
    #[serial]
    fn test_invalid_port_env() {
        unsafe {
            std::env::set_var("HUB_MANAGER_API_PORT", "not-a-port");
        }
        let result = ManagerConfig::load(None);
        unsafe {
            std::env::remove_var("HUB_MANAGER_API_PORT");
        }
        assert!(result.is_err());
    }
}
