use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SubmintError};

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub ledger: LedgerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the subtitle processing service
    pub base_url: String,
    /// Size of each streamed upload chunk in bytes; progress is reported per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Optional request timeout in seconds. Processing can take minutes, so
    /// no timeout is applied unless set.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the node holding the wallet accounts
    pub rpc_url: String,
    /// Address of the deployed ownership registry contract
    pub contract_address: String,
    /// Receipt polling interval while waiting for confirmation
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting for a receipt after this many seconds
    pub confirmation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving subtitle tracks, downloads and the playback manifest
    pub dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:5001".to_string(),
                chunk_size: default_chunk_size(),
                request_timeout_secs: None,
            },
            ledger: LedgerConfig {
                rpc_url: "http://localhost:8545".to_string(),
                // Default localhost deployment address
                contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
                poll_interval_ms: default_poll_interval_ms(),
                confirmation_timeout_secs: 120,
            },
            output: OutputConfig {
                dir: "submint-output".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubmintError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubmintError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubmintError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation
    pub fn service_base(&self) -> &str {
        self.service.base_url.trim_end_matches('/')
    }
}
