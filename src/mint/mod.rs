// Ownership minting
//
// Registers a claim on a processed video with an on-chain registry:
// existence check on the content descriptor, then register-if-absent and
// wait for confirmation. `rpc` talks to a JSON-RPC node; tests use mocks.

pub mod rpc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use rpc::RpcLedger;
use crate::error::{Result, SubmintError};
use crate::subtitle::SubtitleReference;

pub const DESCRIPTOR_NAME: &str = "Video NFT";
pub const DESCRIPTOR_DESCRIPTION: &str = "AI-Generated Subtitles Video NFT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintState {
    None,
    Loading,
    Success,
    Error,
}

/// Payload registered with the ledger. Its JSON form is both the write
/// payload and the key of the existence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    pub name: String,
    pub description: String,
    pub video: String,
    pub subtitles: Vec<SubtitleReference>,
    pub timestamp: String,
}

impl ContentDescriptor {
    pub fn new(video: &str, subtitles: &[SubtitleReference], created_at: DateTime<Utc>) -> Self {
        Self {
            name: DESCRIPTOR_NAME.to_string(),
            description: DESCRIPTOR_DESCRIPTION.to_string(),
            video: video.to_string(),
            subtitles: subtitles.to_vec(),
            timestamp: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn metadata_uri(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    Minted(MintReceipt),
    /// The flow already succeeded; nothing was sent
    AlreadyMinted,
}

/// External surface of the ownership registry contract
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnershipLedger: Send + Sync {
    async fn check_video_exists(&self, metadata_uri: &str) -> Result<bool>;

    /// Submit the registration and return its transaction hash
    async fn mint_nft(&self, metadata_uri: &str) -> Result<String>;

    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<MintReceipt>;
}

/// `None -> Loading -> {Success, Error}`; `Error` may retry, `Success` is final.
#[derive(Debug)]
pub struct MintFlow {
    state: MintState,
    last_error: Option<String>,
}

impl Default for MintFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl MintFlow {
    pub fn new() -> Self {
        Self {
            state: MintState::None,
            last_error: None,
        }
    }

    pub fn state(&self) -> MintState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub async fn mint(
        &mut self,
        ledger: Option<&dyn OwnershipLedger>,
        video_url: &str,
        subtitles: &[SubtitleReference],
    ) -> Result<MintOutcome> {
        self.mint_at(ledger, video_url, subtitles, Utc::now()).await
    }

    pub async fn mint_at(
        &mut self,
        ledger: Option<&dyn OwnershipLedger>,
        video_url: &str,
        subtitles: &[SubtitleReference],
        created_at: DateTime<Utc>,
    ) -> Result<MintOutcome> {
        if self.state == MintState::Success {
            info!("Ownership already minted for this session");
            return Ok(MintOutcome::AlreadyMinted);
        }

        let Some(ledger) = ledger else {
            warn!("Please install a wallet provider to mint ownership records");
            return Err(SubmintError::ProviderUnavailable(
                "no wallet provider configured".to_string(),
            ));
        };

        self.state = MintState::Loading;
        self.last_error = None;

        let descriptor = ContentDescriptor::new(video_url, subtitles, created_at);
        match Self::register(ledger, &descriptor).await {
            Ok(receipt) => {
                info!("Minted ownership record in transaction {}", receipt.tx_hash);
                self.state = MintState::Success;
                Ok(MintOutcome::Minted(receipt))
            }
            Err(e) => {
                error!("Minting error: {}", e);
                self.state = MintState::Error;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn register(
        ledger: &dyn OwnershipLedger,
        descriptor: &ContentDescriptor,
    ) -> Result<MintReceipt> {
        let metadata_uri = descriptor.metadata_uri()?;

        if ledger.check_video_exists(&metadata_uri).await? {
            return Err(SubmintError::DuplicateRegistration);
        }

        let tx_hash = ledger.mint_nft(&metadata_uri).await?;
        info!("Registration submitted: {}", tx_hash);
        ledger.wait_for_confirmation(&tx_hash).await
    }
}
