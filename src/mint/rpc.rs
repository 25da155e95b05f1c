// Ethereum JSON-RPC ledger
//
// Talks to a node that holds unlocked accounts (a local development chain)
// so transactions can be sent with eth_sendTransaction without local signing.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::{MintReceipt, OwnershipLedger};
use crate::config::LedgerConfig;
use crate::error::{Result, SubmintError};

/// First four bytes of keccak256("checkVideoExists(string)")
pub const CHECK_VIDEO_EXISTS_SELECTOR: [u8; 4] = [0x0a, 0xac, 0xd2, 0xb3];
/// First four bytes of keccak256("mintNFT(string)")
pub const MINT_NFT_SELECTOR: [u8; 4] = [0xfb, 0x37, 0xe8, 0x83];

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

pub struct RpcLedger {
    client: Client,
    rpc_url: String,
    contract_address: String,
    from: String,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Connect to the node and pick its first account as sender.
    /// An unreachable node or one without accounts means no provider.
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("submint/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SubmintError::Http)?;

        let mut ledger = Self {
            client,
            rpc_url: config.rpc_url.clone(),
            contract_address: config.contract_address.clone(),
            from: String::new(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
            next_id: AtomicU64::new(1),
        };

        let accounts: Vec<String> = ledger
            .call("eth_accounts", json!([]))
            .await
            .and_then(|value| Ok(serde_json::from_value(value)?))
            .map_err(|e| SubmintError::ProviderUnavailable(format!("{}: {}", config.rpc_url, e)))?;

        ledger.from = accounts.into_iter().next().ok_or_else(|| {
            SubmintError::ProviderUnavailable(format!("{} exposes no accounts", config.rpc_url))
        })?;

        info!("Connected to ledger at {} as {}", ledger.rpc_url, ledger.from);
        Ok(ledger)
    }

    pub fn sender(&self) -> &str {
        &self.from
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("JSON-RPC {} #{}", method, id);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubmintError::Chain(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(SubmintError::Chain(format!(
                "{} failed with HTTP {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| SubmintError::Chain(format!("Invalid {} response: {}", method, e)))?;

        match body.error {
            Some(error) => Err(SubmintError::Chain(format!(
                "{} error {}: {}",
                method, error.code, error.message
            ))),
            None => Ok(body.result),
        }
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        loop {
            let value = self.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
            if !value.is_null() {
                return Ok(serde_json::from_value(value)?);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl OwnershipLedger for RpcLedger {
    async fn check_video_exists(&self, metadata_uri: &str) -> Result<bool> {
        let data = encode_string_call(CHECK_VIDEO_EXISTS_SELECTOR, metadata_uri);
        let result = self
            .call(
                "eth_call",
                json!([{ "from": self.from, "to": self.contract_address, "data": data }, "latest"]),
            )
            .await?;

        let hex = result
            .as_str()
            .ok_or_else(|| SubmintError::Chain("eth_call returned a non-string result".to_string()))?;
        decode_bool(hex)
    }

    async fn mint_nft(&self, metadata_uri: &str) -> Result<String> {
        let data = encode_string_call(MINT_NFT_SELECTOR, metadata_uri);
        let result = self
            .call(
                "eth_sendTransaction",
                json!([{ "from": self.from, "to": self.contract_address, "data": data }]),
            )
            .await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SubmintError::Chain("eth_sendTransaction returned no hash".to_string()))
    }

    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<MintReceipt> {
        let receipt = tokio::time::timeout(self.confirmation_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| {
                SubmintError::Chain(format!(
                    "No receipt for {} after {}s",
                    tx_hash,
                    self.confirmation_timeout.as_secs()
                ))
            })??;

        if receipt.status.as_deref() == Some("0x0") {
            return Err(SubmintError::Chain(format!("transaction {} reverted", tx_hash)));
        }

        Ok(MintReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.as_deref().and_then(parse_quantity),
        })
    }
}

/// ABI-encode a call taking a single `string` argument
pub fn encode_string_call(selector: [u8; 4], value: &str) -> String {
    let bytes = value.as_bytes();
    let padded_len = bytes.len().div_ceil(32) * 32;

    let mut data = Vec::with_capacity(4 + 64 + padded_len);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&word(32));
    data.extend_from_slice(&word(bytes.len() as u64));
    data.extend_from_slice(bytes);
    data.resize(4 + 64 + padded_len, 0);

    format!("0x{}", hex::encode(data))
}

/// Decode an ABI-encoded `bool` return value
pub fn decode_bool(result: &str) -> Result<bool> {
    let raw = hex::decode(result.trim_start_matches("0x"))
        .map_err(|e| SubmintError::Chain(format!("Invalid call result {}: {}", result, e)))?;
    if raw.len() < 32 {
        return Err(SubmintError::Chain(format!(
            "Unexpected call result {}; is the contract deployed?",
            result
        )));
    }
    Ok(raw[..32].iter().any(|b| *b != 0))
}

fn word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn parse_quantity(value: &str) -> Option<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(server: &mockito::Server) -> LedgerConfig {
        LedgerConfig {
            rpc_url: server.url(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            poll_interval_ms: 5,
            confirmation_timeout_secs: 2,
        }
    }

    async fn mock_method(server: &mut mockito::Server, method: &str, result: Value) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create_async()
            .await
    }

    #[test]
    fn test_encode_string_call_layout() {
        let encoded = encode_string_call(MINT_NFT_SELECTOR, "abc");
        let raw = hex::decode(encoded.trim_start_matches("0x")).unwrap();

        assert_eq!(&raw[..4], &MINT_NFT_SELECTOR);
        assert_eq!(raw.len(), 4 + 32 * 3);
        assert_eq!(raw[4 + 31], 32);
        assert_eq!(raw[4 + 63], 3);
        assert_eq!(&raw[68..71], b"abc");
        assert!(raw[71..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_exact_word_needs_no_padding() {
        let value = "x".repeat(32);
        let encoded = encode_string_call(CHECK_VIDEO_EXISTS_SELECTOR, &value);
        assert_eq!(encoded.len(), 2 + (4 + 32 * 3) * 2);
    }

    #[test]
    fn test_decode_bool() {
        let truthy = format!("0x{}1", "0".repeat(63));
        let falsy = format!("0x{}", "0".repeat(64));
        assert!(decode_bool(&truthy).unwrap());
        assert!(!decode_bool(&falsy).unwrap());
        assert!(decode_bool("0x").is_err());
    }

    #[tokio::test]
    async fn test_connect_without_node_is_provider_unavailable() {
        let config = LedgerConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            contract_address: "0x0".to_string(),
            poll_interval_ms: 5,
            confirmation_timeout_secs: 1,
        };
        let result = RpcLedger::connect(&config).await;
        assert!(matches!(result, Err(SubmintError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_connect_without_accounts_is_provider_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_method(&mut server, "eth_accounts", json!([])).await;

        let result = RpcLedger::connect(&config(&server)).await;
        assert!(matches!(result, Err(SubmintError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_check_mint_and_confirm() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_method(&mut server, "eth_accounts", json!(["0xf39f"])).await;
        let _m = mock_method(&mut server, "eth_call", json!(format!("0x{}", "0".repeat(64)))).await;
        let _m = mock_method(&mut server, "eth_sendTransaction", json!("0xfeed")).await;
        let _m = mock_method(
            &mut server,
            "eth_getTransactionReceipt",
            json!({ "transactionHash": "0xfeed", "blockNumber": "0x1a", "status": "0x1" }),
        )
        .await;

        let ledger = RpcLedger::connect(&config(&server)).await.unwrap();
        assert_eq!(ledger.sender(), "0xf39f");
        assert!(!ledger.check_video_exists("{}").await.unwrap());

        let tx = ledger.mint_nft("{}").await.unwrap();
        assert_eq!(tx, "0xfeed");

        let receipt = ledger.wait_for_confirmation(&tx).await.unwrap();
        assert_eq!(receipt.tx_hash, "0xfeed");
        assert_eq!(receipt.block_number, Some(26));
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_chain_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_method(&mut server, "eth_accounts", json!(["0xf39f"])).await;
        let _m = mock_method(
            &mut server,
            "eth_getTransactionReceipt",
            json!({ "transactionHash": "0xfeed", "blockNumber": "0x1", "status": "0x0" }),
        )
        .await;

        let ledger = RpcLedger::connect(&config(&server)).await.unwrap();
        let result = ledger.wait_for_confirmation("0xfeed").await;
        assert!(matches!(result, Err(SubmintError::Chain(_))));
    }

    #[tokio::test]
    async fn test_rpc_error_is_chain_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_method(&mut server, "eth_accounts", json!(["0xf39f"])).await;
        let _m = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "eth_sendTransaction" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"execution reverted"}}"#)
            .create_async()
            .await;

        let ledger = RpcLedger::connect(&config(&server)).await.unwrap();
        match ledger.mint_nft("{}").await {
            Err(SubmintError::Chain(msg)) => assert!(msg.contains("execution reverted")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
