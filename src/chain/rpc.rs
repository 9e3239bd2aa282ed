use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    chain::{abi, types::RentalRecord, ChainReader, ChainWriter},
    config::ChainConfig,
    error::{Result, WatchError},
};

/// How often and how long to poll for a transaction receipt.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECEIPT_POLL_ATTEMPTS: u32 = 60;

/// JSON-RPC client for the marketplace contract on an EVM-style chain.
pub struct EvmRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    contract_address: String,
    from_address: Option<String>,
    request_id: AtomicU64,
}

impl EvmRpcClient {
    pub fn new(chain: &ChainConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: chain.rpc_url.clone(),
            contract_address: chain.contract_address.clone(),
            from_address: chain.from_address.clone(),
            request_id: AtomicU64::new(1),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(WatchError::Chain(format!("{}: {}", method, message)));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| WatchError::Chain(format!("{}: missing result", method)))
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let call = json!({
            "to": self.contract_address,
            "data": format!("0x{}", hex::encode(&data)),
        });
        let result = self.rpc("eth_call", json!([call, "latest"])).await?;
        let output = result
            .as_str()
            .ok_or_else(|| WatchError::Chain("eth_call: non-string result".to_string()))?;
        hex::decode(output.trim_start_matches("0x"))
            .map_err(|e| WatchError::Abi(format!("invalid hex in eth_call result: {}", e)))
    }

    async fn send_transaction(&self, data: Vec<u8>) -> Result<String> {
        let from = self.from_address.as_ref().ok_or_else(|| {
            WatchError::Config("chain.from_address is required for state-changing calls".to_string())
        })?;
        let tx = json!({
            "from": from,
            "to": self.contract_address,
            "data": format!("0x{}", hex::encode(&data)),
        });
        let result = self.rpc("eth_sendTransaction", json!([tx])).await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| WatchError::Chain("eth_sendTransaction: non-string result".to_string()))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<()> {
        for attempt in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt = self
                .rpc("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if !receipt.is_null() {
                let status = receipt.get("status").and_then(|s| s.as_str());
                return match status {
                    Some("0x1") => Ok(()),
                    Some(other) => Err(WatchError::Chain(format!(
                        "transaction {} reverted (status {})",
                        tx_hash, other
                    ))),
                    None => Ok(()), // pre-Byzantium node, assume success
                };
            }

            debug!(tx_hash, attempt, "Receipt not available yet");
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        Err(WatchError::Chain(format!(
            "transaction {} not mined within {} attempts",
            tx_hash, RECEIPT_POLL_ATTEMPTS
        )))
    }
}

/// Decode the return buffer of `getRentalData(uint256)`:
/// `(address renter, string renterEmail, uint256 startTime, uint256 duration,
///   uint256 rentalFee, bool isRented)`.
fn decode_rental_data(token_id: u64, buf: &[u8]) -> Result<RentalRecord> {
    let renter = abi::decode_address(abi::word(buf, 0)?)?;
    let email = abi::decode_string(buf, 1)?;
    let start_time = abi::decode_u64(abi::word(buf, 2)?)? as i64;
    let duration = abi::decode_u64(abi::word(buf, 3)?)? as i64;
    let rental_fee = abi::decode_u128(abi::word(buf, 4)?)?;
    let is_rented = abi::decode_bool(abi::word(buf, 5)?)?;

    Ok(RentalRecord {
        token_id,
        renter,
        renter_contact: if email.is_empty() { None } else { Some(email) },
        start_time,
        duration,
        rental_fee,
        is_rented,
    })
}

#[async_trait]
impl ChainReader for EvmRpcClient {
    async fn rental_record(&self, token_id: u64) -> Result<RentalRecord> {
        let data = abi::encode_call("getRentalData(uint256)", &[abi::encode_u256(token_id)]);
        let output = self.eth_call(data).await?;
        decode_rental_data(token_id, &output)
    }

    async fn last_token_id(&self) -> Result<u64> {
        let data = abi::encode_call("lastTokenId()", &[]);
        let output = self.eth_call(data).await?;
        // An empty return means the contract has no counter state yet.
        if output.is_empty() {
            return Ok(0);
        }
        abi::decode_u64(abi::word(&output, 0)?)
    }
}

#[async_trait]
impl ChainWriter for EvmRpcClient {
    async fn expire_batch(&self, start_id: u64, end_id: u64) -> Result<()> {
        let data = abi::encode_call(
            "batchCheckExpiredRentals(uint256,uint256)",
            &[abi::encode_u256(start_id), abi::encode_u256(end_id)],
        );
        let tx_hash = self.send_transaction(data).await?;
        debug!(start_id, end_id, tx_hash, "Submitted batch expiry check");
        self.wait_for_receipt(&tx_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::abi::{encode_u256, WORD};

    /// Build a `getRentalData` return buffer by hand.
    fn rental_buf(renter_byte: u8, email: &str, start: u64, duration: u64, rented: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut renter = [0u8; WORD];
        renter[WORD - 20..].copy_from_slice(&[renter_byte; 20]);
        buf.extend_from_slice(&renter);
        buf.extend_from_slice(&encode_u256(6 * WORD as u64)); // string offset
        buf.extend_from_slice(&encode_u256(start));
        buf.extend_from_slice(&encode_u256(duration));
        buf.extend_from_slice(&encode_u256(1_000));
        buf.extend_from_slice(&encode_u256(rented as u64));
        buf.extend_from_slice(&encode_u256(email.len() as u64));
        let mut tail = vec![0u8; email.len().div_ceil(WORD).max(1) * WORD];
        tail[..email.len()].copy_from_slice(email.as_bytes());
        buf.extend_from_slice(&tail);
        buf
    }

    #[test]
    fn test_decode_rental_data() {
        let buf = rental_buf(0x22, "renter@example.com", 1_700_000_000, 3_600, true);
        let record = decode_rental_data(5, &buf).unwrap();

        assert_eq!(record.token_id, 5);
        assert_eq!(record.renter, format!("0x{}", "22".repeat(20)));
        assert_eq!(record.renter_contact.as_deref(), Some("renter@example.com"));
        assert_eq!(record.start_time, 1_700_000_000);
        assert_eq!(record.duration, 3_600);
        assert_eq!(record.rental_fee, 1_000);
        assert!(record.is_rented);
    }

    #[test]
    fn test_decode_rental_data_empty_email() {
        let buf = rental_buf(0x00, "", 0, 0, false);
        let record = decode_rental_data(1, &buf).unwrap();

        assert_eq!(record.renter_contact, None);
        assert!(!record.is_rented);
        assert_eq!(record.renter, crate::chain::types::ZERO_ADDRESS);
    }

    #[test]
    fn test_decode_rental_data_truncated() {
        let buf = rental_buf(0x22, "a@b.c", 1, 1, true);
        assert!(decode_rental_data(1, &buf[..3 * WORD]).is_err());
    }
}
