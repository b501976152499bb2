use crate::encoding::{fmt_address, fmt_h256, parse_h256, parse_u256_quantity};
use anyhow::{anyhow, Context, Result};
use ethers::types::{Address, H256, U256};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Thin JSON-RPC client for the ERC-4337 bundler methods.
///
/// The chain-read side (gas price, `getNonce`) goes through an ethers
/// `Provider` instead; this client only speaks the `eth_*UserOperation*`
/// namespace.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    url: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct GasEstimate {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

impl BundlerClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }

    pub async fn estimate_user_operation_gas(
        &self,
        user_op: Value,
        entrypoint: Address,
    ) -> Result<GasEstimate> {
        let res = self
            .rpc(
                "eth_estimateUserOperationGas",
                json!([user_op, fmt_address(entrypoint)]),
            )
            .await
            .context("eth_estimateUserOperationGas failed")?;

        Ok(GasEstimate {
            call_gas_limit: quantity_field(&res, "callGasLimit")?,
            verification_gas_limit: quantity_field(&res, "verificationGasLimit")?,
            pre_verification_gas: quantity_field(&res, "preVerificationGas")?,
        })
    }

    pub async fn send_user_operation(&self, user_op: Value, entrypoint: Address) -> Result<H256> {
        let res = self
            .rpc(
                "eth_sendUserOperation",
                json!([user_op, fmt_address(entrypoint)]),
            )
            .await
            .context("eth_sendUserOperation failed")?;
        user_op_hash_from_response(&res)
    }

    /// Poll for a receipt until a non-null result or timeout (0 = no timeout).
    pub async fn wait_user_operation_receipt(
        &self,
        user_op_hash: H256,
        timeout: Duration,
    ) -> Result<Value> {
        let start = Instant::now();
        loop {
            if !timeout.is_zero() && start.elapsed() > timeout {
                return Err(anyhow!(
                    "timed out waiting for userOp receipt after {:?}",
                    timeout
                ));
            }

            match self
                .rpc(
                    "eth_getUserOperationReceipt",
                    json!([fmt_h256(user_op_hash)]),
                )
                .await
            {
                Ok(v) if !v.is_null() => return Ok(v),
                Ok(_) => {}
                // transient errors are common on bundlers under load; keep polling
                Err(e) => tracing::warn!(error = %e, "bundler receipt poll error"),
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let req = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.url))?;

        let status = resp.status();
        let body: Value = resp.json().await.context("failed to decode JSON")?;

        if !status.is_success() {
            return Err(anyhow!("HTTP {}: {}", status, body));
        }

        if let Some(err) = body.get("error") {
            return Err(anyhow!("RPC error: {}", err));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| anyhow!("missing result field"))
    }
}

fn quantity_field(v: &Value, key: &str) -> Result<U256> {
    let s = v
        .get(key)
        .and_then(|x| x.as_str())
        .ok_or_else(|| anyhow!("missing or invalid field {key}"))?;
    parse_u256_quantity(s)
}

/// Bundlers disagree on the `eth_sendUserOperation` result shape: most return
/// the hash as a bare string, some wrap it in an object under varying keys.
/// Accept all shapes seen in the wild.
fn user_op_hash_from_response(res: &Value) -> Result<H256> {
    let hash_str = res
        .as_str()
        .or_else(|| res.get("result").and_then(|v| v.as_str()))
        .or_else(|| res.get("userOpHash").and_then(|v| v.as_str()))
        .or_else(|| res.get("userOperationHash").and_then(|v| v.as_str()))
        .ok_or_else(|| {
            anyhow!(
                "unexpected eth_sendUserOperation result shape (expected string or {{result: ...}}): {}",
                res
            )
        })?;

    parse_h256(hash_str)
}
