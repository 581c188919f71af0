use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::ledger::Address;

/// Failures at the execution-environment boundary.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("rpc request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rpc returned HTTP {0}")]
    Status(u16),

    #[error("rpc error response: {0}")]
    Rpc(String),

    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),
}

/// The external system that executes read-only contract calls.
///
/// Implementations attribute each call to `sender_address` and return the
/// raw call result; numeric results arrive hex-encoded and are normalized
/// by the caller.
pub trait ExecutionEnv: Send + Sync {
    fn call(
        &self,
        contract_address: &Address,
        method: &str,
        sender_address: &Address,
    ) -> impl Future<Output = Result<Value, ExecError>> + Send;
}

/// JSON-RPC 2.0 client for an execution node.
pub struct RpcExecutionEnv {
    client: Client,
    url: String,
    timeout: Duration,
}

impl RpcExecutionEnv {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            timeout,
        }
    }
}

impl ExecutionEnv for RpcExecutionEnv {
    async fn call(
        &self,
        contract_address: &Address,
        method: &str,
        sender_address: &Address,
    ) -> Result<Value, ExecError> {
        let body = rpc_body(contract_address, method, sender_address);
        let request = self.client.post(&self.url).json(&body);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ExecError::Timeout(self.timeout))?
            .map_err(|e| ExecError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %self.url,
                method,
                status = status.as_u16(),
                "contract call rejected by execution node"
            );
            return Err(ExecError::Status(status.as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ExecError::MalformedResponse(e.to_string()))?;
        parse_rpc_response(json)
    }
}

/// Builds the JSON-RPC envelope for a read-only contract call.
pub(crate) fn rpc_body(contract_address: &Address, method: &str, sender_address: &Address) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "callcontract",
        "params": {
            "address": contract_address.to_string(),
            "method": method,
            "senderAddress": sender_address.to_string(),
        }
    })
}

/// Splits a JSON-RPC response body into its result or error.
pub(crate) fn parse_rpc_response(body: Value) -> Result<Value, ExecError> {
    if let Some(err) = body.get("error") {
        if !err.is_null() {
            return Err(ExecError::Rpc(err.to_string()));
        }
    }
    match body.get("result") {
        Some(result) if !result.is_null() => Ok(result.clone()),
        _ => Err(ExecError::MalformedResponse(
            "missing result field".to_string(),
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
