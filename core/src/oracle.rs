use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::exec_env::{ExecError, ExecutionEnv};
use crate::ledger::Address;

// ── Oracle contract variants ──────────────────────────────────────────────────

/// Method metadata for one oracle contract variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractMetadata {
    /// Contract name as deployed.
    pub contract: &'static str,
    /// Read-only methods the facade may dispatch.
    pub methods: &'static [&'static str],
}

const ORACLE_METHODS: &[&str] = &["eventAddress", "consensusThreshold", "finished"];

const CENTRALIZED_ORACLE: ContractMetadata = ContractMetadata {
    contract: "CentralizedOracle",
    methods: ORACLE_METHODS,
};

const DECENTRALIZED_ORACLE: ContractMetadata = ContractMetadata {
    contract: "DecentralizedOracle",
    methods: ORACLE_METHODS,
};

const DELPHI_ORACLE: ContractMetadata = ContractMetadata {
    contract: "DelphiOracle",
    methods: ORACLE_METHODS,
};

/// The closed set of oracle contract variants.
///
/// Unknown type tags are rejected when parsing the wire string, so a
/// constructed `OracleType` always resolves to metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleType {
    Centralized,
    Decentralized,
    Delphi,
}

impl OracleType {
    pub fn metadata(&self) -> &'static ContractMetadata {
        match self {
            OracleType::Centralized => &CENTRALIZED_ORACLE,
            OracleType::Decentralized => &DECENTRALIZED_ORACLE,
            OracleType::Delphi => &DELPHI_ORACLE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OracleType::Centralized => "centralized",
            OracleType::Decentralized => "decentralized",
            OracleType::Delphi => "delphi",
        }
    }
}

impl FromStr for OracleType {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "centralized" => Ok(OracleType::Centralized),
            "decentralized" => Ok(OracleType::Decentralized),
            "delphi" => Ok(OracleType::Delphi),
            other => Err(OracleError::UnknownOracleType(other.to_string())),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("{0} needs to be defined")]
    MissingArgument(&'static str),

    #[error("invalid oracle type: {0}")]
    UnknownOracleType(String),

    #[error("invalid address in {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("malformed call result: {0}")]
    MalformedResult(String),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

// ── Call arguments ────────────────────────────────────────────────────────────

/// Raw arguments of an oracle read call as they arrive on the wire.
///
/// Presence is validated field by field; the first missing field is named
/// in the resulting `MissingArgument`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OracleCallArgs {
    #[schema(example = "b47c1b554f03de86afe9bc4f2fb0866a287f6a11")]
    pub contract_address: Option<String>,
    #[schema(example = "centralized")]
    pub oracle_type: Option<String>,
    #[schema(example = "17e7888aa7412a735f336d2f6d784caefabb6fa3")]
    pub sender_address: Option<String>,
}

/// A fully validated call: parsed addresses and a resolved variant.
struct ResolvedCall {
    contract_address: Address,
    metadata: &'static ContractMetadata,
    sender_address: Address,
}

fn require_field<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, OracleError> {
    value
        .as_deref()
        .ok_or(OracleError::MissingArgument(field))
}

fn parse_address(value: &str, field: &'static str) -> Result<Address, OracleError> {
    value.parse().map_err(|_| OracleError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

fn resolve(args: &OracleCallArgs) -> Result<ResolvedCall, OracleError> {
    let contract_address = require_field(&args.contract_address, "contractAddress")?;
    let oracle_type = require_field(&args.oracle_type, "oracleType")?;
    let sender_address = require_field(&args.sender_address, "senderAddress")?;

    let oracle_type: OracleType = oracle_type.parse()?;
    Ok(ResolvedCall {
        contract_address: parse_address(contract_address, "contractAddress")?,
        metadata: oracle_type.metadata(),
        sender_address: parse_address(sender_address, "senderAddress")?,
    })
}

// ── Facade ────────────────────────────────────────────────────────────────────

/// Stateless router for read-only oracle contract calls.
///
/// Holds only the injected execution environment; every call validates its
/// arguments, resolves the contract variant, and forwards to the
/// environment attributed to the sender.
pub struct OracleFacade<E> {
    env: E,
}

impl<E: ExecutionEnv> OracleFacade<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Address of the event this oracle resolves.
    pub async fn event_address(&self, args: &OracleCallArgs) -> Result<Address, OracleError> {
        let raw = self.dispatch(args, "eventAddress").await?;
        let value = first_result(&raw)?;
        let s = value.as_str().ok_or_else(|| {
            OracleError::MalformedResult(format!("expected address string, got {value}"))
        })?;
        parse_address(s, "eventAddress")
    }

    /// Whether the oracle has finished collecting results.
    pub async fn finished(&self, args: &OracleCallArgs) -> Result<bool, OracleError> {
        let raw = self.dispatch(args, "finished").await?;
        let value = first_result(&raw)?;
        value.as_bool().ok_or_else(|| {
            OracleError::MalformedResult(format!("expected boolean, got {value}"))
        })
    }

    /// Voting threshold, normalized from the hex-encoded wire value to a
    /// decimal integer.
    pub async fn consensus_threshold(&self, args: &OracleCallArgs) -> Result<u128, OracleError> {
        let raw = self.dispatch(args, "consensusThreshold").await?;
        let value = first_result(&raw)?;
        let s = value.as_str().ok_or_else(|| {
            OracleError::MalformedResult(format!("expected hex string, got {value}"))
        })?;
        hex_to_decimal(s)
    }

    async fn dispatch(&self, args: &OracleCallArgs, method: &str) -> Result<Value, OracleError> {
        let call = resolve(args)?;
        tracing::debug!(
            contract = call.metadata.contract,
            address = %call.contract_address,
            method,
            sender = %call.sender_address,
            "dispatching oracle call"
        );
        let result = self
            .env
            .call(&call.contract_address, method, &call.sender_address)
            .await?;
        Ok(result)
    }
}

/// First element of a call-result array.
fn first_result(raw: &Value) -> Result<&Value, OracleError> {
    raw.as_array()
        .and_then(|values| values.first())
        .ok_or_else(|| OracleError::MalformedResult(format!("expected result array, got {raw}")))
}

/// Normalizes a hex-encoded integer (`0x`-prefixed or bare) to decimal.
fn hex_to_decimal(s: &str) -> Result<u128, OracleError> {
    let trimmed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if trimmed.is_empty() {
        return Err(OracleError::MalformedResult("empty hex value".to_string()));
    }
    u128::from_str_radix(trimmed, 16)
        .map_err(|_| OracleError::MalformedResult(format!("not a hex integer: {s}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct RecordedCall {
        contract_address: Address,
        method: String,
        sender_address: Address,
    }

    /// Execution environment that records calls and replays a canned result.
    struct MockEnv {
        calls: Mutex<Vec<RecordedCall>>,
        response: Option<Value>,
    }

    impl MockEnv {
        fn returning(response: Value) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Some(response),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: None,
            }
        }

        fn recorded(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ExecutionEnv for MockEnv {
        async fn call(
            &self,
            contract_address: &Address,
            method: &str,
            sender_address: &Address,
        ) -> Result<Value, ExecError> {
            self.calls.lock().unwrap().push(RecordedCall {
                contract_address: *contract_address,
                method: method.to_string(),
                sender_address: *sender_address,
            });
            match &self.response {
                Some(value) => Ok(value.clone()),
                None => Err(ExecError::Transport("connection refused".to_string())),
            }
        }
    }

    fn hex_addr(n: u8) -> String {
        format!("{}{:02x}", "00".repeat(19), n)
    }

    fn args() -> OracleCallArgs {
        OracleCallArgs {
            contract_address: Some(hex_addr(0x11)),
            oracle_type: Some("centralized".to_string()),
            sender_address: Some(hex_addr(0x22)),
        }
    }

    #[test]
    fn test_oracle_type_parsing() {
        assert_eq!("centralized".parse::<OracleType>().unwrap(), OracleType::Centralized);
        assert_eq!("decentralized".parse::<OracleType>().unwrap(), OracleType::Decentralized);
        assert_eq!("delphi".parse::<OracleType>().unwrap(), OracleType::Delphi);

        let err = "oracle-9000".parse::<OracleType>().unwrap_err();
        assert!(matches!(err, OracleError::UnknownOracleType(tag) if tag == "oracle-9000"));
    }

    #[test]
    fn test_oracle_type_metadata() {
        assert_eq!(OracleType::Centralized.metadata().contract, "CentralizedOracle");
        assert_eq!(OracleType::Decentralized.metadata().contract, "DecentralizedOracle");
        assert_eq!(OracleType::Delphi.metadata().contract, "DelphiOracle");
        for ty in [OracleType::Centralized, OracleType::Decentralized, OracleType::Delphi] {
            assert!(ty.metadata().methods.contains(&"consensusThreshold"));
            assert_eq!(ty.as_str().parse::<OracleType>().unwrap(), ty);
        }
    }

    #[tokio::test]
    async fn test_missing_arguments_named_in_order() {
        let facade = OracleFacade::new(MockEnv::returning(json!([true])));

        let err = facade.finished(&OracleCallArgs::default()).await.unwrap_err();
        assert!(matches!(err, OracleError::MissingArgument("contractAddress")));

        let mut partial = args();
        partial.oracle_type = None;
        let err = facade.finished(&partial).await.unwrap_err();
        assert!(matches!(err, OracleError::MissingArgument("oracleType")));

        let mut partial = args();
        partial.sender_address = None;
        let err = facade.finished(&partial).await.unwrap_err();
        assert!(matches!(err, OracleError::MissingArgument("senderAddress")));

        // nothing reached the execution environment
        assert!(facade.env.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_oracle_type_rejected_before_dispatch() {
        let facade = OracleFacade::new(MockEnv::returning(json!([true])));
        let mut bad = args();
        bad.oracle_type = Some("quantum".to_string());

        let err = facade.finished(&bad).await.unwrap_err();
        assert!(matches!(err, OracleError::UnknownOracleType(_)));
        assert!(facade.env.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_event_address_dispatch() {
        let event = hex_addr(0x33);
        let facade = OracleFacade::new(MockEnv::returning(json!([event.clone()])));

        let result = facade.event_address(&args()).await.unwrap();
        assert_eq!(result.to_string(), event);

        let calls = facade.env.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "eventAddress");
        assert_eq!(calls[0].contract_address.to_string(), hex_addr(0x11));
        assert_eq!(calls[0].sender_address.to_string(), hex_addr(0x22));
    }

    #[tokio::test]
    async fn test_finished_dispatch() {
        let facade = OracleFacade::new(MockEnv::returning(json!([false])));
        assert!(!facade.finished(&args()).await.unwrap());
        assert_eq!(facade.env.recorded()[0].method, "finished");
    }

    #[tokio::test]
    async fn test_consensus_threshold_normalizes_hex() {
        let facade = OracleFacade::new(MockEnv::returning(json!(["0x5f5e100"])));
        assert_eq!(facade.consensus_threshold(&args()).await.unwrap(), 100_000_000);
        assert_eq!(facade.env.recorded()[0].method, "consensusThreshold");
    }

    #[tokio::test]
    async fn test_consensus_threshold_accepts_bare_hex() {
        let facade = OracleFacade::new(MockEnv::returning(json!(["64"])));
        assert_eq!(facade.consensus_threshold(&args()).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_malformed_results_rejected() {
        let facade = OracleFacade::new(MockEnv::returning(json!({"not": "an array"})));
        let err = facade.finished(&args()).await.unwrap_err();
        assert!(matches!(err, OracleError::MalformedResult(_)));

        let facade = OracleFacade::new(MockEnv::returning(json!(["yes"])));
        let err = facade.finished(&args()).await.unwrap_err();
        assert!(matches!(err, OracleError::MalformedResult(_)));

        let facade = OracleFacade::new(MockEnv::returning(json!(["0xnope"])));
        let err = facade.consensus_threshold(&args()).await.unwrap_err();
        assert!(matches!(err, OracleError::MalformedResult(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let facade = OracleFacade::new(MockEnv::failing());
        let err = facade.finished(&args()).await.unwrap_err();
        assert!(matches!(err, OracleError::Exec(ExecError::Transport(_))));
    }

    #[test]
    fn test_hex_to_decimal() {
        assert_eq!(hex_to_decimal("0x0").unwrap(), 0);
        assert_eq!(hex_to_decimal("0xff").unwrap(), 255);
        assert_eq!(hex_to_decimal("FF").unwrap(), 255);
        assert!(hex_to_decimal("").is_err());
        assert!(hex_to_decimal("0x").is_err());
        assert!(hex_to_decimal("xyz").is_err());
    }
}
