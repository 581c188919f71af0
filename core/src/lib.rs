//! Delphi Bridge core: a fungible-token ledger and an oracle call facade.
//!
//! The ledger owns account balances, delegated-transfer allowances, and a
//! fixed total supply; every operation either applies atomically or leaves
//! the state untouched. The oracle facade validates and routes read-only
//! calls to one of the oracle contract variants through an injected
//! execution environment.

pub mod errors;
pub mod exec_env;
pub mod ledger;
pub mod oracle;

pub use errors::AppError;
pub use exec_env::{ExecError, ExecutionEnv, RpcExecutionEnv};
pub use ledger::{Address, Ledger, LedgerError};
pub use oracle::{OracleCallArgs, OracleFacade, OracleType};
