use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ── Addresses ─────────────────────────────────────────────────────────────────

/// Length of an account identifier in bytes.
pub const ADDRESS_LEN: usize = 20;

/// An opaque 20-byte account identifier, hex-encoded in transport.
///
/// The all-zero address is a reserved sentinel meaning "invalid recipient"
/// and is rejected by `transfer` / `transfer_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The reserved invalid-recipient sentinel.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address '{0}': expected 40 hex characters")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parses a 40-character hex string, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|_| AddressParseError(s.to_string()))?;
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address(arr))
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure modes of the ledger operations.
///
/// No error variant ever leaves the ledger partially mutated: every
/// precondition is checked before the first write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid recipient: the zero address cannot receive tokens")]
    InvalidRecipient,

    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: u64, need: u64 },

    #[error("allowance must be reset to 0 before a new approval")]
    AllowanceResetRequired,
}

impl LedgerError {
    /// Whether this failure corresponds to the abort-severity class
    /// (an arithmetic precondition violation) rather than a plain
    /// input rejection. Both classes leave the ledger untouched.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientBalance { .. } | LedgerError::InsufficientAllowance { .. }
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// ── Ledger ────────────────────────────────────────────────────────────────────

/// Fungible-token ledger: account balances, delegated-transfer allowances,
/// and a fixed total supply.
///
/// The supply is credited in full to a single account at construction and
/// is conserved by every operation; there is no mint or burn. Each call is
/// applied atomically or not at all — callers running the ledger behind
/// shared state must serialize the mutating operations themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<Address, u64>,
    allowances: HashMap<(Address, Address), u64>,
    total_supply: u64,
}

impl Ledger {
    /// Creates a ledger crediting `initial_balance` to `initial_account`.
    pub fn new(initial_account: Address, initial_balance: u64) -> Self {
        let mut balances = HashMap::new();
        balances.insert(initial_account, initial_balance);
        Self {
            balances,
            allowances: HashMap::new(),
            total_supply: initial_balance,
        }
    }

    /// Balance of `account`; 0 for any account never credited.
    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// The fixed supply set at construction.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Remaining amount `spender` may withdraw from `owner`; 0 if never set.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Moves `amount` from `sender` to `to`.
    ///
    /// A self-transfer with sufficient balance is a no-op; the balance
    /// precondition still applies.
    pub fn transfer(&mut self, sender: Address, to: Address, amount: u64) -> LedgerResult<()> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let have = self.balance_of(&sender);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }

        self.spend_balance(sender, amount);
        self.receive_balance(to, amount);
        Ok(())
    }

    /// Sets the allowance for `(owner, spender)` to `amount`.
    ///
    /// An existing non-zero allowance must be reset to 0 before it can be
    /// re-approved to a new non-zero value, closing the double-approval
    /// race between the owner and an in-flight spend.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u64) -> LedgerResult<()> {
        let current = self.allowance(&owner, &spender);
        if current != 0 && amount != 0 {
            return Err(LedgerError::AllowanceResetRequired);
        }

        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
        Ok(())
    }

    /// Moves `amount` from `owner` to `to` on behalf of `spender`,
    /// drawing down the `(owner, spender)` allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u64,
    ) -> LedgerResult<()> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let allowed = self.allowance(&owner, &spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }
        let have = self.balance_of(&owner);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }

        self.spend_balance(owner, amount);
        self.receive_balance(to, amount);
        let remaining = allowed - amount;
        if remaining == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), remaining);
        }
        Ok(())
    }

    /// Sum of all balances. Always equal to `total_supply()`; exposed so
    /// callers and tests can audit the conservation invariant.
    pub fn checked_supply(&self) -> u64 {
        self.balances.values().sum()
    }

    // ── Internal balance plumbing ─────────────────────────────────────────

    // Callers have already verified the balance covers `amount`.
    fn spend_balance(&mut self, account: Address, amount: u64) {
        let balance = self.balance_of(&account);
        self.balances.insert(account, balance - amount);
    }

    // Credits cannot overflow: the sum of all balances never exceeds the
    // fixed total supply.
    fn receive_balance(&mut self, account: Address, amount: u64) {
        let balance = self.balance_of(&account);
        self.balances.insert(account, balance + amount);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
