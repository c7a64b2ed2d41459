use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::{
    balance::Balance,
    serial_buffer::{BufferError, SerialBuffer},
    transaction::Transaction,
};

pub use basic::BasicAccount;
pub use registry::{AccountTypeRegistry, DecodeFn};

pub mod basic;
pub mod registry;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Malformed balance: {reason}")]
    MalformedBalance { reason: String },
    #[error("Malformed type {code}")]
    MalformedType { code: u8 },
    #[error("Unknown account type {0}")]
    UnknownAccountType(u8),
    #[error("Account type {0} is already registered")]
    DuplicateAccountType(u8),
    #[error(
        "Nonce error: transaction nonce {transaction_nonce} is out of order for account nonce {account_nonce}"
    )]
    Nonce {
        account_nonce: u32,
        transaction_nonce: u32,
    },
    #[error("Balance error: {required} required, {available} available")]
    Balance { available: u64, required: u128 },
    #[error("{operation} is not implemented for account type {account_type}")]
    NotImplemented {
        account_type: AccountType,
        operation: &'static str,
    },
    #[error("Account record is {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Wire discriminator of an account variant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountType {
    Basic = 0,
}

impl AccountType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for AccountType {
    type Error = AccountError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Basic),
            code => Err(AccountError::UnknownAccountType(code)),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Behaviour every account variant plugs into the shared ledger algorithms.
///
/// `with_balance` and the two validity hooks are extension points: the
/// provided bodies only report [`AccountError::NotImplemented`], so a variant
/// has to override all three before it can take part in transfers.
///
/// The validity hooks are async so a variant may wait on external work
/// (e.g. evaluating a spending policy) without blocking unrelated accounts.
#[async_trait]
pub trait AccountVariant: fmt::Debug + Send + Sync {
    fn account_type(&self) -> AccountType;

    fn balance(&self) -> Balance;

    /// New account of the same variant carrying `balance`.
    fn with_balance(&self, _balance: Balance) -> Result<Account, AccountError> {
        Err(AccountError::NotImplemented {
            account_type: self.account_type(),
            operation: "with_balance",
        })
    }

    async fn verify_outgoing_transaction_validity(
        &self,
        _transaction: &Transaction,
    ) -> Result<bool, AccountError> {
        Err(AccountError::NotImplemented {
            account_type: self.account_type(),
            operation: "verify_outgoing_transaction_validity",
        })
    }

    async fn verify_incoming_transaction_validity(
        &self,
        _transaction: &Transaction,
    ) -> Result<bool, AccountError> {
        Err(AccountError::NotImplemented {
            account_type: self.account_type(),
            operation: "verify_incoming_transaction_validity",
        })
    }
}

/// Algorithms shared by all variants.
///
/// Implemented for every [`AccountVariant`] through a blanket impl, so no
/// variant can replace them.
pub trait LedgerAccount: AccountVariant {
    /// Type byte plus the balance record.
    fn serialized_size(&self) -> usize {
        1 + Balance::SERIALIZED_SIZE
    }

    fn serialize(&self, buf: &mut SerialBuffer) {
        buf.write_u8(self.account_type().code());
        self.balance().serialize(buf);
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = SerialBuffer::with_capacity(self.serialized_size());
        self.serialize(&mut buf);
        buf.into_vec()
    }

    fn equals(&self, other: &dyn AccountVariant) -> bool {
        self.account_type() == other.account_type() && self.balance() == other.balance()
    }

    /// Checks that `transactions` can all be applied, in order, starting from
    /// the current state. Every rejection is reported as `false`; `silent`
    /// only mutes the diagnostic.
    fn verify_outgoing_transaction_set(
        &self,
        transactions: &[Transaction],
        block_height: u32,
        silent: bool,
    ) -> bool {
        let Some((first, rest)) = transactions.split_first() else {
            return true;
        };
        let Some(mut account) = admit_outgoing(self, first, block_height, silent) else {
            return false;
        };
        for transaction in rest {
            match admit_outgoing(&account, transaction, block_height, silent) {
                Some(next) => account = next,
                None => return false,
            }
        }
        true
    }

    fn with_outgoing_transaction(
        &self,
        transaction: &Transaction,
        _block_height: u32,
        revert: bool,
    ) -> Result<Account, AccountError> {
        let balance = self.balance();
        let new_balance = if !revert {
            if transaction.nonce() != balance.nonce() {
                return Err(AccountError::Nonce {
                    account_nonce: balance.nonce(),
                    transaction_nonce: transaction.nonce(),
                });
            }
            let value = transaction
                .total_cost()
                .and_then(|cost| balance.value().checked_sub(cost))
                .ok_or(AccountError::Balance {
                    available: balance.value(),
                    required: transaction.value() as u128 + transaction.fee() as u128,
                })?;
            let nonce = balance
                .nonce()
                .checked_add(1)
                .ok_or_else(|| AccountError::MalformedBalance {
                    reason: "nonce cannot advance past u32::MAX".to_string(),
                })?;
            Balance::new(value, nonce)
        } else {
            let nonce = balance
                .nonce()
                .checked_sub(1)
                .filter(|prev| *prev == transaction.nonce())
                .ok_or(AccountError::Nonce {
                    account_nonce: balance.nonce(),
                    transaction_nonce: transaction.nonce(),
                })?;
            let value = transaction
                .total_cost()
                .and_then(|cost| balance.value().checked_add(cost))
                .ok_or_else(|| AccountError::MalformedBalance {
                    reason: "value exceeds u64::MAX".to_string(),
                })?;
            Balance::new(value, nonce)
        };
        self.with_balance(new_balance)
    }

    fn with_incoming_transaction(
        &self,
        transaction: &Transaction,
        _block_height: u32,
        revert: bool,
    ) -> Result<Account, AccountError> {
        let balance = self.balance();
        let value = if !revert {
            balance
                .value()
                .checked_add(transaction.value())
                .ok_or_else(|| AccountError::MalformedBalance {
                    reason: "value exceeds u64::MAX".to_string(),
                })?
        } else {
            balance
                .value()
                .checked_sub(transaction.value())
                .ok_or(AccountError::Balance {
                    available: balance.value(),
                    required: transaction.value() as u128,
                })?
        };
        self.with_balance(Balance::new(value, balance.nonce()))
    }
}

impl<T: AccountVariant + ?Sized> LedgerAccount for T {}

/// One step of the batch validator: the account after `transaction`, or
/// `None` if it has to be rejected.
fn admit_outgoing<A: AccountVariant + ?Sized>(
    account: &A,
    transaction: &Transaction,
    block_height: u32,
    silent: bool,
) -> Option<Account> {
    let balance = account.balance();
    if transaction.nonce() != balance.nonce() {
        if !silent {
            warn!(
                account_nonce = balance.nonce(),
                transaction_nonce = transaction.nonce(),
                "Rejected transaction - invalid nonce"
            );
        }
        return None;
    }
    let affordable = transaction
        .total_cost()
        .is_some_and(|cost| balance.value() >= cost);
    if !affordable {
        if !silent {
            warn!(
                available = balance.value(),
                value = transaction.value(),
                fee = transaction.fee(),
                "Rejected transaction - insufficient funds"
            );
        }
        return None;
    }
    match account.with_outgoing_transaction(transaction, block_height, false) {
        Ok(next) => Some(next),
        Err(err) => {
            if !silent {
                warn!(%err, "Rejected transaction");
            }
            None
        }
    }
}

/// Account state as stored by the ledger. Values are never mutated; every
/// transition returns a new `Account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Basic(BasicAccount),
}

impl Account {
    pub fn new(account_type: AccountType, balance: Balance) -> Self {
        match account_type {
            AccountType::Basic => Self::Basic(BasicAccount::new(balance)),
        }
    }

    /// Builds an account from a raw type code, as read from untrusted input.
    pub fn try_from_parts(code: u8, balance: Balance) -> Result<Self, AccountError> {
        let account_type =
            AccountType::try_from(code).map_err(|_| AccountError::MalformedType { code })?;
        Ok(Self::new(account_type, balance))
    }

    /// Decodes one account record through the process-wide registry.
    pub fn unserialize(buf: &mut SerialBuffer) -> Result<Self, AccountError> {
        AccountTypeRegistry::global()?.decode(buf)
    }

    /// Decodes `bytes`, which must hold exactly one account record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AccountError> {
        let mut buf = SerialBuffer::from(bytes);
        let account = Self::unserialize(&mut buf)?;
        if buf.remaining() != 0 {
            return Err(AccountError::TrailingBytes {
                expected: account.serialized_size(),
                actual: bytes.len(),
            });
        }
        Ok(account)
    }

    fn variant(&self) -> &dyn AccountVariant {
        match self {
            Self::Basic(account) => account,
        }
    }
}

#[async_trait]
impl AccountVariant for Account {
    fn account_type(&self) -> AccountType {
        self.variant().account_type()
    }

    fn balance(&self) -> Balance {
        self.variant().balance()
    }

    fn with_balance(&self, balance: Balance) -> Result<Account, AccountError> {
        self.variant().with_balance(balance)
    }

    async fn verify_outgoing_transaction_validity(
        &self,
        transaction: &Transaction,
    ) -> Result<bool, AccountError> {
        self.variant()
            .verify_outgoing_transaction_validity(transaction)
            .await
    }

    async fn verify_incoming_transaction_validity(
        &self,
        transaction: &Transaction,
    ) -> Result<bool, AccountError> {
        self.variant()
            .verify_incoming_transaction_validity(transaction)
            .await
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account{{type={}, balance={}}}",
            self.account_type(),
            self.balance()
        )
    }
}
