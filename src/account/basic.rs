use async_trait::async_trait;

use super::{Account, AccountError, AccountType, AccountVariant};
use crate::{balance::Balance, serial_buffer::SerialBuffer, transaction::Transaction};

/// Plain value-holding account. Accepts every transfer that the shared
/// nonce and balance rules allow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicAccount {
    balance: Balance,
}

impl BasicAccount {
    pub const INITIAL: Account = Account::Basic(BasicAccount {
        balance: Balance::new(0, 0),
    });

    pub fn new(balance: Balance) -> Self {
        Self { balance }
    }

    /// Reads a full basic account record, type byte included.
    pub fn unserialize(buf: &mut SerialBuffer) -> Result<Account, AccountError> {
        let code = buf.read_u8()?;
        if code != AccountType::Basic.code() {
            return Err(AccountError::UnknownAccountType(code));
        }
        let balance = Balance::unserialize(buf)?;
        Ok(Account::Basic(Self { balance }))
    }
}

#[async_trait]
impl AccountVariant for BasicAccount {
    fn account_type(&self) -> AccountType {
        AccountType::Basic
    }

    fn balance(&self) -> Balance {
        self.balance
    }

    fn with_balance(&self, balance: Balance) -> Result<Account, AccountError> {
        Ok(Account::Basic(Self::new(balance)))
    }

    async fn verify_outgoing_transaction_validity(
        &self,
        _transaction: &Transaction,
    ) -> Result<bool, AccountError> {
        Ok(true)
    }

    async fn verify_incoming_transaction_validity(
        &self,
        _transaction: &Transaction,
    ) -> Result<bool, AccountError> {
        Ok(true)
    }
}
