use std::{
    collections::{HashMap, hash_map::Entry},
    sync::OnceLock,
};

use super::{Account, AccountError, AccountType, AccountVariant, BasicAccount};
use crate::serial_buffer::SerialBuffer;

/// Reads one complete account record, type byte included.
pub type DecodeFn = fn(&mut SerialBuffer) -> Result<Account, AccountError>;

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    initial: Account,
    decode: DecodeFn,
}

/// Maps account type codes to their genesis default and decoder.
#[derive(Debug, Default)]
pub struct AccountTypeRegistry {
    entries: HashMap<AccountType, RegistryEntry>,
}

impl AccountTypeRegistry {
    /// Registry shared by the whole process. Built-in variants are registered
    /// on first access and the table is read-only from then on.
    ///
    /// A registration failure is a configuration error and is returned by
    /// every call.
    pub fn global() -> Result<&'static Self, AccountError> {
        static REGISTRY: OnceLock<Result<AccountTypeRegistry, AccountError>> = OnceLock::new();
        REGISTRY
            .get_or_init(Self::with_builtin_variants)
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn with_builtin_variants() -> Result<Self, AccountError> {
        let mut registry = Self::default();
        registry.register(
            AccountType::Basic,
            BasicAccount::INITIAL,
            BasicAccount::unserialize,
        )?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        account_type: AccountType,
        initial: Account,
        decode: DecodeFn,
    ) -> Result<(), AccountError> {
        if initial.account_type() != account_type {
            return Err(AccountError::MalformedType {
                code: initial.account_type().code(),
            });
        }
        match self.entries.entry(account_type) {
            Entry::Occupied(_) => Err(AccountError::DuplicateAccountType(account_type.code())),
            Entry::Vacant(entry) => {
                entry.insert(RegistryEntry { initial, decode });
                Ok(())
            }
        }
    }

    pub fn contains(&self, account_type: AccountType) -> bool {
        self.entries.contains_key(&account_type)
    }

    /// Default account of a variant, used for accounts not yet in the ledger.
    pub fn initial_for(&self, account_type: AccountType) -> Result<Account, AccountError> {
        self.entries
            .get(&account_type)
            .map(|entry| entry.initial)
            .ok_or(AccountError::UnknownAccountType(account_type.code()))
    }

    /// Peeks the type byte, then hands the untouched record to that
    /// variant's decoder. On failure the read position is restored.
    pub fn decode(&self, buf: &mut SerialBuffer) -> Result<Account, AccountError> {
        let mark = buf.mark();
        let code = buf.peek_u8()?;
        let entry = AccountType::try_from(code)
            .ok()
            .and_then(|account_type| self.entries.get(&account_type))
            .ok_or(AccountError::UnknownAccountType(code))?;
        (entry.decode)(buf).inspect_err(|_| buf.reset(mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::LedgerAccount, balance::Balance};

    #[test]
    fn global_has_basic() {
        let registry = AccountTypeRegistry::global().unwrap();
        assert!(registry.contains(AccountType::Basic));
        assert_eq!(
            registry.initial_for(AccountType::Basic).unwrap(),
            BasicAccount::INITIAL
        );
    }

    #[test]
    fn register_twice_fails() {
        let mut registry = AccountTypeRegistry::default();
        registry
            .register(
                AccountType::Basic,
                BasicAccount::INITIAL,
                BasicAccount::unserialize,
            )
            .unwrap();
        let err = registry
            .register(
                AccountType::Basic,
                BasicAccount::INITIAL,
                BasicAccount::unserialize,
            )
            .unwrap_err();
        assert_eq!(err, AccountError::DuplicateAccountType(0));
        assert_eq!(err.to_string(), "Account type 0 is already registered");
    }

    #[test]
    fn builtin_variants_are_registered_once() {
        let mut registry = AccountTypeRegistry::with_builtin_variants().unwrap();
        let err = registry
            .register(
                AccountType::Basic,
                BasicAccount::INITIAL,
                BasicAccount::unserialize,
            )
            .unwrap_err();
        assert_eq!(err, AccountError::DuplicateAccountType(0));
        assert!(registry.contains(AccountType::Basic));
    }

    #[test]
    fn unregistered_lookups_fail() {
        let registry = AccountTypeRegistry::default();
        assert_eq!(
            registry.initial_for(AccountType::Basic).unwrap_err(),
            AccountError::UnknownAccountType(0)
        );

        let mut buf = SerialBuffer::from(BasicAccount::INITIAL.to_bytes());
        assert_eq!(
            registry.decode(&mut buf).unwrap_err(),
            AccountError::UnknownAccountType(0)
        );
        assert_eq!(buf.read_pos(), 0);
    }

    #[test]
    fn decode_peeks_then_dispatches() {
        let registry = AccountTypeRegistry::with_builtin_variants().unwrap();
        let acc = Account::Basic(BasicAccount::new(Balance::new(77, 2)));
        let mut buf = SerialBuffer::default();
        acc.serialize(&mut buf);
        acc.serialize(&mut buf);

        assert_eq!(registry.decode(&mut buf).unwrap(), acc);
        assert_eq!(buf.read_pos(), acc.serialized_size());
        assert_eq!(registry.decode(&mut buf).unwrap(), acc);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn decode_unknown_code_constructs_nothing() {
        let registry = AccountTypeRegistry::global().unwrap();
        let mut buf = SerialBuffer::from(vec![9, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(
            registry.decode(&mut buf).unwrap_err(),
            AccountError::UnknownAccountType(9)
        );
        assert_eq!(buf.read_pos(), 0);
    }

    #[test]
    fn truncated_record_restores_position() {
        let registry = AccountTypeRegistry::global().unwrap();
        let mut buf = SerialBuffer::from(vec![0, 0, 0, 1]);
        assert!(matches!(
            registry.decode(&mut buf).unwrap_err(),
            AccountError::Buffer(_)
        ));
        assert_eq!(buf.read_pos(), 0);
    }
}
