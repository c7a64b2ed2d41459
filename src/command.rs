use std::collections::hash_map::Entry;

use serde::Deserialize;
use thiserror::Error;

use crate::{processor::Address, transaction::Transaction};

pub type TransactionId = u32;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Mint,
    Transfer,
    Revert,
}

/// One line of the ledger feed, before validation. Which fields are
/// required depends on `kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub tx: TransactionId,
    #[serde(default)]
    pub sender: Option<Address>,
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default)]
    pub nonce: Option<u32>,
    #[serde(default)]
    pub value: Option<u64>,
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintCommand {
    pub tx_id: TransactionId,
    pub recipient: Address,
    pub value: u64,
    pub block_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub tx_id: TransactionId,
    pub sender: Address,
    pub recipient: Address,
    pub transaction: Transaction,
    pub block_height: u32,
}

#[derive(Debug, Error)]
pub enum AccountCommandError {
    #[error("`{field}` is required for {kind:?}")]
    FieldRequired {
        kind: CommandKind,
        field: &'static str,
    },
    #[error("There shouldn't be an existing transaction for {kind:?}")]
    DuplicateTransaction { kind: CommandKind },
    #[error("There should be an existing transaction for {kind:?}")]
    UnknownTransaction { kind: CommandKind },
}

/// A mint or transfer that has been applied and can still be reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedCommand {
    Mint(MintCommand),
    Transfer(TransferCommand),
}

impl AppliedCommand {
    pub fn tx_id(&self) -> TransactionId {
        match self {
            Self::Mint(command) => command.tx_id,
            Self::Transfer(command) => command.tx_id,
        }
    }
}

pub enum LedgerCommand {
    Mint(MintCommand),
    Transfer(TransferCommand),
    /// Undo of a previously applied mint or transfer.
    Revert(AppliedCommand),
}

impl LedgerCommand {
    pub fn parse_command(
        tx_entry: &Entry<'_, TransactionId, AppliedCommand>,
        raw: &RawCommand,
    ) -> Result<Self, AccountCommandError> {
        match raw.kind {
            CommandKind::Mint => {
                let tx_id = vacant_id(tx_entry, raw.kind)?;
                Ok(Self::Mint(MintCommand {
                    tx_id,
                    recipient: required(raw.kind, "recipient", raw.recipient)?,
                    value: required(raw.kind, "value", raw.value)?,
                    block_height: raw.height.unwrap_or_default(),
                }))
            }
            CommandKind::Transfer => Ok(Self::Transfer(Self::parse_transfer(tx_entry, raw)?)),
            CommandKind::Revert => {
                let Entry::Occupied(entry) = tx_entry else {
                    return Err(AccountCommandError::UnknownTransaction { kind: raw.kind });
                };
                Ok(Self::Revert(*entry.get()))
            }
        }
    }

    fn parse_transfer(
        tx_entry: &Entry<'_, TransactionId, AppliedCommand>,
        raw: &RawCommand,
    ) -> Result<TransferCommand, AccountCommandError> {
        let tx_id = vacant_id(tx_entry, raw.kind)?;
        let block_height = raw.height.unwrap_or_default();
        Ok(TransferCommand {
            tx_id,
            sender: required(raw.kind, "sender", raw.sender)?,
            recipient: required(raw.kind, "recipient", raw.recipient)?,
            transaction: Transaction::new(
                required(raw.kind, "nonce", raw.nonce)?,
                required(raw.kind, "value", raw.value)?,
                raw.fee.unwrap_or_default(),
                block_height,
            ),
            block_height,
        })
    }
}

fn vacant_id(
    tx_entry: &Entry<'_, TransactionId, AppliedCommand>,
    kind: CommandKind,
) -> Result<TransactionId, AccountCommandError> {
    let Entry::Vacant(entry) = tx_entry else {
        return Err(AccountCommandError::DuplicateTransaction { kind });
    };
    Ok(*entry.key())
}

fn required<T>(
    kind: CommandKind,
    field: &'static str,
    value: Option<T>,
) -> Result<T, AccountCommandError> {
    value.ok_or(AccountCommandError::FieldRequired { kind, field })
}
