use std::collections::HashMap;

use futures::executor::block_on;
use tracing::{debug, error, warn};

use crate::{
    account::{
        Account, AccountError, AccountType, AccountTypeRegistry, AccountVariant, LedgerAccount,
    },
    command::{
        AppliedCommand, LedgerCommand, MintCommand, RawCommand, TransactionId, TransferCommand,
    },
    transaction::Transaction,
};

use super::{Address, TransactionProcessError, TransactionProcessor};

/// Ledger owner keeping every account in memory. Each command is applied
/// to completion, or not at all, before the next one starts.
#[derive(Default)]
pub struct InMemoryLedgerProcessor {
    applied: HashMap<TransactionId, AppliedCommand>,
    pub accounts: HashMap<Address, Account>,
}

impl InMemoryLedgerProcessor {
    /// Current state of `address`, or the genesis default if it was never touched.
    pub fn account(&self, address: Address) -> Result<Account, AccountError> {
        match self.accounts.get(&address) {
            Some(account) => Ok(*account),
            None => AccountTypeRegistry::global()?.initial_for(AccountType::Basic),
        }
    }

    fn mint(&mut self, command: &MintCommand) -> Result<(), TransactionProcessError> {
        let transaction = mint_transaction(command);
        let recipient = self.account(command.recipient)?;
        let accepted = credit_fits(&recipient, &transaction, command.tx_id)
            && block_on(recipient.verify_incoming_transaction_validity(&transaction))?;
        if !accepted {
            return Err(TransactionProcessError::Rejected {
                tx_id: command.tx_id,
            });
        }
        let recipient =
            recipient.with_incoming_transaction(&transaction, command.block_height, false)?;
        debug!(address = command.recipient, %recipient, "Minted");
        self.accounts.insert(command.recipient, recipient);
        Ok(())
    }

    fn transfer(&mut self, command: &TransferCommand) -> Result<(), TransactionProcessError> {
        let tx = &command.transaction;
        let sender = self.account(command.sender)?;
        let recipient = self.account(command.recipient)?;

        // a self-transfer is credited after the debit, so it always fits
        let accepted = sender.verify_outgoing_transaction_set(
            std::slice::from_ref(tx),
            command.block_height,
            false,
        ) && (command.sender == command.recipient
            || credit_fits(&recipient, tx, command.tx_id))
            && block_on(sender.verify_outgoing_transaction_validity(tx))?
            && block_on(recipient.verify_incoming_transaction_validity(tx))?;
        if !accepted {
            return Err(TransactionProcessError::Rejected {
                tx_id: command.tx_id,
            });
        }

        let (sender, recipient) = Self::apply_transfer(command, sender, recipient)
            .inspect_err(|err| error!(tx_id = command.tx_id, %err, "Validated transfer failed"))?;
        debug!(tx_id = command.tx_id, %sender, %recipient, "Applied transfer");
        self.accounts.insert(command.sender, sender);
        self.accounts.insert(command.recipient, recipient);
        Ok(())
    }

    fn apply_transfer(
        command: &TransferCommand,
        sender: Account,
        recipient: Account,
    ) -> Result<(Account, Account), AccountError> {
        let tx = &command.transaction;
        let sender = sender.with_outgoing_transaction(tx, command.block_height, false)?;
        // a self-transfer credits the already debited account
        let recipient = if command.sender == command.recipient {
            sender
        } else {
            recipient
        };
        let recipient = recipient.with_incoming_transaction(tx, command.block_height, false)?;
        if command.sender == command.recipient {
            return Ok((recipient, recipient));
        }
        Ok((sender, recipient))
    }

    fn revert(&mut self, command: &AppliedCommand) -> Result<(), TransactionProcessError> {
        match command {
            AppliedCommand::Mint(mint) => self.revert_mint(mint),
            AppliedCommand::Transfer(transfer) => self.revert_transfer(transfer),
        }
    }

    fn revert_mint(&mut self, command: &MintCommand) -> Result<(), TransactionProcessError> {
        let recipient = self
            .account(command.recipient)?
            .with_incoming_transaction(&mint_transaction(command), command.block_height, true)?;
        debug!(tx_id = command.tx_id, %recipient, "Reverted mint");
        self.accounts.insert(command.recipient, recipient);
        Ok(())
    }

    fn revert_transfer(
        &mut self,
        command: &TransferCommand,
    ) -> Result<(), TransactionProcessError> {
        let tx = &command.transaction;
        let recipient = self
            .account(command.recipient)?
            .with_incoming_transaction(tx, command.block_height, true)?;
        let sender = if command.sender == command.recipient {
            recipient
        } else {
            self.account(command.sender)?
        };
        let sender = sender.with_outgoing_transaction(tx, command.block_height, true)?;
        debug!(tx_id = command.tx_id, %sender, %recipient, "Reverted transfer");
        if command.sender == command.recipient {
            self.accounts.insert(command.sender, sender);
        } else {
            self.accounts.insert(command.recipient, recipient);
            self.accounts.insert(command.sender, sender);
        }
        Ok(())
    }
}

fn mint_transaction(command: &MintCommand) -> Transaction {
    Transaction::new(0, command.value, 0, command.block_height)
}

/// Whether crediting `transaction` keeps the recipient within `u64`.
fn credit_fits(recipient: &Account, transaction: &Transaction, tx_id: TransactionId) -> bool {
    let fits = recipient
        .balance()
        .value()
        .checked_add(transaction.value())
        .is_some();
    if !fits {
        warn!(
            tx_id,
            available = recipient.balance().value(),
            value = transaction.value(),
            "Rejected transaction - recipient balance overflow"
        );
    }
    fits
}

impl TransactionProcessor for InMemoryLedgerProcessor {
    fn process_command(&mut self, raw: RawCommand) -> Result<(), TransactionProcessError> {
        let tx_entry = self.applied.entry(raw.tx);
        let cmd = LedgerCommand::parse_command(&tx_entry, &raw)?;
        match cmd {
            LedgerCommand::Mint(command) => {
                self.mint(&command)?;
                self.applied
                    .insert(command.tx_id, AppliedCommand::Mint(command));
            }
            LedgerCommand::Transfer(command) => {
                self.transfer(&command)?;
                // remember only applied transfers
                self.applied
                    .insert(command.tx_id, AppliedCommand::Transfer(command));
            }
            LedgerCommand::Revert(command) => {
                self.revert(&command)?;
                self.applied.remove(&command.tx_id());
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{balance::Balance, command::CommandKind};

    use super::*;

    fn mint(tx: TransactionId, recipient: Address, value: u64) -> RawCommand {
        RawCommand {
            kind: CommandKind::Mint,
            tx,
            sender: None,
            recipient: Some(recipient),
            nonce: None,
            value: Some(value),
            fee: None,
            height: None,
        }
    }

    fn transfer(
        tx: TransactionId,
        sender: Address,
        recipient: Address,
        nonce: u32,
        value: u64,
        fee: u64,
    ) -> RawCommand {
        RawCommand {
            kind: CommandKind::Transfer,
            tx,
            sender: Some(sender),
            recipient: Some(recipient),
            nonce: Some(nonce),
            value: Some(value),
            fee: Some(fee),
            height: Some(1),
        }
    }

    fn revert(tx: TransactionId) -> RawCommand {
        RawCommand {
            kind: CommandKind::Revert,
            tx,
            sender: None,
            recipient: None,
            nonce: None,
            value: None,
            fee: None,
            height: None,
        }
    }

    fn balance(processor: &InMemoryLedgerProcessor, address: Address) -> Balance {
        processor.account(address).unwrap().balance()
    }

    #[test]
    fn process_some_commands() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 100)).unwrap();
        processor
            .process_command(transfer(2, 1, 2, 0, 40, 1))
            .unwrap();
        assert_eq!(balance(&processor, 1), Balance::new(59, 1));
        assert_eq!(balance(&processor, 2), Balance::new(40, 0));
        assert_eq!(processor.applied.len(), 2);

        processor.process_command(revert(2)).unwrap();
        assert_eq!(balance(&processor, 1), Balance::new(100, 0));
        assert_eq!(balance(&processor, 2), Balance::new(0, 0));
        assert_eq!(processor.applied.len(), 1);

        processor.process_command(revert(1)).unwrap();
        assert_eq!(balance(&processor, 1), Balance::new(0, 0));
        assert!(processor.applied.is_empty());
    }

    #[test]
    fn rejected_transfers_change_nothing() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 10)).unwrap();
        processor
            .process_command(transfer(2, 1, 2, 0, 6, 0))
            .unwrap();

        // unaffordable after the first one
        let err = processor
            .process_command(transfer(3, 1, 2, 1, 6, 0))
            .unwrap_err();
        assert!(matches!(err, TransactionProcessError::Rejected { tx_id: 3 }));

        // nonce gap
        let err = processor
            .process_command(transfer(4, 1, 2, 2, 1, 0))
            .unwrap_err();
        assert!(matches!(err, TransactionProcessError::Rejected { tx_id: 4 }));

        assert_eq!(balance(&processor, 1), Balance::new(4, 1));
        assert_eq!(balance(&processor, 2), Balance::new(6, 0));
        assert_eq!(processor.applied.len(), 2);
    }

    #[test]
    fn revert_out_of_order_is_an_error() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 10)).unwrap();
        processor
            .process_command(transfer(2, 1, 2, 0, 1, 0))
            .unwrap();
        processor
            .process_command(transfer(3, 1, 2, 1, 1, 0))
            .unwrap();

        let err = processor.process_command(revert(2)).unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::AccountErr(AccountError::Nonce {
                account_nonce: 2,
                transaction_nonce: 0
            })
        ));
        // nothing was partially applied
        assert_eq!(balance(&processor, 1), Balance::new(8, 2));
        assert_eq!(balance(&processor, 2), Balance::new(2, 0));

        processor.process_command(revert(3)).unwrap();
        processor.process_command(revert(2)).unwrap();
        assert_eq!(balance(&processor, 1), Balance::new(10, 0));
        assert_eq!(balance(&processor, 2), Balance::new(0, 0));
    }

    #[test]
    fn revert_fails_when_recipient_already_spent() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 10)).unwrap();
        processor
            .process_command(transfer(2, 1, 2, 0, 10, 0))
            .unwrap();
        processor
            .process_command(transfer(3, 2, 3, 0, 10, 0))
            .unwrap();

        let err = processor.process_command(revert(2)).unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::AccountErr(AccountError::Balance { .. })
        ));
        assert_eq!(balance(&processor, 1), Balance::new(0, 1));
    }

    #[test]
    fn self_transfer_only_costs_fee() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 5, 10)).unwrap();
        processor
            .process_command(transfer(2, 5, 5, 0, 7, 2))
            .unwrap();
        assert_eq!(balance(&processor, 5), Balance::new(8, 1));

        processor.process_command(revert(2)).unwrap();
        assert_eq!(balance(&processor, 5), Balance::new(10, 0));
    }

    #[test]
    fn duplicate_transfer_id() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 10)).unwrap();
        processor
            .process_command(transfer(2, 1, 2, 0, 1, 0))
            .unwrap();
        let err = processor
            .process_command(transfer(2, 1, 2, 1, 1, 0))
            .unwrap_err();
        assert!(matches!(err, TransactionProcessError::CommandErr(_)));
    }

    #[test]
    fn recipient_overflow_is_rejected() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 2, u64::MAX)).unwrap();
        processor.process_command(mint(2, 1, 5)).unwrap();

        let err = processor
            .process_command(transfer(3, 1, 2, 0, 1, 0))
            .unwrap_err();
        assert!(matches!(err, TransactionProcessError::Rejected { tx_id: 3 }));
        let err = processor.process_command(mint(4, 2, 1)).unwrap_err();
        assert!(matches!(err, TransactionProcessError::Rejected { tx_id: 4 }));

        assert_eq!(balance(&processor, 1), Balance::new(5, 0));
        assert_eq!(balance(&processor, 2), Balance::new(u64::MAX, 0));

        // zero-value transfers still go through
        processor
            .process_command(transfer(5, 1, 2, 0, 0, 1))
            .unwrap();
        assert_eq!(balance(&processor, 1), Balance::new(4, 1));
    }

    #[test]
    fn mints_reserve_their_id() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 10)).unwrap();

        let err = processor
            .process_command(transfer(1, 1, 2, 0, 1, 0))
            .unwrap_err();
        assert!(matches!(err, TransactionProcessError::CommandErr(_)));
        let err = processor.process_command(mint(1, 3, 10)).unwrap_err();
        assert!(matches!(err, TransactionProcessError::CommandErr(_)));
        assert_eq!(balance(&processor, 1), Balance::new(10, 0));
        assert_eq!(balance(&processor, 3), Balance::new(0, 0));
    }

    #[test]
    fn revert_mint_needs_unspent_funds() {
        let mut processor = InMemoryLedgerProcessor::default();
        processor.process_command(mint(1, 1, 10)).unwrap();
        processor
            .process_command(transfer(2, 1, 2, 0, 4, 0))
            .unwrap();

        let err = processor.process_command(revert(1)).unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::AccountErr(AccountError::Balance { .. })
        ));
        assert_eq!(balance(&processor, 1), Balance::new(6, 1));

        processor.process_command(revert(2)).unwrap();
        processor.process_command(revert(1)).unwrap();
        assert_eq!(balance(&processor, 1), Balance::new(0, 0));
    }
}
