use thiserror::Error;

use crate::{
    account::AccountError,
    command::{AccountCommandError, RawCommand, TransactionId},
};

pub mod in_memory_processor;

#[derive(Debug, Error)]
pub enum TransactionProcessError {
    #[error(transparent)]
    CommandErr(#[from] AccountCommandError),
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error("Transaction {tx_id} rejected")]
    Rejected { tx_id: TransactionId },
}

pub type Address = u16;

pub trait TransactionProcessor {
    fn process_command(&mut self, raw: RawCommand) -> Result<(), TransactionProcessError>;
}
