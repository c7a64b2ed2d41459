//! Bootstraps [`crate::processor`] for the `account-ledger` binary: CSV
//! commands in, CSV account states out.

use std::io::{Read, Write};

use crate::{
    account::{AccountVariant, LedgerAccount},
    processor::{
        TransactionProcessError, TransactionProcessor,
        in_memory_processor::InMemoryLedgerProcessor,
    },
};
use anyhow::Result;
use csv_parser::CsvCommandParser;
use csv_printer::{AccountRow, print_accounts};
use thiserror::Error;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Process(#[from] TransactionProcessError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, ServiceError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvCommandParser::new(self.input);

        let mut processor = InMemoryLedgerProcessor::default();

        for (line, row) in parser {
            let outcome = row
                .map_err(ServiceError::from)
                .and_then(|raw| processor.process_command(raw).map_err(ServiceError::from));
            if let Err(err) = outcome {
                (self.error_printer)(line, err);
            }
        }

        let mut addresses: Vec<_> = processor.accounts.keys().copied().collect();
        addresses.sort_unstable();
        print_accounts(
            self.output,
            addresses.into_iter().filter_map(|address| {
                processor.accounts.get(&address).map(|acc| AccountRow {
                    address,
                    account_type: acc.account_type().code(),
                    value: acc.balance().value(),
                    nonce: acc.balance().nonce(),
                    encoded: hex::encode(acc.to_bytes()),
                })
            }),
        )
    }
}
