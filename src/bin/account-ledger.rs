use std::fs::File;

use account_ledger::{
    bin_utils::{Service, ServiceError},
    processor::TransactionProcessError,
};
use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a file name as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        error_printer: Box::new(|line, err| match err {
            ServiceError::Parse(err) => eprintln!("Error at line {line}: {err}"),
            ServiceError::Process(TransactionProcessError::CommandErr(err)) => {
                eprintln!("Error at line {line}: {err}")
            }
            ServiceError::Process(TransactionProcessError::AccountErr(err)) => {
                // validated commands must never fail to apply
                error!(line, %err, "Ledger invariant violated");
            }
            ServiceError::Process(TransactionProcessError::Rejected { .. }) => {
                // rejections are not technical errors, the validator already logged why
            }
        }),
    };
    service.run()
}
