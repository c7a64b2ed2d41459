use std::io::Write;

use crate::processor::Address;
use csv::Writer;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub address: Address,
    #[serde(rename = "type")]
    pub account_type: u8,
    pub value: u64,
    pub nonce: u32,
    /// Hex of the account wire record.
    pub encoded: String,
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = AccountRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        if let Err(err) = writer.serialize(acc) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
