use std::io::Read;

use crate::command::RawCommand;
use csv::{DeserializeRecordsIntoIter, Trim};

/// Parses a ledger command feed in CSV format
///
/// Header: `type,tx,sender,recipient,nonce,value,fee,height`.
/// Rows that cannot be deserialized are yielded as errors together with
/// their line number.
pub struct CsvCommandParser<R> {
    iter: DeserializeRecordsIntoIter<R, RawCommand>,
}

impl<R> CsvCommandParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvCommandParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<RawCommand>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
