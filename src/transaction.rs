/// Read-only view of a value transfer, as handed over by the transaction
/// layer once signature and sender identity have been checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    nonce: u32,
    value: u64,
    fee: u64,
    validity_start_height: u32,
}

impl Transaction {
    pub fn new(nonce: u32, value: u64, fee: u64, validity_start_height: u32) -> Self {
        Self {
            nonce,
            value,
            fee,
            validity_start_height,
        }
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn validity_start_height(&self) -> u32 {
        self.validity_start_height
    }

    /// `value + fee`, or `None` if that does not fit in 64 bits.
    pub fn total_cost(&self) -> Option<u64> {
        self.value.checked_add(self.fee)
    }
}
