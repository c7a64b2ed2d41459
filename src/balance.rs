use std::fmt;

use crate::{
    account::AccountError,
    serial_buffer::{BufferError, SerialBuffer},
};

/// Spendable value of an account together with its replay-protection nonce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Balance {
    value: u64,
    nonce: u32,
}

impl Balance {
    /// 8 bytes value + 4 bytes nonce.
    pub const SERIALIZED_SIZE: usize = 12;

    pub const fn new(value: u64, nonce: u32) -> Self {
        Self { value, nonce }
    }

    /// Builds a balance from wider signed integers, checking that both fit
    /// their declared widths.
    pub fn try_from_parts(value: i128, nonce: i64) -> Result<Self, AccountError> {
        let value = u64::try_from(value).map_err(|_| AccountError::MalformedBalance {
            reason: format!("value {value} is not an unsigned 64-bit amount"),
        })?;
        let nonce = u32::try_from(nonce).map_err(|_| AccountError::MalformedBalance {
            reason: format!("nonce {nonce} is not an unsigned 32-bit counter"),
        })?;
        Ok(Self { value, nonce })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn serialize(&self, buf: &mut SerialBuffer) {
        buf.write_u64(self.value);
        buf.write_u32(self.nonce);
    }

    pub fn unserialize(buf: &mut SerialBuffer) -> Result<Self, BufferError> {
        let value = buf.read_u64()?;
        let nonce = buf.read_u32()?;
        Ok(Self { value, nonce })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Balance{{value={}, nonce={}}}", self.value, self.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_parts_checks_widths() {
        assert_eq!(
            Balance::try_from_parts(100, 5).unwrap(),
            Balance::new(100, 5)
        );
        assert_eq!(
            Balance::try_from_parts(u64::MAX as i128, u32::MAX as i64).unwrap(),
            Balance::new(u64::MAX, u32::MAX)
        );

        let err = Balance::try_from_parts(-1, 0).unwrap_err();
        assert!(matches!(err, AccountError::MalformedBalance { .. }));
        let err = Balance::try_from_parts(u64::MAX as i128 + 1, 0).unwrap_err();
        assert!(matches!(err, AccountError::MalformedBalance { .. }));
        let err = Balance::try_from_parts(0, -1).unwrap_err();
        assert!(matches!(err, AccountError::MalformedBalance { .. }));
        let err = Balance::try_from_parts(0, u32::MAX as i64 + 1).unwrap_err();
        assert!(matches!(err, AccountError::MalformedBalance { .. }));
    }

    #[test]
    fn copies_are_equal() {
        let balance = Balance::new(42, 3);
        let copy = balance;
        assert_eq!(balance, copy);
        assert_ne!(balance, Balance::new(42, 4));
        assert_ne!(balance, Balance::new(43, 3));
    }

    #[test]
    fn serialized_layout() {
        let mut buf = SerialBuffer::default();
        Balance::new(0x0102, 7).serialize(&mut buf);
        assert_eq!(buf.len(), Balance::SERIALIZED_SIZE);
        assert_eq!(buf.as_slice(), &[0, 0, 0, 0, 0, 0, 1, 2, 0, 0, 0, 7]);
        assert_eq!(Balance::unserialize(&mut buf).unwrap(), Balance::new(0x0102, 7));
    }

    #[test]
    fn display() {
        assert_eq!(
            Balance::new(59, 6).to_string(),
            "Balance{value=59, nonce=6}"
        );
    }
}
