use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("Unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
}

/// Growable byte buffer with an explicit read cursor.
///
/// Writes always append. Reads advance `read_pos`, which can be saved with
/// [`SerialBuffer::mark`] and restored with [`SerialBuffer::reset`].
/// All multi-byte integers are big-endian.
#[derive(Debug, Default, Clone)]
pub struct SerialBuffer {
    data: Vec<u8>,
    read_pos: usize,
}

impl SerialBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            read_pos: 0,
        }
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Bytes left between the read cursor and the end of written data.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn mark(&self) -> usize {
        self.read_pos
    }

    pub fn reset(&mut self, mark: usize) {
        self.read_pos = mark.min(self.data.len());
    }

    /// Reads the next byte without moving the cursor.
    pub fn peek_u8(&self) -> Result<u8, BufferError> {
        self.data
            .get(self.read_pos)
            .copied()
            .ok_or(BufferError::UnexpectedEnd {
                needed: 1,
                remaining: 0,
            })
    }

    pub fn read_u8(&mut self) -> Result<u8, BufferError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_u32(&mut self) -> Result<u32, BufferError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, BufferError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        let remaining = self.remaining();
        let bytes = self
            .data
            .get(self.read_pos..self.read_pos + N)
            .ok_or(BufferError::UnexpectedEnd {
                needed: N,
                remaining,
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.read_pos += N;
        Ok(out)
    }
}

impl From<Vec<u8>> for SerialBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data, read_pos: 0 }
    }
}

impl From<&[u8]> for SerialBuffer {
    fn from(data: &[u8]) -> Self {
        data.to_vec().into()
    }
}
