use super::error::WireError;
use crate::modifier::Endian;

use super::token::resolve_endian;

/// Cursor over an encoded buffer with bounds-checked reads.
pub struct WireReader<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.payload.len() - self.offset
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.offset.saturating_add(len);
        let bytes = self
            .payload
            .get(self.offset..end)
            .ok_or(WireError::Truncated {
                needed: end,
                actual: self.payload.len(),
            })?;
        self.offset = end;
        Ok(bytes)
    }

    pub fn take_rest(&mut self) -> &'a [u8] {
        let bytes = &self.payload[self.offset..];
        self.offset = self.payload.len();
        bytes
    }

    /// Read `len` bytes (at most 8) as an unsigned integer.
    pub fn read_uint(&mut self, len: usize, endian: Endian) -> Result<u64, WireError> {
        let bytes = self.take(len)?;
        let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        Ok(match resolve_endian(endian) {
            Endian::Little => bytes.iter().rev().fold(0, fold),
            _ => bytes.iter().fold(0, fold),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_uint_respects_byte_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(
            WireReader::new(&bytes).read_uint(4, Endian::Little).unwrap(),
            0x0403_0201
        );
        assert_eq!(
            WireReader::new(&bytes).read_uint(4, Endian::Big).unwrap(),
            0x0102_0304
        );
    }

    #[test]
    fn take_past_end_reports_needed_length() {
        let bytes = [0u8; 3];
        let mut reader = WireReader::new(&bytes);
        reader.take(2).unwrap();
        assert_eq!(
            reader.take(2).unwrap_err(),
            WireError::Truncated {
                needed: 4,
                actual: 3
            }
        );
        assert_eq!(reader.offset(), 2);
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn take_rest_drains() {
        let bytes = [1u8, 2, 3];
        let mut reader = WireReader::new(&bytes);
        reader.take(1).unwrap();
        assert_eq!(reader.take_rest(), &[2, 3]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn oversized_take_is_truncated() {
        let bytes = [0u8; 3];
        let mut reader = WireReader::new(&bytes);
        reader.take(1).unwrap();
        assert_eq!(
            reader.take(usize::MAX).unwrap_err(),
            WireError::Truncated {
                needed: usize::MAX,
                actual: 3
            }
        );
    }
}
