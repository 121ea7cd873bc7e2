//! Bounds-checked little-endian reader over a header frame.
//!
//! Every read states how many bytes it needs; if fewer remain the cursor
//! returns [`DecodeError::Truncated`] and does not advance.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated frame at byte {offset}: need {needed} byte(s), {remaining} remaining")]
    Truncated { offset: usize, needed: usize, remaining: usize },
}

#[derive(Debug, Clone)]
pub struct FrameCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                offset:    self.pos,
                needed:    n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut c = FrameCursor::new(&bytes);
        assert_eq!(c.read_u8().unwrap(), 0x01);
        assert_eq!(c.read_u16().unwrap(), 0x1234);
        assert_eq!(c.read_u32().unwrap(), 0x1234_5678);
        assert!(c.is_empty());
    }

    #[test]
    fn overlong_take_is_rejected_without_advancing() {
        let bytes = [0u8; 3];
        let mut c = FrameCursor::new(&bytes);
        c.read_u16().unwrap();
        let err = c.take(2).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 2, needed: 2, remaining: 1 });
        assert_eq!(c.position(), 2);
        assert_eq!(c.read_u8().unwrap(), 0);
    }
}
