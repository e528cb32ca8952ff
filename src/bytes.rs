// src/bytes.rs
//! Bounds-checked cursor over a byte slice, and the byte order helpers shared
//! by the record codecs.

use crate::error::{NdefError, Result};

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
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

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(NdefError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }

        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn be_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn le_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn be_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn be_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Copy `src` into `dst` with the byte order reversed.
///
/// Bluetooth addresses and UUIDs travel little-endian on the wire but are kept
/// most-significant byte first everywhere else.
pub fn copy_reversed(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src.iter().rev()) {
        *d = *s;
    }
}

pub fn reversed(src: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    copy_reversed(&mut out, src);
    out
}

pub fn utf8(bytes: &[u8], field: &'static str) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| NdefError::InvalidField(field))
}

pub fn ensure_len(field: &'static str, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(NdefError::FieldTooLong { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_truncation_offset() {
        let mut reader = ByteReader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(reader.u8().unwrap(), 0x01);

        let err = reader.be_u32().unwrap_err();
        assert_eq!(
            err,
            NdefError::Truncated {
                offset: 1,
                needed: 4,
                available: 2
            }
        );

        // a failed read does not consume anything
        assert_eq!(reader.be_u16().unwrap(), 0x0203);
        assert!(reader.is_empty());
    }

    #[test]
    fn reversed_copy() {
        let mut dst = [0u8; 3];
        copy_reversed(&mut dst, &[1, 2, 3]);
        assert_eq!(dst, [3, 2, 1]);
        assert_eq!(reversed(&[0xAA, 0xBB]), vec![0xBB, 0xAA]);
    }
}
