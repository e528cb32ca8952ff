// src/tag/type4.rs
//! Type 4 NDEF file: 2 byte big-endian NLEN followed by the message.

use log::debug;

use crate::error::{NdefError, Result};
use crate::tag::{NdefArea, TagMemory};

pub const NLEN_SIZE: usize = 2;

/// NLEN values above this are reserved
pub const NLEN_MAX: usize = 0xFFFE;

fn capacity<M: TagMemory + ?Sized>(memory: &M) -> usize {
    memory.capacity().saturating_sub(NLEN_SIZE).min(NLEN_MAX)
}

pub fn area<M: TagMemory + ?Sized>(memory: &mut M) -> Result<NdefArea> {
    if memory.capacity() < NLEN_SIZE {
        return Err(NdefError::NotFormatted);
    }

    let mut nlen = [0u8; NLEN_SIZE];
    memory.read(0, &mut nlen)?;
    let length = u16::from_be_bytes(nlen) as usize;

    if length > capacity(memory) {
        debug!("NLEN {length} larger than the NDEF file");
        return Err(NdefError::NotFormatted);
    }

    Ok(NdefArea {
        offset: NLEN_SIZE,
        length,
    })
}

/// NLEN is zeroed while the message is replaced, then set last
pub fn write_ndef<M: TagMemory + ?Sized>(memory: &mut M, data: &[u8]) -> Result<()> {
    let available = capacity(memory);
    if data.len() > available {
        return Err(NdefError::MemoryTag {
            required: data.len(),
            available,
        });
    }

    memory.write(0, &[0x00, 0x00])?;
    memory.write(NLEN_SIZE, data)?;
    memory.write(0, &(data.len() as u16).to_be_bytes())
}

pub fn format<M: TagMemory + ?Sized>(memory: &mut M) -> Result<()> {
    if memory.capacity() < NLEN_SIZE {
        return Err(NdefError::MemoryTag {
            required: NLEN_SIZE,
            available: memory.capacity(),
        });
    }
    memory.write(0, &[0x00, 0x00])
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tag::{MemoryTag, Protocol, TagAdapter};

    #[test]
    fn length_is_big_endian_at_offset_zero() {
        let mut bytes = vec![0x00, 0x2A];
        bytes.extend((0..42u8).collect::<Vec<_>>());
        bytes.extend_from_slice(&[0xEE; 10]);

        let mut adapter = TagAdapter::new(MemoryTag::from_bytes(bytes), Protocol::Type4A);
        assert_eq!(adapter.get_length().unwrap(), 42);

        let mut out = Vec::new();
        assert_eq!(adapter.read_ndef(&mut out).unwrap(), 42);
        assert_eq!(out, (0..42u8).collect::<Vec<_>>());
    }

    #[test]
    fn write_sets_length_and_payload() {
        let mut adapter = TagAdapter::new(MemoryTag::new(16), Protocol::Type4B);
        adapter.write_ndef(&[1, 2, 3]).unwrap();

        assert_eq!(&adapter.memory().as_bytes()[..5], &[0x00, 0x03, 1, 2, 3]);
        assert_eq!(adapter.get_length().unwrap(), 3);
    }

    #[test]
    fn write_larger_than_file_fails() {
        let mut adapter = TagAdapter::new(MemoryTag::new(8), Protocol::Type4A);
        let err = adapter.write_ndef(&[0u8; 7]).unwrap_err();
        assert_eq!(
            err,
            NdefError::MemoryTag {
                required: 7,
                available: 6
            }
        );
    }

    #[test]
    fn bogus_length_is_not_formatted() {
        let mut adapter =
            TagAdapter::new(MemoryTag::from_bytes(vec![0xFF, 0xFF, 0, 0]), Protocol::Type4A);
        assert_eq!(adapter.get_length().unwrap_err(), NdefError::NotFormatted);
    }
}
