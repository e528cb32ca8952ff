// src/tag/type3.rs
//! Type 3 tags: a 16 byte Attribute Information block precedes the message.
//!
//! ```text
//! | Ver | Nbr | Nbw | Nmaxb (2) | RFU (4) | WriteF | RWFlag | Ln (3) | Checksum (2) |
//! ```

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bytes::ByteReader;
use crate::error::{NdefError, Result};
use crate::tag::{NdefArea, TagMemory};

pub const BLOCK_SIZE: usize = 16;
pub const ATTRIBUTE_INFO_SIZE: usize = 16;

pub const VERSION_1_0: u8 = 0x10;

pub const WRITE_FLAG_DONE: u8 = 0x00;
pub const WRITE_FLAG_IN_PROGRESS: u8 = 0x0F;

pub const RW_FLAG_READ_ONLY: u8 = 0x00;
pub const RW_FLAG_READ_WRITE: u8 = 0x01;

/// Ln is a 24 bit field
pub const LN_MAX: usize = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub version: u8,
    pub nbr: u8,
    pub nbw: u8,
    pub nmaxb: u16,
    pub write_flag: u8,
    pub rw_flag: u8,
    pub ndef_length: u32,
}

impl AttributeInfo {
    /// Read/write block with room for `nmaxb` blocks of NDEF data
    pub fn new(nmaxb: u16) -> Self {
        Self {
            version: VERSION_1_0,
            nbr: 1,
            nbw: 1,
            nmaxb,
            write_flag: WRITE_FLAG_DONE,
            rw_flag: RW_FLAG_READ_WRITE,
            ndef_length: 0,
        }
    }

    pub fn parse(bytes: &[u8; ATTRIBUTE_INFO_SIZE]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);

        let version = reader.u8()?;
        let nbr = reader.u8()?;
        let nbw = reader.u8()?;
        let nmaxb = reader.be_u16()?;
        let _rfu = reader.take(4)?;
        let write_flag = reader.u8()?;
        let rw_flag = reader.u8()?;
        let ndef_length = reader.be_u24()?;
        let stored_checksum = reader.be_u16()?;

        if checksum(bytes) != stored_checksum {
            debug!("attribute information checksum mismatch");
            return Err(NdefError::NotFormatted);
        }

        if version >> 4 != VERSION_1_0 >> 4 {
            debug!("unsupported attribute information version {version:#04x}");
            return Err(NdefError::NotFormatted);
        }

        Ok(Self {
            version,
            nbr,
            nbw,
            nmaxb,
            write_flag,
            rw_flag,
            ndef_length,
        })
    }

    pub fn to_bytes(&self) -> [u8; ATTRIBUTE_INFO_SIZE] {
        let mut out = [0u8; ATTRIBUTE_INFO_SIZE];
        out[0] = self.version;
        out[1] = self.nbr;
        out[2] = self.nbw;
        out[3..5].copy_from_slice(&self.nmaxb.to_be_bytes());
        out[9] = self.write_flag;
        out[10] = self.rw_flag;
        out[11..14].copy_from_slice(&self.ndef_length.to_be_bytes()[1..]);

        let sum = checksum(&out);
        out[14..16].copy_from_slice(&sum.to_be_bytes());
        out
    }

    /// Bytes available for the message
    pub fn capacity(&self) -> usize {
        self.nmaxb as usize * BLOCK_SIZE
    }
}

fn checksum(bytes: &[u8; ATTRIBUTE_INFO_SIZE]) -> u16 {
    bytes[..14].iter().map(|b| *b as u16).sum()
}

pub fn read_attribute_info<M: TagMemory + ?Sized>(memory: &mut M) -> Result<AttributeInfo> {
    if memory.capacity() < ATTRIBUTE_INFO_SIZE {
        return Err(NdefError::NotFormatted);
    }

    let mut bytes = [0u8; ATTRIBUTE_INFO_SIZE];
    memory.read(0, &mut bytes)?;
    AttributeInfo::parse(&bytes)
}

pub fn area<M: TagMemory + ?Sized>(memory: &mut M) -> Result<NdefArea> {
    let info = read_attribute_info(memory)?;

    let length = info.ndef_length as usize;
    if length > info.capacity() {
        debug!("Ln {length} larger than Nmaxb allows");
        return Err(NdefError::NotFormatted);
    }

    Ok(NdefArea {
        offset: ATTRIBUTE_INFO_SIZE,
        length,
    })
}

pub fn write_ndef<M: TagMemory + ?Sized>(memory: &mut M, data: &[u8]) -> Result<()> {
    let mut info = read_attribute_info(memory)?;

    if info.rw_flag == RW_FLAG_READ_ONLY {
        return Err(NdefError::Locked);
    }

    let available = info
        .capacity()
        .min(memory.capacity().saturating_sub(ATTRIBUTE_INFO_SIZE))
        .min(LN_MAX);
    if data.len() > available {
        return Err(NdefError::MemoryTag {
            required: data.len(),
            available,
        });
    }

    info.write_flag = WRITE_FLAG_IN_PROGRESS;
    memory.write(0, &info.to_bytes())?;

    memory.write(ATTRIBUTE_INFO_SIZE, data)?;

    info.write_flag = WRITE_FLAG_DONE;
    info.ndef_length = data.len() as u32;
    memory.write(0, &info.to_bytes())
}

pub fn format<M: TagMemory + ?Sized>(memory: &mut M) -> Result<()> {
    let blocks = memory.capacity().saturating_sub(ATTRIBUTE_INFO_SIZE) / BLOCK_SIZE;
    if blocks == 0 {
        return Err(NdefError::MemoryTag {
            required: ATTRIBUTE_INFO_SIZE + BLOCK_SIZE,
            available: memory.capacity(),
        });
    }

    let info = AttributeInfo::new(blocks.min(u16::MAX as usize) as u16);
    memory.write(0, &info.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tag::{MemoryTag, Protocol, TagAdapter};

    #[test]
    fn attribute_info_layout() {
        let mut info = AttributeInfo::new(4);
        info.ndef_length = 0x01_02_03;
        let bytes = info.to_bytes();

        assert_eq!(bytes[0], 0x10);
        assert_eq!(&bytes[3..5], &[0x00, 0x04]);
        assert_eq!(&bytes[11..14], &[0x01, 0x02, 0x03]);

        let sum: u16 = bytes[..14].iter().map(|b| *b as u16).sum();
        assert_eq!(u16::from_be_bytes([bytes[14], bytes[15]]), sum);
        assert_eq!(AttributeInfo::parse(&bytes).unwrap(), info);
    }

    #[test]
    fn bad_checksum_is_not_formatted() {
        let mut bytes = AttributeInfo::new(4).to_bytes();
        bytes[15] ^= 0xFF;
        assert_eq!(AttributeInfo::parse(&bytes).unwrap_err(), NdefError::NotFormatted);
    }

    #[test]
    fn write_then_read() {
        let mut adapter = TagAdapter::new(MemoryTag::new(16 + 4 * 16), Protocol::Type3);
        adapter.format().unwrap();
        adapter.write_ndef(b"hello type 3").unwrap();

        let info = read_attribute_info(adapter.memory_mut()).unwrap();
        assert_eq!(info.write_flag, WRITE_FLAG_DONE);
        assert_eq!(info.ndef_length, 12);

        let mut out = Vec::new();
        adapter.read_ndef(&mut out).unwrap();
        assert_eq!(out, b"hello type 3");
    }

    #[test]
    fn read_only_tag_is_locked() {
        let mut info = AttributeInfo::new(2);
        info.rw_flag = RW_FLAG_READ_ONLY;

        let mut tag = MemoryTag::new(48);
        tag.write(0, &info.to_bytes()).unwrap();

        let mut adapter = TagAdapter::new(tag, Protocol::Type3);
        assert_eq!(adapter.write_ndef(b"x").unwrap_err(), NdefError::Locked);
    }

    #[test]
    fn write_beyond_nmaxb_fails() {
        let mut adapter = TagAdapter::new(MemoryTag::new(16 + 2 * 16), Protocol::Type3);
        adapter.format().unwrap();

        let err = adapter.write_ndef(&[0u8; 33]).unwrap_err();
        assert_eq!(
            err,
            NdefError::MemoryTag {
                required: 33,
                available: 32
            }
        );
    }
}
