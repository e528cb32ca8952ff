// src/tag/mod.rs
//! Tag transport adapter: hides the per tag type container layout behind
//! get-length / read / write of the raw NDEF message.

pub mod memory;
pub mod type3;
pub mod type4;
pub mod type5;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{NDEF_MAX_SIZE, NdefConfig};
use crate::error::{NdefError, Result};

pub use memory::MemoryTag;
pub use type5::CcFile;

/// Byte addressable tag memory, the physical transport lives behind this
pub trait TagMemory {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Total addressable bytes
    fn capacity(&self) -> usize;
}

impl<T: TagMemory + ?Sized> TagMemory for &mut T {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        (**self).write(offset, data)
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

pub(crate) fn read_u8<M: TagMemory + ?Sized>(memory: &mut M, offset: usize) -> Result<u8> {
    let mut byte = [0u8; 1];
    memory.read(offset, &mut byte)?;
    Ok(byte[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Type1,
    Type2,
    Type3,
    Type4A,
    Type4B,
    Type5,
}

impl TryFrom<u8> for Protocol {
    type Error = NdefError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Protocol::Type1),
            0x02 => Ok(Protocol::Type2),
            0x03 => Ok(Protocol::Type3),
            0x04 => Ok(Protocol::Type4A),
            0x05 => Ok(Protocol::Type4B),
            0x06 => Ok(Protocol::Type5),
            other => Err(NdefError::UnsupportedProtocol(other)),
        }
    }
}

impl Protocol {
    /// Where the Capability Container sits for the CC/TLV based tag types
    pub fn default_cc_file_offset(self) -> usize {
        match self {
            Protocol::Type1 => 8,
            Protocol::Type2 => 12,
            _ => 0,
        }
    }
}

/// Active protocol plus the tag memory it applies to
#[derive(Debug)]
pub struct TagAdapter<M> {
    memory: M,
    protocol: Protocol,
    cc_file_offset: usize,
    max_ndef_size: usize,
}

impl<M: TagMemory> TagAdapter<M> {
    pub fn new(memory: M, protocol: Protocol) -> Self {
        Self {
            memory,
            protocol,
            cc_file_offset: protocol.default_cc_file_offset(),
            max_ndef_size: NDEF_MAX_SIZE,
        }
    }

    pub fn with_config(memory: M, protocol: Protocol, config: &NdefConfig) -> Self {
        let mut adapter = Self::new(memory, protocol);
        adapter.max_ndef_size = config.max_ndef_size;
        if let Some(offset) = config.cc_file_offset {
            adapter.cc_file_offset = offset;
        }
        adapter
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Switch the active protocol from its raw identifier
    pub fn select_protocol(&mut self, protocol: u8) -> Result<()> {
        let protocol = Protocol::try_from(protocol)?;
        debug!("selected protocol {protocol:?}");

        self.protocol = protocol;
        self.cc_file_offset = protocol.default_cc_file_offset();
        Ok(())
    }

    pub fn cc_file_offset(&self) -> usize {
        self.cc_file_offset
    }

    pub fn set_cc_file_offset(&mut self, offset: usize) {
        self.cc_file_offset = offset;
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn into_inner(self) -> M {
        self.memory
    }

    /// Length of the stored NDEF message
    pub fn get_length(&mut self) -> Result<usize> {
        Ok(self.area()?.length)
    }

    /// Copy the stored NDEF message into `out`, returns its length
    pub fn read_ndef(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let area = self.area()?;

        if area.length > self.max_ndef_size {
            return Err(NdefError::MemoryInternal {
                required: area.length,
                available: self.max_ndef_size,
            });
        }

        out.clear();
        out.resize(area.length, 0);
        self.memory.read(area.offset, out)?;

        debug!("read {} NDEF bytes at offset {}", area.length, area.offset);
        Ok(area.length)
    }

    /// Replace the stored NDEF message with `data`
    pub fn write_ndef(&mut self, data: &[u8]) -> Result<()> {
        debug!("writing {} NDEF bytes with {:?}", data.len(), self.protocol);

        match self.protocol {
            Protocol::Type1 | Protocol::Type2 | Protocol::Type5 => {
                type5::write_ndef(&mut self.memory, self.cc_file_offset, data)
            }
            Protocol::Type3 => type3::write_ndef(&mut self.memory, data),
            Protocol::Type4A | Protocol::Type4B => type4::write_ndef(&mut self.memory, data),
        }
    }

    /// Lay down an empty NDEF container for the active protocol
    pub fn format(&mut self) -> Result<()> {
        debug!("formatting tag as {:?}", self.protocol);

        match self.protocol {
            Protocol::Type1 | Protocol::Type2 | Protocol::Type5 => {
                type5::format(&mut self.memory, self.cc_file_offset)
            }
            Protocol::Type3 => type3::format(&mut self.memory),
            Protocol::Type4A | Protocol::Type4B => type4::format(&mut self.memory),
        }
    }

    pub fn read_cc_file(&mut self) -> Result<CcFile> {
        self.ensure_cc_protocol()?;
        type5::read_cc_file(&mut self.memory, self.cc_file_offset)
    }

    pub fn write_cc_file(&mut self, cc: &CcFile) -> Result<()> {
        self.ensure_cc_protocol()?;
        type5::write_cc_file(&mut self.memory, self.cc_file_offset, cc)
    }

    fn ensure_cc_protocol(&self) -> Result<()> {
        match self.protocol {
            Protocol::Type1 | Protocol::Type2 | Protocol::Type5 => Ok(()),
            _ => Err(NdefError::NotFormatted),
        }
    }

    fn area(&mut self) -> Result<NdefArea> {
        match self.protocol {
            Protocol::Type1 | Protocol::Type2 | Protocol::Type5 => {
                type5::area(&mut self.memory, self.cc_file_offset)
            }
            Protocol::Type3 => type3::area(&mut self.memory),
            Protocol::Type4A | Protocol::Type4B => type4::area(&mut self.memory),
        }
    }
}

/// Where the NDEF message lives once the container header has been decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefArea {
    pub offset: usize,
    pub length: usize,
}
