// src/tag/memory.rs
use crate::error::{NdefError, Result};
use crate::tag::TagMemory;

/// Tag memory held in RAM, used for tag emulation and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTag {
    data: Vec<u8>,
}

impl MemoryTag {
    /// A blank (zeroed) tag of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset.saturating_add(len);
        if end > self.data.len() {
            return Err(NdefError::MemoryTag {
                required: end,
                available: self.data.len(),
            });
        }
        Ok(())
    }
}

impl TagMemory for MemoryTag {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.check(offset, buf.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.check(offset, data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}
