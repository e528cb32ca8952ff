// src/cards.rs
use log::debug;
use nfc_ndef::{NdefError, Result, TagMemory};
use pcsc::Card;

use crate::apdu;

/// NTAG / Ultralight pages are 4 bytes
pub const PAGE_SIZE: usize = 4;

/// READ BINARY returns four pages at once
const READ_CHUNK: usize = 4 * PAGE_SIZE;

/// NTAG memory seen through the reader, addressed in bytes from page 0
pub struct ReaderTag<'c> {
    card: &'c Card,
    pages: usize,
}

impl<'c> ReaderTag<'c> {
    pub fn new(card: &'c Card, pages: usize) -> Self {
        Self { card, pages }
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        let required = offset + len;
        if required > self.capacity() {
            return Err(NdefError::MemoryTag {
                required,
                available: self.capacity(),
            });
        }
        Ok(())
    }

    fn read_page(&self, page: usize) -> Result<[u8; PAGE_SIZE]> {
        let data = apdu::read_binary(self.card, page as u8, PAGE_SIZE as u8)?;
        data.get(..PAGE_SIZE)
            .and_then(|page| page.try_into().ok())
            .ok_or_else(|| NdefError::Transport(format!("short read of page {page}")))
    }
}

impl TagMemory for ReaderTag<'_> {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.check_range(offset, buf.len())?;

        let mut done = 0;
        while done < buf.len() {
            let position = offset + done;
            let page = position / PAGE_SIZE;
            let skip = position % PAGE_SIZE;

            let data = apdu::read_binary(self.card, page as u8, READ_CHUNK as u8)?;
            let available = data.get(skip..).unwrap_or_default();
            if available.is_empty() {
                return Err(NdefError::Transport(format!("short read of page {page}")));
            }

            let n = available.len().min(buf.len() - done);
            buf[done..done + n].copy_from_slice(&available[..n]);
            done += n;
        }

        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len())?;
        debug!("writing {} bytes at offset {offset}", data.len());

        let mut done = 0;
        while done < data.len() {
            let position = offset + done;
            let page = position / PAGE_SIZE;
            let skip = position % PAGE_SIZE;
            let n = (PAGE_SIZE - skip).min(data.len() - done);

            // partial pages keep the bytes around the written range
            let mut bytes = if n == PAGE_SIZE {
                [0u8; PAGE_SIZE]
            } else {
                self.read_page(page)?
            };
            bytes[skip..skip + n].copy_from_slice(&data[done..done + n]);

            apdu::update_binary(self.card, page as u8, &bytes)?;
            done += n;
        }

        Ok(())
    }

    fn capacity(&self) -> usize {
        self.pages * PAGE_SIZE
    }
}
