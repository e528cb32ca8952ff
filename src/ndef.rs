// src/ndef.rs
use log::{debug, info};

use crate::config::NdefConfig;
use crate::error::{NdefError, Result};
use crate::message::{self, encode_message};
use crate::record::{Record, RecordFlags, parse_message};
use crate::records::{CarrierPowerState, DecodedRecord, Handover, decode_record};
use crate::tag::{Protocol, TagAdapter, TagMemory};

/// NDEF context for one tag: the transport adapter plus the message and
/// record staging buffers reused across calls.
///
/// Every read-modify-write goes through `&mut self`, so a context shared
/// between threads needs a lock around it.
#[derive(Debug)]
pub struct Ndef<M> {
    adapter: TagAdapter<M>,
    config: NdefConfig,
    buffer: Vec<u8>,
    record_buffer: Vec<u8>,
}

impl<M: TagMemory> Ndef<M> {
    pub fn new(memory: M, protocol: Protocol) -> Self {
        Self::with_config(memory, protocol, NdefConfig::default())
    }

    pub fn with_config(memory: M, protocol: Protocol, config: NdefConfig) -> Self {
        let adapter = TagAdapter::with_config(memory, protocol, &config);
        Self::from_adapter(adapter, config)
    }

    pub fn from_adapter(adapter: TagAdapter<M>, config: NdefConfig) -> Self {
        Self {
            adapter,
            buffer: Vec::with_capacity(config.max_ndef_size),
            record_buffer: Vec::with_capacity(config.max_record_size),
            config,
        }
    }

    pub fn adapter(&self) -> &TagAdapter<M> {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut TagAdapter<M> {
        &mut self.adapter
    }

    pub fn config(&self) -> &NdefConfig {
        &self.config
    }

    pub fn into_inner(self) -> M {
        self.adapter.into_inner()
    }

    /// Read and parse the stored message, an empty container yields no records
    pub fn read_message(&mut self) -> Result<Vec<Record<'_>>> {
        if self.adapter.get_length()? == 0 {
            self.buffer.clear();
            return Ok(Vec::new());
        }

        self.adapter.read_ndef(&mut self.buffer)?;
        parse_message(&self.buffer)
    }

    /// Read the stored message and decode each record with its codec
    pub fn read_decoded(&mut self) -> Result<Vec<DecodedRecord>> {
        self.read_message()?.iter().map(decode_record).collect()
    }

    /// Replace the stored message with a single record
    pub fn write_record(&mut self, record: &Record<'_>) -> Result<()> {
        self.stage(record, RecordFlags::MESSAGE_BEGIN | RecordFlags::MESSAGE_END)?;
        debug!("writing single {:?} record", record.kind);

        self.adapter.write_ndef(&self.record_buffer)
    }

    /// Replace the stored message with `records`
    pub fn write_message(&mut self, records: &[Record<'_>]) -> Result<()> {
        let required = message::message_len(records);
        if required > self.config.max_ndef_size {
            return Err(NdefError::MemoryInternal {
                required,
                available: self.config.max_ndef_size,
            });
        }

        self.buffer.clear();
        encode_message(records, &mut self.buffer)?;
        info!("writing {} records, {} bytes", records.len(), self.buffer.len());

        self.adapter.write_ndef(&self.buffer)
    }

    /// Add `record` after the last record of the stored message
    pub fn append_record(&mut self, record: &Record<'_>) -> Result<()> {
        self.check_record_size(record)?;
        message::append_record(
            &mut self.adapter,
            &mut self.buffer,
            record,
            self.config.max_ndef_size,
        )
    }

    /// Leave an empty NDEF message on the tag
    pub fn clear(&mut self) -> Result<()> {
        self.buffer.clear();
        self.adapter.write_ndef(&[])
    }

    /// Write a Handover message offering `carriers`, each referenced by ID
    pub fn write_handover(
        &mut self,
        handover: Handover,
        carriers: Vec<(CarrierPowerState, Record<'static>)>,
    ) -> Result<()> {
        let records = handover.compose(carriers)?;
        self.write_message(&records)
    }

    fn check_record_size(&self, record: &Record<'_>) -> Result<()> {
        let required = record.encoded_len();
        if required > self.config.max_record_size {
            return Err(NdefError::MemoryInternal {
                required,
                available: self.config.max_record_size,
            });
        }
        Ok(())
    }

    /// Serialize one record into the record scratch buffer
    fn stage(&mut self, record: &Record<'_>, flags: RecordFlags) -> Result<()> {
        self.check_record_size(record)?;

        self.record_buffer.clear();
        record.write_with_flags(flags, &mut self.record_buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::records::{Text, Uri};
    use crate::tag::MemoryTag;

    fn ndef(protocol: Protocol) -> Ndef<MemoryTag> {
        let mut ndef = Ndef::new(MemoryTag::new(256), protocol);
        ndef.adapter_mut().format().unwrap();
        ndef
    }

    #[test]
    fn empty_tag_has_no_records() {
        let mut ndef = ndef(Protocol::Type5);
        assert!(ndef.read_message().unwrap().is_empty());
    }

    #[test]
    fn write_record_replaces_message() {
        let mut ndef = ndef(Protocol::Type4A);
        ndef.append_record(&Text::new("en", "one").to_record().unwrap()).unwrap();
        ndef.append_record(&Text::new("en", "two").to_record().unwrap()).unwrap();

        let uri = Uri::from_full("https://www.st.com");
        ndef.write_record(&uri.to_record()).unwrap();

        assert_eq!(ndef.read_decoded().unwrap(), vec![DecodedRecord::Uri(uri)]);
    }

    #[test]
    fn record_larger_than_scratch_buffer() {
        let config = NdefConfig {
            max_record_size: 16,
            ..NdefConfig::default()
        };
        let mut ndef = Ndef::with_config(MemoryTag::new(256), Protocol::Type4A, config);

        let record = Text::new("en", "far too long for sixteen bytes").to_record().unwrap();
        assert!(matches!(
            ndef.append_record(&record),
            Err(NdefError::MemoryInternal { available: 16, .. })
        ));
    }

    #[test]
    fn append_leaves_scratch_buffer_untouched() {
        let mut ndef = ndef(Protocol::Type5);
        ndef.append_record(&Text::new("en", "one").to_record().unwrap()).unwrap();

        assert!(ndef.record_buffer.is_empty());
        assert_eq!(
            ndef.read_decoded().unwrap(),
            vec![DecodedRecord::Text(Text::new("en", "one"))]
        );
    }

    #[test]
    fn clear_leaves_empty_message() {
        let mut ndef = ndef(Protocol::Type3);
        ndef.write_record(&Text::new("en", "x").to_record().unwrap()).unwrap();
        ndef.clear().unwrap();

        assert_eq!(ndef.adapter_mut().get_length().unwrap(), 0);
        assert!(ndef.read_message().unwrap().is_empty());
    }

    #[test]
    fn message_too_big_for_tag() {
        let mut ndef = Ndef::new(MemoryTag::new(32), Protocol::Type4A);
        let record = Text::new("en", "x".repeat(40)).to_record().unwrap();

        assert!(matches!(
            ndef.write_message(&[record]),
            Err(NdefError::MemoryTag { .. })
        ));
    }
}
