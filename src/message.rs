// src/message.rs
//! Composition of whole NDEF messages: Message-Begin on the first record,
//! Message-End on the last one.

use log::debug;

use crate::error::{NdefError, Result};
use crate::record::{Record, RecordFlags, identify_buffer};
use crate::tag::{TagAdapter, TagMemory};

/// flags + type length + short payload length
const MIN_RECORD_LEN: usize = 3;

/// Serialize `records` as one message, MB and ME are recomputed from position
pub fn encode_message(records: &[Record<'_>], out: &mut Vec<u8>) -> Result<usize> {
    let start = out.len();
    let last = records.len().saturating_sub(1);

    for (index, record) in records.iter().enumerate() {
        let mut flags = record.flags;
        flags.remove(RecordFlags::MESSAGE_BEGIN | RecordFlags::MESSAGE_END);
        flags.set(RecordFlags::MESSAGE_BEGIN, index == 0);
        flags.set(RecordFlags::MESSAGE_END, index == last);

        record.write_with_flags(flags, out)?;
    }

    Ok(out.len() - start)
}

pub fn message_len(records: &[Record<'_>]) -> usize {
    records.iter().map(Record::encoded_len).sum()
}

/// Collects records and emits them as a single message
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder<'a> {
    records: Vec<Record<'a>>,
}

impl<'a> MessageBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record<'a>) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn records(&self) -> &[Record<'a>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn encoded_len(&self) -> usize {
        message_len(&self.records)
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        encode_message(&self.records, &mut out)?;
        Ok(out)
    }
}

/// Offset of the record carrying Message-End and the offset right after it
fn find_message_end(buf: &[u8]) -> Result<(usize, usize)> {
    let mut offset = 0;

    for _ in 0..buf.len() / MIN_RECORD_LEN + 1 {
        if offset >= buf.len() {
            break;
        }

        let record = identify_buffer(&buf[offset..])?;
        let end = offset + record.span();

        if record.message_end() {
            return Ok((offset, end));
        }
        offset = end;
    }

    Err(NdefError::CorruptMessage)
}

/// Append `record` to the message stored on the tag.
///
/// The whole message is read, the previous last record loses its ME flag, the
/// new record is written after it with ME set, and the result is written back
/// in a single transport write. `buffer` is the caller owned message scratch space.
pub fn append_record<M: TagMemory>(
    adapter: &mut TagAdapter<M>,
    buffer: &mut Vec<u8>,
    record: &Record<'_>,
    max_size: usize,
) -> Result<()> {
    let length = adapter.get_length()?;
    let mut flags = record.flags;

    if length == 0 {
        buffer.clear();
        flags.insert(RecordFlags::MESSAGE_BEGIN | RecordFlags::MESSAGE_END);
    } else {
        adapter.read_ndef(buffer)?;

        let (last, end) = find_message_end(buffer)?;
        buffer[last] &= !RecordFlags::MESSAGE_END.bits();
        buffer.truncate(end);

        flags.remove(RecordFlags::MESSAGE_BEGIN);
        flags.insert(RecordFlags::MESSAGE_END);
    }

    let required = buffer.len() + record.encoded_len();
    if required > max_size {
        return Err(NdefError::MemoryInternal {
            required,
            available: max_size,
        });
    }

    record.write_with_flags(flags, buffer)?;
    debug!("appending record, message is now {} bytes", buffer.len());

    adapter.write_ndef(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ndef_type::TEXT_TYPE;
    use crate::record::{Tnf, parse_message};
    use crate::tag::{MemoryTag, Protocol};

    fn text(body: &str) -> Record<'static> {
        let mut payload = vec![0x02, b'e', b'n'];
        payload.extend_from_slice(body.as_bytes());
        Record::new(Tnf::WellKnown, TEXT_TYPE, payload)
    }

    #[test]
    fn builder_sets_begin_and_end() {
        let mut builder = MessageBuilder::new();
        builder.push(text("a")).push(text("b")).push(text("c"));

        let bytes = builder.build().unwrap();
        assert_eq!(bytes.len(), builder.encoded_len());

        let records = parse_message(&bytes).unwrap();
        let flags: Vec<(bool, bool)> = records
            .iter()
            .map(|r| (r.message_begin(), r.message_end()))
            .collect();
        assert_eq!(flags, vec![(true, false), (false, false), (false, true)]);
    }

    #[test]
    fn single_record_has_both_flags() {
        let mut out = Vec::new();
        encode_message(&[text("only")], &mut out).unwrap();
        assert_eq!(out[0] & 0xC0, 0xC0);
    }

    #[test]
    fn append_to_unterminated_message_is_corrupt() {
        let mut body = Vec::new();
        text("x")
            .write_with_flags(RecordFlags::MESSAGE_BEGIN, &mut body)
            .unwrap();

        let mut adapter = TagAdapter::new(MemoryTag::new(128), Protocol::Type4A);
        adapter.write_ndef(&body).unwrap();

        let err = append_record(&mut adapter, &mut Vec::new(), &text("y"), 1024).unwrap_err();
        assert_eq!(err, NdefError::CorruptMessage);
    }

    #[test]
    fn append_beyond_internal_buffer() {
        let mut adapter = TagAdapter::new(MemoryTag::new(128), Protocol::Type4A);
        let mut buffer = Vec::new();
        append_record(&mut adapter, &mut buffer, &text("12345"), 16).unwrap();

        let err = append_record(&mut adapter, &mut buffer, &text("12345"), 16).unwrap_err();
        assert_eq!(
            err,
            NdefError::MemoryInternal {
                required: 24,
                available: 16
            }
        );
    }
}
