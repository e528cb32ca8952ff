// src/record.rs
//! Generic NDEF record header codec.
//!
//! Wire layout of a record:
//!
//! ```text
//! | MB ME CF SR IL TNF | TYPE LENGTH | PAYLOAD LENGTH (1 or 4) | ID LENGTH (0 or 1) | TYPE | ID | PAYLOAD |
//! ```

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, ensure_len};
use crate::error::{NdefError, Result};
use crate::ndef_type::{self, NdefType};

bitflags! {
    /// The five flag bits of the record header byte, the TNF lives in the low 3 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RecordFlags: u8 {
        const MESSAGE_BEGIN = 0b1000_0000;
        const MESSAGE_END = 0b0100_0000;
        const CHUNK = 0b0010_0000;
        const SHORT_RECORD = 0b0001_0000;
        const ID_LENGTH_PRESENT = 0b0000_1000;
    }
}

pub const TNF_MASK: u8 = 0b0000_0111;

/// Payloads up to this size use the 1 byte payload length field
pub const SHORT_RECORD_MAX_PAYLOAD: usize = 0xFF;

/// Smart Poster payloads are scanned for at most this many nested records
pub const SP_MAX_RECORDS: usize = 4;

/// Smart Poster and Handover records nested deeper than this are rejected
pub const MAX_NESTING_DEPTH: usize = 2;

/// flags + type length + short payload length
const MIN_RECORD_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tnf {
    Empty = 0x00,
    WellKnown = 0x01,
    MediaType = 0x02,
    AbsoluteUri = 0x03,
    External = 0x04,
    Unknown = 0x05,
    Unchanged = 0x06,
    Reserved = 0x07,
}

impl Tnf {
    pub fn from_header(header: u8) -> Self {
        match header & TNF_MASK {
            0x00 => Tnf::Empty,
            0x01 => Tnf::WellKnown,
            0x02 => Tnf::MediaType,
            0x03 => Tnf::AbsoluteUri,
            0x04 => Tnf::External,
            0x05 => Tnf::Unknown,
            0x06 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }
}

/// One NDEF record.
///
/// Records parsed with [`identify_buffer`] borrow their payload from the
/// message buffer; records built by the encoders own it.
#[derive(Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub flags: RecordFlags,
    pub tnf: Tnf,
    pub type_: Vec<u8>,
    pub id: Vec<u8>,
    pub payload_length: u32,

    /// Offset from the start of the record to its payload
    pub payload_offset: usize,
    pub payload: Cow<'a, [u8]>,
    pub kind: NdefType,

    /// Records embedded in a Smart Poster or Handover payload
    pub nested: Vec<Record<'a>>,
}

impl Record<'static> {
    /// A new owned record, classified from its type and payload
    pub fn new(tnf: Tnf, type_: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        let type_ = type_.into();
        let payload = payload.into();
        let kind = ndef_type::classify(tnf, &type_, &payload).unwrap_or(NdefType::Unknown);

        let mut record = Self {
            flags: RecordFlags::empty(),
            tnf,
            type_,
            id: Vec::new(),
            payload_length: payload.len() as u32,
            payload_offset: 0,
            payload: Cow::Owned(payload),
            kind,
            nested: Vec::new(),
        };

        record.payload_offset = record.header_len();
        record
    }
}

impl<'a> Record<'a> {
    pub fn with_id(mut self, id: impl Into<Vec<u8>>) -> Self {
        self.id = id.into();
        self.flags.insert(RecordFlags::ID_LENGTH_PRESENT);
        self.payload_offset = self.header_len();
        self
    }

    pub fn message_begin(&self) -> bool {
        self.flags.contains(RecordFlags::MESSAGE_BEGIN)
    }

    pub fn message_end(&self) -> bool {
        self.flags.contains(RecordFlags::MESSAGE_END)
    }

    pub fn has_id(&self) -> bool {
        self.flags.contains(RecordFlags::ID_LENGTH_PRESENT)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_type(&self, tnf: Tnf, type_: &[u8]) -> bool {
        self.tnf == tnf && self.type_ == type_
    }

    /// Number of records parsed out of a Smart Poster payload
    pub fn nb_of_records_in_sp_payload(&self) -> usize {
        if self.kind == NdefType::SmartPoster {
            self.nested.len()
        } else {
            0
        }
    }

    /// Records nested in this Smart Poster, parsed on demand for owned records
    pub fn smart_poster_records(&self) -> Result<Vec<Record<'_>>> {
        if !self.nested.is_empty() {
            return Ok(self.nested.clone());
        }
        parse_smart_poster(&self.payload)
    }

    /// Size of the header as it will be written, with SR taken from the payload length
    pub fn header_len(&self) -> usize {
        let length_field = if self.payload.len() <= SHORT_RECORD_MAX_PAYLOAD {
            1
        } else {
            4
        };
        let id_field = if self.has_id() { 1 + self.id.len() } else { 0 };

        2 + length_field + id_field + self.type_.len()
    }

    /// Total size of the record once written
    pub fn encoded_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    /// Bytes this record occupied in the buffer it was parsed from
    pub fn span(&self) -> usize {
        self.payload_offset + self.payload.len()
    }

    /// Serialize the record, recomputing the SR flag, returns the number of bytes written
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<usize> {
        self.write_with_flags(self.flags, out)
    }

    pub(crate) fn write_with_flags(&self, flags: RecordFlags, out: &mut Vec<u8>) -> Result<usize> {
        ensure_len("type", self.type_.len(), 0xFF)?;
        ensure_len("id", self.id.len(), 0xFF)?;
        ensure_len("payload", self.payload.len(), u32::MAX as usize)?;

        let mut flags = flags;
        let short = self.payload.len() <= SHORT_RECORD_MAX_PAYLOAD;
        flags.set(RecordFlags::SHORT_RECORD, short);

        let start = out.len();
        out.push(flags.bits() | self.tnf as u8);
        out.push(self.type_.len() as u8);

        if short {
            out.push(self.payload.len() as u8);
        } else {
            out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        }

        if flags.contains(RecordFlags::ID_LENGTH_PRESENT) {
            out.push(self.id.len() as u8);
        }

        out.extend_from_slice(&self.type_);

        if flags.contains(RecordFlags::ID_LENGTH_PRESENT) {
            out.extend_from_slice(&self.id);
        }

        out.extend_from_slice(&self.payload);

        Ok(out.len() - start)
    }

    pub fn into_owned(self) -> Record<'static> {
        Record {
            flags: self.flags,
            tnf: self.tnf,
            type_: self.type_,
            id: self.id,
            payload_length: self.payload_length,
            payload_offset: self.payload_offset,
            payload: Cow::Owned(self.payload.into_owned()),
            kind: self.kind,
            nested: self.nested.into_iter().map(Record::into_owned).collect(),
        }
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ret = f.debug_struct("Record");
        ret.field("flags", &self.flags)
            .field("tnf", &self.tnf)
            .field("kind", &self.kind);

        match std::str::from_utf8(&self.type_) {
            Ok(type_str) => ret.field("type", &type_str),
            Err(_) => ret.field("type", &hex::encode(&self.type_)),
        };

        ret.field("id", &hex::encode(&self.id))
            .field("payload_offset", &self.payload_offset)
            .field("payload", &hex::encode(&self.payload));

        if !self.nested.is_empty() {
            ret.field("nested", &self.nested);
        }

        ret.finish()
    }
}

/// Parse the record starting at the beginning of `buf` and classify it.
///
/// A record whose TNF cannot be interpreted is still returned, with its kind
/// set to [`NdefType::Unknown`], the caller decides whether that is fatal.
pub fn identify_buffer(buf: &[u8]) -> Result<Record<'_>> {
    identify_at_depth(buf, 0)
}

fn identify_at_depth(buf: &[u8], depth: usize) -> Result<Record<'_>> {
    if depth > MAX_NESTING_DEPTH {
        warn!("record nested {depth} levels deep");
        return Err(NdefError::CorruptMessage);
    }

    let mut reader = ByteReader::new(buf);

    let header = reader.u8()?;
    let flags = RecordFlags::from_bits_truncate(header);
    let tnf = Tnf::from_header(header);

    let type_length = reader.u8()? as usize;

    let payload_length = if flags.contains(RecordFlags::SHORT_RECORD) {
        reader.u8()? as u32
    } else {
        reader.be_u32()?
    };

    let id_length = if flags.contains(RecordFlags::ID_LENGTH_PRESENT) {
        reader.u8()? as usize
    } else {
        0
    };

    let type_ = reader.take(type_length)?.to_vec();
    let id = reader.take(id_length)?.to_vec();
    let payload_offset = reader.position();
    let payload = reader.take(payload_length as usize)?;

    trace!(
        "record header {header:#04x} type={} id={} payload_len={payload_length} payload_offset={payload_offset}",
        hex::encode(&type_),
        hex::encode(&id),
    );

    let kind = match ndef_type::classify(tnf, &type_, payload) {
        Ok(kind) => kind,
        Err(err) => {
            warn!("unable to classify record: {err}");
            NdefType::Unknown
        }
    };

    let nested = match kind {
        NdefType::SmartPoster => parse_nested(payload, SP_MAX_RECORDS, false, depth + 1)?,
        NdefType::Handover => match payload.get(1..) {
            Some(records) => parse_nested(records, nested_limit(records), true, depth + 1)?,
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    debug!("identified {kind:?} record, {} nested", nested.len());

    Ok(Record {
        flags,
        tnf,
        type_,
        id,
        payload_length,
        payload_offset,
        payload: Cow::Borrowed(payload),
        kind,
        nested,
    })
}

/// Parse a whole message, stopping at the record carrying Message-End
pub fn parse_message(buf: &[u8]) -> Result<Vec<Record<'_>>> {
    let mut records = Vec::new();
    let max_records = buf.len() / MIN_RECORD_LEN + 1;
    let mut offset = 0;

    while offset < buf.len() {
        if records.len() >= max_records {
            return Err(NdefError::CorruptMessage);
        }

        let record = identify_buffer(&buf[offset..])?;
        offset += record.span();

        let last = record.message_end();
        records.push(record);

        if last {
            return Ok(records);
        }
    }

    if records.is_empty() {
        Ok(records)
    } else {
        Err(NdefError::CorruptMessage)
    }
}

/// Walk a Smart Poster payload, keeping at most [`SP_MAX_RECORDS`] records
pub fn parse_smart_poster(payload: &[u8]) -> Result<Vec<Record<'_>>> {
    parse_nested(payload, SP_MAX_RECORDS, false, 1)
}

/// Walk the records following the version byte of a Handover payload
pub fn parse_handover_records(payload: &[u8]) -> Result<Vec<Record<'_>>> {
    match payload.get(1..) {
        Some(records) => parse_nested(records, nested_limit(records), true, 1),
        None => Ok(Vec::new()),
    }
}

fn nested_limit(records: &[u8]) -> usize {
    records.len() / MIN_RECORD_LEN + 1
}

/// Malformed nested records end the scan, exceeding the nesting depth is fatal
fn parse_nested(
    payload: &[u8],
    max_records: usize,
    stop_at_end: bool,
    depth: usize,
) -> Result<Vec<Record<'_>>> {
    let mut nested = Vec::new();
    let mut offset = 0;

    while offset < payload.len() && nested.len() < max_records {
        match identify_at_depth(&payload[offset..], depth) {
            Ok(record) => {
                offset += record.span();

                if record.kind == NdefType::Unknown {
                    debug!(
                        "nested record of type {} not classified",
                        String::from_utf8_lossy(&record.type_)
                    );
                }

                let last = record.message_end();
                nested.push(record);

                if stop_at_end && last {
                    break;
                }
            }
            Err(NdefError::CorruptMessage) => return Err(NdefError::CorruptMessage),
            Err(err) => {
                warn!("stopped nested record scan at offset {offset}: {err}");
                break;
            }
        }
    }

    Ok(nested)
}
