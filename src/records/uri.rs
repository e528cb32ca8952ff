// src/records/uri.rs
//! Well known URI record: one identifier byte abridging the scheme, then the
//! rest of the URI.

use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, utf8};
use crate::error::{NdefError, Result};
use crate::ndef_type::{NdefType, URI_TYPE};
use crate::record::{Record, Tnf};

/// URI prefix codes as defined in NFC Forum RTD URI specification
pub const URI_PREFIXES: &[&str] = &[
    "",                           // 0x00 - no prepending
    "http://www.",                // 0x01
    "https://www.",               // 0x02
    "http://",                    // 0x03
    "https://",                   // 0x04
    "tel:",                       // 0x05
    "mailto:",                    // 0x06
    "ftp://anonymous:anonymous@", // 0x07
    "ftp://ftp.",                 // 0x08
    "ftps://",                    // 0x09
    "sftp://",                    // 0x0A
    "smb://",                     // 0x0B
    "nfs://",                     // 0x0C
    "ftp://",                     // 0x0D
    "dav://",                     // 0x0E
    "news:",                      // 0x0F
    "telnet://",                  // 0x10
    "imap:",                      // 0x11
    "rtsp://",                    // 0x12
    "urn:",                       // 0x13
    "pop:",                       // 0x14
    "sip:",                       // 0x15
    "sips:",                      // 0x16
    "tftp:",                      // 0x17
    "btspp://",                   // 0x18
    "btl2cap://",                 // 0x19
    "btgoep://",                  // 0x1A
    "tcpobex://",                 // 0x1B
    "irdaobex://",                // 0x1C
    "file://",                    // 0x1D
    "urn:epc:id:",                // 0x1E
    "urn:epc:tag:",               // 0x1F
    "urn:epc:pat:",               // 0x20
    "urn:epc:raw:",               // 0x21
    "urn:epc:",                   // 0x22
    "urn:nfc:",                   // 0x23
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    pub identifier: u8,
    /// Everything after the abridged prefix
    pub uri: String,
}

impl Uri {
    pub fn new(identifier: u8, uri: impl Into<String>) -> Self {
        Self {
            identifier,
            uri: uri.into(),
        }
    }

    /// Abridge a full URI with the longest matching prefix code
    pub fn from_full(full: &str) -> Self {
        let best = URI_PREFIXES
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, prefix)| full.starts_with(*prefix))
            .max_by_key(|(_, prefix)| prefix.len());

        match best {
            Some((code, prefix)) => Self::new(code as u8, &full[prefix.len()..]),
            None => Self::new(0x00, full),
        }
    }

    /// Reserved identifiers expand to nothing
    pub fn prefix(&self) -> &'static str {
        URI_PREFIXES
            .get(self.identifier as usize)
            .copied()
            .unwrap_or("")
    }

    pub fn full(&self) -> String {
        format!("{}{}", self.prefix(), self.uri)
    }

    /// Decode a URI record, or the URI nested in a Smart Poster
    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if record.kind == NdefType::SmartPoster {
            let nested = record.smart_poster_records()?;
            let uri = nested
                .iter()
                .find(|r| r.is_type(Tnf::WellKnown, URI_TYPE))
                .ok_or_else(|| NdefError::NotFound("smart poster URI record".into()))?;
            return Self::from_payload(uri.payload());
        }

        if !record.is_type(Tnf::WellKnown, URI_TYPE) {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::WellKnownAbridgedUri,
                found: record.kind,
            });
        }

        Self::from_payload(record.payload())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(payload);
        let identifier = reader.u8()?;
        let uri = utf8(reader.rest(), "uri")?;
        Ok(Self { identifier, uri })
    }

    pub fn payload_len(&self) -> usize {
        1 + self.uri.len()
    }

    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.payload_len());
        payload.push(self.identifier);
        payload.extend_from_slice(self.uri.as_bytes());
        payload
    }

    pub fn to_record(&self) -> Record<'static> {
        Record::new(Tnf::WellKnown, URI_TYPE, self.to_payload())
    }
}
