// src/records/text.rs
//! Well known Text record: status byte, IANA language code, then the text.

use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, ensure_len, utf8};
use crate::error::{NdefError, Result};
use crate::ndef_type::{NdefType, TEXT_TYPE};
use crate::record::{Record, Tnf};

const UTF16_FLAG: u8 = 0b1000_0000;
const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];
const LANGUAGE_LENGTH_MASK: u8 = 0b0011_1111;
pub const LANGUAGE_CODE_MAX: usize = LANGUAGE_LENGTH_MASK as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Utf16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub encoding: TextEncoding,
    pub language_code: String,
    pub text: String,
}

impl Text {
    pub fn new(language_code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            encoding: TextEncoding::Utf8,
            language_code: language_code.into(),
            text: text.into(),
        }
    }

    pub fn utf16(language_code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            encoding: TextEncoding::Utf16,
            ..Self::new(language_code, text)
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if !record.is_type(Tnf::WellKnown, TEXT_TYPE) {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::Text,
                found: record.kind,
            });
        }
        Self::from_payload(record.payload())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(payload);

        let status = reader.u8()?;
        let encoding = if status & UTF16_FLAG != 0 {
            TextEncoding::Utf16
        } else {
            TextEncoding::Utf8
        };

        let language_code = reader.take((status & LANGUAGE_LENGTH_MASK) as usize)?;
        let language_code = utf8(language_code, "language code")?;

        let text = reader.rest();
        let text = match encoding {
            TextEncoding::Utf8 => utf8(text, "text")?,
            TextEncoding::Utf16 => decode_utf16(text)?,
        };

        Ok(Self {
            encoding,
            language_code,
            text,
        })
    }

    /// A leading U+FEFF in UTF-16 text would be read back as a byte order mark
    fn needs_bom(&self) -> bool {
        self.encoding == TextEncoding::Utf16 && self.text.starts_with('\u{FEFF}')
    }

    fn encoded_text(&self) -> Vec<u8> {
        match self.encoding {
            TextEncoding::Utf8 => self.text.as_bytes().to_vec(),
            TextEncoding::Utf16 => {
                let mut encoded = Vec::with_capacity(self.payload_len());
                if self.needs_bom() {
                    encoded.extend_from_slice(&UTF16_BOM);
                }
                encoded.extend(self.text.encode_utf16().flat_map(|unit| unit.to_be_bytes()));
                encoded
            }
        }
    }

    pub fn payload_len(&self) -> usize {
        let text = match self.encoding {
            TextEncoding::Utf8 => self.text.len(),
            TextEncoding::Utf16 => {
                let bom = if self.needs_bom() { UTF16_BOM.len() } else { 0 };
                bom + self.text.encode_utf16().count() * 2
            }
        };
        1 + self.language_code.len() + text
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        ensure_len("language code", self.language_code.len(), LANGUAGE_CODE_MAX)?;

        let mut status = self.language_code.len() as u8;
        if self.encoding == TextEncoding::Utf16 {
            status |= UTF16_FLAG;
        }

        let mut payload = Vec::with_capacity(self.payload_len());
        payload.push(status);
        payload.extend_from_slice(self.language_code.as_bytes());
        payload.extend(self.encoded_text());
        Ok(payload)
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        Ok(Record::new(Tnf::WellKnown, TEXT_TYPE, self.to_payload()?))
    }
}

/// Big-endian unless a byte order mark says otherwise
fn decode_utf16(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(NdefError::InvalidField("text"));
    }

    let (little_endian, bytes) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).map_err(|_| NdefError::InvalidField("text"))
}
