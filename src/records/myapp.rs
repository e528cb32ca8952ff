// src/records/myapp.rs
//! Vendor external record driving the M24SR discovery demo board.
//!
//! ```text
//! | LED BLINK (4) | LED CONFIG (4) | INFORMATION (UTF-8, rest of payload) |
//! ```

use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, utf8};
use crate::error::{NdefError, Result};
use crate::ndef_type::{MYAPP_TYPE, NdefType};
use crate::record::{Record, Tnf};

pub const LED_COUNT: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyApp {
    /// Blink period of each LED, 0 keeps it steady
    pub led_blink: [u8; LED_COUNT],
    /// On/off state of each LED
    pub led_config: [u8; LED_COUNT],
    pub information: String,
}

impl MyApp {
    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if !record.is_type(Tnf::External, MYAPP_TYPE) {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::MyApp,
                found: record.kind,
            });
        }
        Self::from_payload(record.payload())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(payload);
        Ok(Self {
            led_blink: reader.array()?,
            led_config: reader.array()?,
            information: utf8(reader.rest(), "information")?,
        })
    }

    pub fn payload_len(&self) -> usize {
        2 * LED_COUNT + self.information.len()
    }

    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.payload_len());
        payload.extend_from_slice(&self.led_blink);
        payload.extend_from_slice(&self.led_config);
        payload.extend_from_slice(self.information.as_bytes());
        payload
    }

    pub fn to_record(&self) -> Record<'static> {
        Record::new(Tnf::External, MYAPP_TYPE, self.to_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::record::identify_buffer;

    #[test]
    fn round_trip() {
        let app = MyApp {
            led_blink: [0, 2, 0, 8],
            led_config: [1, 1, 0, 1],
            information: "demo".into(),
        };

        let mut out = Vec::new();
        app.to_record().write_to(&mut out).unwrap();
        let record = identify_buffer(&out).unwrap();

        assert_eq!(record.kind, NdefType::MyApp);
        assert_eq!(record.payload().len(), app.payload_len());
        assert_eq!(MyApp::from_record(&record).unwrap(), app);
    }

    #[test]
    fn short_payload() {
        assert!(matches!(
            MyApp::from_payload(&[0; 6]),
            Err(NdefError::Truncated { .. })
        ));
    }
}
