// src/records/wifi.rs
//! Wi-Fi Simple Configuration token (`application/vnd.wfa.wsc`).
//!
//! The payload is a list of attributes, each a 2 byte big-endian ID, a 2 byte
//! big-endian length and the value. The network settings live inside the
//! Credential attribute.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, utf8};
use crate::error::{NdefError, Result};
use crate::ndef_type::{NdefType, WIFI_TOKEN_TYPE};
use crate::record::{Record, Tnf};

pub const ATTR_VERSION: u16 = 0x104A;
pub const ATTR_CREDENTIAL: u16 = 0x100E;
pub const ATTR_NETWORK_INDEX: u16 = 0x1026;
pub const ATTR_SSID: u16 = 0x1045;
pub const ATTR_AUTH_TYPE: u16 = 0x1003;
pub const ATTR_ENCRYPTION_TYPE: u16 = 0x100F;
pub const ATTR_NETWORK_KEY: u16 = 0x1027;
pub const ATTR_MAC_ADDRESS: u16 = 0x1020;

pub const WSC_VERSION: u8 = 0x10;
pub const SSID_MAX: usize = 32;
pub const NETWORK_KEY_MAX: usize = 64;

const ATTR_HEADER_LEN: usize = 4;
const BROADCAST_MAC: [u8; 6] = [0xFF; 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authentication {
    Open,
    WpaPersonal,
    Shared,
    WpaEnterprise,
    Wpa2Enterprise,
    Wpa2Personal,
    Other(u16),
}

impl From<u16> for Authentication {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => Self::Open,
            0x0002 => Self::WpaPersonal,
            0x0004 => Self::Shared,
            0x0008 => Self::WpaEnterprise,
            0x0010 => Self::Wpa2Enterprise,
            0x0020 => Self::Wpa2Personal,
            other => Self::Other(other),
        }
    }
}

impl From<Authentication> for u16 {
    fn from(value: Authentication) -> Self {
        match value {
            Authentication::Open => 0x0001,
            Authentication::WpaPersonal => 0x0002,
            Authentication::Shared => 0x0004,
            Authentication::WpaEnterprise => 0x0008,
            Authentication::Wpa2Enterprise => 0x0010,
            Authentication::Wpa2Personal => 0x0020,
            Authentication::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encryption {
    None,
    Wep,
    Tkip,
    Aes,
    Other(u16),
}

impl From<u16> for Encryption {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => Self::None,
            0x0002 => Self::Wep,
            0x0004 => Self::Tkip,
            0x0008 => Self::Aes,
            other => Self::Other(other),
        }
    }
}

impl From<Encryption> for u16 {
    fn from(value: Encryption) -> Self {
        match value {
            Encryption::None => 0x0001,
            Encryption::Wep => 0x0002,
            Encryption::Tkip => 0x0004,
            Encryption::Aes => 0x0008,
            Encryption::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiToken {
    pub ssid: String,
    pub network_key: String,
    pub authentication: Authentication,
    pub encryption: Encryption,
}

impl WifiToken {
    pub fn new(ssid: impl Into<String>, network_key: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            network_key: network_key.into(),
            authentication: Authentication::Wpa2Personal,
            encryption: Encryption::Aes,
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if !record.is_type(Tnf::MediaType, WIFI_TOKEN_TYPE) {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::WifiToken,
                found: record.kind,
            });
        }
        Self::from_payload(record.payload())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut token = Self {
            ssid: String::new(),
            network_key: String::new(),
            authentication: Authentication::Open,
            encryption: Encryption::None,
        };
        token.scan(payload)?;
        Ok(token)
    }

    /// Linear walk over the attributes, descending into the Credential
    fn scan(&mut self, attributes: &[u8]) -> Result<()> {
        let mut reader = ByteReader::new(attributes);

        while !reader.is_empty() {
            let id = reader.be_u16()?;
            let len = reader.be_u16()? as usize;
            let value = reader.take(len)?;

            match id {
                ATTR_CREDENTIAL => self.scan(value)?,
                ATTR_SSID => self.ssid = utf8(value, "ssid")?,
                ATTR_NETWORK_KEY => self.network_key = utf8(value, "network key")?,
                ATTR_AUTH_TYPE => {
                    self.authentication = ByteReader::new(value).be_u16()?.into();
                }
                ATTR_ENCRYPTION_TYPE => {
                    self.encryption = ByteReader::new(value).be_u16()?.into();
                }
                other => trace!("skipping WSC attribute {other:#06x}"),
            }
        }

        Ok(())
    }

    fn credential_len(&self) -> usize {
        (ATTR_HEADER_LEN + 1)
            + (ATTR_HEADER_LEN + self.ssid.len())
            + (ATTR_HEADER_LEN + 2)
            + (ATTR_HEADER_LEN + 2)
            + (ATTR_HEADER_LEN + self.network_key.len())
            + (ATTR_HEADER_LEN + BROADCAST_MAC.len())
    }

    pub fn payload_len(&self) -> usize {
        (ATTR_HEADER_LEN + 1) + ATTR_HEADER_LEN + self.credential_len()
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        if self.ssid.len() > SSID_MAX {
            return Err(NdefError::FieldTooLong {
                field: "ssid",
                len: self.ssid.len(),
                max: SSID_MAX,
            });
        }
        if self.network_key.len() > NETWORK_KEY_MAX {
            return Err(NdefError::FieldTooLong {
                field: "network key",
                len: self.network_key.len(),
                max: NETWORK_KEY_MAX,
            });
        }

        let mut credential = Vec::with_capacity(self.credential_len());
        push_attribute(&mut credential, ATTR_NETWORK_INDEX, &[0x01]);
        push_attribute(&mut credential, ATTR_SSID, self.ssid.as_bytes());
        push_attribute(
            &mut credential,
            ATTR_AUTH_TYPE,
            &u16::from(self.authentication).to_be_bytes(),
        );
        push_attribute(
            &mut credential,
            ATTR_ENCRYPTION_TYPE,
            &u16::from(self.encryption).to_be_bytes(),
        );
        push_attribute(&mut credential, ATTR_NETWORK_KEY, self.network_key.as_bytes());
        push_attribute(&mut credential, ATTR_MAC_ADDRESS, &BROADCAST_MAC);

        let mut payload = Vec::with_capacity(self.payload_len());
        push_attribute(&mut payload, ATTR_VERSION, &[WSC_VERSION]);
        push_attribute(&mut payload, ATTR_CREDENTIAL, &credential);
        Ok(payload)
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        Ok(Record::new(Tnf::MediaType, WIFI_TOKEN_TYPE, self.to_payload()?))
    }
}

fn push_attribute(out: &mut Vec<u8>, id: u16, value: &[u8]) {
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::record::identify_buffer;

    #[test]
    fn round_trip() {
        let token = WifiToken {
            authentication: Authentication::WpaPersonal,
            encryption: Encryption::Tkip,
            ..WifiToken::new("ST-guest", "s3cr3t-passphrase")
        };

        let record = token.to_record().unwrap();
        assert_eq!(record.payload().len(), token.payload_len());

        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        let record = identify_buffer(&out).unwrap();

        assert_eq!(record.kind, NdefType::WifiToken);
        assert_eq!(WifiToken::from_record(&record).unwrap(), token);
    }

    #[test]
    fn attributes_are_big_endian() {
        let payload = WifiToken::new("ab", "").to_payload().unwrap();
        assert_eq!(&payload[..5], &[0x10, 0x4A, 0x00, 0x01, 0x10]);
        assert_eq!(&payload[5..7], &[0x10, 0x0E]);
        // network index then SSID inside the credential
        assert_eq!(&payload[9..14], &[0x10, 0x26, 0x00, 0x01, 0x01]);
        assert_eq!(&payload[14..20], &[0x10, 0x45, 0x00, 0x02, b'a', b'b']);
    }

    #[test]
    fn unknown_attributes_are_skipped() {
        let mut payload = Vec::new();
        push_attribute(&mut payload, 0x1049, &[0x00, 0x37, 0x2A]);
        push_attribute(&mut payload, ATTR_SSID, b"net");
        push_attribute(&mut payload, ATTR_NETWORK_KEY, b"key");

        let token = WifiToken::from_payload(&payload).unwrap();
        assert_eq!(token.ssid, "net");
        assert_eq!(token.network_key, "key");
    }

    #[test]
    fn truncated_attribute() {
        let err = WifiToken::from_payload(&[0x10, 0x45, 0x00, 0x08, b'a']).unwrap_err();
        assert!(matches!(err, NdefError::Truncated { .. }));
    }

    #[test]
    fn ssid_too_long() {
        let token = WifiToken::new("x".repeat(33), "");
        assert!(matches!(
            token.to_payload(),
            Err(NdefError::FieldTooLong { field: "ssid", .. })
        ));
    }
}
