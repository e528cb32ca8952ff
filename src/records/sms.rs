// src/records/sms.rs
use serde::{Deserialize, Serialize};

use crate::error::{NdefError, Result};
use crate::ndef_type::NdefType;
use crate::record::Record;
use crate::records::Uri;
use crate::records::smart_poster::{uri_and_information, uri_or_smart_poster};

pub const SMS_SCHEME: &str = "sms:";
pub const SMS_BODY: &str = "?body=";

/// `sms:<number>?body=<message>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sms {
    pub phone_number: String,
    pub message: String,
    pub information: Option<String>,
}

impl Sms {
    pub fn new(phone_number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            message: message.into(),
            information: None,
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        let (uri, information) = uri_and_information(record)?;

        let full = uri.full();
        let Some(rest) = full.strip_prefix(SMS_SCHEME) else {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::UriSms,
                found: record.kind,
            });
        };

        let (phone_number, message) = rest.split_once(SMS_BODY).unwrap_or((rest, ""));

        Ok(Self {
            phone_number: phone_number.to_string(),
            message: message.to_string(),
            information,
        })
    }

    pub fn to_uri(&self) -> Uri {
        Uri::new(
            0x00,
            format!("{SMS_SCHEME}{}{SMS_BODY}{}", self.phone_number, self.message),
        )
    }

    /// Length of the URI payload, without any Smart Poster wrapping
    pub fn payload_len(&self) -> usize {
        1 + SMS_SCHEME.len() + self.phone_number.len() + SMS_BODY.len() + self.message.len()
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        uri_or_smart_poster(self.to_uri(), self.information.as_deref())
    }
}
