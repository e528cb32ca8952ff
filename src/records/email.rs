// src/records/email.rs
use serde::{Deserialize, Serialize};

use crate::error::{NdefError, Result};
use crate::ndef_type::{NdefType, URI_ID_EMAIL};
use crate::record::Record;
use crate::records::Uri;
use crate::records::smart_poster::{uri_and_information, uri_or_smart_poster};

pub const MAILTO_SCHEME: &str = "mailto:";
pub const EMAIL_SUBJECT: &str = "?subject=";
pub const EMAIL_BODY: &str = "&body=";

/// `mailto:<address>?subject=<subject>&body=<message>`, abridged with identifier 0x06
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub email_address: String,
    pub subject: String,
    pub message: String,
    pub information: Option<String>,
}

impl Email {
    pub fn new(
        email_address: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            email_address: email_address.into(),
            subject: subject.into(),
            message: message.into(),
            information: None,
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        let (uri, information) = uri_and_information(record)?;

        let full = uri.full();
        let Some(rest) = full.strip_prefix(MAILTO_SCHEME) else {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::UriEmail,
                found: record.kind,
            });
        };

        let (email_address, query) = match rest.split_once(EMAIL_SUBJECT) {
            Some((address, query)) => (address, query),
            None => (rest, ""),
        };
        let (subject, message) = query.split_once(EMAIL_BODY).unwrap_or((query, ""));

        Ok(Self {
            email_address: email_address.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
            information,
        })
    }

    pub fn to_uri(&self) -> Uri {
        Uri::new(
            URI_ID_EMAIL,
            format!(
                "{}{EMAIL_SUBJECT}{}{EMAIL_BODY}{}",
                self.email_address, self.subject, self.message
            ),
        )
    }

    pub fn payload_len(&self) -> usize {
        1 + self.email_address.len()
            + EMAIL_SUBJECT.len()
            + self.subject.len()
            + EMAIL_BODY.len()
            + self.message.len()
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        uri_or_smart_poster(self.to_uri(), self.information.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::record::identify_buffer;

    #[test]
    fn round_trip() {
        let email = Email::new("customer.service@st.com", "M24SR", "Hello, please call me");

        let mut out = Vec::new();
        let record = email.to_record().unwrap();
        record.write_to(&mut out).unwrap();
        assert_eq!(record.payload().len(), email.payload_len());

        let record = identify_buffer(&out).unwrap();
        assert_eq!(record.kind, NdefType::UriEmail);
        assert_eq!(record.payload()[0], 0x06);
        assert_eq!(Email::from_record(&record).unwrap(), email);
    }

    #[test]
    fn smart_poster_round_trip() {
        let email = Email {
            information: Some("Support".into()),
            ..Email::new("a@b.c", "s", "m")
        };

        let mut out = Vec::new();
        email.to_record().unwrap().write_to(&mut out).unwrap();
        let record = identify_buffer(&out).unwrap();

        assert_eq!(record.kind, NdefType::SmartPoster);
        assert_eq!(Email::from_record(&record).unwrap(), email);
    }

    #[test]
    fn bare_address() {
        let record = Uri::from_full("mailto:a@b.c").to_record();
        let email = Email::from_record(&record).unwrap();
        assert_eq!(email.email_address, "a@b.c");
        assert_eq!(email.subject, "");
        assert_eq!(email.message, "");
    }
}
