// src/records/smart_poster.rs
//! Smart Poster: a URI plus optional title, recommended action, size and type,
//! carried as a nested message in the payload.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, utf8};
use crate::error::{NdefError, Result};
use crate::message::encode_message;
use crate::ndef_type::{NdefType, SMART_POSTER_TYPE, TEXT_TYPE, URI_TYPE};
use crate::record::{Record, SP_MAX_RECORDS, Tnf};
use crate::records::{Text, Uri};

pub const ACTION_TYPE: &[u8] = b"act";
pub const SIZE_TYPE: &[u8] = b"s";
pub const MIME_TYPE_TYPE: &[u8] = b"t";

/// Language used for titles generated from an `information` string
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmartPosterAction {
    Execute,
    Save,
    Edit,
}

impl SmartPosterAction {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Self::Execute),
            0x01 => Ok(Self::Save),
            0x02 => Ok(Self::Edit),
            _ => Err(NdefError::InvalidField("smart poster action")),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Execute => 0x00,
            Self::Save => 0x01,
            Self::Edit => 0x02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartPoster {
    pub uri: Uri,
    pub title: Option<Text>,
    pub action: Option<SmartPosterAction>,
    pub size: Option<u32>,
    pub mime_type: Option<String>,
}

impl SmartPoster {
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            title: None,
            action: None,
            size: None,
            mime_type: None,
        }
    }

    pub fn with_title(mut self, title: Text) -> Self {
        self.title = Some(title);
        self
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if !record.is_type(Tnf::WellKnown, SMART_POSTER_TYPE) {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::SmartPoster,
                found: record.kind,
            });
        }

        let mut uri = None;
        let mut poster = Self::new(Uri::new(0, ""));

        for nested in record.smart_poster_records()? {
            if nested.tnf != Tnf::WellKnown {
                continue;
            }

            let payload = nested.payload();
            let decoded = match nested.type_.as_slice() {
                URI_TYPE if uri.is_none() => {
                    Uri::from_payload(payload).map(|value| uri = Some(value))
                }
                TEXT_TYPE if poster.title.is_none() => {
                    Text::from_payload(payload).map(|title| poster.title = Some(title))
                }
                ACTION_TYPE => ByteReader::new(payload)
                    .u8()
                    .and_then(SmartPosterAction::from_byte)
                    .map(|action| poster.action = Some(action)),
                SIZE_TYPE => ByteReader::new(payload).be_u32().map(|size| poster.size = Some(size)),
                MIME_TYPE_TYPE => {
                    utf8(payload, "mime type").map(|mime_type| poster.mime_type = Some(mime_type))
                }
                _ => Ok(()),
            };

            // a malformed nested record only loses that field
            if let Err(err) = decoded {
                warn!(
                    "skipping smart poster {} record: {err}",
                    String::from_utf8_lossy(&nested.type_)
                );
            }
        }

        poster.uri = uri.ok_or_else(|| NdefError::NotFound("smart poster URI record".into()))?;
        Ok(poster)
    }

    fn nested_records(&self) -> Result<Vec<Record<'static>>> {
        let mut records = vec![self.uri.to_record()];

        if let Some(title) = &self.title {
            records.push(title.to_record()?);
        }
        if let Some(action) = self.action {
            records.push(Record::new(Tnf::WellKnown, ACTION_TYPE, vec![action.to_byte()]));
        }
        if let Some(size) = self.size {
            records.push(Record::new(Tnf::WellKnown, SIZE_TYPE, size.to_be_bytes().to_vec()));
        }
        if let Some(mime_type) = &self.mime_type {
            records.push(Record::new(
                Tnf::WellKnown,
                MIME_TYPE_TYPE,
                mime_type.as_bytes().to_vec(),
            ));
        }

        if records.len() > SP_MAX_RECORDS {
            return Err(NdefError::TooManyRecords {
                max: SP_MAX_RECORDS,
            });
        }
        Ok(records)
    }

    pub fn payload_len(&self) -> Result<usize> {
        Ok(self.nested_records()?.iter().map(Record::encoded_len).sum())
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        encode_message(&self.nested_records()?, &mut payload)?;
        Ok(payload)
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        Ok(Record::new(Tnf::WellKnown, SMART_POSTER_TYPE, self.to_payload()?))
    }
}

/// The URI of a plain URI record or of a Smart Poster, with the poster title as information
pub(crate) fn uri_and_information(record: &Record<'_>) -> Result<(Uri, Option<String>)> {
    if record.kind == NdefType::SmartPoster {
        let poster = SmartPoster::from_record(record)?;
        return Ok((poster.uri, poster.title.map(|title| title.text)));
    }
    Ok((Uri::from_record(record)?, None))
}

/// A plain URI record, or a Smart Poster titled with `information` when there is one
pub(crate) fn uri_or_smart_poster(uri: Uri, information: Option<&str>) -> Result<Record<'static>> {
    match information {
        Some(information) => SmartPoster::new(uri)
            .with_title(Text::new(DEFAULT_LANGUAGE, information))
            .to_record(),
        None => Ok(uri.to_record()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::record::identify_buffer;

    fn parse(record: &Record<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        out
    }

    #[test]
    fn round_trip_all_fields() {
        let poster = SmartPoster {
            uri: Uri::from_full("https://www.st.com"),
            title: Some(Text::new("en", "ST")),
            action: Some(SmartPosterAction::Save),
            size: Some(1024),
            mime_type: None,
        };

        let bytes = parse(&poster.to_record().unwrap());
        let record = identify_buffer(&bytes).unwrap();

        assert_eq!(record.kind, NdefType::SmartPoster);
        assert_eq!(record.nb_of_records_in_sp_payload(), 4);
        assert_eq!(SmartPoster::from_record(&record).unwrap(), poster);
        assert_eq!(record.payload().len(), poster.payload_len().unwrap());
    }

    #[test]
    fn nested_records_are_a_message() {
        let poster =
            SmartPoster::new(Uri::from_full("http://a.b")).with_title(Text::new("en", "t"));
        let record = identify_buffer(&parse(&poster.to_record().unwrap()))
            .unwrap()
            .into_owned();

        assert!(record.nested[0].message_begin());
        assert!(!record.nested[0].message_end());
        assert!(record.nested[1].message_end());
    }

    #[test]
    fn more_than_four_nested_is_rejected() {
        let poster = SmartPoster {
            uri: Uri::from_full("http://a.b"),
            title: Some(Text::new("en", "t")),
            action: Some(SmartPosterAction::Execute),
            size: Some(1),
            mime_type: Some("text/html".into()),
        };
        assert_eq!(
            poster.to_record().unwrap_err(),
            NdefError::TooManyRecords { max: 4 }
        );
    }

    #[test]
    fn missing_uri() {
        let mut payload = Vec::new();
        encode_message(&[Text::new("en", "no uri").to_record().unwrap()], &mut payload).unwrap();
        let record = Record::new(Tnf::WellKnown, SMART_POSTER_TYPE, payload);

        assert!(matches!(
            SmartPoster::from_record(&record),
            Err(NdefError::NotFound(_))
        ));
    }

    #[test]
    fn plain_uri_has_no_information() {
        let uri = Uri::from_full("http://st.com");
        let record = uri_or_smart_poster(uri.clone(), None).unwrap();
        assert_eq!(record.kind, NdefType::WellKnownAbridgedUri);
        assert_eq!(uri_and_information(&record).unwrap(), (uri, None));
    }

    fn poster_with(extra: Record<'static>) -> Record<'static> {
        let mut payload = Vec::new();
        let nested = [Uri::from_full("https://www.st.com").to_record(), extra];
        encode_message(&nested, &mut payload).unwrap();
        Record::new(Tnf::WellKnown, SMART_POSTER_TYPE, payload)
    }

    #[test]
    fn reserved_action_is_skipped() {
        let record = poster_with(Record::new(Tnf::WellKnown, ACTION_TYPE, vec![0x05]));

        let poster = SmartPoster::from_record(&record).unwrap();
        assert_eq!(poster.uri, Uri::from_full("https://www.st.com"));
        assert_eq!(poster.action, None);
    }

    #[test]
    fn short_size_is_skipped() {
        let record = poster_with(Record::new(Tnf::WellKnown, SIZE_TYPE, vec![0x01, 0x00]));

        let poster = SmartPoster::from_record(&record).unwrap();
        assert_eq!(poster.size, None);
        assert_eq!(poster.uri.full(), "https://www.st.com");
    }
}
