// src/records/vcard.rs
//! vCard media record, one `TAG:value` property per CRLF terminated line.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::bytes::utf8;
use crate::error::{NdefError, Result};
use crate::ndef_type::{NdefType, VCARD_TYPE};
use crate::record::{Record, Tnf};

pub const BEGIN: &str = "BEGIN:VCARD";
pub const END: &str = "END:VCARD";
pub const VERSION: &str = "VERSION";
pub const DEFAULT_VERSION: &str = "2.1";

const FIRST_NAME: &str = "FN";
const TITLE: &str = "TITLE";
const ORG: &str = "ORG";
const HOME_ADDRESS: &str = "ADR;HOME";
const WORK_ADDRESS: &str = "ADR;WORK";
const ADDRESS: &str = "ADR";
const HOME_TEL: &str = "TEL;HOME";
const WORK_TEL: &str = "TEL;WORK";
const CELL_TEL: &str = "TEL;CELL";
const HOME_EMAIL: &str = "EMAIL;HOME";
const WORK_EMAIL: &str = "EMAIL;WORK";
const EMAIL: &str = "EMAIL";
const URL: &str = "URL";

const LINE_END: &str = "\r\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vcard {
    pub version: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub org: Option<String>,
    pub home_address: Option<String>,
    pub work_address: Option<String>,
    pub address: Option<String>,
    pub home_tel: Option<String>,
    pub work_tel: Option<String>,
    pub cell_tel: Option<String>,
    pub home_email: Option<String>,
    pub work_email: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

impl Vcard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    fn properties(&self) -> [(&'static str, Option<&String>); 13] {
        [
            (FIRST_NAME, self.name.as_ref()),
            (TITLE, self.title.as_ref()),
            (ORG, self.org.as_ref()),
            (HOME_ADDRESS, self.home_address.as_ref()),
            (WORK_ADDRESS, self.work_address.as_ref()),
            (ADDRESS, self.address.as_ref()),
            (HOME_TEL, self.home_tel.as_ref()),
            (WORK_TEL, self.work_tel.as_ref()),
            (CELL_TEL, self.cell_tel.as_ref()),
            (HOME_EMAIL, self.home_email.as_ref()),
            (WORK_EMAIL, self.work_email.as_ref()),
            (EMAIL, self.email.as_ref()),
            (URL, self.url.as_ref()),
        ]
    }

    fn property_mut(&mut self, tag: &str) -> Option<&mut Option<String>> {
        let field = match tag {
            FIRST_NAME => &mut self.name,
            TITLE => &mut self.title,
            ORG => &mut self.org,
            HOME_ADDRESS => &mut self.home_address,
            WORK_ADDRESS => &mut self.work_address,
            ADDRESS => &mut self.address,
            HOME_TEL => &mut self.home_tel,
            WORK_TEL => &mut self.work_tel,
            CELL_TEL => &mut self.cell_tel,
            HOME_EMAIL => &mut self.home_email,
            WORK_EMAIL => &mut self.work_email,
            EMAIL => &mut self.email,
            URL => &mut self.url,
            _ => return None,
        };
        Some(field)
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if record.tnf != Tnf::MediaType || record.kind != NdefType::Vcard {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::Vcard,
                found: record.kind,
            });
        }
        Self::from_payload(record.payload())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let text = utf8(payload, "vcard")?;
        let mut lines = text.lines();

        if lines.next() != Some(BEGIN) {
            return Err(NdefError::InvalidField("vcard begin"));
        }

        let mut vcard = Self::default();
        for line in lines {
            if line == END {
                return Ok(vcard);
            }

            let Some((tag, value)) = line.split_once(':') else {
                continue;
            };

            if tag == VERSION {
                vcard.version = value.to_string();
            } else if let Some(field) = vcard.property_mut(tag) {
                *field = Some(value.to_string());
            } else {
                trace!("ignoring vcard property {tag}");
            }
        }

        Err(NdefError::InvalidField("vcard end"))
    }

    pub fn payload_len(&self) -> usize {
        let line = |tag: &str, value: &str| tag.len() + 1 + value.len() + LINE_END.len();

        let properties: usize = self
            .properties()
            .iter()
            .filter_map(|(tag, value)| value.map(|v| line(tag, v)))
            .sum();

        BEGIN.len()
            + LINE_END.len()
            + line(VERSION, &self.version)
            + properties
            + END.len()
            + LINE_END.len()
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(self.payload_len());

        out.push_str(BEGIN);
        out.push_str(LINE_END);
        push_property(&mut out, VERSION, &self.version)?;

        for (tag, value) in self.properties() {
            if let Some(value) = value {
                push_property(&mut out, tag, value)?;
            }
        }

        out.push_str(END);
        out.push_str(LINE_END);
        Ok(out.into_bytes())
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        Ok(Record::new(Tnf::MediaType, VCARD_TYPE, self.to_payload()?))
    }
}

fn push_property(out: &mut String, tag: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(NdefError::InvalidField("vcard property contains a line break"));
    }

    out.push_str(tag);
    out.push(':');
    out.push_str(value);
    out.push_str(LINE_END);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::record::identify_buffer;

    fn sample() -> Vcard {
        Vcard {
            title: Some("Engineer".into()),
            org: Some("STMicroelectronics".into()),
            work_address: Some(";;39 chemin du champ des filles;Geneva;;1228;CH".into()),
            cell_tel: Some("+41 22 929 29 29".into()),
            work_email: Some("jane@st.com".into()),
            url: Some("https://www.st.com".into()),
            ..Vcard::new("Jane Doe")
        }
    }

    #[test]
    fn round_trip() {
        let vcard = sample();
        let record = vcard.to_record().unwrap();
        assert_eq!(record.payload().len(), vcard.payload_len());

        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        let record = identify_buffer(&out).unwrap();

        assert_eq!(record.kind, NdefType::Vcard);
        assert_eq!(Vcard::from_record(&record).unwrap(), vcard);
    }

    #[test]
    fn payload_layout() {
        let payload = Vcard::new("Jo").to_payload().unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            "BEGIN:VCARD\r\nVERSION:2.1\r\nFN:Jo\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn x_vcard_type_and_unknown_properties() {
        let payload =
            b"BEGIN:VCARD\nVERSION:3.0\nN:Doe;Jane\nFN:Jane Doe\nTEL;HOME:123\nEND:VCARD\n";
        let record = Record::new(Tnf::MediaType, b"text/x-vCard".to_vec(), payload.to_vec());

        let vcard = Vcard::from_record(&record).unwrap();
        assert_eq!(vcard.version, "3.0");
        assert_eq!(vcard.name.as_deref(), Some("Jane Doe"));
        assert_eq!(vcard.home_tel.as_deref(), Some("123"));
        assert_eq!(vcard.cell_tel, None);
    }

    #[test]
    fn trailing_spaces_are_kept() {
        let vcard = Vcard {
            org: Some("ST ".into()),
            ..Vcard::new("Jo  ")
        };
        let payload = vcard.to_payload().unwrap();
        assert_eq!(Vcard::from_payload(&payload).unwrap(), vcard);
    }

    #[test]
    fn unterminated_vcard() {
        let err = Vcard::from_payload(b"BEGIN:VCARD\r\nFN:x\r\n").unwrap_err();
        assert_eq!(err, NdefError::InvalidField("vcard end"));
    }

    #[test]
    fn line_break_in_value_is_rejected() {
        let vcard = Vcard {
            org: Some("a\r\nb".into()),
            ..Vcard::new("x")
        };
        assert!(vcard.to_payload().is_err());
    }
}
