// src/records/geo.rs
use serde::{Deserialize, Serialize};

use crate::error::{NdefError, Result};
use crate::ndef_type::NdefType;
use crate::record::Record;
use crate::records::Uri;
use crate::records::smart_poster::{uri_and_information, uri_or_smart_poster};

pub const GEO_SCHEME: &str = "geo:";

/// `geo:<latitude>,<longitude>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geo {
    pub latitude: String,
    pub longitude: String,
    pub information: Option<String>,
}

impl Geo {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
            information: None,
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        let (uri, information) = uri_and_information(record)?;

        let full = uri.full();
        let Some(rest) = full.strip_prefix(GEO_SCHEME) else {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::UriGeo,
                found: record.kind,
            });
        };

        let (latitude, longitude) = rest
            .split_once(',')
            .ok_or(NdefError::InvalidField("geo coordinates"))?;

        Ok(Self {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            information,
        })
    }

    pub fn to_uri(&self) -> Uri {
        Uri::new(
            0x00,
            format!("{GEO_SCHEME}{},{}", self.latitude, self.longitude),
        )
    }

    pub fn payload_len(&self) -> usize {
        1 + GEO_SCHEME.len() + self.latitude.len() + 1 + self.longitude.len()
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
        for geo in [
            Geo::new("48.8584", "2.2945"),
            Geo {
                information: Some("Eiffel tower".into()),
                ..Geo::new("48.8584", "2.2945")
            },
        ] {
            let mut out = Vec::new();
            geo.to_record().unwrap().write_to(&mut out).unwrap();

            let record = identify_buffer(&out).unwrap();
            assert_eq!(Geo::from_record(&record).unwrap(), geo);
        }
    }

    #[test]
    fn plain_geo_is_classified() {
        let geo = Geo::new("1", "2");
        let record = geo.to_record().unwrap();
        assert_eq!(record.kind, NdefType::UriGeo);
        assert_eq!(record.payload().len(), geo.payload_len());
    }

    #[test]
    fn missing_longitude() {
        let record = Uri::new(0x00, "geo:48.85").to_record();
        assert_eq!(
            Geo::from_record(&record).unwrap_err(),
            NdefError::InvalidField("geo coordinates")
        );
    }
}
