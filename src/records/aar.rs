// src/records/aar.rs
//! Android Application Record, an external record naming the package that
//! should handle the message.

use serde::{Deserialize, Serialize};

use crate::bytes::utf8;
use crate::error::{NdefError, Result};
use crate::ndef_type::{ANDROID_APP_TYPE, NdefType};
use crate::record::{Record, Tnf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidApp {
    pub package: String,
}

impl AndroidApp {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        if !record.is_type(Tnf::External, ANDROID_APP_TYPE) {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::AndroidApp,
                found: record.kind,
            });
        }
        Ok(Self::new(utf8(record.payload(), "package")?))
    }

    pub fn payload_len(&self) -> usize {
        self.package.len()
    }

    pub fn to_record(&self) -> Record<'static> {
        Record::new(Tnf::External, ANDROID_APP_TYPE, self.package.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn android_package() {
        let aar = AndroidApp::new("com.st.demo");
        let record = aar.to_record();

        assert_eq!(record.kind, NdefType::AndroidApp);
        assert_eq!(record.payload(), b"com.st.demo");
        assert_eq!(AndroidApp::from_record(&record).unwrap(), aar);
    }

    #[test]
    fn rejects_other_external_types() {
        let record = Record::new(Tnf::External, b"example.com:x".to_vec(), b"a".to_vec());
        assert!(AndroidApp::from_record(&record).is_err());
    }
}
