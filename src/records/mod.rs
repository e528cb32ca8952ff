// src/records/mod.rs
//! Typed codecs for each record kind the classifier recognises.

pub mod aar;
pub mod bluetooth;
pub mod email;
pub mod geo;
pub mod handover;
pub mod myapp;
pub mod smart_poster;
pub mod sms;
pub mod text;
pub mod uri;
pub mod vcard;
pub mod wifi;

use serde::Serialize;

pub use aar::AndroidApp;
pub use bluetooth::BluetoothOob;
pub use email::Email;
pub use geo::Geo;
pub use handover::{AlternativeCarrier, CarrierPowerState, Handover};
pub use myapp::MyApp;
pub use smart_poster::SmartPoster;
pub use sms::Sms;
pub use text::{Text, TextEncoding};
pub use uri::Uri;
pub use vcard::Vcard;
pub use wifi::WifiToken;

use crate::error::Result;
use crate::ndef_type::{NdefType, URI_TYPE};
use crate::record::{Record, Tnf};

/// Any record decoded into the codec matching its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record")]
pub enum DecodedRecord {
    Text(Text),
    Uri(Uri),
    Sms(Sms),
    Geo(Geo),
    Email(Email),
    SmartPoster(SmartPoster),
    Vcard(Vcard),
    WifiToken(WifiToken),
    Bluetooth(BluetoothOob),
    Handover(Handover),
    MyApp(MyApp),
    AndroidApp(AndroidApp),
    Unknown {
        tnf: Tnf,
        /// Hex encoded
        record_type: String,
        id: String,
        payload: String,
    },
}

pub fn decode_record(record: &Record<'_>) -> Result<DecodedRecord> {
    let decoded = match record.kind {
        NdefType::Text => DecodedRecord::Text(Text::from_record(record)?),
        NdefType::Url | NdefType::WellKnownAbridgedUri => {
            DecodedRecord::Uri(Uri::from_record(record)?)
        }
        NdefType::UriSms => DecodedRecord::Sms(Sms::from_record(record)?),
        NdefType::UriGeo => DecodedRecord::Geo(Geo::from_record(record)?),
        NdefType::UriEmail => DecodedRecord::Email(Email::from_record(record)?),
        NdefType::SmartPoster => DecodedRecord::SmartPoster(SmartPoster::from_record(record)?),
        NdefType::Vcard => DecodedRecord::Vcard(Vcard::from_record(record)?),
        NdefType::WifiToken => DecodedRecord::WifiToken(WifiToken::from_record(record)?),
        NdefType::BluetoothBrEdr | NdefType::BluetoothLe => {
            DecodedRecord::Bluetooth(BluetoothOob::from_record(record)?)
        }
        NdefType::Handover => DecodedRecord::Handover(Handover::from_record(record)?),
        NdefType::MyApp => DecodedRecord::MyApp(MyApp::from_record(record)?),
        NdefType::AndroidApp => DecodedRecord::AndroidApp(AndroidApp::from_record(record)?),
        // literal URIs other than sms: and geo:
        NdefType::Unknown if record.is_type(Tnf::WellKnown, URI_TYPE) => {
            DecodedRecord::Uri(Uri::from_record(record)?)
        }
        NdefType::Unknown => DecodedRecord::Unknown {
            tnf: record.tnf,
            record_type: hex::encode(&record.type_),
            id: hex::encode(&record.id),
            payload: hex::encode(record.payload()),
        },
    };

    Ok(decoded)
}
