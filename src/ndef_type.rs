// src/ndef_type.rs
use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{NdefError, Result};
use crate::record::Tnf;

pub const SMART_POSTER_TYPE: &[u8] = b"Sp";
pub const URI_TYPE: &[u8] = b"U";
pub const TEXT_TYPE: &[u8] = b"T";
pub const HANDOVER_SELECT_TYPE: &[u8] = b"Hs";
pub const HANDOVER_REQUEST_TYPE: &[u8] = b"Hr";

pub const VCARD_TYPE: &[u8] = b"text/vcard";
pub const XVCARD_TYPE: &[u8] = b"text/x-vCard";
pub const XVCARD_LOWER_TYPE: &[u8] = b"text/x-vcard";

pub const BLUETOOTH_BR_EDR_TYPE: &[u8] = b"application/vnd.bluetooth.ep.oob";
pub const BLUETOOTH_LE_TYPE: &[u8] = b"application/vnd.bluetooth.le.oob";
pub const WIFI_TOKEN_TYPE: &[u8] = b"application/vnd.wfa.wsc";

pub const MYAPP_TYPE: &[u8] = b"st.com:m24sr_discovery_democtrl";
pub const ANDROID_APP_TYPE: &[u8] = b"android.com:pkg";

/// Highest URI identifier code with a defined abridgement
pub const URI_ID_MAX: u8 = 0x23;
pub const URI_ID_EMAIL: u8 = 0x06;

/// Semantic kind of a record, decided from its TNF, type and (for URIs) payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NdefType {
    Unknown,
    Vcard,
    WellKnownAbridgedUri,
    UriSms,
    UriGeo,
    UriEmail,
    SmartPoster,
    /// Never produced by the classifier, http codes are abridged URIs
    Url,
    Text,
    Handover,
    MyApp,
    BluetoothBrEdr,
    BluetoothLe,
    WifiToken,
    AndroidApp,
}

lazy_static! {
    static ref REGISTRY: HashMap<Tnf, HashMap<&'static [u8], NdefType>> = {
        let mut well_known = HashMap::new();
        well_known.insert(SMART_POSTER_TYPE, NdefType::SmartPoster);
        well_known.insert(TEXT_TYPE, NdefType::Text);
        well_known.insert(HANDOVER_SELECT_TYPE, NdefType::Handover);
        well_known.insert(HANDOVER_REQUEST_TYPE, NdefType::Handover);

        let mut media = HashMap::new();
        media.insert(VCARD_TYPE, NdefType::Vcard);
        media.insert(XVCARD_TYPE, NdefType::Vcard);
        media.insert(XVCARD_LOWER_TYPE, NdefType::Vcard);
        media.insert(BLUETOOTH_BR_EDR_TYPE, NdefType::BluetoothBrEdr);
        media.insert(BLUETOOTH_LE_TYPE, NdefType::BluetoothLe);
        media.insert(WIFI_TOKEN_TYPE, NdefType::WifiToken);

        let mut external = HashMap::new();
        external.insert(MYAPP_TYPE, NdefType::MyApp);
        external.insert(ANDROID_APP_TYPE, NdefType::AndroidApp);

        let mut registry = HashMap::new();
        registry.insert(Tnf::WellKnown, well_known);
        registry.insert(Tnf::MediaType, media);
        registry.insert(Tnf::External, external);
        registry
    };
}

/// Decide the kind of a record.
///
/// Fails only when the TNF itself cannot be interpreted, an unrecognised type
/// under a supported TNF is [`NdefType::Unknown`].
pub fn classify(tnf: Tnf, type_: &[u8], payload: &[u8]) -> Result<NdefType> {
    let Some(types) = REGISTRY.get(&tnf) else {
        return Err(NdefError::UnsupportedTnf(tnf));
    };

    if tnf == Tnf::WellKnown && type_ == URI_TYPE {
        return Ok(classify_uri(payload));
    }

    Ok(types.get(type_).copied().unwrap_or(NdefType::Unknown))
}

/// URI records are split by their identifier code, literal URIs by scheme
pub fn classify_uri(payload: &[u8]) -> NdefType {
    match payload.first().copied() {
        Some(0x00) => {
            let uri = &payload[1..];
            if uri.starts_with(b"sms:") {
                NdefType::UriSms
            } else if uri.starts_with(b"geo:") {
                NdefType::UriGeo
            } else {
                NdefType::Unknown
            }
        }
        Some(URI_ID_EMAIL) => NdefType::UriEmail,
        Some(code) if code <= URI_ID_MAX => NdefType::WellKnownAbridgedUri,
        _ => NdefType::Unknown,
    }
}
