use nfc_ndef::records::bluetooth::{BluetoothTransport, LocalName};
use nfc_ndef::records::smart_poster::SmartPosterAction;
use nfc_ndef::records::{
    BluetoothOob, CarrierPowerState, Email, Handover, SmartPoster, Text, Uri, WifiToken,
};
use nfc_ndef::tag::CcFile;
use nfc_ndef::{
    DecodedRecord, MemoryTag, Ndef, NdefError, NdefType, Protocol, RecordFlags, TagAdapter,
};
use pretty_assertions::assert_eq;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn formatted(size: usize, protocol: Protocol) -> Ndef<MemoryTag> {
    init_logger();
    let mut ndef = Ndef::new(MemoryTag::new(size), protocol);
    ndef.adapter_mut().format().unwrap();
    ndef
}

#[test]
fn hello_text_on_type4() {
    let mut ndef = formatted(64, Protocol::Type4A);
    ndef.write_record(&Text::new("en", "Hello").to_record().unwrap())
        .unwrap();

    assert_eq!(
        &ndef.adapter().memory().as_bytes()[..14],
        &[
            0x00, 0x0C, // NLEN
            0xD1, 0x01, 0x08, b'T', 0x02, b'e', b'n', b'H', b'e', b'l', b'l', b'o',
        ]
    );

    let records = ndef.read_message().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, NdefType::Text);

    let text = Text::from_record(&records[0]).unwrap();
    assert_eq!(text, Text::new("en", "Hello"));
}

#[test]
fn appends_keep_call_order() {
    let mut ndef = formatted(256, Protocol::Type5);

    for body in ["first", "second", "third"] {
        ndef.append_record(&Text::new("en", body).to_record().unwrap())
            .unwrap();
    }

    let records = ndef.read_message().unwrap();
    let flags: Vec<(bool, bool)> = records
        .iter()
        .map(|r| (r.message_begin(), r.message_end()))
        .collect();
    assert_eq!(flags, vec![(true, false), (false, false), (false, true)]);

    let bodies: Vec<String> = records
        .iter()
        .map(|r| Text::from_record(r).unwrap().text)
        .collect();
    assert_eq!(bodies, vec!["first", "second", "third"]);
}

#[test]
fn append_on_type2_and_type3() {
    for protocol in [Protocol::Type2, Protocol::Type3] {
        let mut ndef = formatted(256, protocol);
        ndef.append_record(&Uri::from_full("https://www.st.com").to_record())
            .unwrap();
        ndef.append_record(&Text::new("fr", "bonjour").to_record().unwrap())
            .unwrap();

        assert_eq!(
            ndef.read_decoded().unwrap(),
            vec![
                DecodedRecord::Uri(Uri::new(0x02, "st.com")),
                DecodedRecord::Text(Text::new("fr", "bonjour")),
            ],
            "{protocol:?}"
        );
    }
}

#[test]
fn handover_carriers_resolve_by_id() {
    let mut ndef = formatted(512, Protocol::Type5);

    let bluetooth = BluetoothOob {
        local_name: Some(LocalName::Complete("headset".into())),
        class_of_device: Some(0x24_0404),
        ..BluetoothOob::new(BluetoothTransport::BrEdr, [0x00, 0x0D, 0x18, 0xA1, 0xB2, 0xC3])
    };
    let wifi = WifiToken::new("ST-guest", "passphrase");

    ndef.write_handover(
        Handover::select(),
        vec![
            (CarrierPowerState::Active, bluetooth.to_record().unwrap()),
            (CarrierPowerState::Inactive, wifi.to_record().unwrap()),
        ],
    )
    .unwrap();

    let records = ndef.read_message().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].kind, NdefType::Handover);

    let handover = Handover::from_record(&records[0]).unwrap();
    let first = handover.read_ac(0, &records).unwrap();
    let second = handover.read_ac(1, &records).unwrap();

    assert_eq!(BluetoothOob::from_record(first).unwrap(), bluetooth);
    assert_eq!(WifiToken::from_record(second).unwrap(), wifi);
}

#[test]
fn smart_poster_with_four_nested_records() {
    let mut ndef = formatted(256, Protocol::Type2);
    let poster = SmartPoster {
        uri: Uri::from_full("https://www.st.com/nfc"),
        title: Some(Text::new("en", "ST NFC")),
        action: Some(SmartPosterAction::Execute),
        size: Some(2048),
        mime_type: None,
    };

    ndef.write_record(&poster.to_record().unwrap()).unwrap();

    let records = ndef.read_message().unwrap();
    assert_eq!(records[0].kind, NdefType::SmartPoster);
    assert_eq!(records[0].nb_of_records_in_sp_payload(), 4);
    assert_eq!(SmartPoster::from_record(&records[0]).unwrap(), poster);
}

#[test]
fn email_with_information_on_type1() {
    let mut ndef = formatted(128, Protocol::Type1);
    let email = Email {
        information: Some("Support".into()),
        ..Email::new("nfc@st.com", "Hi", "Yo")
    };

    ndef.write_record(&email.to_record().unwrap()).unwrap();

    let records = ndef.read_message().unwrap();
    assert_eq!(records[0].kind, NdefType::SmartPoster);
    assert_eq!(Email::from_record(&records[0]).unwrap(), email);
}

#[test]
fn type5_cc_round_trip() {
    for (size, extended) in [(64, false), (4096, true)] {
        let mut adapter = TagAdapter::new(MemoryTag::new(size), Protocol::Type5);
        let cc = CcFile::new(size - 8);
        assert_eq!(cc.is_extended(), extended);

        adapter.write_cc_file(&cc).unwrap();
        assert_eq!(adapter.read_cc_file().unwrap(), cc);
    }
}

#[test]
fn unformatted_type5_tag() {
    let mut ndef = Ndef::new(MemoryTag::new(64), Protocol::Type5);
    assert_eq!(ndef.read_message().unwrap_err(), NdefError::NotFormatted);
}

#[test]
fn message_without_end_is_reported() {
    let mut ndef = formatted(128, Protocol::Type4B);

    let mut raw = Vec::new();
    Text::new("en", "dangling")
        .to_record()
        .unwrap()
        .write_to(&mut raw)
        .unwrap();
    assert_eq!(raw[0] & RecordFlags::MESSAGE_END.bits(), 0);
    ndef.adapter_mut().write_ndef(&raw).unwrap();

    assert_eq!(ndef.read_message().unwrap_err(), NdefError::CorruptMessage);
}

#[test]
fn unsupported_protocol_identifier() {
    let mut adapter = TagAdapter::new(MemoryTag::new(16), Protocol::Type4A);
    assert_eq!(
        adapter.select_protocol(0x07).unwrap_err(),
        NdefError::UnsupportedProtocol(0x07)
    );
    adapter.select_protocol(0x06).unwrap();
    assert_eq!(adapter.protocol(), Protocol::Type5);
}
