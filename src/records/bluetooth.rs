// src/records/bluetooth.rs
//! Bluetooth out-of-band pairing data (`application/vnd.bluetooth.ep.oob` and
//! `application/vnd.bluetooth.le.oob`).
//!
//! BR/EDR payloads start with a little-endian OOB length and the device
//! address. LE payloads carry the address and role as EIR elements instead.
//! Everything after that is a list of Extended Inquiry Response elements:
//!
//! ```text
//! | LENGTH (type + data) | EIR TYPE | DATA ... |
//! ```
//!
//! Multi-byte EIR values are little-endian on the wire. Addresses and 128 bit
//! values are kept most-significant byte first in this module.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, copy_reversed, reversed, utf8};
use crate::error::{NdefError, Result};
use crate::ndef_type::{BLUETOOTH_BR_EDR_TYPE, BLUETOOTH_LE_TYPE, NdefType};
use crate::record::{Record, Tnf};

pub const EIR_FLAGS: u8 = 0x01;
pub const EIR_SERVICE_CLASS_UUID_16_PARTIAL: u8 = 0x02;
pub const EIR_SERVICE_CLASS_UUID_16_COMPLETE: u8 = 0x03;
pub const EIR_SERVICE_CLASS_UUID_32_PARTIAL: u8 = 0x04;
pub const EIR_SERVICE_CLASS_UUID_32_COMPLETE: u8 = 0x05;
pub const EIR_SERVICE_CLASS_UUID_128_PARTIAL: u8 = 0x06;
pub const EIR_SERVICE_CLASS_UUID_128_COMPLETE: u8 = 0x07;
pub const EIR_SHORT_LOCAL_NAME: u8 = 0x08;
pub const EIR_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const EIR_CLASS_OF_DEVICE: u8 = 0x0D;
pub const EIR_SIMPLE_PAIRING_HASH: u8 = 0x0E;
pub const EIR_SIMPLE_PAIRING_RANDOMIZER: u8 = 0x0F;
pub const EIR_SECURITY_MANAGER_TK_VALUE: u8 = 0x10;
pub const EIR_SECURITY_MANAGER_FLAGS: u8 = 0x11;
pub const EIR_SLAVE_CONNECTION_INTERVAL_RANGE: u8 = 0x12;
pub const EIR_APPEARANCE: u8 = 0x19;
pub const EIR_LE_DEVICE_ADDRESS: u8 = 0x1B;
pub const EIR_LE_ROLE: u8 = 0x1C;
pub const EIR_LE_SC_CONFIRMATION_VALUE: u8 = 0x22;
pub const EIR_LE_SC_RANDOM_VALUE: u8 = 0x23;

pub const DEVICE_ADDRESS_LEN: usize = 6;

/// OOB length + device address
const BR_EDR_PREFIX_LEN: usize = 2 + DEVICE_ADDRESS_LEN;

/// EIR types below this value are tracked in [`BluetoothOob::optional_mask`]
const OPTIONAL_MASK_LIMIT: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeAddressType {
    Public,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeRole {
    PeripheralOnly,
    CentralOnly,
    PeripheralPreferred,
    CentralPreferred,
}

impl LeRole {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Self::PeripheralOnly),
            0x01 => Ok(Self::CentralOnly),
            0x02 => Ok(Self::PeripheralPreferred),
            0x03 => Ok(Self::CentralPreferred),
            _ => Err(NdefError::InvalidField("LE role")),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::PeripheralOnly => 0x00,
            Self::CentralOnly => 0x01,
            Self::PeripheralPreferred => 0x02,
            Self::CentralPreferred => 0x03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BluetoothTransport {
    BrEdr,
    Le {
        address_type: LeAddressType,
        role: LeRole,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UuidList<T> {
    pub complete: bool,
    pub uuids: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalName {
    Shortened(String),
    Complete(String),
}

/// An EIR element this module does not interpret, kept so it can be re-emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eir {
    pub eir_type: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BluetoothOob {
    pub transport: BluetoothTransport,
    pub device_address: [u8; DEVICE_ADDRESS_LEN],
    pub flags: Option<u8>,
    pub uuids_16: Option<UuidList<u16>>,
    pub uuids_32: Option<UuidList<u32>>,
    pub uuids_128: Option<UuidList<[u8; 16]>>,
    pub local_name: Option<LocalName>,
    /// 24 bit Class of Device
    pub class_of_device: Option<u32>,
    pub simple_pairing_hash: Option<[u8; 16]>,
    pub simple_pairing_randomizer: Option<[u8; 16]>,
    pub security_manager_tk: Option<[u8; 16]>,
    pub security_manager_flags: Option<u8>,
    /// Minimum and maximum connection interval
    pub slave_connection_interval: Option<(u16, u16)>,
    pub appearance: Option<u16>,
    pub sc_confirmation: Option<[u8; 16]>,
    pub sc_random: Option<[u8; 16]>,
    pub unknown_eirs: Vec<Eir>,
}

impl BluetoothOob {
    pub fn new(transport: BluetoothTransport, device_address: [u8; DEVICE_ADDRESS_LEN]) -> Self {
        Self {
            transport,
            device_address,
            flags: None,
            uuids_16: None,
            uuids_32: None,
            uuids_128: None,
            local_name: None,
            class_of_device: None,
            simple_pairing_hash: None,
            simple_pairing_randomizer: None,
            security_manager_tk: None,
            security_manager_flags: None,
            slave_connection_interval: None,
            appearance: None,
            sc_confirmation: None,
            sc_random: None,
            unknown_eirs: Vec::new(),
        }
    }

    pub fn is_le(&self) -> bool {
        matches!(self.transport, BluetoothTransport::Le { .. })
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        match record.kind {
            NdefType::BluetoothBrEdr => Self::from_br_edr_payload(record.payload()),
            NdefType::BluetoothLe => Self::from_le_payload(record.payload()),
            found => Err(NdefError::WrongRecordKind {
                expected: NdefType::BluetoothBrEdr,
                found,
            }),
        }
    }

    pub fn from_br_edr_payload(payload: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(payload);
        let oob_length = reader.le_u16()? as usize;

        let mut device_address = [0u8; DEVICE_ADDRESS_LEN];
        copy_reversed(&mut device_address, reader.take(DEVICE_ADDRESS_LEN)?);

        let end = oob_length.clamp(BR_EDR_PREFIX_LEN, payload.len());
        let mut oob = Self::new(BluetoothTransport::BrEdr, device_address);
        oob.decode_eirs(&payload[BR_EDR_PREFIX_LEN..end], None)?;
        Ok(oob)
    }

    pub fn from_le_payload(payload: &[u8]) -> Result<Self> {
        let mut le = LeFields::default();
        let mut oob = Self::new(BluetoothTransport::BrEdr, [0; DEVICE_ADDRESS_LEN]);
        oob.decode_eirs(payload, Some(&mut le))?;

        let (address, address_type) = le
            .address
            .ok_or_else(|| NdefError::NotFound("LE device address EIR".into()))?;
        let role = le
            .role
            .ok_or_else(|| NdefError::NotFound("LE role EIR".into()))?;

        oob.device_address = address;
        oob.transport = BluetoothTransport::Le { address_type, role };
        Ok(oob)
    }

    fn decode_eirs(&mut self, eirs: &[u8], mut le: Option<&mut LeFields>) -> Result<()> {
        let mut reader = ByteReader::new(eirs);

        while !reader.is_empty() {
            let length = reader.u8()? as usize;
            if length == 0 {
                // zero padding up to the end of the OOB data
                break;
            }

            let eir_type = reader.u8()?;
            let data = reader.take(length - 1)?;
            trace!("EIR {eir_type:#04x}: {}", hex::encode(data));

            match eir_type {
                EIR_FLAGS => self.flags = Some(fixed::<1>(data, "flags")?[0]),
                EIR_SERVICE_CLASS_UUID_16_PARTIAL | EIR_SERVICE_CLASS_UUID_16_COMPLETE => {
                    self.uuids_16 = Some(UuidList {
                        complete: eir_type == EIR_SERVICE_CLASS_UUID_16_COMPLETE,
                        uuids: chunks::<2>(data, "16 bit UUID list")?
                            .map(u16::from_le_bytes)
                            .collect(),
                    });
                }
                EIR_SERVICE_CLASS_UUID_32_PARTIAL | EIR_SERVICE_CLASS_UUID_32_COMPLETE => {
                    self.uuids_32 = Some(UuidList {
                        complete: eir_type == EIR_SERVICE_CLASS_UUID_32_COMPLETE,
                        uuids: chunks::<4>(data, "32 bit UUID list")?
                            .map(u32::from_le_bytes)
                            .collect(),
                    });
                }
                EIR_SERVICE_CLASS_UUID_128_PARTIAL | EIR_SERVICE_CLASS_UUID_128_COMPLETE => {
                    self.uuids_128 = Some(UuidList {
                        complete: eir_type == EIR_SERVICE_CLASS_UUID_128_COMPLETE,
                        uuids: chunks::<16>(data, "128 bit UUID list")?
                            .map(|uuid| swap(&uuid))
                            .collect(),
                    });
                }
                EIR_SHORT_LOCAL_NAME => {
                    self.local_name = Some(LocalName::Shortened(utf8(data, "local name")?))
                }
                EIR_COMPLETE_LOCAL_NAME => {
                    self.local_name = Some(LocalName::Complete(utf8(data, "local name")?))
                }
                EIR_CLASS_OF_DEVICE => {
                    let [b0, b1, b2] = fixed::<3>(data, "class of device")?;
                    self.class_of_device = Some(u32::from_le_bytes([b0, b1, b2, 0]));
                }
                EIR_SIMPLE_PAIRING_HASH => {
                    self.simple_pairing_hash = Some(swap(&fixed(data, "simple pairing hash")?))
                }
                EIR_SIMPLE_PAIRING_RANDOMIZER => {
                    self.simple_pairing_randomizer =
                        Some(swap(&fixed(data, "simple pairing randomizer")?))
                }
                EIR_SECURITY_MANAGER_TK_VALUE => {
                    self.security_manager_tk = Some(swap(&fixed(data, "security manager TK")?))
                }
                EIR_SECURITY_MANAGER_FLAGS => {
                    let [flags] = fixed::<1>(data, "security manager flags")?;
                    self.security_manager_flags = Some(flags);
                }
                EIR_SLAVE_CONNECTION_INTERVAL_RANGE => {
                    let [a, b, c, d] = fixed::<4>(data, "connection interval")?;
                    self.slave_connection_interval =
                        Some((u16::from_le_bytes([a, b]), u16::from_le_bytes([c, d])));
                }
                EIR_APPEARANCE => {
                    self.appearance = Some(u16::from_le_bytes(fixed(data, "appearance")?))
                }
                EIR_LE_SC_CONFIRMATION_VALUE => {
                    self.sc_confirmation = Some(swap(&fixed(data, "LE SC confirmation")?))
                }
                EIR_LE_SC_RANDOM_VALUE => {
                    self.sc_random = Some(swap(&fixed(data, "LE SC random")?))
                }
                EIR_LE_DEVICE_ADDRESS if le.is_some() => {
                    let raw = fixed::<7>(data, "LE device address")?;
                    let mut address = [0u8; DEVICE_ADDRESS_LEN];
                    copy_reversed(&mut address, &raw[..DEVICE_ADDRESS_LEN]);

                    let address_type = if raw[DEVICE_ADDRESS_LEN] & 0x01 == 0 {
                        LeAddressType::Public
                    } else {
                        LeAddressType::Random
                    };
                    if let Some(le) = le.as_deref_mut() {
                        le.address = Some((address, address_type));
                    }
                }
                EIR_LE_ROLE if le.is_some() => {
                    let role = LeRole::from_byte(fixed::<1>(data, "LE role")?[0])?;
                    if let Some(le) = le.as_deref_mut() {
                        le.role = Some(role);
                    }
                }
                _ => self.unknown_eirs.push(Eir {
                    eir_type,
                    data: data.to_vec(),
                }),
            }
        }

        Ok(())
    }

    /// Every EIR element to emit, in ascending type order, unknown ones last
    fn eirs(&self) -> Vec<Eir> {
        let mut eirs = Vec::new();
        let mut push = |eir_type: u8, data: Vec<u8>| eirs.push(Eir { eir_type, data });

        if let Some(flags) = self.flags {
            push(EIR_FLAGS, vec![flags]);
        }
        if let Some(list) = &self.uuids_16 {
            let eir_type = if list.complete {
                EIR_SERVICE_CLASS_UUID_16_COMPLETE
            } else {
                EIR_SERVICE_CLASS_UUID_16_PARTIAL
            };
            push(eir_type, list.uuids.iter().flat_map(|u| u.to_le_bytes()).collect());
        }
        if let Some(list) = &self.uuids_32 {
            let eir_type = if list.complete {
                EIR_SERVICE_CLASS_UUID_32_COMPLETE
            } else {
                EIR_SERVICE_CLASS_UUID_32_PARTIAL
            };
            push(eir_type, list.uuids.iter().flat_map(|u| u.to_le_bytes()).collect());
        }
        if let Some(list) = &self.uuids_128 {
            let eir_type = if list.complete {
                EIR_SERVICE_CLASS_UUID_128_COMPLETE
            } else {
                EIR_SERVICE_CLASS_UUID_128_PARTIAL
            };
            push(eir_type, list.uuids.iter().flat_map(|u| reversed(u)).collect());
        }
        match &self.local_name {
            Some(LocalName::Shortened(name)) => {
                push(EIR_SHORT_LOCAL_NAME, name.as_bytes().to_vec())
            }
            Some(LocalName::Complete(name)) => {
                push(EIR_COMPLETE_LOCAL_NAME, name.as_bytes().to_vec())
            }
            None => {}
        }
        if let Some(class) = self.class_of_device {
            push(EIR_CLASS_OF_DEVICE, class.to_le_bytes()[..3].to_vec());
        }
        if let Some(hash) = &self.simple_pairing_hash {
            push(EIR_SIMPLE_PAIRING_HASH, reversed(hash));
        }
        if let Some(randomizer) = &self.simple_pairing_randomizer {
            push(EIR_SIMPLE_PAIRING_RANDOMIZER, reversed(randomizer));
        }
        if let Some(tk) = &self.security_manager_tk {
            push(EIR_SECURITY_MANAGER_TK_VALUE, reversed(tk));
        }
        if let Some(flags) = self.security_manager_flags {
            push(EIR_SECURITY_MANAGER_FLAGS, vec![flags]);
        }
        if let Some((min, max)) = self.slave_connection_interval {
            let mut data = min.to_le_bytes().to_vec();
            data.extend_from_slice(&max.to_le_bytes());
            push(EIR_SLAVE_CONNECTION_INTERVAL_RANGE, data);
        }
        if let Some(appearance) = self.appearance {
            push(EIR_APPEARANCE, appearance.to_le_bytes().to_vec());
        }
        if let BluetoothTransport::Le { address_type, role } = self.transport {
            let mut data = reversed(&self.device_address);
            data.push(match address_type {
                LeAddressType::Public => 0x00,
                LeAddressType::Random => 0x01,
            });
            push(EIR_LE_DEVICE_ADDRESS, data);
            push(EIR_LE_ROLE, vec![role.to_byte()]);
        }
        if let Some(confirmation) = &self.sc_confirmation {
            push(EIR_LE_SC_CONFIRMATION_VALUE, reversed(confirmation));
        }
        if let Some(random) = &self.sc_random {
            push(EIR_LE_SC_RANDOM_VALUE, reversed(random));
        }

        eirs.extend(self.unknown_eirs.iter().cloned());
        eirs
    }

    /// One bit per EIR type below 0x20 that the encoder will emit
    pub fn optional_mask(&self) -> u32 {
        self.eirs()
            .iter()
            .filter(|eir| eir.eir_type < OPTIONAL_MASK_LIMIT)
            .fold(0, |mask, eir| mask | 1 << eir.eir_type)
    }

    pub fn payload_len(&self) -> usize {
        let prefix = if self.is_le() { 0 } else { BR_EDR_PREFIX_LEN };
        prefix + self.eirs().iter().map(|eir| 2 + eir.data.len()).sum::<usize>()
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let eirs = self.eirs();
        let mut payload = Vec::with_capacity(self.payload_len());

        if !self.is_le() {
            let oob_length = self.payload_len();
            if oob_length > u16::MAX as usize {
                return Err(NdefError::FieldTooLong {
                    field: "OOB data",
                    len: oob_length,
                    max: u16::MAX as usize,
                });
            }
            payload.extend_from_slice(&(oob_length as u16).to_le_bytes());
            payload.extend(reversed(&self.device_address));
        }

        for eir in eirs {
            // the length byte covers the type byte too
            if eir.data.len() + 1 > u8::MAX as usize {
                return Err(NdefError::FieldTooLong {
                    field: "EIR data",
                    len: eir.data.len(),
                    max: u8::MAX as usize - 1,
                });
            }
            payload.push(eir.data.len() as u8 + 1);
            payload.push(eir.eir_type);
            payload.extend_from_slice(&eir.data);
        }

        Ok(payload)
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        let type_ = if self.is_le() {
            BLUETOOTH_LE_TYPE
        } else {
            BLUETOOTH_BR_EDR_TYPE
        };
        Ok(Record::new(Tnf::MediaType, type_, self.to_payload()?))
    }
}

#[derive(Default)]
struct LeFields {
    address: Option<([u8; DEVICE_ADDRESS_LEN], LeAddressType)>,
    role: Option<LeRole>,
}

fn fixed<const N: usize>(data: &[u8], field: &'static str) -> Result<[u8; N]> {
    data.try_into().map_err(|_| NdefError::InvalidField(field))
}

fn swap<const N: usize>(wire: &[u8; N]) -> [u8; N] {
    let mut out = [0u8; N];
    copy_reversed(&mut out, wire);
    out
}

fn chunks<'a, const N: usize>(
    data: &'a [u8],
    field: &'static str,
) -> Result<impl Iterator<Item = [u8; N]> + 'a> {
    if data.len() % N != 0 {
        return Err(NdefError::InvalidField(field));
    }
    Ok(data.chunks_exact(N).filter_map(|chunk| chunk.try_into().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::record::identify_buffer;

    const ADDRESS: [u8; 6] = [0x00, 0x1B, 0xDC, 0x07, 0x32, 0x7F];

    fn reparse(oob: &BluetoothOob) -> BluetoothOob {
        let mut out = Vec::new();
        oob.to_record().unwrap().write_to(&mut out).unwrap();
        BluetoothOob::from_record(&identify_buffer(&out).unwrap()).unwrap()
    }

    #[test]
    fn br_edr_round_trip() {
        let oob = BluetoothOob {
            uuids_16: Some(UuidList {
                complete: true,
                uuids: vec![0x110B, 0x110E],
            }),
            local_name: Some(LocalName::Complete("ST speaker".into())),
            class_of_device: Some(0x24_0414),
            simple_pairing_hash: Some([0x11; 16]),
            simple_pairing_randomizer: Some([0x22; 16]),
            ..BluetoothOob::new(BluetoothTransport::BrEdr, ADDRESS)
        };

        assert_eq!(reparse(&oob), oob);
    }

    #[test]
    fn br_edr_wire_layout() {
        let mut oob = BluetoothOob::new(BluetoothTransport::BrEdr, ADDRESS);
        oob.class_of_device = Some(0x0C_025A);

        let payload = oob.to_payload().unwrap();
        assert_eq!(payload.len(), oob.payload_len());
        assert_eq!(&payload[..2], &(payload.len() as u16).to_le_bytes());
        assert_eq!(&payload[2..8], &[0x7F, 0x32, 0x07, 0xDC, 0x1B, 0x00]);
        assert_eq!(&payload[8..], &[0x04, EIR_CLASS_OF_DEVICE, 0x5A, 0x02, 0x0C]);
    }

    #[test]
    fn le_round_trip() {
        let mut uuid = [0u8; 16];
        uuid[15] = 0x01;

        let oob = BluetoothOob {
            flags: Some(0x06),
            uuids_128: Some(UuidList {
                complete: false,
                uuids: vec![uuid],
            }),
            local_name: Some(LocalName::Shortened("ST".into())),
            security_manager_tk: Some([0x33; 16]),
            security_manager_flags: Some(0x01),
            slave_connection_interval: Some((0x0006, 0x0C80)),
            appearance: Some(0x03C1),
            sc_confirmation: Some([0x44; 16]),
            sc_random: Some([0x55; 16]),
            ..BluetoothOob::new(
                BluetoothTransport::Le {
                    address_type: LeAddressType::Random,
                    role: LeRole::PeripheralPreferred,
                },
                ADDRESS,
            )
        };

        let record = oob.to_record().unwrap();
        assert_eq!(record.kind, NdefType::BluetoothLe);
        assert_eq!(reparse(&oob), oob);
    }

    #[test]
    fn le_address_is_an_eir() {
        let oob = BluetoothOob::new(
            BluetoothTransport::Le {
                address_type: LeAddressType::Public,
                role: LeRole::CentralOnly,
            },
            ADDRESS,
        );
        let payload = oob.to_payload().unwrap();
        assert_eq!(
            payload,
            vec![
                0x08, EIR_LE_DEVICE_ADDRESS, 0x7F, 0x32, 0x07, 0xDC, 0x1B, 0x00, 0x00, //
                0x02, EIR_LE_ROLE, 0x01,
            ]
        );
    }

    #[test]
    fn le_without_role_is_rejected() {
        let payload = [0x08, EIR_LE_DEVICE_ADDRESS, 1, 2, 3, 4, 5, 6, 0x00];
        assert!(matches!(
            BluetoothOob::from_le_payload(&payload),
            Err(NdefError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_eirs_are_kept() {
        let mut oob = BluetoothOob::new(BluetoothTransport::BrEdr, ADDRESS);
        oob.unknown_eirs.push(Eir {
            eir_type: 0x0A,
            data: vec![0x04],
        });
        oob.appearance = Some(0x0040);

        assert_eq!(reparse(&oob), oob);
        assert_eq!(oob.optional_mask(), 1 << EIR_APPEARANCE | 1 << 0x0A);
    }

    #[test]
    fn malformed_uuid_list() {
        let mut payload = vec![0x00, 0x00];
        payload.extend_from_slice(&ADDRESS);
        payload.extend_from_slice(&[0x04, EIR_SERVICE_CLASS_UUID_16_COMPLETE, 0x01, 0x02, 0x03]);
        payload[0] = payload.len() as u8;

        assert_eq!(
            BluetoothOob::from_br_edr_payload(&payload).unwrap_err(),
            NdefError::InvalidField("16 bit UUID list")
        );
    }
}
