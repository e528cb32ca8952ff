// src/records/handover.rs
//! Connection Handover Select ("Hs") and Request ("Hr") records.
//!
//! The payload is a version byte followed by a nested message: an optional
//! Collision Resolution record and one Alternative Carrier record per offered
//! carrier. Each Alternative Carrier points, by record ID, at a sibling record
//! of the enclosing message holding the carrier configuration.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::bytes::{ByteReader, ensure_len};
use crate::error::{NdefError, Result};
use crate::message::encode_message;
use crate::ndef_type::{HANDOVER_REQUEST_TYPE, HANDOVER_SELECT_TYPE, NdefType};
use crate::record::{Record, Tnf, parse_handover_records};

pub const COLLISION_RESOLUTION_TYPE: &[u8] = b"cr";
pub const ALTERNATIVE_CARRIER_TYPE: &[u8] = b"ac";

/// Connection Handover 1.2
pub const HANDOVER_VERSION: u8 = 0x12;

const POWER_STATE_MASK: u8 = 0b0000_0011;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandoverKind {
    Select,
    Request,
}

impl HandoverKind {
    fn record_type(self) -> &'static [u8] {
        match self {
            Self::Select => HANDOVER_SELECT_TYPE,
            Self::Request => HANDOVER_REQUEST_TYPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarrierPowerState {
    Inactive,
    Active,
    Activating,
    Unknown,
}

impl CarrierPowerState {
    fn from_byte(byte: u8) -> Self {
        match byte & POWER_STATE_MASK {
            0x00 => Self::Inactive,
            0x01 => Self::Active,
            0x02 => Self::Activating,
            _ => Self::Unknown,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Inactive => 0x00,
            Self::Active => 0x01,
            Self::Activating => 0x02,
            Self::Unknown => 0x03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeCarrier {
    pub power_state: CarrierPowerState,
    pub carrier_data_reference: Vec<u8>,
    pub auxiliary_data_references: Vec<Vec<u8>>,
}

impl AlternativeCarrier {
    pub fn new(power_state: CarrierPowerState, carrier_data_reference: impl Into<Vec<u8>>) -> Self {
        Self {
            power_state,
            carrier_data_reference: carrier_data_reference.into(),
            auxiliary_data_references: Vec::new(),
        }
    }

    fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(payload);

        let power_state = CarrierPowerState::from_byte(reader.u8()?);
        let cdr_len = reader.u8()? as usize;
        let carrier_data_reference = reader.take(cdr_len)?.to_vec();

        let aux_count = reader.u8()? as usize;
        let mut auxiliary_data_references = Vec::with_capacity(aux_count);
        for _ in 0..aux_count {
            let len = reader.u8()? as usize;
            auxiliary_data_references.push(reader.take(len)?.to_vec());
        }

        Ok(Self {
            power_state,
            carrier_data_reference,
            auxiliary_data_references,
        })
    }

    fn to_payload(&self) -> Result<Vec<u8>> {
        ensure_len("carrier data reference", self.carrier_data_reference.len(), 0xFF)?;
        ensure_len("auxiliary data references", self.auxiliary_data_references.len(), 0xFF)?;

        let mut payload = vec![
            self.power_state.to_byte(),
            self.carrier_data_reference.len() as u8,
        ];
        payload.extend_from_slice(&self.carrier_data_reference);
        payload.push(self.auxiliary_data_references.len() as u8);

        for aux in &self.auxiliary_data_references {
            ensure_len("auxiliary data reference", aux.len(), 0xFF)?;
            payload.push(aux.len() as u8);
            payload.extend_from_slice(aux);
        }

        Ok(payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handover {
    pub kind: HandoverKind,
    pub version: u8,
    /// Random number, mandatory in a Handover Request
    pub collision_resolution: Option<u16>,
    pub alternative_carriers: Vec<AlternativeCarrier>,
}

impl Handover {
    pub fn select() -> Self {
        Self {
            kind: HandoverKind::Select,
            version: HANDOVER_VERSION,
            collision_resolution: None,
            alternative_carriers: Vec::new(),
        }
    }

    pub fn request(random_number: u16) -> Self {
        Self {
            kind: HandoverKind::Request,
            collision_resolution: Some(random_number),
            ..Self::select()
        }
    }

    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        let kind = if record.is_type(Tnf::WellKnown, HANDOVER_SELECT_TYPE) {
            HandoverKind::Select
        } else if record.is_type(Tnf::WellKnown, HANDOVER_REQUEST_TYPE) {
            HandoverKind::Request
        } else {
            return Err(NdefError::WrongRecordKind {
                expected: NdefType::Handover,
                found: record.kind,
            });
        };

        let version = ByteReader::new(record.payload()).u8()?;
        let mut handover = Self {
            kind,
            version,
            collision_resolution: None,
            alternative_carriers: Vec::new(),
        };

        let parsed;
        let nested = if record.nested.is_empty() {
            parsed = parse_handover_records(record.payload())?;
            &parsed
        } else {
            &record.nested
        };

        for nested in nested.iter().filter(|r| r.tnf == Tnf::WellKnown) {
            match nested.type_.as_slice() {
                COLLISION_RESOLUTION_TYPE => {
                    handover.collision_resolution =
                        Some(ByteReader::new(nested.payload()).be_u16()?)
                }
                ALTERNATIVE_CARRIER_TYPE => handover
                    .alternative_carriers
                    .push(AlternativeCarrier::from_payload(nested.payload())?),
                other => trace!("ignoring handover record {}", String::from_utf8_lossy(other)),
            }
        }

        if kind == HandoverKind::Request && handover.collision_resolution.is_none() {
            return Err(NdefError::NotFound("collision resolution record".into()));
        }

        debug!(
            "{kind:?} handover with {} alternative carriers",
            handover.alternative_carriers.len()
        );
        Ok(handover)
    }

    fn nested_records(&self) -> Result<Vec<Record<'static>>> {
        let mut records = Vec::with_capacity(self.alternative_carriers.len() + 1);

        match (self.kind, self.collision_resolution) {
            (_, Some(random)) => records.push(Record::new(
                Tnf::WellKnown,
                COLLISION_RESOLUTION_TYPE,
                random.to_be_bytes().to_vec(),
            )),
            (HandoverKind::Request, None) => {
                return Err(NdefError::InvalidField(
                    "handover request without collision resolution",
                ));
            }
            (HandoverKind::Select, None) => {}
        }

        for carrier in &self.alternative_carriers {
            records.push(Record::new(
                Tnf::WellKnown,
                ALTERNATIVE_CARRIER_TYPE,
                carrier.to_payload()?,
            ));
        }

        Ok(records)
    }

    pub fn payload_len(&self) -> Result<usize> {
        Ok(1 + self.nested_records()?.iter().map(Record::encoded_len).sum::<usize>())
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let mut payload = vec![self.version];
        encode_message(&self.nested_records()?, &mut payload)?;
        Ok(payload)
    }

    pub fn to_record(&self) -> Result<Record<'static>> {
        Ok(Record::new(Tnf::WellKnown, self.kind.record_type(), self.to_payload()?))
    }

    /// Build the whole handover message: this record followed by one record per carrier.
    ///
    /// Carrier records without an ID are given their position as ID, and an
    /// Alternative Carrier referencing that ID is added for each of them.
    pub fn compose(
        mut self,
        carriers: Vec<(CarrierPowerState, Record<'static>)>,
    ) -> Result<Vec<Record<'static>>> {
        let mut siblings = Vec::with_capacity(carriers.len());

        for (index, (power_state, carrier)) in carriers.into_iter().enumerate() {
            let carrier = if carrier.id.is_empty() {
                carrier.with_id(index.to_string())
            } else {
                carrier
            };

            self.alternative_carriers
                .push(AlternativeCarrier::new(power_state, carrier.id.clone()));
            siblings.push(carrier);
        }

        let mut records = vec![self.to_record()?];
        records.extend(siblings);
        Ok(records)
    }

    /// The sibling record holding the configuration of carrier `index`
    pub fn read_ac<'r, 'a>(
        &self,
        index: usize,
        records: &'r [Record<'a>],
    ) -> Result<&'r Record<'a>> {
        let carrier = self.carrier(index)?;
        find_by_id(records, &carrier.carrier_data_reference)
    }

    /// The sibling record holding auxiliary data `aux_index` of carrier `index`
    pub fn read_aux<'r, 'a>(
        &self,
        index: usize,
        aux_index: usize,
        records: &'r [Record<'a>],
    ) -> Result<&'r Record<'a>> {
        let reference = self
            .carrier(index)?
            .auxiliary_data_references
            .get(aux_index)
            .ok_or_else(|| {
                NdefError::NotFound(format!(
                    "auxiliary data reference {aux_index} of carrier {index}"
                ))
            })?;
        find_by_id(records, reference)
    }

    fn carrier(&self, index: usize) -> Result<&AlternativeCarrier> {
        self.alternative_carriers
            .get(index)
            .ok_or_else(|| NdefError::NotFound(format!("alternative carrier {index}")))
    }
}

fn find_by_id<'r, 'a>(records: &'r [Record<'a>], id: &[u8]) -> Result<&'r Record<'a>> {
    records
        .iter()
        .find(|record| record.has_id() && record.id == id)
        .ok_or_else(|| NdefError::NotFound(format!("record with id {}", hex::encode(id))))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::message::MessageBuilder;
    use crate::record::{identify_buffer, parse_message};

    fn carrier(payload: &[u8]) -> Record<'static> {
        Record::new(Tnf::MediaType, b"application/x-test".to_vec(), payload.to_vec())
    }

    #[test]
    fn select_round_trip() {
        let mut handover = Handover::select();
        handover.alternative_carriers.push(AlternativeCarrier {
            power_state: CarrierPowerState::Activating,
            carrier_data_reference: b"bt".to_vec(),
            auxiliary_data_references: vec![b"aux0".to_vec(), b"aux1".to_vec()],
        });

        let record = handover.to_record().unwrap();
        assert_eq!(record.kind, NdefType::Handover);
        assert_eq!(record.payload().len(), handover.payload_len().unwrap());
        assert_eq!(record.payload()[0], HANDOVER_VERSION);

        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        let record = identify_buffer(&out).unwrap();

        assert_eq!(Handover::from_record(&record).unwrap(), handover);
    }

    #[test]
    fn carriers_resolve_without_swapping() {
        let records = Handover::select()
            .compose(vec![
                (CarrierPowerState::Active, carrier(b"first")),
                (CarrierPowerState::Inactive, carrier(b"second")),
            ])
            .unwrap();

        let mut builder = MessageBuilder::new();
        for record in records {
            builder.push(record);
        }
        let bytes = builder.build().unwrap();

        let message = parse_message(&bytes).unwrap();
        assert_eq!(message.len(), 3);

        let handover = Handover::from_record(&message[0]).unwrap();
        assert_eq!(handover.alternative_carriers.len(), 2);
        assert_eq!(handover.read_ac(0, &message[1..]).unwrap().payload(), b"first");
        assert_eq!(handover.read_ac(1, &message[1..]).unwrap().payload(), b"second");
        assert_eq!(
            handover.alternative_carriers[0].power_state,
            CarrierPowerState::Active
        );

        assert!(matches!(
            handover.read_ac(2, &message[1..]),
            Err(NdefError::NotFound(_))
        ));
    }

    #[test]
    fn auxiliary_reference_resolution() {
        let mut handover = Handover::select();
        let mut ac = AlternativeCarrier::new(CarrierPowerState::Active, "c");
        ac.auxiliary_data_references.push(b"x".to_vec());
        handover.alternative_carriers.push(ac);

        let siblings = vec![carrier(b"config").with_id("c"), carrier(b"extra").with_id("x")];
        assert_eq!(handover.read_aux(0, 0, &siblings).unwrap().payload(), b"extra");
        assert!(handover.read_aux(0, 1, &siblings).is_err());
    }

    #[test]
    fn request_needs_collision_resolution() {
        let request = Handover::request(0x1234);
        let record = request.to_record().unwrap();
        assert_eq!(Handover::from_record(&record).unwrap(), request);

        let mut payload = vec![HANDOVER_VERSION];
        encode_message(
            &[Record::new(
                Tnf::WellKnown,
                ALTERNATIVE_CARRIER_TYPE,
                vec![0x01, 0x01, b'0', 0x00],
            )],
            &mut payload,
        )
        .unwrap();
        let record = Record::new(Tnf::WellKnown, HANDOVER_REQUEST_TYPE, payload);
        assert!(matches!(
            Handover::from_record(&record),
            Err(NdefError::NotFound(_))
        ));
    }

    #[test]
    fn nested_records_carry_their_own_begin_and_end() {
        let records = Handover::select()
            .compose(vec![
                (CarrierPowerState::Active, carrier(b"a")),
                (CarrierPowerState::Active, carrier(b"b")),
            ])
            .unwrap();

        let mut out = Vec::new();
        records[0].write_to(&mut out).unwrap();
        let record = identify_buffer(&out).unwrap();

        assert_eq!(record.nested.len(), 2);
        assert!(record.nested[0].message_begin());
        assert!(!record.nested[0].message_end());
        assert!(record.nested[1].message_end());
    }
}
