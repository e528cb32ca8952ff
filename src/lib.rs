// src/lib.rs
//! NDEF (NFC Data Exchange Format) message codec over NFC Forum Type 1 to 5
//! tag memory.
//!
//! [`tag::TagAdapter`] reads and writes the raw message for the tag type in
//! use, [`record`] parses and serializes record headers, [`records`] holds the
//! typed codec of each record kind and [`Ndef`] ties them together.

pub mod bytes;
pub mod config;
pub mod error;
pub mod message;
pub mod ndef;
pub mod ndef_type;
pub mod record;
pub mod records;
pub mod tag;

pub use config::NdefConfig;
pub use error::{Error, NdefError, Result};
pub use message::MessageBuilder;
pub use ndef::Ndef;
pub use ndef_type::NdefType;
pub use record::{Record, RecordFlags, Tnf, identify_buffer, parse_message};
pub use records::{DecodedRecord, decode_record};
pub use tag::{MemoryTag, Protocol, TagAdapter, TagMemory};
