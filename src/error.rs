// src/error.rs
use crate::ndef_type::NdefType;
use crate::record::Tnf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NdefError {
    /// Low level failure reported by the tag memory
    #[error("transport error: {0}")]
    Transport(String),

    #[error("tag memory too small, required {required} bytes, available {available}")]
    MemoryTag { required: usize, available: usize },

    #[error("internal buffer too small, required {required} bytes, available {available}")]
    MemoryInternal { required: usize, available: usize },

    #[error("tag is write protected")]
    Locked,

    #[error("no NDEF container found on tag")]
    NotFormatted,

    /// The message never terminates (no Message-End record within the buffer)
    #[error("NDEF message is corrupted")]
    CorruptMessage,

    #[error("buffer truncated at offset {offset}, needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("field {field} is {len} bytes long, max is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("unsupported tag protocol: {0:#04x}")]
    UnsupportedProtocol(u8),

    #[error("type name format {0:?} cannot be interpreted")]
    UnsupportedTnf(Tnf),

    #[error("expected a {expected:?} record, got {found:?}")]
    WrongRecordKind { expected: NdefType, found: NdefType },

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    #[error("too many nested records, max is {max}")]
    TooManyRecords { max: usize },

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Error = NdefError;
pub type Result<T, E = Error> = std::result::Result<T, E>;
