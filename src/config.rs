// src/config.rs
use serde::Deserialize;

/// Largest NDEF message the library will stage in memory
pub const NDEF_MAX_SIZE: usize = 8192;

/// Largest single record the library will stage before appending it
pub const NDEF_RECORD_MAX_SIZE: usize = 512;

/// Tunables for an [`crate::Ndef`] context
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NdefConfig {
    pub max_ndef_size: usize,
    pub max_record_size: usize,

    /// Overrides the protocol default Capability Container offset (Type 1/2/5 only)
    pub cc_file_offset: Option<usize>,
}

impl Default for NdefConfig {
    fn default() -> Self {
        Self {
            max_ndef_size: NDEF_MAX_SIZE,
            max_record_size: NDEF_RECORD_MAX_SIZE,
            cc_file_offset: None,
        }
    }
}
