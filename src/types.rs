// src/types.rs
#![allow(non_camel_case_types)]

use nfc_ndef::records::{AndroidApp, Text, Uri};
use nfc_ndef::{DecodedRecord, Record};
use serde::{Deserialize, Serialize};

// Messages sent TO the WebSocket client (Frontend)
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    READER_STATUS { success: bool },
    CARD_STATUS { success: bool, message: String },
    DATA_READ_SUCCESS { records: Vec<DecodedRecord> },
    DATA_READ_ERROR { error: String },
    DATA_WRITE_SUCCESS { message: String },
    DATA_WRITE_ERROR { error: String },
    READER_ERROR { error: String },
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub enum NDEFType {
    TEXT,
    URL,
    APP,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NdefPayload {
    pub data_type: NDEFType,
    pub content: String,
}

impl NdefPayload {
    pub fn to_record(&self) -> nfc_ndef::Result<Record<'static>> {
        match self.data_type {
            NDEFType::TEXT => Text::new("en", self.content.as_str()).to_record(),
            NDEFType::URL => Ok(Uri::from_full(&self.content).to_record()),
            NDEFType::APP => Ok(AndroidApp::new(self.content.as_str()).to_record()),
        }
    }
}

// Messages received FROM the WebSocket client
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    GET_READER_STATUS,
    WRITE_DATA { payloads: Vec<NdefPayload> },
}

// Internal commands sent from WS Server -> NFC Thread
#[derive(Debug)]
pub enum NfcCommand {
    Write { payloads: Vec<NdefPayload> },
    CheckReaderStatus,
}

impl From<IncomingMessage> for NfcCommand {
    fn from(message: IncomingMessage) -> Self {
        match message {
            IncomingMessage::GET_READER_STATUS => Self::CheckReaderStatus,
            IncomingMessage::WRITE_DATA { payloads } => Self::Write { payloads },
        }
    }
}

pub const CARD_TYPE_MIFARE_1K: &str = "6a"; // MIFARE Classic 1K, no NFC Forum container
