// src/apdu.rs
use log::trace;
use nfc_ndef::{NdefError, Result};
use pcsc::Card;

const SW_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Send a pseudo-APDU to the reader and strip the status word
fn transmit(card: &Card, apdu: &[u8], what: &str) -> Result<Vec<u8>> {
    let mut recv_buffer = [0u8; 258];
    let resp = card
        .transmit(apdu, &mut recv_buffer)
        .map_err(|e| NdefError::Transport(format!("{what}: {e}")))?;

    trace!("{what} {} -> {}", hex::encode(apdu), hex::encode(resp));

    match resp.split_last_chunk::<2>() {
        Some((data, sw)) if *sw == SW_SUCCESS => Ok(data.to_vec()),
        _ => Err(NdefError::Transport(format!(
            "{what} failed: {}",
            hex::encode(resp)
        ))),
    }
}

// Read: FF B0 00 Page Len
pub fn read_binary(card: &Card, page: u8, length: u8) -> Result<Vec<u8>> {
    transmit(card, &[0xFF, 0xB0, 0x00, page, length], "read binary")
}

// Write: FF D6 00 Page Len [Data]
pub fn update_binary(card: &Card, page: u8, data: &[u8]) -> Result<()> {
    let mut apdu = vec![0xFF, 0xD6, 0x00, page, data.len() as u8];
    apdu.extend_from_slice(data);

    transmit(card, &apdu, "update binary").map(|_| ())
}
