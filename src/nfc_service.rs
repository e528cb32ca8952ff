// src/nfc_service.rs
use crossbeam_channel::{Receiver, Sender};
use log::{error, info, warn};
use nfc_ndef::{Ndef, Protocol, Record};
use pcsc::{Card, Context, PNP_NOTIFICATION, Protocols, ReaderState, Scope, ShareMode, State};
use std::ffi::{CStr, CString};
use std::time::Duration;

use crate::cards::ReaderTag;
use crate::settings::Settings;
use crate::types::{CARD_TYPE_MIFARE_1K, NdefPayload, NfcCommand, OutgoingMessage};

pub fn run(settings: Settings, tx: Sender<OutgoingMessage>, rx: Receiver<NfcCommand>) {
    info!("Starting NFC Service (Event Driven)...");

    let ctx = match Context::establish(Scope::User) {
        Ok(ctx) => ctx,
        Err(err) => {
            error!("Failed to establish context: {}", err);
            let _ = tx.send(OutgoingMessage::READER_ERROR {
                error: err.to_string(),
            });
            return;
        }
    };

    let mut readers_buf = [0; 2048];
    let mut reader_names: Vec<CString> = Vec::new();
    let mut reader_states = vec![ReaderState::new(PNP_NOTIFICATION(), State::UNAWARE)];

    loop {
        // 1. Wait for State Change
        if let Err(err) = ctx.get_status_change(Duration::from_millis(500), &mut reader_states) {
            if err != pcsc::Error::Timeout {
                error!("PCSC Error: {}", err);
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        }

        // 2. CHECK FOR COMMANDS
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                NfcCommand::Write { payloads } => {
                    info!("Received Write Command with {} records", payloads.len());
                    handle_write_command(&ctx, &reader_names, &settings, &payloads, &tx);
                }
                NfcCommand::CheckReaderStatus => match ctx.list_readers(&mut readers_buf) {
                    Ok(iter) => {
                        reader_names = iter.map(CString::from).collect();
                        let _ = tx.send(OutgoingMessage::READER_STATUS {
                            success: !reader_names.is_empty(),
                        });
                    }
                    Err(_) => {
                        reader_names.clear();
                        let _ = tx.send(OutgoingMessage::READER_STATUS { success: false });
                    }
                },
            }
        }

        // 3. PROCESS EVENTS
        let mut readers_changed = false;

        // PnP notifications live at index 0
        if reader_states[0].event_state().intersects(State::CHANGED) {
            info!("Hardware change detected");
            readers_changed = true;
            reader_states[0].sync_current_state();
        }

        for i in 1..reader_states.len() {
            let rs = &reader_states[i];
            let Some(name) = reader_names.get(i - 1).cloned() else {
                continue;
            };

            if rs.event_state().intersects(State::CHANGED) {
                let current = rs.event_state();

                if current.intersects(State::PRESENT)
                    && !rs.current_state().intersects(State::PRESENT)
                {
                    info!("Card Inserted on {:?}", name);
                    handle_card_insertion(&ctx, &name, &settings, &tx);
                }

                if current.intersects(State::EMPTY) && rs.current_state().intersects(State::PRESENT)
                {
                    info!("Card Removed from {:?}", name);
                    let _ = tx.send(OutgoingMessage::CARD_STATUS {
                        success: false,
                        message: "Card removed!".into(),
                    });
                }

                reader_states[i].sync_current_state();
            }
        }

        // 4. REFRESH LIST
        if readers_changed {
            // keep the PnP state at index 0 and rebuild the rest
            reader_states.truncate(1);

            match ctx.list_readers(&mut readers_buf) {
                Ok(iter) => {
                    reader_names = iter.map(CString::from).collect();
                    for name in &reader_names {
                        reader_states.push(ReaderState::new(name.clone(), State::UNAWARE));
                    }

                    let _ = tx.send(OutgoingMessage::READER_STATUS {
                        success: !reader_names.is_empty(),
                    });
                }
                Err(_) => {
                    reader_names.clear();
                    let _ = tx.send(OutgoingMessage::READER_STATUS { success: false });
                }
            }
        }
    }
}

/// Last ATR byte, which the reader uses to report the card family
fn card_type(card: &Card) -> Option<String> {
    let mut names_buf = [0u8; 128];
    let mut atr_buf = [0u8; 64];
    let status = card.status2(&mut names_buf, &mut atr_buf).ok()?;
    status.atr().last().map(|last| format!("{:x}", last))
}

/// NTAG pages behind the reader, as a Type 2 tag
fn open_tag<'c>(card: &'c Card, settings: &Settings) -> Ndef<ReaderTag<'c>> {
    Ndef::new(ReaderTag::new(card, settings.tag_pages), Protocol::Type2)
}

fn handle_card_insertion(
    ctx: &Context,
    reader_name: &CStr,
    settings: &Settings,
    tx: &Sender<OutgoingMessage>,
) {
    let _ = tx.send(OutgoingMessage::CARD_STATUS {
        success: true,
        message: "Card detected!".into(),
    });

    let card = match ctx.connect(reader_name, ShareMode::Shared, Protocols::ANY) {
        Ok(card) => card,
        Err(e) => {
            error!("Failed to connect to card: {}", e);
            return;
        }
    };

    if card_type(&card).as_deref() == Some(CARD_TYPE_MIFARE_1K) {
        let _ = tx.send(OutgoingMessage::DATA_READ_ERROR {
            error: "MIFARE Classic cards are not supported".into(),
        });
        return;
    }

    let mut ndef = open_tag(&card, settings);
    let message = match ndef.read_decoded() {
        Ok(records) => OutgoingMessage::DATA_READ_SUCCESS { records },
        Err(e) => {
            warn!("Failed to read NDEF message: {}", e);
            OutgoingMessage::DATA_READ_ERROR {
                error: e.to_string(),
            }
        }
    };
    let _ = tx.send(message);
}

fn handle_write_command(
    ctx: &Context,
    reader_names: &[CString],
    settings: &Settings,
    payloads: &[NdefPayload],
    tx: &Sender<OutgoingMessage>,
) {
    if reader_names.is_empty() {
        let _ = tx.send(OutgoingMessage::DATA_WRITE_ERROR {
            error: "No reader connected".into(),
        });
        return;
    }

    let records = match payloads
        .iter()
        .map(NdefPayload::to_record)
        .collect::<nfc_ndef::Result<Vec<Record<'static>>>>()
    {
        Ok(records) => records,
        Err(e) => {
            let _ = tx.send(OutgoingMessage::DATA_WRITE_ERROR {
                error: e.to_string(),
            });
            return;
        }
    };

    for name in reader_names {
        let Ok(card) = ctx.connect(name, ShareMode::Shared, Protocols::ANY) else {
            continue;
        };

        if card_type(&card).as_deref() == Some(CARD_TYPE_MIFARE_1K) {
            let _ = tx.send(OutgoingMessage::DATA_WRITE_ERROR {
                error: "MIFARE Classic cards are not supported".into(),
            });
            return;
        }

        let message = match open_tag(&card, settings).write_message(&records) {
            Ok(()) => OutgoingMessage::DATA_WRITE_SUCCESS {
                message: "Data Written Successfully!".into(),
            },
            Err(e) => OutgoingMessage::DATA_WRITE_ERROR {
                error: e.to_string(),
            },
        };
        let _ = tx.send(message);
        return;
    }

    let _ = tx.send(OutgoingMessage::DATA_WRITE_ERROR {
        error: "No card found on reader".into(),
    });
}
