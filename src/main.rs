// src/main.rs
mod apdu;
mod cards;
mod nfc_service;
mod settings;
mod types;
mod ws;

use crossbeam_channel::unbounded;
use log::info;
use tokio::sync::broadcast;

use crate::settings::Settings;

#[tokio::main]
async fn main() {
    env_logger::init();
    info!("Starting NFC NDEF Service...");

    let settings = Settings::from_env();

    // WS -> NFC commands. Crossbeam because the NFC thread blocks on PC/SC
    let (cmd_tx, cmd_rx) = unbounded::<types::NfcCommand>();

    // NFC -> WS events, fanned out to every client
    let (event_tx, _) = broadcast::channel::<types::OutgoingMessage>(100);

    let (bridge_tx, bridge_rx) = unbounded::<types::OutgoingMessage>();

    let nfc_settings = settings.clone();
    std::thread::spawn(move || {
        nfc_service::run(nfc_settings, bridge_tx, cmd_rx);
    });

    // broadcast::Sender::send is sync, so a plain thread can bridge the two
    let bridge_event_tx = event_tx.clone();
    std::thread::spawn(move || {
        while let Ok(msg) = bridge_rx.recv() {
            // no connected client is not an error
            let _ = bridge_event_tx.send(msg);
        }
    });

    ws::start_server(settings.addr, cmd_tx, event_tx).await;
}
