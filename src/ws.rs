// src/ws.rs
use std::net::SocketAddr;

use crossbeam_channel::Sender;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use warp::Filter;
use warp::ws::{Message, WebSocket, Ws};

use crate::types::{IncomingMessage, NfcCommand, OutgoingMessage};

/// Serve the tag events on `ws://addr/`, every client gets every event
pub async fn start_server(
    addr: SocketAddr,
    nfc_cmd_tx: Sender<NfcCommand>,
    events: broadcast::Sender<OutgoingMessage>,
) {
    let route = warp::path::end().and(warp::ws()).map(move |ws: Ws| {
        let nfc_cmd_tx = nfc_cmd_tx.clone();
        let events = events.subscribe();
        ws.on_upgrade(move |socket| handle_connection(socket, nfc_cmd_tx, events))
    });

    info!("WebSocket server listening on ws://{addr}");
    warp::serve(route.with(warp::cors().allow_any_origin()))
        .run(addr)
        .await;
}

async fn handle_connection(
    socket: WebSocket,
    nfc_cmd_tx: Sender<NfcCommand>,
    mut events: broadcast::Receiver<OutgoingMessage>,
) {
    let (mut sink, mut stream) = socket.split();

    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("client fell behind, {skipped} events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(frame) = to_frame(&event) else {
                continue;
            };
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let Ok(text) = frame.to_str() else {
            continue;
        };

        match serde_json::from_str::<IncomingMessage>(text) {
            Ok(message) => {
                debug!("client request {message:?}");
                if nfc_cmd_tx.send(message.into()).is_err() {
                    error!("NFC thread is gone, closing client");
                    break;
                }
            }
            Err(err) => warn!("ignoring malformed client message: {err}"),
        }
    }
}

fn to_frame(event: &OutgoingMessage) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::text(json)),
        Err(err) => {
            error!("unable to serialize {event:?}: {err}");
            None
        }
    }
}
