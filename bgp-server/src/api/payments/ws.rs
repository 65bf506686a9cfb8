use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bgp_core::entities::token_purchase::{GetTokenPurchaseByUid, TokenPurchase};
use bgp_core::framework::DatabaseProcessor;
use bgp_sdk::objects::ws::{WsCloseCode, WsServerMessage};
use bgp_sdk::objects::{PurchaseResponse, PurchaseStatus};
use kanau::processor::Processor;
use tokio::sync::broadcast::error::RecvError;

use super::status::owned_purchase;
use crate::api::error::ApiError;
use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// `GET /api/payments/status/{transaction_uid}/ws`: purchase status stream.
///
/// Ownership is checked before the upgrade. The socket then receives the
/// current purchase, one frame per status change, and a normal close after
/// a terminal status.
pub(super) async fn purchase_status_ws(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    Path(transaction_uid): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    owned_purchase(&state.db, &user, transaction_uid.clone())
        .await?
        .ok_or(ApiError::NotFound("purchase not found"))?;
    Ok(ws.on_upgrade(move |socket| handle_purchase_ws(socket, state, transaction_uid)))
}

enum Sent {
    Open,
    Closed,
}

/// Drives a single WebSocket connection.
async fn handle_purchase_ws(mut socket: WebSocket, state: AppState, transaction_uid: String) {
    // Subscribe before the first read so an update racing the query is
    // still buffered.
    let mut status_rx = state.events.purchase_status.subscribe();

    if let Sent::Closed = send_current(&mut socket, &state.db, &transaction_uid).await {
        return;
    }

    loop {
        tokio::select! {
            result = status_rx.recv() => {
                match result {
                    Ok(update) if update.transaction_uid == transaction_uid => {
                        if let Sent::Closed =
                            send_current(&mut socket, &state.db, &transaction_uid).await
                        {
                            return;
                        }
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            uid = %transaction_uid,
                            skipped,
                            "WS: broadcast receiver lagged, checking current status"
                        );
                        if let Sent::Closed =
                            send_current(&mut socket, &state.db, &transaction_uid).await
                        {
                            return;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Send the stored purchase. Closes the socket on terminal status or error.
async fn send_current(
    socket: &mut WebSocket,
    db: &DatabaseProcessor,
    transaction_uid: &str,
) -> Sent {
    let purchase: TokenPurchase = match db
        .process(GetTokenPurchaseByUid {
            transaction_uid: transaction_uid.to_owned(),
        })
        .await
    {
        Ok(Some(p)) => p,
        Ok(None) => {
            close_with_error(socket, WsCloseCode::PURCHASE_NOT_FOUND, "purchase not found").await;
            return Sent::Closed;
        }
        Err(e) => {
            tracing::error!(error = %e, uid = %transaction_uid, "WS: failed to query purchase");
            close_with_error(socket, WsCloseCode::INTERNAL_ERROR, "internal error").await;
            return Sent::Closed;
        }
    };

    let response = PurchaseResponse::from(purchase);
    let terminal = PurchaseStatus::is_terminal(response.status);
    let msg = WsServerMessage::StatusUpdate { purchase: response };
    if send_json(socket, &msg).await.is_err() {
        return Sent::Closed;
    }
    if terminal {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: WsCloseCode::NORMAL,
                reason: "purchase settled".into(),
            })))
            .await;
        return Sent::Closed;
    }
    Sent::Open
}

async fn close_with_error(socket: &mut WebSocket, code: u16, reason: &str) {
    let _ = send_json(
        socket,
        &WsServerMessage::Error {
            code,
            reason: reason.to_owned(),
        },
    )
    .await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_owned().into(),
        })))
        .await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
