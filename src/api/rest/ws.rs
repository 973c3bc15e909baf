use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::Utc;
use futures::stream::SplitSink;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use crate::engine::bookings::list_available;
use crate::models::booking::Booking;
use crate::state::AppState;

/// A subscriber identifies its role via query string: students follow their
/// own bookings, drivers follow the open pool and their assigned rides,
/// admin dashboards subscribe unfiltered.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub student_id: Option<String>,
    pub driver_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, params: WsParams) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before taking the snapshot so no update is lost in between.
    let mut rx = state.booking_events_tx.subscribe();

    info!(
        student_id = params.student_id.as_deref().unwrap_or("-"),
        driver_id = params.driver_id.as_deref().unwrap_or("-"),
        "websocket client connected"
    );

    let send_task = tokio::spawn(async move {
        for booking in list_available(&state, Utc::now()) {
            if !wants_update(&params, &booking) {
                continue;
            }
            if send_booking(&mut sender, &booking).await.is_err() {
                return;
            }
        }

        while let Ok(booking) = rx.recv().await {
            if !wants_update(&params, &booking) {
                continue;
            }
            if send_booking(&mut sender, &booking).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

async fn send_booking(
    sender: &mut SplitSink<WebSocket, Message>,
    booking: &Booking,
) -> Result<(), ()> {
    let json = match serde_json::to_string(booking) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize booking for ws");
            return Ok(());
        }
    };

    sender.send(Message::Text(json)).await.map_err(|_| ())
}

fn wants_update(params: &WsParams, booking: &Booking) -> bool {
    if let Some(student_id) = &params.student_id {
        return booking.student_id == *student_id;
    }

    if let Some(driver_id) = &params.driver_id {
        return booking.is_pending()
            || booking.assigned_driver_id.as_deref() == Some(driver_id);
    }

    true
}
