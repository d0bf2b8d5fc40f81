//! HTTP surface: one message-in/message-out endpoint per session, a
//! diagnostic session snapshot, and liveness.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use sufra_domain::fsm::state_description_ar;

use crate::runtime::orchestrator;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/sessions/:session_id/messages", post(post_message))
        .route("/v1/sessions/:session_id", get(get_session))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

#[derive(Serialize)]
struct MessageResponse {
    reply: String,
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: e.to_string(),
        }),
    )
        .into_response()
}

async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> Response {
    if body.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "text must not be empty".into(),
            }),
        )
            .into_response();
    }

    match orchestrator::handle_message(&state, &session_id, body.text.trim()).await {
        Ok(reply) => Json(MessageResponse { reply }).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Serialize)]
struct SessionSnapshot {
    session_id: String,
    state: String,
    state_description_ar: &'static str,
    order_type: String,
    cart_items: usize,
    cart_subtotal: f64,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    applied_promo_code: Option<String>,
    area_name: Option<String>,
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.sessions.get(&session_id).await {
        Ok(Some(session)) => Json(SessionSnapshot {
            session_id: session.session_id.clone(),
            state: serde_json::to_value(session.fsm_state)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default(),
            state_description_ar: state_description_ar(session.fsm_state),
            order_type: session.order_type.as_str().into(),
            cart_items: session.cart.len(),
            cart_subtotal: session.cart_subtotal(),
            customer_name: session.customer_name.clone(),
            customer_phone: session.customer_phone.clone(),
            applied_promo_code: session.applied_promo_code.clone(),
            area_name: session.location.area_name.clone(),
        })
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: "session not found".into(),
            }),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}
