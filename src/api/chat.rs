//! Chat endpoint
//!
//! POST /api/chat — answers a question about PDF text supplied by the client.

use axum::{extract::State, Extension, Json};

use crate::error::ApiError;
use crate::middleware::TraceId;
use crate::schemas::{ChatReply, ChatRequest};
use crate::server::state::AppState;

/// POST /api/chat
///
/// Returns `{ "reply": ... }` on success and `{ "detail": ... }` with a 500
/// status once every model target has failed.
pub async fn chat(
    State(state): State<AppState>,
    trace_id: Option<Extension<TraceId>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let trace_id = trace_id.map(|Extension(id)| id).unwrap_or_default();

    tracing::debug!(
        trace_id = %trace_id,
        pdf_chars = request.pdf_text.chars().count(),
        input_chars = request.user_input.chars().count(),
        "Received chat request"
    );

    let reply = state.relay.handle(&request).await?;

    Ok(Json(reply))
}
