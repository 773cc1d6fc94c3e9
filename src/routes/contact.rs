use axum::{Json, Router, extract::State, response::IntoResponse, routing};
use serde::{Deserialize, Serialize};

use crate::{app_error::AppError, app_state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/contact", routing::post(send_message))
}

#[derive(Deserialize)]
struct ContactReq {
    name: String,
    email: String,
    message: String,
}

#[derive(Serialize)]
struct ContactRes {
    success: bool,
}

/// Relay a visitor's message to the shop owner's mailbox.
async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<ContactReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.message.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Name, email and message are required".into(),
        ));
    }

    state
        .mailer
        .send_contact_message(&body.name, &body.email, &body.message)
        .await
        .map_err(|err| {
            tracing::warn!("Contact relay failed: {err:#}");
            AppError::ServiceUnreachable("Mail relay".into())
        })?;

    Ok(Json(ContactRes { success: true }))
}
