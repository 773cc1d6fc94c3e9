use axum::{extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::stripe,
    app_error::{AppError, StdResponse},
    app_state::AppState,
};

/// Defines payment routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payment",
        OpenApiRouter::new().routes(utoipa_axum::routes!(create_payment_session)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreatePaymentSessionReq {
    /// Major-unit amount; converted to the gateway's minor unit before the
    /// session is created.
    amount: f32,
}

#[derive(Serialize, ToSchema)]
struct CreatePaymentSessionRes {
    client_secret: String,
}

/// Create a payment session for the given amount and hand the gateway's
/// client secret back to the browser.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Payments"],
    request_body = CreatePaymentSessionReq,
    responses(
        (status = 200, description = "Payment session created", body = StdResponse<CreatePaymentSessionRes, String>),
        (status = 400, description = "Non-positive amount"),
        (status = 502, description = "Payment gateway unreachable")
    )
)]
async fn create_payment_session(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<CreatePaymentSessionReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.amount <= 0.0 {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }

    let intent =
        stripe::create_payment_intent(&state.http_client, &state.config.stripe, body.amount)
            .await?;

    Ok(StdResponse {
        data: Some(CreatePaymentSessionRes {
            client_secret: intent.client_secret,
        }),
        message: Some("Payment session created"),
    })
}
