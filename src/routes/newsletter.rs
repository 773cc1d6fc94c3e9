use anyhow::Context;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    app_error::AppError, app_state::AppState, middleware, models::NewsletterEntryEntity,
    schema::newsletter_entries,
};

pub fn routes() -> Router<AppState> {
    let public = Router::new().route("/add", routing::post(subscribe));

    let admin = Router::new()
        .route("/", routing::get(get_subscribers))
        .route("/", routing::put(update_subscriber))
        .route("/", routing::delete(unsubscribe))
        .route_layer(axum::middleware::from_fn(middleware::admin_authorization));

    Router::new().nest("/newsletter", public.merge(admin))
}

#[derive(Deserialize)]
struct SubscribeReq {
    email: String,
}

/// Canonical form for stored addresses; lookups use the same form so a
/// subscription created as `Foo@Bar.com` stays reachable.
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Subscribing twice with the same address is a conflict, not a second row.
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeReq>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize(&body.email);
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let inserted = diesel::insert_into(newsletter_entries::table)
        .values(newsletter_entries::email.eq(&email))
        .on_conflict(newsletter_entries::email)
        .do_nothing()
        .execute(conn)
        .await
        .context("Failed to register newsletter subscription")?;
    if inserted == 0 {
        return Err(AppError::Conflict("Email is already subscribed".into()));
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Subscribed successfully", "email": email })),
    ))
}

async fn get_subscribers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entries: Vec<NewsletterEntryEntity> = newsletter_entries::table
        .order_by(newsletter_entries::created_at.desc())
        .select(NewsletterEntryEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get newsletter subscribers")?;

    Ok(Json(entries))
}

#[derive(Deserialize)]
struct UpdateSubscriberReq {
    old_email: String,
    new_email: String,
}

async fn update_subscriber(
    State(state): State<AppState>,
    Json(body): Json<UpdateSubscriberReq>,
) -> Result<impl IntoResponse, AppError> {
    let new_email = normalize(&body.new_email);
    if new_email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entry: NewsletterEntryEntity = diesel::update(
        newsletter_entries::table.filter(newsletter_entries::email.eq(normalize(&body.old_email))),
    )
    .set(newsletter_entries::email.eq(&new_email))
    .returning(NewsletterEntryEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(Json(entry))
}

#[derive(Deserialize)]
struct UnsubscribeReq {
    email: String,
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let removed = diesel::delete(
        newsletter_entries::table.filter(newsletter_entries::email.eq(normalize(&body.email))),
    )
    .execute(conn)
    .await?;
    if removed == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(
        serde_json::json!({ "message": "Unsubscribed successfully" }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_and_inserts_share_one_canonical_form() {
        assert_eq!(normalize(" Foo@Bar.com "), "foo@bar.com");
        assert_eq!(normalize("foo@bar.com"), normalize("FOO@BAR.COM"));
    }
}

