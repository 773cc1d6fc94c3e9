use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::AppError,
    app_state::AppState,
    middleware,
    models::{CreateDrawEntity, DrawEntity},
    schema::draws,
};

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", routing::get(get_draws_page))
        .route("/length", routing::get(get_draws_length));

    let admin = Router::new()
        .route("/admin", routing::get(get_all_draws))
        .route("/admin", routing::post(create_draw))
        .route("/admin/{id}", routing::put(update_draw))
        .route("/admin/{id}", routing::delete(delete_draw))
        .route_layer(axum::middleware::from_fn(middleware::admin_authorization));

    Router::new().nest("/draws", public.merge(admin))
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Deserialize)]
struct DrawsPageQuery {
    #[serde(default = "default_page")]
    page: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

#[derive(Serialize)]
struct DrawsPageRes {
    draws: Vec<DrawEntity>,
    total_pages: i64,
    current_page: i64,
}

fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Gallery listing, newest first, paginated.
async fn get_draws_page(
    State(state): State<AppState>,
    Query(query): Query<DrawsPageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let total: i64 = draws::table
        .count()
        .get_result(conn)
        .await
        .context("Failed to count draws")?;

    let page_of_draws: Vec<DrawEntity> = draws::table
        .order_by(draws::created_at.desc())
        .offset((page - 1) * limit)
        .limit(limit)
        .select(DrawEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get draws")?;

    Ok(Json(DrawsPageRes {
        draws: page_of_draws,
        total_pages: total_pages(total, limit),
        current_page: page,
    }))
}

#[derive(Serialize)]
struct DrawsLengthRes {
    total_draws: i64,
}

async fn get_draws_length(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let total: i64 = draws::table
        .count()
        .get_result(conn)
        .await
        .context("Failed to count draws")?;

    Ok(Json(DrawsLengthRes { total_draws: total }))
}

async fn get_all_draws(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let all: Vec<DrawEntity> = draws::table
        .order_by(draws::created_at.desc())
        .select(DrawEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get draws")?;

    Ok(Json(all))
}

#[derive(Deserialize)]
struct DrawReq {
    title: String,
    image: String,
}

async fn create_draw(
    State(state): State<AppState>,
    Json(body): Json<DrawReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.title.trim().is_empty() || body.image.trim().is_empty() {
        return Err(AppError::BadRequest("Title and image are required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let draw: DrawEntity = diesel::insert_into(draws::table)
        .values(CreateDrawEntity {
            title: body.title,
            image: body.image,
        })
        .returning(DrawEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create draw")?;

    Ok((StatusCode::CREATED, Json(draw)))
}

async fn update_draw(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<DrawReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.title.trim().is_empty() || body.image.trim().is_empty() {
        return Err(AppError::BadRequest("Title and image are required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let draw: DrawEntity = diesel::update(draws::table.find(id))
        .set((draws::title.eq(body.title), draws::image.eq(body.image)))
        .returning(DrawEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(Json(draw))
}

async fn delete_draw(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let removed = diesel::delete(draws::table.find(id)).execute(conn).await?;
    if removed == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(serde_json::json!({
        "message": "Draw deleted successfully",
        "draw_id": id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(9, 10), 1);
    }
}
