use anyhow::Context;
use axum::{Json, Router, extract::State, response::IntoResponse, routing};
use chrono::NaiveDate;
use diesel::{AsChangeset, ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::AppError,
    app_state::AppState,
    middleware,
    models::UserEntity,
    schema::{cart_items, carts, orders, users},
};

pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/users",
        Router::new()
            .route("/", routing::get(get_users))
            .route("/", routing::put(update_user))
            .route("/", routing::delete(delete_user))
            .route_layer(axum::middleware::from_fn(middleware::admin_authorization)),
    )
}

async fn get_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let users: Vec<UserEntity> = users::table
        .order_by(users::created_at.desc())
        .select(UserEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get users")?;

    Ok(Json(users))
}

/// Only profile fields may change through this endpoint. Credentials and
/// ids are never touched.
#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = crate::schema::users)]
struct UpdateUserFields {
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    date_of_birth: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct UpdateUserReq {
    user_id: Uuid,
    #[serde(flatten)]
    update: UpdateUserFields,
}

async fn update_user(
    State(state): State<AppState>,
    Json(body): Json<UpdateUserReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = diesel::update(users::table.find(body.user_id))
        .set((body.update, users::updated_at.eq(diesel::dsl::now)))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(Json(user))
}

#[derive(Deserialize)]
struct DeleteUserReq {
    user_id: Uuid,
}

#[derive(Serialize)]
struct DeleteUserRes {
    user_id: Uuid,
    deleted_orders: usize,
}

/// Delete a user together with their cart and every order they placed.
async fn delete_user(
    State(state): State<AppState>,
    Json(body): Json<DeleteUserReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user_id = body.user_id;
    let deleted_orders = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let user: UserEntity = users::table
                    .find(user_id)
                    .select(UserEntity::as_select())
                    .get_result(conn)
                    .await?;

                let cart_ids: Vec<Uuid> = carts::table
                    .filter(carts::user_id.eq(user.id))
                    .select(carts::id)
                    .get_results(conn)
                    .await?;
                diesel::delete(cart_items::table.filter(cart_items::cart_id.eq_any(&cart_ids)))
                    .execute(conn)
                    .await?;
                diesel::delete(carts::table.filter(carts::user_id.eq(user.id)))
                    .execute(conn)
                    .await?;

                // Order lines go with their orders via ON DELETE CASCADE.
                let deleted_orders =
                    diesel::delete(orders::table.filter(orders::user_id.eq(user.id)))
                        .execute(conn)
                        .await?;

                diesel::delete(users::table.find(user.id))
                    .execute(conn)
                    .await?;

                Ok::<usize, AppError>(deleted_orders)
            })
        })
        .await?;

    Ok(Json(DeleteUserRes {
        user_id,
        deleted_orders,
    }))
}
