use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    app_error::AppError,
    app_state::AppState,
    middleware,
    models::{CreatePolicySectionEntity, PolicyEntity, PolicySectionEntity},
    schema::{policies, policy_sections},
};

pub fn routes() -> Router<AppState> {
    let public = Router::new().route("/{slug}", routing::get(get_policy));

    let admin = Router::new()
        .route("/{slug}", routing::post(add_section))
        .route("/{slug}", routing::put(update_section))
        .route("/{slug}/{section_id}", routing::delete(delete_section))
        .route_layer(axum::middleware::from_fn(middleware::admin_authorization));

    Router::new().nest("/policy", public.merge(admin))
}

#[derive(Serialize)]
struct PolicyRes {
    policy: PolicyEntity,
    sections: Vec<PolicySectionEntity>,
}

async fn load_sections(
    conn: &mut diesel_async::AsyncPgConnection,
    policy_id: uuid::Uuid,
) -> Result<Vec<PolicySectionEntity>, crate::db::DieselError> {
    policy_sections::table
        .filter(policy_sections::policy_id.eq(policy_id))
        .order_by(policy_sections::created_at.asc())
        .select(PolicySectionEntity::as_select())
        .get_results(conn)
        .await
}

/// Fetch a policy page by slug. A slug seen for the first time is
/// materialised with a single placeholder section so the page is always
/// editable afterwards.
async fn get_policy(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let res = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let existing: Option<PolicyEntity> = policies::table
                    .filter(policies::slug.eq(&slug))
                    .select(PolicyEntity::as_select())
                    .get_result(conn)
                    .await
                    .optional()?;

                let policy = match existing {
                    Some(policy) => policy,
                    None => {
                        let policy: PolicyEntity = diesel::insert_into(policies::table)
                            .values(policies::slug.eq(&slug))
                            .returning(PolicyEntity::as_returning())
                            .get_result(conn)
                            .await?;
                        diesel::insert_into(policy_sections::table)
                            .values(CreatePolicySectionEntity {
                                policy_id: policy.id,
                                title: "New section".into(),
                                content: "Content coming soon.".into(),
                            })
                            .execute(conn)
                            .await?;
                        policy
                    }
                };

                let sections = load_sections(conn, policy.id).await?;
                Ok::<PolicyRes, AppError>(PolicyRes { policy, sections })
            })
        })
        .await?;

    Ok(Json(res))
}

#[derive(Deserialize)]
struct AddSectionReq {
    title: String,
    content: String,
}

async fn add_section(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<AddSectionReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.title.trim().is_empty() || body.content.trim().is_empty() {
        return Err(AppError::BadRequest("Title and content are required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let res = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let policy: PolicyEntity = diesel::insert_into(policies::table)
                    .values(policies::slug.eq(&slug))
                    .on_conflict(policies::slug)
                    .do_update()
                    .set(policies::updated_at.eq(diesel::dsl::now))
                    .returning(PolicyEntity::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::insert_into(policy_sections::table)
                    .values(CreatePolicySectionEntity {
                        policy_id: policy.id,
                        title: body.title,
                        content: body.content,
                    })
                    .execute(conn)
                    .await?;

                let sections = load_sections(conn, policy.id).await?;
                Ok::<PolicyRes, AppError>(PolicyRes { policy, sections })
            })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(res)))
}

#[derive(Deserialize)]
struct UpdateSectionReq {
    id: uuid::Uuid,
    title: String,
    content: String,
}

async fn update_section(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateSectionReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let policy: PolicyEntity = policies::table
        .filter(policies::slug.eq(&slug))
        .select(PolicyEntity::as_select())
        .get_result(conn)
        .await?;

    let section: PolicySectionEntity = diesel::update(
        policy_sections::table
            .find(body.id)
            .filter(policy_sections::policy_id.eq(policy.id)),
    )
    .set((
        policy_sections::title.eq(body.title),
        policy_sections::content.eq(body.content),
    ))
    .returning(PolicySectionEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(Json(section))
}

async fn delete_section(
    Path((slug, section_id)): Path<(String, uuid::Uuid)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let policy: PolicyEntity = policies::table
        .filter(policies::slug.eq(&slug))
        .select(PolicyEntity::as_select())
        .get_result(conn)
        .await?;

    let removed = diesel::delete(
        policy_sections::table
            .find(section_id)
            .filter(policy_sections::policy_id.eq(policy.id)),
    )
    .execute(conn)
    .await?;
    if removed == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(serde_json::json!({
        "message": "Section deleted successfully",
        "section_id": section_id,
    })))
}
