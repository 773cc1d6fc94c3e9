use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::AppError,
    app_state::AppState,
    middleware,
    models::{ProductEntity, ProfessionEntity, ProfessionProductEntity},
    schema::{profession_products, professions, products},
};

/// Professions group catalog products by the trade they are meant for,
/// so the storefront can answer "which products fit profession X" and
/// "which products are not assigned anywhere yet".
pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/available", routing::get(get_unassigned_products))
        .route("/{name}/products", routing::get(get_profession_products));

    let admin = Router::new()
        .route("/", routing::get(get_professions))
        .route("/", routing::post(create_profession))
        .route("/{id}", routing::delete(delete_profession))
        .route_layer(axum::middleware::from_fn(middleware::admin_authorization));

    Router::new().nest("/professions", public.merge(admin))
}

#[derive(Serialize)]
struct ProfessionRes {
    profession: ProfessionEntity,
    product_ids: Vec<Uuid>,
}

fn group_links(
    entries: Vec<ProfessionEntity>,
    links: Vec<ProfessionProductEntity>,
) -> Vec<ProfessionRes> {
    let mut by_profession: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links {
        by_profession
            .entry(link.profession_id)
            .or_default()
            .push(link.product_id);
    }
    entries
        .into_iter()
        .map(|profession| {
            let product_ids = by_profession.remove(&profession.id).unwrap_or_default();
            ProfessionRes {
                profession,
                product_ids,
            }
        })
        .collect()
}

async fn get_professions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let entries: Vec<ProfessionEntity> = professions::table
        .order_by(professions::name.asc())
        .select(ProfessionEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get professions")?;

    let links: Vec<ProfessionProductEntity> = profession_products::table
        .select(ProfessionProductEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get profession links")?;

    Ok(Json(group_links(entries, links)))
}

#[derive(Deserialize)]
struct CreateProfessionReq {
    name: String,
    #[serde(default)]
    product_ids: Vec<Uuid>,
}

async fn create_profession(
    State(state): State<AppState>,
    Json(body): Json<CreateProfessionReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let res = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let known: i64 = products::table
                    .filter(products::id.eq_any(&body.product_ids))
                    .count()
                    .get_result(conn)
                    .await?;
                if known != body.product_ids.len() as i64 {
                    return Err(AppError::BadRequest(
                        "One or more products do not exist".into(),
                    ));
                }

                let profession: ProfessionEntity = diesel::insert_into(professions::table)
                    .values(professions::name.eq(body.name.trim()))
                    .returning(ProfessionEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let links: Vec<ProfessionProductEntity> = body
                    .product_ids
                    .iter()
                    .map(|&product_id| ProfessionProductEntity {
                        profession_id: profession.id,
                        product_id,
                    })
                    .collect();
                diesel::insert_into(profession_products::table)
                    .values(&links)
                    .execute(conn)
                    .await?;

                Ok::<ProfessionRes, AppError>(ProfessionRes {
                    profession,
                    product_ids: body.product_ids,
                })
            })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(res)))
}

/// Products linked to a profession, looked up by its display name.
async fn get_profession_products(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profession: ProfessionEntity = professions::table
        .filter(professions::name.eq(&name))
        .select(ProfessionEntity::as_select())
        .get_result(conn)
        .await?;

    let linked: Vec<ProductEntity> = profession_products::table
        .inner_join(products::table)
        .filter(profession_products::profession_id.eq(profession.id))
        .select(ProductEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get profession products")?;

    Ok(Json(linked))
}

/// Products not linked to any profession.
async fn get_unassigned_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let assigned = profession_products::table.select(profession_products::product_id);
    let unassigned: Vec<ProductEntity> = products::table
        .filter(diesel::dsl::not(products::id.eq_any(assigned)))
        .select(ProductEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get unassigned products")?;

    Ok(Json(unassigned))
}

async fn delete_profession(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    // Links go with the profession via ON DELETE CASCADE.
    let removed = diesel::delete(professions::table.find(id))
        .execute(conn)
        .await?;
    if removed == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(serde_json::json!({
        "message": "Profession deleted successfully",
        "profession_id": id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profession(name: &str) -> ProfessionEntity {
        ProfessionEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn links_are_grouped_under_their_profession() {
        let notary = profession("notary");
        let architect = profession("architect");
        let product = Uuid::new_v4();
        let links = vec![ProfessionProductEntity {
            profession_id: notary.id,
            product_id: product,
        }];

        let grouped = group_links(vec![notary, architect], links);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].product_ids, vec![product]);
        assert!(grouped[1].product_ids.is_empty());
    }
}
