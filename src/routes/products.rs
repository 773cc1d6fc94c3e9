use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use diesel::{AsChangeset, ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    app_state::AppState,
    middleware,
    models::{CreateProductEntity, ProductEntity},
    schema::products,
};

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", routing::get(get_products))
        .route("/{id}", routing::get(get_product))
        .route("/{id}/image", routing::get(get_product_image));

    let admin = Router::new()
        .route("/", routing::post(create_product))
        .route("/{id}", routing::patch(update_product))
        .route("/{id}", routing::delete(delete_product))
        .route_layer(axum::middleware::from_fn(middleware::admin_authorization));

    Router::new().nest("/products", public.merge(admin))
}

/// Fetch the whole catalog.
async fn get_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let products: Vec<ProductEntity> = products::table
        .order_by(products::created_at.desc())
        .select(ProductEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    Ok(Json(products))
}

async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = products::table
        .find(id)
        .select(ProductEntity::as_select())
        .get_result(conn)
        .await?;

    Ok(Json(product))
}

/// Serve the stored image bytes. 404 when the product has no image.
async fn get_product_image(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let image: Option<Vec<u8>> = products::table
        .find(id)
        .select(products::image)
        .get_result(conn)
        .await?;

    match image {
        Some(bytes) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )),
        None => Err(AppError::NotFound),
    }
}

#[derive(Deserialize)]
struct CreateProductReq {
    name: String,
    description: String,
    price: f32,
    /// Base64-encoded image bytes, if any.
    image: Option<String>,
}

fn decode_image(encoded: Option<String>) -> Result<Option<Vec<u8>>, AppError> {
    encoded
        .map(|data| {
            BASE64
                .decode(data)
                .map_err(|_| AppError::BadRequest("Image is not valid base64".into()))
        })
        .transpose()
}

async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if body.price < 0.0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    let image = decode_image(body.image)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::insert_into(products::table)
        .values(CreateProductEntity {
            name: body.name,
            description: body.description,
            price: body.price,
            image,
        })
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create product")?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = crate::schema::products)]
struct UpdateProductFields {
    name: Option<String>,
    description: Option<String>,
    price: Option<f32>,
}

#[derive(Deserialize)]
struct UpdateProductReq {
    #[serde(flatten)]
    fields: UpdateProductFields,
    /// Base64-encoded replacement image.
    image: Option<String>,
}

async fn update_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if matches!(&body.fields.price, Some(price) if *price < 0.0) {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    let image = decode_image(body.image)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = match image {
        Some(bytes) => {
            diesel::update(products::table.find(id))
                .set((
                    body.fields,
                    products::image.eq(Some(bytes)),
                    products::updated_at.eq(diesel::dsl::now),
                ))
                .returning(ProductEntity::as_returning())
                .get_result(conn)
                .await?
        }
        None => {
            diesel::update(products::table.find(id))
                .set((body.fields, products::updated_at.eq(diesel::dsl::now)))
                .returning(ProductEntity::as_returning())
                .get_result(conn)
                .await?
        }
    };

    Ok(Json(product))
}

async fn delete_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::delete(products::table.find(id))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Product deleted successfully",
        "product_id": product.id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_decoding_accepts_valid_base64() {
        let decoded = decode_image(Some(BASE64.encode(b"png-bytes"))).unwrap();
        assert_eq!(decoded.as_deref(), Some(b"png-bytes".as_slice()));
    }

    #[test]
    fn image_decoding_rejects_garbage() {
        assert!(decode_image(Some("not base64!!".into())).is_err());
    }

    #[test]
    fn absent_image_stays_absent() {
        assert_eq!(decode_image(None).unwrap(), None);
    }
}
