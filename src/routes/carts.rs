use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{CartEntity, CartItemEntity, CreateCartEntity, CreateCartItemEntity, ProductEntity},
    schema::{cart_items, carts, products},
};

/// Defines cart routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(add_to_cart))
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(update_quantity))
            .routes(utoipa_axum::routes!(clear_cart))
            .routes(utoipa_axum::routes!(remove_item)),
    )
}

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize, ToSchema)]
struct AddToCartReq {
    user_id: Uuid,
    product_id: Uuid,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

#[derive(Serialize, ToSchema)]
struct CartRes {
    cart: CartEntity,
    items: Vec<CartLineRes>,
    total_price: f32,
}

/// A cart line joined with its product snapshot.
#[derive(Serialize, ToSchema)]
struct CartLineRes {
    product_id: Uuid,
    name: String,
    price: f32,
    quantity: i32,
}

fn to_lines(rows: Vec<(CartItemEntity, ProductEntity)>) -> (Vec<CartLineRes>, f32) {
    let lines: Vec<CartLineRes> = rows
        .into_iter()
        .map(|(item, product)| CartLineRes {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: item.quantity,
        })
        .collect();
    let total = lines
        .iter()
        .map(|line| line.price * line.quantity as f32)
        .sum();
    (lines, total)
}

/// Add a product to the user's cart, creating the cart on first use.
/// Adding a product already present increments its line quantity.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Carts"],
    request_body = AddToCartReq,
    responses(
        (status = 200, description = "Product added to cart", body = StdResponse<CartRes, String>),
        (status = 400, description = "Quantity below 1"),
        (status = 404, description = "Unknown product")
    )
)]
async fn add_to_cart(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<AddToCartReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (cart, rows) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                // Unknown products are rejected before touching the cart.
                products::table
                    .find(body.product_id)
                    .select(ProductEntity::as_select())
                    .get_result(conn)
                    .await?;

                let cart: CartEntity = diesel::insert_into(carts::table)
                    .values(CreateCartEntity {
                        user_id: body.user_id,
                    })
                    .on_conflict(carts::user_id)
                    .do_update()
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .returning(CartEntity::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::insert_into(cart_items::table)
                    .values(CreateCartItemEntity {
                        cart_id: cart.id,
                        product_id: body.product_id,
                        quantity: body.quantity,
                    })
                    .on_conflict((cart_items::cart_id, cart_items::product_id))
                    .do_update()
                    .set((
                        cart_items::quantity.eq(cart_items::quantity + body.quantity),
                        cart_items::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;

                let rows: Vec<(CartItemEntity, ProductEntity)> = cart_items::table
                    .inner_join(products::table)
                    .filter(cart_items::cart_id.eq(cart.id))
                    .select((CartItemEntity::as_select(), ProductEntity::as_select()))
                    .get_results(conn)
                    .await?;

                Ok::<(CartEntity, Vec<(CartItemEntity, ProductEntity)>), AppError>((cart, rows))
            })
        })
        .await?;

    let (items, total_price) = to_lines(rows);
    Ok(StdResponse {
        data: Some(CartRes {
            cart,
            items,
            total_price,
        }),
        message: Some("Product added to cart"),
    })
}

#[derive(Deserialize)]
struct GetCartQuery {
    user_id: Uuid,
}

/// Fetch the user's cart with product snapshots and the running total.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Carts"],
    params(
        ("user_id" = Uuid, Query, description = "Owner of the cart")
    ),
    responses(
        (status = 200, description = "Cart contents", body = StdResponse<CartRes, String>),
        (status = 404, description = "User has no cart")
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Query(query): Query<GetCartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart: CartEntity = carts::table
        .filter(carts::user_id.eq(query.user_id))
        .select(CartEntity::as_select())
        .get_result(conn)
        .await?;

    let rows: Vec<(CartItemEntity, ProductEntity)> = cart_items::table
        .inner_join(products::table)
        .filter(cart_items::cart_id.eq(cart.id))
        .select((CartItemEntity::as_select(), ProductEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get cart items")?;

    let (items, total_price) = to_lines(rows);
    Ok(StdResponse {
        data: Some(CartRes {
            cart,
            items,
            total_price,
        }),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateQuantityReq {
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

/// Set a line's quantity. A quantity of zero or less removes the line.
#[utoipa::path(
    patch,
    path = "/",
    tags = ["Carts"],
    request_body = UpdateQuantityReq,
    responses(
        (status = 200, description = "Quantity updated", body = StdResponse<CartEntity, String>),
        (status = 404, description = "Cart or line not found")
    )
)]
async fn update_quantity(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<UpdateQuantityReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart: CartEntity = carts::table
                    .filter(carts::user_id.eq(body.user_id))
                    .select(CartEntity::as_select())
                    .get_result(conn)
                    .await?;

                if body.quantity <= 0 {
                    let removed = diesel::delete(
                        cart_items::table
                            .filter(cart_items::cart_id.eq(cart.id))
                            .filter(cart_items::product_id.eq(body.product_id)),
                    )
                    .execute(conn)
                    .await?;
                    if removed == 0 {
                        return Err(AppError::NotFound);
                    }
                } else {
                    let updated = diesel::update(
                        cart_items::table
                            .filter(cart_items::cart_id.eq(cart.id))
                            .filter(cart_items::product_id.eq(body.product_id)),
                    )
                    .set((
                        cart_items::quantity.eq(body.quantity),
                        cart_items::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;
                    if updated == 0 {
                        return Err(AppError::NotFound);
                    }
                }

                let cart = diesel::update(carts::table.find(cart.id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .returning(CartEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok::<CartEntity, AppError>(cart)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Quantity updated successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CartOwnerReq {
    user_id: Uuid,
}

/// Remove one product line from the user's cart.
#[utoipa::path(
    delete,
    path = "/{product_id}",
    tags = ["Carts"],
    params(
        ("product_id" = Uuid, Path, description = "Product line to remove")
    ),
    request_body = CartOwnerReq,
    responses(
        (status = 200, description = "Line removed", body = StdResponse<CartEntity, String>),
        (status = 404, description = "Cart or line not found")
    )
)]
async fn remove_item(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
    axum::Json(body): axum::Json<CartOwnerReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart: CartEntity = carts::table
                    .filter(carts::user_id.eq(body.user_id))
                    .select(CartEntity::as_select())
                    .get_result(conn)
                    .await?;

                let removed = diesel::delete(
                    cart_items::table
                        .filter(cart_items::cart_id.eq(cart.id))
                        .filter(cart_items::product_id.eq(product_id)),
                )
                .execute(conn)
                .await?;
                if removed == 0 {
                    return Err(AppError::NotFound);
                }

                let cart = diesel::update(carts::table.find(cart.id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .returning(CartEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok::<CartEntity, AppError>(cart)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Product removed from cart"),
    })
}

#[derive(Serialize, ToSchema)]
struct ClearCartRes {
    removed_lines: usize,
}

/// Clear every line from the user's cart. Invoked after checkout.
#[utoipa::path(
    delete,
    path = "/",
    tags = ["Carts"],
    request_body = CartOwnerReq,
    responses(
        (status = 200, description = "Cart cleared", body = StdResponse<ClearCartRes, String>),
        (status = 404, description = "User has no cart")
    )
)]
async fn clear_cart(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<CartOwnerReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let removed = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart: CartEntity = carts::table
                    .filter(carts::user_id.eq(body.user_id))
                    .select(CartEntity::as_select())
                    .get_result(conn)
                    .await?;

                let removed =
                    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                        .execute(conn)
                        .await?;

                Ok::<usize, AppError>(removed)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(ClearCartRes {
            removed_lines: removed,
        }),
        message: Some("Cart cleared"),
    })
}
