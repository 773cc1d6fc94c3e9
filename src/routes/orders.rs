use std::collections::HashMap;

use anyhow::Context;
use axum::{
    extract::{Path, State},
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
    middleware,
    models::{
        CreateOrderEntity, CreateOrderItemEntity, OrderEntity, OrderItemEntity, OrderStatus,
        ProductEntity,
    },
    schema::{order_items, orders, products},
    sweeper,
};

/// Defines order routes with OpenAPI specs. The full listing and the
/// status update are back-office operations and sit behind the admin
/// guard; everything else is reachable from the checkout flow.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_order))
        .routes(utoipa_axum::routes!(cleanup_orders))
        .routes(utoipa_axum::routes!(get_user_orders))
        .routes(utoipa_axum::routes!(get_order))
        .routes(utoipa_axum::routes!(confirm_payment))
        .routes(utoipa_axum::routes!(complete_order))
        .routes(utoipa_axum::routes!(delete_order));

    let admin = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_orders))
        .routes(utoipa_axum::routes!(update_status))
        .route_layer(axum::middleware::from_fn(middleware::admin_authorization));

    utoipa_axum::router::OpenApiRouter::new().nest("/orders", public.merge(admin))
}

/// Sum of `price * quantity` over the snapshotted line items. The stored
/// order amount always comes from here, never from client input.
fn compute_amount(items: &[CreateOrderItemEntity]) -> f32 {
    items
        .iter()
        .map(|item| item.price * item.quantity as f32)
        .sum()
}

#[derive(Deserialize, ToSchema)]
struct CreateOrderReqItem {
    product_id: Uuid,
    quantity: i32,
}

#[derive(Deserialize, ToSchema)]
struct CreateOrderReq {
    /// Absent for guest checkout.
    user_id: Option<Uuid>,
    items: Vec<CreateOrderReqItem>,
}

#[derive(Serialize, ToSchema)]
struct CreateOrderRes {
    order_id: Uuid,
    amount: f32,
}

/// Create a pending order from the given items, snapshotting current
/// product names and prices. Later product edits do not change the order.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Created order successfully", body = StdResponse<CreateOrderRes, String>),
        (status = 400, description = "Empty order or unknown product")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    if body.items.iter().any(|item| item.quantity < 1) {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product_ids: Vec<Uuid> =
                    body.items.iter().map(|item| item.product_id).collect();
                let snapshots: Vec<ProductEntity> = products::table
                    .filter(products::id.eq_any(&product_ids))
                    .select(ProductEntity::as_select())
                    .get_results(conn)
                    .await?;
                let by_id: HashMap<Uuid, &ProductEntity> =
                    snapshots.iter().map(|p| (p.id, p)).collect();

                let mut items = Vec::with_capacity(body.items.len());
                for item in &body.items {
                    let product = by_id.get(&item.product_id).ok_or_else(|| {
                        AppError::BadRequest(format!("Unknown product {}", item.product_id))
                    })?;
                    items.push(CreateOrderItemEntity {
                        // order_id is patched in after the insert below
                        order_id: Uuid::nil(),
                        product_id: product.id,
                        name: product.name.clone(),
                        price: product.price,
                        quantity: item.quantity,
                    });
                }

                let amount = compute_amount(&items);

                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        user_id: body.user_id,
                        amount,
                        status: OrderStatus::Pending.as_str().into(),
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                for item in &mut items {
                    item.order_id = order.id;
                }
                diesel::insert_into(order_items::table)
                    .values(items)
                    .execute(conn)
                    .await?;

                Ok::<OrderEntity, AppError>(order)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(CreateOrderRes {
            order_id: order.id,
            amount: order.amount,
        }),
        message: Some("Create order successfully"),
    })
}

/// Fetch all orders in the system, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .order_by(orders::created_at.desc())
        .select(OrderEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    order: OrderEntity,
    order_items: Vec<OrderItemEntity>,
}

/// Fetch a specific order with its line items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .select(OrderEntity::as_select())
        .get_result(conn)
        .await?;

    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .select(OrderItemEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(GetOrderRes {
            order,
            order_items: items,
        }),
        message: Some("Get order successfully"),
    })
}

/// Fetch all orders belonging to one user, newest first.
#[utoipa::path(
    get,
    path = "/user/{user_id}",
    tags = ["Orders"],
    params(
        ("user_id" = Uuid, Path, description = "Owner of the orders")
    ),
    responses(
        (status = 200, description = "List user orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_user_orders(
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::user_id.eq(user_id))
        .order_by(orders::created_at.desc())
        .select(OrderEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get user orders")?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get user orders successfully"),
    })
}

#[derive(Serialize, Deserialize, ToSchema)]
struct BillingAddress {
    line1: Option<String>,
    line2: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize, ToSchema)]
struct ConfirmPaymentReq {
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<BillingAddress>,
    payment_ref: Option<String>,
    /// Must be `"paid"`; any other value is rejected.
    status: String,
}

/// Payment confirmation: attach billing details and mark the order paid.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to confirm")
    ),
    request_body = ConfirmPaymentReq,
    responses(
        (status = 200, description = "Order marked as paid", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Status other than paid"),
        (status = 404, description = "Order not found")
    )
)]
async fn confirm_payment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    axum::Json(body): axum::Json<ConfirmPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    if OrderStatus::parse(&body.status) != Some(OrderStatus::Paid) {
        return Err(AppError::BadRequest("Invalid status update".into()));
    }

    let billing_address = body
        .address
        .map(|address| serde_json::to_value(address).context("Failed to serialize address"))
        .transpose()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = diesel::update(orders::table.find(id))
        .set((
            orders::customer_name.eq(Some(body.name)),
            orders::email.eq(Some(body.email)),
            orders::phone.eq(body.phone),
            orders::billing_address.eq(billing_address),
            orders::payment_ref.eq(body.payment_ref),
            orders::status.eq(OrderStatus::Paid.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order paid successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateStatusReq {
    order_id: Uuid,
    status: String,
}

/// Admin status update (e.g. mark shipped). Setting the current status
/// again is a no-op that still returns the row.
#[utoipa::path(
    patch,
    path = "/",
    tags = ["Orders"],
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found")
    )
)]
async fn update_status(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let status = OrderStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status {}", body.status)))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = diesel::update(orders::table.find(body.order_id))
        .set((
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order status updated successfully"),
    })
}

/// Mark an order as completed.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to complete")
    ),
    responses(
        (status = 200, description = "Order completed", body = StdResponse<OrderEntity, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn complete_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = diesel::update(orders::table.find(id))
        .set((
            orders::status.eq(OrderStatus::Completed.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order completed successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct DeleteOrderRes {
    order_id: Uuid,
}

/// Delete an order. Used when payment fails client-side and by admins.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to delete")
    ),
    responses(
        (status = 200, description = "Order deleted", body = StdResponse<DeleteOrderRes, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn delete_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = diesel::delete(orders::table.find(id))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(DeleteOrderRes { order_id: order.id }),
        message: Some("Order deleted successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct CleanupRes {
    deleted_count: usize,
}

/// Delete stale pending orders past the retention window. The background
/// sweeper runs the same query on an interval; this endpoint allows manual
/// triggering and keeps the historical contract.
#[utoipa::path(
    get,
    path = "/cleanup",
    tags = ["Orders"],
    responses(
        (status = 200, description = "Stale pending orders deleted", body = StdResponse<CleanupRes, String>)
    )
)]
async fn cleanup_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let deleted_count = sweeper::purge_stale_pending(&state).await?;

    Ok(StdResponse {
        data: Some(CleanupRes { deleted_count }),
        message: Some("Cleanup completed"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: f32, quantity: i32) -> CreateOrderItemEntity {
        CreateOrderItemEntity {
            order_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            name: "item".into(),
            price,
            quantity,
        }
    }

    #[test]
    fn amount_is_sum_of_price_times_quantity() {
        let items = vec![item(10.0, 2), item(5.0, 1)];
        assert_eq!(compute_amount(&items), 25.0);
    }

    #[test]
    fn empty_order_has_zero_amount() {
        assert_eq!(compute_amount(&[]), 0.0);
    }

    #[test]
    fn only_paid_is_a_valid_payment_confirmation_status() {
        assert_eq!(OrderStatus::parse("paid"), Some(OrderStatus::Paid));
        assert_ne!(OrderStatus::parse("shipped"), Some(OrderStatus::Paid));
        assert_eq!(OrderStatus::parse("PAID"), None);
    }
}
