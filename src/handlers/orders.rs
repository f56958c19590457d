use crate::context::OperationContext;
use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, PaginatedResponse, PaginationParams,
};
use crate::services::orders::{CreateOrderInput, OrderDetail, OrderFilter};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_order_status))
}

/// Create an order with its lines; totals are computed server-side
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created", body = crate::ApiResponse<OrderDetail>),
        (status = 400, description = "Invalid payload or discount above subtotal", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.create_order(&ctx, payload).await?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderFilter, PaginationParams),
    responses(
        (status = 200, description = "Orders", body = crate::ApiResponse<PaginatedResponse<order::Model>>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config);
    let (orders, total) = state
        .services
        .orders
        .list_orders(filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with lines", body = crate::ApiResponse<OrderDetail>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.orders.get_order(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<OrderDetail>),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .update_status(&ctx, id, payload.status)
        .await?;
    Ok(success_response(order))
}
