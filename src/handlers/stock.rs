use crate::context::OperationContext;
use crate::errors::ServiceError;
use crate::handlers::common::created_response;
use crate::services::stock_ledger::{StockMovement, StockReference};
use crate::AppState;
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockInRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub reference: Option<StockReference>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockOutRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub reference: Option<StockReference>,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockAdjustRequest {
    pub product_id: Uuid,
    #[validate(range(min = 0))]
    pub new_quantity: i32,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/in", post(stock_in))
        .route("/out", post(stock_out))
        .route("/adjust", post(stock_adjust))
}

/// Receive stock
#[utoipa::path(
    post,
    path = "/api/v1/stock/in",
    request_body = StockInRequest,
    responses(
        (status = 201, description = "Stock received", body = crate::ApiResponse<StockMovement>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Stock"
)]
pub async fn stock_in(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<StockInRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let movement = state
        .services
        .ledger
        .stock_in(
            &ctx,
            payload.product_id,
            payload.quantity,
            payload.reference,
            payload.note,
        )
        .await?;
    Ok(created_response(movement))
}

/// Withdraw stock
#[utoipa::path(
    post,
    path = "/api/v1/stock/out",
    request_body = StockOutRequest,
    responses(
        (status = 201, description = "Stock withdrawn", body = crate::ApiResponse<StockMovement>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Stock"
)]
pub async fn stock_out(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<StockOutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let movement = state
        .services
        .ledger
        .stock_out(
            &ctx,
            payload.product_id,
            payload.quantity,
            payload.reference,
            payload.reason,
        )
        .await?;
    Ok(created_response(movement))
}

/// Set stock to a counted quantity
#[utoipa::path(
    post,
    path = "/api/v1/stock/adjust",
    request_body = StockAdjustRequest,
    responses(
        (status = 201, description = "Stock adjusted", body = crate::ApiResponse<StockMovement>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Stock"
)]
pub async fn stock_adjust(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<StockAdjustRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let movement = state
        .services
        .ledger
        .stock_adjust(&ctx, payload.product_id, payload.new_quantity, payload.reason)
        .await?;
    Ok(created_response(movement))
}
