use crate::context::OperationContext;
use crate::entities::{product, stock_reservation, stock_transaction};
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, PaginatedResponse, PaginationParams,
};
use crate::services::{
    products::{CreateProductInput, UpdateProductInput},
    reservations::AvailableStock,
};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub per_page: Option<u64>,
    /// Only products at or below their minimum stock
    #[serde(default)]
    pub low_stock: bool,
}

fn default_page() -> u64 {
    1
}

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product))
        .route("/:id/availability", get(get_availability))
        .route("/:id/transactions", get(list_transactions))
        .route("/:id/reservations", get(list_product_reservations))
}

/// Create a product with its opening stock
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<product::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.create_product(&ctx, payload).await?;
    Ok(created_response(product))
}

/// List products ordered by SKU
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products", body = crate::ApiResponse<PaginatedResponse<product::Model>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .products
        .list_products(page, per_page, query.low_stock)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = crate::ApiResponse<product::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.products.get_product(id).await?))
}

/// Update descriptive fields; stock is changed through the ledger
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<product::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .products
        .update_product(&ctx, id, payload)
        .await?;
    Ok(success_response(product))
}

/// Current stock, reserved quantity and what is still available
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/availability",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Availability", body = crate::ApiResponse<AvailableStock>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let stock = state.services.reservations.available_quantity(id).await?;
    Ok(success_response(stock))
}

/// Stock ledger of a product, newest first
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/transactions",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Ledger rows", body = crate::ApiResponse<Vec<stock_transaction::Model>>)
    ),
    tag = "Stock"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.get_product(id).await?;
    let rows = state.services.ledger.list_transactions(id).await?;
    Ok(success_response(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/reservations",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Reservations", body = crate::ApiResponse<Vec<stock_reservation::Model>>)
    ),
    tag = "Reservations"
)]
pub async fn list_product_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state.services.reservations.list_for_product(id).await?;
    Ok(success_response(rows))
}
