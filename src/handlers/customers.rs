use crate::context::OperationContext;
use crate::entities::customer;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, PaginatedResponse, PaginationParams,
};
use crate::services::customers::{CreateCustomerInput, UpdateCustomerInput};
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
pub struct CustomerSearch {
    /// Substring of the customer name
    pub search: Option<String>,
}

pub fn customers_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/:id", get(get_customer).put(update_customer))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerInput,
    responses(
        (status = 201, description = "Customer created", body = crate::ApiResponse<customer::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<CreateCustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .create_customer(&ctx, payload)
        .await?;
    Ok(created_response(customer))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(CustomerSearch, PaginationParams),
    responses(
        (status = 200, description = "Customers", body = crate::ApiResponse<PaginatedResponse<customer::Model>>)
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(search): Query<CustomerSearch>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config);
    let (customers, total) = state
        .services
        .customers
        .list_customers(search.search, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        customers, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = crate::ApiResponse<customer::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.customers.get_customer(id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerInput,
    responses(
        (status = 200, description = "Customer updated", body = crate::ApiResponse<customer::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .update_customer(&ctx, id, payload)
        .await?;
    Ok(success_response(customer))
}
