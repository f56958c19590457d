use crate::context::OperationContext;
use crate::entities::stock_reservation;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    pub job_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

pub fn reservations_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_reservation))
        .route("/:id/release", post(release_reservation))
        .route("/:id/use", post(mark_reservation_used))
}

/// Reserve stock of one product for a production job
#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reserved", body = crate::ApiResponse<stock_reservation::Model>),
        (status = 404, description = "Job or product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough available stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let reservation = state
        .services
        .reservations
        .create_reservation(&ctx, payload.job_id, payload.product_id, payload.quantity)
        .await?;
    Ok(created_response(reservation))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/release",
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Released", body = crate::ApiResponse<stock_reservation::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reservation is not active", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn release_reservation(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let reservation = state
        .services
        .reservations
        .release_reservation(&ctx, id)
        .await?;
    Ok(success_response(reservation))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/use",
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Marked used", body = crate::ApiResponse<stock_reservation::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reservation is not active", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn mark_reservation_used(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let reservation = state.services.reservations.mark_used(&ctx, id).await?;
    Ok(success_response(reservation))
}
