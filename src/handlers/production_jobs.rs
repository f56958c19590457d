use crate::context::OperationContext;
use crate::entities::{
    production_job::{self, JobStatus},
    production_job_log, qc_record, stock_reservation,
};
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, PaginatedResponse, PaginationParams,
};
use crate::services::{
    job_status::JobEvent,
    production_jobs::{CreateJobInput, JobFilter, QcCheckpointInput, QcResult},
    reservations::{BatchPolicy, BatchReservation, ReservationItem},
};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateJobStatusRequest {
    pub status: JobStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobEventRequest {
    pub event: JobEvent,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordOutputRequest {
    #[validate(range(min = 0))]
    pub produced_qty: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReworkRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QcCheckRequest {
    pub checkpoints: Vec<QcCheckpointInput>,
    pub overall_passed: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReserveMaterialsRequest {
    pub items: Vec<ReservationItem>,
    #[serde(default)]
    pub policy: BatchPolicy,
}

pub fn production_jobs_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/by-number/:job_number", get(get_job_by_number))
        .route("/:id", get(get_job))
        .route("/:id/status", put(update_job_status))
        .route("/:id/events", post(apply_job_event))
        .route("/:id/output", put(record_output))
        .route("/:id/rework", post(create_rework_job))
        .route("/:id/qc", get(list_qc_records).post(perform_qc_check))
        .route("/:id/logs", get(list_job_logs))
        .route(
            "/:id/reservations",
            get(list_job_reservations).post(reserve_materials),
        )
        .route("/:id/consume", post(consume_materials))
}

#[utoipa::path(
    post,
    path = "/api/v1/production-jobs",
    request_body = CreateJobInput,
    responses(
        (status = 201, description = "Job created", body = crate::ApiResponse<production_job::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Job number already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn create_job(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(payload): Json<CreateJobInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let job = state.services.jobs.create_job(&ctx, payload).await?;
    Ok(created_response(job))
}

/// List jobs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/production-jobs",
    params(JobFilter, PaginationParams),
    responses(
        (status = 200, description = "Jobs", body = crate::ApiResponse<PaginatedResponse<production_job::Model>>)
    ),
    tag = "Production Jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config);
    let (jobs, total) = state
        .services
        .jobs
        .list_jobs(filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        jobs, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = crate::ApiResponse<production_job::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.jobs.get_job(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-jobs/by-number/{job_number}",
    params(("job_number" = String, Path, description = "Job number")),
    responses(
        (status = 200, description = "Job", body = crate::ApiResponse<production_job::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn get_job_by_number(
    State(state): State<AppState>,
    Path(job_number): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let job = state.services.jobs.get_job_by_number(&job_number).await?;
    Ok(success_response(job))
}

/// Move a job to a new status
#[utoipa::path(
    put,
    path = "/api/v1/production-jobs/{id}/status",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = UpdateJobStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<production_job::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn update_job_status(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let job = state
        .services
        .jobs
        .update_job_status(&ctx, id, payload.status, payload.note)
        .await?;
    Ok(success_response(job))
}

/// Apply a workflow event such as `start_printing` or `cancel`
#[utoipa::path(
    post,
    path = "/api/v1/production-jobs/{id}/events",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = JobEventRequest,
    responses(
        (status = 200, description = "Event applied", body = crate::ApiResponse<production_job::Model>),
        (status = 409, description = "Event not allowed in current status", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn apply_job_event(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobEventRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let job = state
        .services
        .jobs
        .apply_event(&ctx, id, payload.event, payload.note)
        .await?;
    Ok(success_response(job))
}

#[utoipa::path(
    put,
    path = "/api/v1/production-jobs/{id}/output",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = RecordOutputRequest,
    responses(
        (status = 200, description = "Output recorded", body = crate::ApiResponse<production_job::Model>),
        (status = 409, description = "Job is cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn record_output(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordOutputRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let job = state
        .services
        .jobs
        .record_output(&ctx, id, payload.produced_qty)
        .await?;
    Ok(success_response(job))
}

/// Spawn a rework job from an existing one
#[utoipa::path(
    post,
    path = "/api/v1/production-jobs/{id}/rework",
    params(("id" = Uuid, Path, description = "Original job id")),
    request_body = CreateReworkRequest,
    responses(
        (status = 201, description = "Rework job created", body = crate::ApiResponse<production_job::Model>),
        (status = 404, description = "Original job not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn create_rework_job(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReworkRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let job = state
        .services
        .jobs
        .create_rework_job(&ctx, id, payload.quantity, payload.reason)
        .await?;
    Ok(created_response(job))
}

/// Record a QC inspection
#[utoipa::path(
    post,
    path = "/api/v1/production-jobs/{id}/qc",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = QcCheckRequest,
    responses(
        (status = 201, description = "QC recorded", body = crate::ApiResponse<QcResult>),
        (status = 409, description = "Job is not ready for QC", body = crate::errors::ErrorResponse)
    ),
    tag = "Production Jobs"
)]
pub async fn perform_qc_check(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<QcCheckRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .jobs
        .perform_qc_check(&ctx, id, payload.checkpoints, payload.overall_passed)
        .await?;
    Ok(created_response(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-jobs/{id}/qc",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "QC records", body = crate::ApiResponse<Vec<qc_record::Model>>)
    ),
    tag = "Production Jobs"
)]
pub async fn list_qc_records(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.jobs.qc_records(id).await?))
}

/// Status history, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/production-jobs/{id}/logs",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Status log", body = crate::ApiResponse<Vec<production_job_log::Model>>)
    ),
    tag = "Production Jobs"
)]
pub async fn list_job_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.jobs.job_logs(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-jobs/{id}/reservations",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Reservations", body = crate::ApiResponse<Vec<stock_reservation::Model>>)
    ),
    tag = "Reservations"
)]
pub async fn list_job_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.reservations.list_for_job(id).await?,
    ))
}

/// Reserve several materials for a job
#[utoipa::path(
    post,
    path = "/api/v1/production-jobs/{id}/reservations",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = ReserveMaterialsRequest,
    responses(
        (status = 201, description = "Batch processed; `failure` is set when best effort stopped early", body = crate::ApiResponse<BatchReservation>),
        (status = 422, description = "All-or-nothing batch rolled back", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn reserve_materials(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReserveMaterialsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = state
        .services
        .reservations
        .reserve_for_job(&ctx, id, payload.items, payload.policy)
        .await?;
    Ok(created_response(batch))
}

/// Draw reserved materials out of stock and mark the reservations used
#[utoipa::path(
    post,
    path = "/api/v1/production-jobs/{id}/consume",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Reservations consumed", body = crate::ApiResponse<Vec<stock_reservation::Model>>),
        (status = 422, description = "Not enough stock on hand", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn consume_materials(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let used = state
        .services
        .reservations
        .consume_for_job(&ctx, id)
        .await?;
    Ok(success_response(used))
}
