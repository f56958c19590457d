use crate::entities::audit_log;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

const MAX_RECENT: u64 = 500;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    /// `product`, `production_job`, `stock_reservation`, `customer` or `order`
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub limit: Option<u64>,
}

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

/// History of one entity (oldest first) when `entity_type` and `entity_id`
/// are given, otherwise the most recent entries.
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit entries", body = crate::ApiResponse<Vec<audit_log::Model>>),
        (status = 400, description = "Only one of entity_type / entity_id given", body = crate::errors::ErrorResponse)
    ),
    tag = "Audit"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = match (query.entity_type, query.entity_id) {
        (Some(entity_type), Some(entity_id)) => {
            state
                .services
                .audit
                .list_for_entity(&entity_type, entity_id)
                .await?
        }
        (None, None) => {
            let limit = query
                .limit
                .unwrap_or(state.config.api_default_page_size)
                .clamp(1, MAX_RECENT);
            state.services.audit.list_recent(limit).await?
        }
        _ => {
            return Err(ServiceError::BadRequest(
                "entity_type and entity_id must be given together".to_string(),
            ))
        }
    };
    Ok(success_response(rows))
}
