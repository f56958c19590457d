use crate::errors::ServiceError;
use crate::tracing::RequestId;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use uuid::Uuid;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// Who is performing a mutation, and under which request.
///
/// Every mutating service call takes one of these explicitly; it is the only
/// source of actor information for audit rows, job logs and ledger entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationContext {
    pub actor_id: Option<Uuid>,
    pub actor_name: Option<String>,
    pub request_id: Option<String>,
}

impl OperationContext {
    pub fn new(actor_id: Option<Uuid>, actor_name: Option<String>) -> Self {
        Self {
            actor_id,
            actor_name,
            request_id: crate::tracing::current_request_id().map(|id| id.0),
        }
    }

    /// Context for work done by the service itself (event processing, jobs).
    pub fn system() -> Self {
        Self {
            actor_id: None,
            actor_name: Some("system".to_string()),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Display name for log rows; falls back to the actor id.
    pub fn actor_label(&self) -> String {
        match (&self.actor_name, &self.actor_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "anonymous".to_string(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OperationContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = match parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(raw) => Some(Uuid::parse_str(raw.trim()).map_err(|_| {
                ServiceError::BadRequest(format!("{} must be a UUID", ACTOR_ID_HEADER))
            })?),
            None => None,
        };

        let actor_name = parts
            .headers
            .get(ACTOR_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .or_else(|| crate::tracing::current_request_id().map(|id| id.0));

        Ok(Self {
            actor_id,
            actor_name,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<OperationContext, ServiceError> {
        let (mut parts, _) = request.into_parts();
        OperationContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_actor_headers() {
        let actor = Uuid::new_v4();
        let ctx = extract(
            Request::builder()
                .header(ACTOR_ID_HEADER, actor.to_string())
                .header(ACTOR_NAME_HEADER, "Somchai")
                .body(())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(ctx.actor_id, Some(actor));
        assert_eq!(ctx.actor_label(), "Somchai");
    }

    #[tokio::test]
    async fn rejects_malformed_actor_id() {
        let err = extract(
            Request::builder()
                .header(ACTOR_ID_HEADER, "not-a-uuid")
                .body(())
                .unwrap(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_headers_yield_anonymous_context() {
        let ctx = extract(Request::builder().body(()).unwrap()).await.unwrap();
        assert_eq!(ctx.actor_id, None);
        assert_eq!(ctx.actor_label(), "anonymous");
    }
}
