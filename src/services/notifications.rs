use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::notification::{self, Entity as NotificationEntity, NotificationKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventHandler};
use crate::webhooks::{InboundPayload, MessagingClient};

const DEFAULT_LIST_LIMIT: u64 = 200;

/// Persists notifications for domain events and forwards them to the
/// messaging channel when one is configured.
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DatabaseConnection>,
    messaging: Option<MessagingClient>,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DatabaseConnection>, messaging: Option<MessagingClient>) -> Self {
        Self { db_pool, messaging }
    }

    #[instrument(skip(self, event), fields(kind = %event.kind()))]
    pub async fn notify(&self, event: &Event) -> Result<notification::Model, ServiceError> {
        let (entity_type, entity_id) = event.entity();
        let row = notification::ActiveModel {
            kind: Set(event.kind().to_string()),
            title: Set(event.title()),
            message: Set(event.message()),
            entity_type: Set(Some(entity_type.to_string())),
            entity_id: Set(Some(entity_id)),
            read: Set(false),
            delivered: Set(false),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        if let Some(client) = self.messaging.clone() {
            let db = self.db_pool.clone();
            let text = format!("{}\n{}", row.title, row.message);
            let pending = row.clone();
            tokio::spawn(async move {
                match client.push_text(&text).await {
                    Ok(()) => {
                        let mut active = pending.into_active_model();
                        active.delivered = Set(true);
                        if let Err(e) = active.update(&*db).await {
                            warn!(error = %e, "Pushed notification but could not mark it delivered");
                        }
                    }
                    Err(e) => warn!(error = %e, "Notification push failed"),
                }
            });
        } else {
            debug!("Messaging push disabled; notification stored only");
        }

        Ok(row)
    }

    /// Newest first.
    pub async fn list_notifications(
        &self,
        unread_only: bool,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut query = NotificationEntity::find();
        if unread_only {
            query = query.filter(notification::Column::Read.eq(false));
        }
        query
            .order_by_desc(notification::Column::CreatedAt)
            .limit(DEFAULT_LIST_LIMIT)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<notification::Model, ServiceError> {
        let row = NotificationEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Notification {} not found", id)))?;
        if row.read {
            return Ok(row);
        }

        let mut active = row.into_active_model();
        active.read = Set(true);
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Stores each text message of an inbound webhook delivery. Other event
    /// types are ignored.
    #[instrument(skip(self, payload), fields(events = payload.events.len()))]
    pub async fn store_inbound(
        &self,
        payload: &InboundPayload,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut stored = Vec::new();
        for event in &payload.events {
            let Some(text) = event.text() else {
                continue;
            };
            let sender = event.sender().unwrap_or("unknown");
            let row = notification::ActiveModel {
                kind: Set(NotificationKind::InboundMessage.to_string()),
                title: Set(format!("Message from {}", sender)),
                message: Set(text.to_string()),
                entity_type: Set(None),
                entity_id: Set(None),
                read: Set(false),
                delivered: Set(true),
                ..Default::default()
            }
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
            stored.push(row);
        }
        info!(stored = stored.len(), "Inbound messages stored");
        Ok(stored)
    }
}

#[async_trait]
impl EventHandler for NotificationService {
    async fn handle_event(&self, event: Event) -> Result<(), ServiceError> {
        self.notify(&event).await.map(|_| ())
    }
}
