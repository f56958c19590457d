//! Audit Trail
//!
//! Every mutation records who did what to which entity, with before/after
//! snapshots. Recording returns a `Result`; mutating services use
//! [`AuditService::record_or_warn`] so a failed audit write never undoes the
//! business change.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::context::OperationContext;
use crate::entities::{
    audit_log::{self, Entity as AuditLogEntity},
    customer, order, order_item, product, production_job, stock_reservation,
};
use crate::errors::ServiceError;

/// What happened to the entity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    StatusChange,
    StockIn,
    StockOut,
    StockAdjust,
    Reserve,
    Release,
    MarkUsed,
    RecordOutput,
    QcCheck,
    Rework,
}

/// Order header together with its lines, as captured in audit rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSnapshot {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Typed payload of an audit row. The stored entity type follows the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuditSnapshot {
    Product(product::Model),
    ProductionJob(production_job::Model),
    Reservation(stock_reservation::Model),
    Customer(customer::Model),
    Order(OrderSnapshot),
}

impl AuditSnapshot {
    pub fn entity_type(&self) -> &'static str {
        match self {
            AuditSnapshot::Product(_) => "product",
            AuditSnapshot::ProductionJob(_) => "production_job",
            AuditSnapshot::Reservation(_) => "stock_reservation",
            AuditSnapshot::Customer(_) => "customer",
            AuditSnapshot::Order(_) => "order",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            AuditSnapshot::Product(m) => m.id,
            AuditSnapshot::ProductionJob(m) => m.id,
            AuditSnapshot::Reservation(m) => m.id,
            AuditSnapshot::Customer(m) => m.id,
            AuditSnapshot::Order(s) => s.order.id,
        }
    }

    fn to_json(&self) -> Result<serde_json::Value, ServiceError> {
        serde_json::to_value(self).map_err(ServiceError::from)
    }
}

impl From<product::Model> for AuditSnapshot {
    fn from(model: product::Model) -> Self {
        AuditSnapshot::Product(model)
    }
}

impl From<production_job::Model> for AuditSnapshot {
    fn from(model: production_job::Model) -> Self {
        AuditSnapshot::ProductionJob(model)
    }
}

impl From<stock_reservation::Model> for AuditSnapshot {
    fn from(model: stock_reservation::Model) -> Self {
        AuditSnapshot::Reservation(model)
    }
}

impl From<customer::Model> for AuditSnapshot {
    fn from(model: customer::Model) -> Self {
        AuditSnapshot::Customer(model)
    }
}

impl From<OrderSnapshot> for AuditSnapshot {
    fn from(snapshot: OrderSnapshot) -> Self {
        AuditSnapshot::Order(snapshot)
    }
}

/// One audit record to be written
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub old: Option<AuditSnapshot>,
    pub new: Option<AuditSnapshot>,
}

impl AuditEntry {
    pub fn created(action: AuditAction, new: impl Into<AuditSnapshot>) -> Self {
        Self {
            action,
            old: None,
            new: Some(new.into()),
        }
    }

    pub fn changed(
        action: AuditAction,
        old: impl Into<AuditSnapshot>,
        new: impl Into<AuditSnapshot>,
    ) -> Self {
        Self {
            action,
            old: Some(old.into()),
            new: Some(new.into()),
        }
    }

    /// Entity type and id, taken from whichever snapshot is present.
    fn target(&self) -> Result<(&'static str, Uuid), ServiceError> {
        match (&self.old, &self.new) {
            (Some(old), Some(new)) => {
                if old.entity_type() != new.entity_type() || old.entity_id() != new.entity_id() {
                    return Err(ServiceError::ValidationError(
                        "audit snapshots refer to different entities".to_string(),
                    ));
                }
                Ok((new.entity_type(), new.entity_id()))
            }
            (Some(snapshot), None) | (None, Some(snapshot)) => {
                Ok((snapshot.entity_type(), snapshot.entity_id()))
            }
            (None, None) => Err(ServiceError::ValidationError(
                "audit entry needs at least one snapshot".to_string(),
            )),
        }
    }
}

/// Service for writing and reading the audit trail.
#[derive(Clone)]
pub struct AuditService {
    db_pool: Arc<DatabaseConnection>,
}

impl AuditService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Persists an audit row on the service's own connection.
    pub async fn record(
        &self,
        ctx: &OperationContext,
        entry: AuditEntry,
    ) -> Result<audit_log::Model, ServiceError> {
        Self::record_on(&*self.db_pool, ctx, entry).await
    }

    /// Persists an audit row on `conn`, which may be an open transaction.
    #[instrument(skip(conn, ctx, entry), fields(action = %entry.action))]
    pub async fn record_on<C: ConnectionTrait>(
        conn: &C,
        ctx: &OperationContext,
        entry: AuditEntry,
    ) -> Result<audit_log::Model, ServiceError> {
        let (entity_type, entity_id) = entry.target()?;
        let old_data = entry.old.as_ref().map(AuditSnapshot::to_json).transpose()?;
        let new_data = entry.new.as_ref().map(AuditSnapshot::to_json).transpose()?;

        let row = audit_log::ActiveModel {
            actor_id: Set(ctx.actor_id),
            actor_name: Set(ctx.actor_name.clone()),
            action: Set(entry.action.to_string()),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id),
            old_data: Set(old_data),
            new_data: Set(new_data),
            request_id: Set(ctx.request_id.clone()),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;

        debug!(audit_id = %row.id, entity_type, entity_id = %entity_id, "Audit entry recorded");
        Ok(row)
    }

    /// Records the entry, logging a warning when the write fails.
    pub async fn record_or_warn(&self, ctx: &OperationContext, entry: AuditEntry) {
        Self::record_or_warn_on(&*self.db_pool, ctx, entry).await
    }

    pub async fn record_or_warn_on<C: ConnectionTrait>(
        conn: &C,
        ctx: &OperationContext,
        entry: AuditEntry,
    ) {
        let action = entry.action;
        if let Err(e) = Self::record_on(conn, ctx, entry).await {
            crate::metrics::record_audit_failure();
            warn!(action = %action, error = %e, "Failed to write audit entry");
        }
    }

    /// Audit history of one entity, oldest first.
    #[instrument(skip(self))]
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<audit_log::Model>, ServiceError> {
        AuditLogEntity::find()
            .filter(audit_log::Column::EntityType.eq(entity_type))
            .filter(audit_log::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_log::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Most recent audit rows across all entities.
    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: u64) -> Result<Vec<audit_log::Model>, ServiceError> {
        AuditLogEntity::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .limit(limit.clamp(1, 500))
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn customer(id: Uuid, name: &str) -> customer::Model {
        let now = Utc::now();
        customer::Model {
            id,
            name: name.to_string(),
            phone: None,
            email: None,
            company: None,
            address: None,
            notes: None,
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn entity_type_follows_snapshot_variant() {
        let id = Uuid::new_v4();
        let entry = AuditEntry::created(AuditAction::Create, customer(id, "Acme"));
        assert_eq!(entry.target().unwrap(), ("customer", id));
    }

    #[test]
    fn mismatched_snapshots_are_rejected() {
        let entry = AuditEntry::changed(
            AuditAction::Update,
            customer(Uuid::new_v4(), "A"),
            customer(Uuid::new_v4(), "B"),
        );
        assert!(matches!(
            entry.target(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn snapshot_serializes_as_plain_row() {
        let snapshot = AuditSnapshot::from(customer(Uuid::new_v4(), "Acme"));
        let json = snapshot.to_json().unwrap();
        assert_eq!(json["name"], "Acme");
        assert!(json.get("Customer").is_none());
    }
}
