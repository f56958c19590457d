//! Stock Ledger
//!
//! IN / OUT / ADJUST movements against a product's `current_stock`. Each
//! movement updates the product row first and then appends a ledger row.
//! The ledger row is best-effort: if it cannot be written the stock change
//! stands and a warning is logged.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::context::OperationContext;
use crate::entities::{
    product::{self, Entity as ProductEntity},
    stock_transaction::{self, Entity as StockTransactionEntity, TransactionType},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{AuditAction, AuditEntry, AuditService};

/// What a movement is attributed to (a production job, a purchase, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockReference {
    pub reference_type: String,
    pub reference_id: Uuid,
}

impl StockReference {
    pub fn production_job(job_id: Uuid) -> Self {
        Self {
            reference_type: "production_job".to_string(),
            reference_id: job_id,
        }
    }
}

/// Result of a ledger operation. `transaction` is `None` when the history
/// row could not be written.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockMovement {
    pub product: product::Model,
    pub transaction: Option<stock_transaction::Model>,
}

#[derive(Debug, Clone, Copy)]
enum Movement {
    In(i32),
    Out(i32),
    Adjust(i32),
}

impl Movement {
    fn transaction_type(&self) -> TransactionType {
        match self {
            Movement::In(_) => TransactionType::In,
            Movement::Out(_) => TransactionType::Out,
            Movement::Adjust(_) => TransactionType::Adjust,
        }
    }

    fn audit_action(&self) -> AuditAction {
        match self {
            Movement::In(_) => AuditAction::StockIn,
            Movement::Out(_) => AuditAction::StockOut,
            Movement::Adjust(_) => AuditAction::StockAdjust,
        }
    }
}

/// Computes `(new_quantity, transaction_quantity)` for a movement applied to
/// `current`.
fn compute_movement(
    product: &product::Model,
    movement: Movement,
) -> Result<(i32, i32), ServiceError> {
    let current = product.current_stock;
    match movement {
        Movement::In(qty) => {
            if qty <= 0 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be positive".to_string(),
                ));
            }
            let new = current.checked_add(qty).ok_or_else(|| {
                ServiceError::ValidationError("Resulting stock is out of range".to_string())
            })?;
            Ok((new, qty))
        }
        Movement::Out(qty) => {
            if qty <= 0 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be positive".to_string(),
                ));
            }
            if qty > current {
                return Err(ServiceError::InsufficientStock(format!(
                    "requested {} of {} but only {} in stock",
                    qty, product.sku, current
                )));
            }
            Ok((current - qty, qty))
        }
        Movement::Adjust(new_qty) => {
            if new_qty < 0 {
                return Err(ServiceError::ValidationError(
                    "Adjusted stock cannot be negative".to_string(),
                ));
            }
            Ok((new_qty, (new_qty - current).abs()))
        }
    }
}

#[derive(Clone)]
pub struct StockLedgerService {
    db_pool: Arc<DatabaseConnection>,
    audit: AuditService,
    event_sender: Option<EventSender>,
}

impl StockLedgerService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        audit: AuditService,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db_pool,
            audit,
            event_sender,
        }
    }

    /// Receives `quantity` units into stock.
    pub async fn stock_in(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
        quantity: i32,
        reference: Option<StockReference>,
        note: Option<String>,
    ) -> Result<StockMovement, ServiceError> {
        self.apply(ctx, product_id, Movement::In(quantity), reference, note)
            .await
    }

    /// Withdraws `quantity` units. Fails with `InsufficientStock` and leaves
    /// stock untouched when more is requested than is on hand.
    pub async fn stock_out(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
        quantity: i32,
        reference: Option<StockReference>,
        reason: Option<String>,
    ) -> Result<StockMovement, ServiceError> {
        self.apply(ctx, product_id, Movement::Out(quantity), reference, reason)
            .await
    }

    /// Sets stock to `new_quantity` regardless of its current value.
    pub async fn stock_adjust(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
        new_quantity: i32,
        reason: Option<String>,
    ) -> Result<StockMovement, ServiceError> {
        self.apply(ctx, product_id, Movement::Adjust(new_quantity), None, reason)
            .await
    }

    #[instrument(skip(self, ctx, reference, note), fields(movement = ?movement))]
    async fn apply(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
        movement: Movement,
        reference: Option<StockReference>,
        note: Option<String>,
    ) -> Result<StockMovement, ServiceError> {
        let db = &*self.db_pool;
        let tx_type = movement.transaction_type();

        let before = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let (new_quantity, quantity) = compute_movement(&before, movement).map_err(|e| {
            crate::metrics::record_stock_movement_failure(tx_type.as_ref(), e.kind());
            e
        })?;

        let mut active = before.clone().into_active_model();
        active.current_stock = Set(new_quantity);
        let after = active.update(db).await.map_err(ServiceError::db_error)?;

        let (reference_type, reference_id) = match reference {
            Some(r) => (Some(r.reference_type), Some(r.reference_id)),
            None => (None, None),
        };

        let transaction = match (stock_transaction::ActiveModel {
            product_id: Set(product_id),
            transaction_type: Set(tx_type.to_string()),
            quantity: Set(quantity),
            previous_quantity: Set(before.current_stock),
            new_quantity: Set(new_quantity),
            reference_type: Set(reference_type),
            reference_id: Set(reference_id),
            note: Set(note),
            created_by: Set(ctx.actor_id),
            ..Default::default()
        })
        .insert(db)
        .await
        {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(
                    product_id = %product_id,
                    error = %e,
                    "Stock updated but ledger row could not be written"
                );
                None
            }
        };

        info!(
            product_id = %product_id,
            transaction_type = %tx_type,
            previous = before.current_stock,
            new = new_quantity,
            "Stock movement applied"
        );
        crate::metrics::record_stock_movement(tx_type.as_ref());

        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::changed(movement.audit_action(), before, after.clone()),
            )
            .await;

        if after.is_low_stock() {
            if let Some(sender) = &self.event_sender {
                sender
                    .send_or_log(Event::LowStock {
                        product_id: after.id,
                        sku: after.sku.clone(),
                        name: after.name.clone(),
                        current_stock: after.current_stock,
                        min_stock: after.min_stock,
                    })
                    .await;
            }
        }

        Ok(StockMovement {
            product: after,
            transaction,
        })
    }

    /// Ledger of one product, newest first.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<stock_transaction::Model>, ServiceError> {
        StockTransactionEntity::find()
            .filter(stock_transaction::Column::ProductId.eq(product_id))
            .order_by_desc(stock_transaction::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}
