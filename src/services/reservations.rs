//! Stock Reservation Manager
//!
//! Reservations earmark product stock for a production job without touching
//! `current_stock`. Available quantity is derived as
//! `current_stock - sum(quantity of reserved rows)`. Stock only leaves the
//! shelf when a job consumes its reservations through the ledger.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::context::OperationContext;
use crate::entities::{
    product::{self, Entity as ProductEntity},
    production_job::{self, Entity as ProductionJobEntity},
    stock_reservation::{self, Entity as StockReservationEntity, ReservationStatus},
};
use crate::errors::ServiceError;
use crate::services::audit::{AuditAction, AuditEntry, AuditService};
use crate::services::stock_ledger::{StockLedgerService, StockReference};

/// How a multi-item reservation reacts to a failing item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Stop at the first failure and keep the reservations made so far.
    #[default]
    BestEffort,
    /// Reserve everything in one transaction; any failure rolls back the batch.
    AllOrNothing,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReservationItem {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationFailure {
    pub product_id: Uuid,
    pub quantity: i32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchReservation {
    pub reserved: Vec<stock_reservation::Model>,
    pub failure: Option<ReservationFailure>,
}

/// Stock position of a product with reservations taken into account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AvailableStock {
    pub product_id: Uuid,
    pub sku: String,
    pub current_stock: i32,
    pub reserved: i64,
    pub available: i64,
}

async fn find_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    ProductEntity::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

async fn find_job<C: ConnectionTrait>(
    conn: &C,
    job_id: Uuid,
) -> Result<production_job::Model, ServiceError> {
    ProductionJobEntity::find_by_id(job_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Production job {} not found", job_id)))
}

async fn reserved_total<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> Result<i64, ServiceError> {
    let rows = StockReservationEntity::find()
        .filter(stock_reservation::Column::ProductId.eq(product_id))
        .filter(stock_reservation::Column::Status.eq(ReservationStatus::Reserved.as_ref()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(rows.iter().map(|r| i64::from(r.quantity)).sum())
}

async fn available_on<C: ConnectionTrait>(
    conn: &C,
    product: &product::Model,
) -> Result<AvailableStock, ServiceError> {
    let reserved = reserved_total(conn, product.id).await?;
    Ok(AvailableStock {
        product_id: product.id,
        sku: product.sku.clone(),
        current_stock: product.current_stock,
        reserved,
        available: i64::from(product.current_stock) - reserved,
    })
}

#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DatabaseConnection>,
    ledger: StockLedgerService,
}

impl ReservationService {
    pub fn new(db_pool: Arc<DatabaseConnection>, ledger: StockLedgerService) -> Self {
        Self { db_pool, ledger }
    }

    /// Reserves `quantity` of a product for a job. Fails with
    /// `InsufficientStock` without inserting anything when the quantity
    /// exceeds what is available.
    pub async fn create_reservation(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<stock_reservation::Model, ServiceError> {
        Self::create_reservation_on(&*self.db_pool, ctx, job_id, product_id, quantity).await
    }

    #[instrument(skip(conn, ctx))]
    async fn create_reservation_on<C: ConnectionTrait>(
        conn: &C,
        ctx: &OperationContext,
        job_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<stock_reservation::Model, ServiceError> {
        if quantity <= 0 {
            crate::metrics::record_reservation_failure("validation");
            return Err(ServiceError::ValidationError(
                "Reservation quantity must be positive".to_string(),
            ));
        }

        let job = find_job(conn, job_id).await?;
        let product = find_product(conn, product_id).await?;
        let stock = available_on(conn, &product).await?;

        if i64::from(quantity) > stock.available {
            crate::metrics::record_reservation_failure("insufficient_stock");
            warn!(
                product_id = %product_id,
                requested = quantity,
                available = stock.available,
                "Reservation rejected"
            );
            return Err(ServiceError::InsufficientStock(format!(
                "requested {} of {} but only {} available",
                quantity, product.sku, stock.available
            )));
        }

        let reservation = stock_reservation::ActiveModel {
            job_id: Set(job.id),
            product_id: Set(product.id),
            quantity: Set(quantity),
            status: Set(ReservationStatus::Reserved.to_string()),
            reserved_by: Set(ctx.actor_id),
            released_at: Set(None),
            used_at: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;

        crate::metrics::record_reservation_created();
        info!(
            reservation_id = %reservation.id,
            job_number = %job.job_number,
            sku = %product.sku,
            quantity,
            "Stock reserved"
        );

        AuditService::record_or_warn_on(
            conn,
            ctx,
            AuditEntry::created(AuditAction::Reserve, reservation.clone()),
        )
        .await;

        Ok(reservation)
    }

    /// Reserves several products for one job, one item after another.
    #[instrument(skip(self, ctx, items), fields(items = items.len()))]
    pub async fn reserve_for_job(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
        items: Vec<ReservationItem>,
        policy: BatchPolicy,
    ) -> Result<BatchReservation, ServiceError> {
        for item in &items {
            item.validate()?;
        }

        match policy {
            BatchPolicy::BestEffort => {
                let mut reserved = Vec::with_capacity(items.len());
                for item in items {
                    match self
                        .create_reservation(ctx, job_id, item.product_id, item.quantity)
                        .await
                    {
                        Ok(row) => reserved.push(row),
                        Err(e) => {
                            warn!(
                                product_id = %item.product_id,
                                kept = reserved.len(),
                                error = %e,
                                "Batch reservation stopped; earlier reservations are kept"
                            );
                            return Ok(BatchReservation {
                                reserved,
                                failure: Some(ReservationFailure {
                                    product_id: item.product_id,
                                    quantity: item.quantity,
                                    error: e.to_string(),
                                }),
                            });
                        }
                    }
                }
                Ok(BatchReservation {
                    reserved,
                    failure: None,
                })
            }
            BatchPolicy::AllOrNothing => {
                let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
                let mut reserved = Vec::with_capacity(items.len());
                for item in items {
                    match Self::create_reservation_on(
                        &txn,
                        ctx,
                        job_id,
                        item.product_id,
                        item.quantity,
                    )
                    .await
                    {
                        Ok(row) => reserved.push(row),
                        Err(e) => {
                            warn!(
                                product_id = %item.product_id,
                                rolled_back = reserved.len(),
                                error = %e,
                                "Batch reservation rolled back"
                            );
                            txn.rollback().await.map_err(ServiceError::db_error)?;
                            return Err(e);
                        }
                    }
                }
                txn.commit().await.map_err(ServiceError::db_error)?;
                Ok(BatchReservation {
                    reserved,
                    failure: None,
                })
            }
        }
    }

    async fn get_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<stock_reservation::Model, ServiceError> {
        StockReservationEntity::find_by_id(reservation_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Reservation {} not found", reservation_id))
            })
    }

    /// Moves a `reserved` row to `released` or `used`.
    async fn close_reservation(
        &self,
        ctx: &OperationContext,
        reservation_id: Uuid,
        target: ReservationStatus,
    ) -> Result<stock_reservation::Model, ServiceError> {
        let before = self.get_reservation(reservation_id).await?;
        if !before.is_active() {
            return Err(ServiceError::InvalidStatus(format!(
                "Reservation {} is {} and cannot be {}",
                reservation_id, before.status, target
            )));
        }

        let now = Utc::now();
        let mut active = before.clone().into_active_model();
        active.status = Set(target.to_string());
        let action = match target {
            ReservationStatus::Released => {
                active.released_at = Set(Some(now));
                AuditAction::Release
            }
            ReservationStatus::Used => {
                active.used_at = Set(Some(now));
                AuditAction::MarkUsed
            }
            ReservationStatus::Reserved => {
                return Err(ServiceError::InvalidStatus(
                    "Reservation is already reserved".to_string(),
                ))
            }
        };

        let after = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        info!(reservation_id = %reservation_id, status = %target, "Reservation closed");
        self.audit_on_pool(ctx, AuditEntry::changed(action, before, after.clone()))
            .await;
        Ok(after)
    }

    async fn audit_on_pool(&self, ctx: &OperationContext, entry: AuditEntry) {
        AuditService::record_or_warn_on(&*self.db_pool, ctx, entry).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn release_reservation(
        &self,
        ctx: &OperationContext,
        reservation_id: Uuid,
    ) -> Result<stock_reservation::Model, ServiceError> {
        self.close_reservation(ctx, reservation_id, ReservationStatus::Released)
            .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn mark_used(
        &self,
        ctx: &OperationContext,
        reservation_id: Uuid,
    ) -> Result<stock_reservation::Model, ServiceError> {
        self.close_reservation(ctx, reservation_id, ReservationStatus::Used)
            .await
    }

    /// Takes every reserved item of the job out of stock and marks the
    /// reservations used. Stops at the first item that cannot be withdrawn.
    #[instrument(skip(self, ctx))]
    pub async fn consume_for_job(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
    ) -> Result<Vec<stock_reservation::Model>, ServiceError> {
        let job = find_job(&*self.db_pool, job_id).await?;
        let pending: Vec<_> = self
            .list_for_job(job_id)
            .await?
            .into_iter()
            .filter(|r| r.is_active())
            .collect();

        let mut used = Vec::with_capacity(pending.len());
        for reservation in pending {
            self.ledger
                .stock_out(
                    ctx,
                    reservation.product_id,
                    reservation.quantity,
                    Some(StockReference::production_job(job.id)),
                    Some(format!("Consumed by {}", job.job_number)),
                )
                .await?;
            used.push(self.mark_used(ctx, reservation.id).await?);
        }

        info!(job_number = %job.job_number, consumed = used.len(), "Job materials consumed");
        Ok(used)
    }

    #[instrument(skip(self))]
    pub async fn available_quantity(&self, product_id: Uuid) -> Result<AvailableStock, ServiceError> {
        let product = find_product(&*self.db_pool, product_id).await?;
        available_on(&*self.db_pool, &product).await
    }

    pub async fn list_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<stock_reservation::Model>, ServiceError> {
        StockReservationEntity::find()
            .filter(stock_reservation::Column::JobId.eq(job_id))
            .order_by_asc(stock_reservation::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn list_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<stock_reservation::Model>, ServiceError> {
        StockReservationEntity::find()
            .filter(stock_reservation::Column::ProductId.eq(product_id))
            .order_by_asc(stock_reservation::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}
