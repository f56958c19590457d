//! Customer orders and their derived totals.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::context::OperationContext;
use crate::entities::{
    customer::Entity as CustomerEntity,
    order::{self, Entity as OrderEntity, OrderStatus},
    order_item::{self, Entity as OrderItemEntity},
};
use crate::errors::ServiceError;
use crate::services::audit::{AuditAction, AuditEntry, AuditService, OrderSnapshot};
use crate::services::generate_reference;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemInput {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    pub garment_type: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderInput {
    pub customer_id: Uuid,
    #[validate(length(min = 1))]
    pub items: Vec<CreateOrderItemInput>,
    pub discount: Option<Decimal>,
    /// Falls back to the configured default rate
    pub tax_rate: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
}

/// Order header with its lines
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

impl From<OrderDetail> for OrderSnapshot {
    fn from(detail: OrderDetail) -> Self {
        OrderSnapshot {
            order: detail.order,
            items: detail.items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

/// `tax = round2((subtotal - discount) * tax_rate)`,
/// `total = subtotal - discount + tax`.
pub fn compute_totals(
    lines: &[(i32, Decimal)],
    discount: Decimal,
    tax_rate: Decimal,
) -> Result<OrderTotals, ServiceError> {
    if lines.iter().any(|(qty, price)| *qty <= 0 || price.is_sign_negative()) {
        return Err(ServiceError::ValidationError(
            "Line quantities must be positive and prices non-negative".to_string(),
        ));
    }
    if discount.is_sign_negative() {
        return Err(ServiceError::ValidationError(
            "Discount cannot be negative".to_string(),
        ));
    }
    if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE {
        return Err(ServiceError::ValidationError(
            "Tax rate must be between 0 and 1".to_string(),
        ));
    }

    let subtotal: Decimal = lines
        .iter()
        .map(|(qty, price)| line_total(*qty, *price))
        .sum();
    if discount > subtotal {
        return Err(ServiceError::ValidationError(format!(
            "Discount {} exceeds subtotal {}",
            discount, subtotal
        )));
    }

    let taxable = subtotal - discount;
    let tax = (taxable * tax_rate).round_dp(2);
    Ok(OrderTotals {
        subtotal,
        discount,
        tax,
        total: taxable + tax,
    })
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DatabaseConnection>,
    audit: AuditService,
    default_tax_rate: Decimal,
}

impl OrderService {
    pub fn new(db_pool: Arc<DatabaseConnection>, audit: AuditService, default_tax_rate: f64) -> Self {
        Self {
            db_pool,
            audit,
            default_tax_rate: Decimal::from_f64(default_tax_rate)
                .unwrap_or_default()
                .round_dp(4),
        }
    }

    /// Inserts the header and lines in one transaction.
    #[instrument(skip(self, ctx, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(
        &self,
        ctx: &OperationContext,
        input: CreateOrderInput,
    ) -> Result<OrderDetail, ServiceError> {
        input.validate()?;
        for item in &input.items {
            item.validate()?;
        }

        CustomerEntity::find_by_id(input.customer_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        let lines: Vec<(i32, Decimal)> = input
            .items
            .iter()
            .map(|item| (item.quantity, item.unit_price))
            .collect();
        let tax_rate = input.tax_rate.unwrap_or(self.default_tax_rate);
        let totals = compute_totals(&lines, input.discount.unwrap_or_default(), tax_rate)?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let order = order::ActiveModel {
            order_number: Set(generate_reference("ORD")),
            customer_id: Set(input.customer_id),
            status: Set(OrderStatus::Draft.to_string()),
            subtotal: Set(totals.subtotal),
            discount: Set(totals.discount),
            tax_rate: Set(tax_rate),
            tax: Set(totals.tax),
            total: Set(totals.total),
            due_date: Set(input.due_date),
            notes: Set(input.notes),
            created_by: Set(ctx.actor_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            let row = order_item::ActiveModel {
                order_id: Set(order.id),
                description: Set(item.description),
                garment_type: Set(item.garment_type),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(line_total(item.quantity, item.unit_price)),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(row);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_number = %order.order_number, total = %order.total, "Order created");
        let detail = OrderDetail { order, items };
        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::created(AuditAction::Create, OrderSnapshot::from(detail.clone())),
            )
            .await;
        Ok(detail)
    }

    async fn load_items(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = OrderEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
        let items = self.load_items(order.id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Headers only, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.as_ref()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(page.max(1) - 1)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((orders, total))
    }

    #[instrument(skip(self, ctx))]
    pub async fn update_status(
        &self,
        ctx: &OperationContext,
        id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderDetail, ServiceError> {
        let before = self.get_order(id).await?;
        let current = before.order.status().ok_or_else(|| {
            ServiceError::InvalidStatus(format!(
                "Order {} has unknown status {}",
                before.order.order_number, before.order.status
            ))
        })?;

        if current == new_status {
            return Ok(before);
        }
        if !current.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move order {} from {} to {}",
                before.order.order_number, current, new_status
            )));
        }

        let mut active = before.order.clone().into_active_model();
        active.status = Set(new_status.to_string());
        let order = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        info!(order_number = %order.order_number, from = %current, to = %new_status, "Order status changed");
        let after = OrderDetail {
            order,
            items: before.items.clone(),
        };
        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::changed(
                    AuditAction::StatusChange,
                    OrderSnapshot::from(before),
                    OrderSnapshot::from(after.clone()),
                ),
            )
            .await;
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_apply_discount_before_tax() {
        let totals = compute_totals(&[(10, dec!(150)), (5, dec!(200))], dec!(500), dec!(0.07)).unwrap();
        assert_eq!(totals.subtotal, dec!(2500));
        assert_eq!(totals.tax, dec!(140.00));
        assert_eq!(totals.total, dec!(2140.00));
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        let totals = compute_totals(&[(3, dec!(33.33))], Decimal::ZERO, dec!(0.07)).unwrap();
        assert_eq!(totals.subtotal, dec!(99.99));
        assert_eq!(totals.tax, dec!(7.00));
        assert_eq!(totals.total, dec!(106.99));
    }

    #[test]
    fn discount_larger_than_subtotal_is_rejected() {
        assert!(matches!(
            compute_totals(&[(1, dec!(100))], dec!(100.01), Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn negative_prices_and_rates_are_rejected() {
        assert!(compute_totals(&[(1, dec!(-1))], Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(compute_totals(&[(1, dec!(1))], Decimal::ZERO, dec!(1.5)).is_err());
    }
}
