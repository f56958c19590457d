use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::context::OperationContext;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::errors::ServiceError;
use crate::services::audit::{AuditAction, AuditEntry, AuditService};
use crate::services::stock_ledger::StockLedgerService;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub initial_stock: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub min_stock: i32,
    pub unit_cost: Option<Decimal>,
}

/// Descriptive fields only; stock moves go through the ledger.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub unit_cost: Option<Decimal>,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DatabaseConnection>,
    audit: AuditService,
    ledger: StockLedgerService,
}

impl ProductService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        audit: AuditService,
        ledger: StockLedgerService,
    ) -> Self {
        Self {
            db_pool,
            audit,
            ledger,
        }
    }

    /// Inserts the product with zero stock; a positive `initial_stock` is
    /// then received through the ledger as an opening `IN` movement.
    #[instrument(skip(self, ctx, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        ctx: &OperationContext,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let sku = input.sku.trim().to_string();

        if self.find_by_sku(&sku).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU {} already exists",
                sku
            )));
        }

        let product = product::ActiveModel {
            sku: Set(sku),
            name: Set(input.name),
            unit: Set(input.unit.unwrap_or_else(|| "pcs".to_string())),
            current_stock: Set(0),
            min_stock: Set(input.min_stock),
            unit_cost: Set(input.unit_cost),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(product_id = %product.id, "Product created");
        self.audit
            .record_or_warn(ctx, AuditEntry::created(AuditAction::Create, product.clone()))
            .await;

        if input.initial_stock > 0 {
            let opening = self
                .ledger
                .stock_in(
                    ctx,
                    product.id,
                    input.initial_stock,
                    None,
                    Some("Opening stock".to_string()),
                )
                .await?;
            return Ok(opening.product);
        }
        Ok(product)
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update_product(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let before = self.get_product(product_id).await?;

        let mut active = before.clone().into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(unit) = input.unit {
            active.unit = Set(unit);
        }
        if let Some(min_stock) = input.min_stock {
            active.min_stock = Set(min_stock);
        }
        if input.unit_cost.is_some() {
            active.unit_cost = Set(input.unit_cost);
        }

        let after = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.audit
            .record_or_warn(ctx, AuditEntry::changed(AuditAction::Update, before, after.clone()))
            .await;
        Ok(after)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<product::Model>, ServiceError> {
        ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists products ordered by SKU; `low_stock_only` keeps rows at or
    /// below their minimum.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        low_stock_only: bool,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        if low_stock_only {
            // Column-to-column comparison is filtered in memory; the table is small.
            let all = ProductEntity::find()
                .order_by_asc(product::Column::Sku)
                .all(&*self.db_pool)
                .await
                .map_err(ServiceError::db_error)?;
            let low: Vec<_> = all.into_iter().filter(|p| p.is_low_stock()).collect();
            let total = low.len() as u64;
            let start = (page.max(1) - 1).saturating_mul(per_page);
            let items = low
                .into_iter()
                .skip(usize::try_from(start).unwrap_or(usize::MAX))
                .take(usize::try_from(per_page).unwrap_or(usize::MAX))
                .collect();
            return Ok((items, total));
        }

        let paginator = ProductEntity::find()
            .order_by_asc(product::Column::Sku)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.max(1) - 1)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((items, total))
    }
}
