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
use crate::entities::customer::{self, Entity as CustomerEntity};
use crate::errors::ServiceError;
use crate::services::audit::{AuditAction, AuditEntry, AuditService};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    /// `active` or `inactive`
    #[validate(custom = "validate_customer_status")]
    pub status: Option<String>,
}

fn validate_customer_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        "active" | "inactive" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_customer_status")),
    }
}

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DatabaseConnection>,
    audit: AuditService,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DatabaseConnection>, audit: AuditService) -> Self {
        Self { db_pool, audit }
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn create_customer(
        &self,
        ctx: &OperationContext,
        input: CreateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;

        let customer = customer::ActiveModel {
            name: Set(input.name.trim().to_string()),
            phone: Set(input.phone),
            email: Set(input.email),
            company: Set(input.company),
            address: Set(input.address),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(customer_id = %customer.id, "Customer created");
        self.audit
            .record_or_warn(ctx, AuditEntry::created(AuditAction::Create, customer.clone()))
            .await;
        Ok(customer)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        CustomerEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    /// Ordered by name; `search` matches a substring of the name.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        search: Option<String>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let mut query = CustomerEntity::find();
        if let Some(term) = search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(customer::Column::Name.contains(term));
        }

        let paginator = query
            .order_by_asc(customer::Column::Name)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let customers = paginator
            .fetch_page(page.max(1) - 1)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((customers, total))
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update_customer(
        &self,
        ctx: &OperationContext,
        id: Uuid,
        input: UpdateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let before = self.get_customer(id).await?;

        let mut active = before.clone().into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.phone.is_some() {
            active.phone = Set(input.phone);
        }
        if input.email.is_some() {
            active.email = Set(input.email);
        }
        if input.company.is_some() {
            active.company = Set(input.company);
        }
        if input.address.is_some() {
            active.address = Set(input.address);
        }
        if input.notes.is_some() {
            active.notes = Set(input.notes);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_input_rejects_bad_email() {
        let input = CreateCustomerInput {
            name: "Ploy".into(),
            phone: None,
            email: Some("not-an-email".into()),
            company: None,
            address: None,
            notes: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn status_must_be_known() {
        assert!(validate_customer_status("active").is_ok());
        assert!(validate_customer_status("archived").is_err());
    }
}
