//! Production jobs: creation, status workflow, output, QC and rework.
//!
//! Status changes go through [`crate::services::job_status`]; every applied
//! transition writes the job row, appends a `production_job_logs` row and
//! records one audit entry.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::context::OperationContext;
use crate::entities::{
    production_job::{self, Entity as ProductionJobEntity, JobPriority, JobStatus},
    production_job_log::{self, Entity as ProductionJobLogEntity},
    qc_record::{self, Entity as QcRecordEntity},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{AuditAction, AuditEntry, AuditService};
use crate::services::generate_reference;
use crate::services::job_status::{self, JobEvent, Transition};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateJobInput {
    /// Generated as `JOB-YYYYMMDD-XXXXXX` when omitted
    #[validate(length(min = 1, max = 64))]
    pub job_number: Option<String>,
    pub order_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub product_sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub garment_type: Option<String>,
    pub print_method: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub priority: Option<JobPriority>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct QcCheckpointInput {
    #[validate(length(min = 1, max = 128))]
    pub checkpoint: String,
    pub passed: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QcResult {
    pub job: production_job::Model,
    pub records: Vec<qc_record::Model>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub priority: Option<JobPriority>,
    pub is_rework: Option<bool>,
    pub order_id: Option<Uuid>,
}

/// Writes prepared for one applied transition
struct AppliedTransition {
    after: production_job::Model,
    from: JobStatus,
    to: JobStatus,
}

#[derive(Clone)]
pub struct ProductionJobService {
    db_pool: Arc<DatabaseConnection>,
    audit: AuditService,
    event_sender: Option<EventSender>,
}

impl ProductionJobService {
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

    #[instrument(skip(self, ctx, input), fields(title = %input.title))]
    pub async fn create_job(
        &self,
        ctx: &OperationContext,
        input: CreateJobInput,
    ) -> Result<production_job::Model, ServiceError> {
        input.validate()?;

        let job_number = match input.job_number {
            Some(number) => {
                let number = number.trim().to_string();
                if number.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "Job number cannot be blank".to_string(),
                    ));
                }
                if self.find_by_number(&number).await?.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Job number {} already exists",
                        number
                    )));
                }
                number
            }
            None => generate_reference("JOB"),
        };

        let job = production_job::ActiveModel {
            job_number: Set(job_number),
            order_id: Set(input.order_id),
            product_sku: Set(input.product_sku),
            title: Set(input.title),
            garment_type: Set(input.garment_type),
            print_method: Set(input.print_method),
            quantity: Set(input.quantity),
            produced_qty: Set(0),
            passed_qty: Set(0),
            failed_qty: Set(0),
            status: Set(JobStatus::Pending.to_string()),
            priority: Set(input.priority.unwrap_or_default().to_string()),
            progress_percent: Set(0),
            due_date: Set(input.due_date),
            assigned_to: Set(input.assigned_to),
            started_at: Set(None),
            completed_at: Set(None),
            is_rework: Set(false),
            rework_of: Set(None),
            rework_count: Set(0),
            rework_reason: Set(None),
            notes: Set(input.notes),
            created_by: Set(ctx.actor_id),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(job_id = %job.id, job_number = %job.job_number, "Production job created");
        self.audit
            .record_or_warn(ctx, AuditEntry::created(AuditAction::Create, job.clone()))
            .await;
        Ok(job)
    }

    fn current_status(job: &production_job::Model) -> Result<JobStatus, ServiceError> {
        job.status().ok_or_else(|| {
            ServiceError::InvalidStatus(format!(
                "Job {} has unknown status {}",
                job.job_number, job.status
            ))
        })
    }

    /// Writes the status change, timestamps and progress, plus the log row.
    /// `extra` lets callers fold additional column changes into the same update.
    async fn write_transition(
        &self,
        ctx: &OperationContext,
        before: &production_job::Model,
        to: JobStatus,
        note: Option<String>,
        extra: impl FnOnce(&mut production_job::ActiveModel),
    ) -> Result<AppliedTransition, ServiceError> {
        let from = Self::current_status(before)?;
        let now = Utc::now();

        let mut active = before.clone().into_active_model();
        active.status = Set(to.to_string());
        if let Some(progress) = to.progress_percent() {
            active.progress_percent = Set(progress);
        }
        if to.is_work_in_progress() && before.started_at.is_none() {
            active.started_at = Set(Some(now));
        }
        if to == JobStatus::Completed {
            active.completed_at = Set(Some(now));
        }
        extra(&mut active);

        let after = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let log = production_job_log::ActiveModel {
            job_id: Set(after.id),
            from_status: Set(Some(from.to_string())),
            to_status: Set(to.to_string()),
            note: Set(note),
            actor_id: Set(ctx.actor_id),
            actor_name: Set(Some(ctx.actor_label())),
            ..Default::default()
        };
        if let Err(e) = log.insert(&*self.db_pool).await {
            warn!(job_id = %after.id, error = %e, "Status changed but job log row could not be written");
        }

        crate::metrics::record_job_transition(to.as_ref());
        info!(
            job_number = %after.job_number,
            from = %from,
            to = %to,
            "Job status changed"
        );

        Ok(AppliedTransition { after, from, to })
    }

    async fn emit_transition_events(&self, applied: &AppliedTransition) {
        let Some(sender) = &self.event_sender else {
            return;
        };
        let job = &applied.after;

        sender
            .send_or_log(Event::JobStatusChanged {
                job_id: job.id,
                job_number: job.job_number.clone(),
                from_status: applied.from.to_string(),
                to_status: applied.to.to_string(),
            })
            .await;

        match applied.to {
            JobStatus::Completed => {
                sender
                    .send_or_log(Event::JobCompleted {
                        job_id: job.id,
                        job_number: job.job_number.clone(),
                        produced_qty: job.produced_qty,
                    })
                    .await
            }
            JobStatus::QcFailed => {
                sender
                    .send_or_log(Event::QcFailed {
                        job_id: job.id,
                        job_number: job.job_number.clone(),
                        failed_qty: job.failed_qty,
                    })
                    .await
            }
            _ => {}
        }
    }

    /// Moves a job to `new_status` if the transition table allows it.
    /// Requesting the current status is a no-op.
    #[instrument(skip(self, ctx, note))]
    pub async fn update_job_status(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
        new_status: JobStatus,
        note: Option<String>,
    ) -> Result<production_job::Model, ServiceError> {
        let before = self.get_job(job_id).await?;
        let from = Self::current_status(&before)?;

        let to = match job_status::transition_to(from, new_status)? {
            Transition::Unchanged => return Ok(before),
            Transition::To(to) => to,
        };

        let applied = self
            .write_transition(ctx, &before, to, note, |_| {})
            .await?;

        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::changed(AuditAction::StatusChange, before, applied.after.clone()),
            )
            .await;
        self.emit_transition_events(&applied).await;

        Ok(applied.after)
    }

    /// Applies a named event instead of a target status.
    pub async fn apply_event(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
        event: JobEvent,
        note: Option<String>,
    ) -> Result<production_job::Model, ServiceError> {
        let before = self.get_job(job_id).await?;
        let to = job_status::apply(Self::current_status(&before)?, event)?;
        self.update_job_status(ctx, job_id, to, note).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn record_output(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
        produced_qty: i32,
    ) -> Result<production_job::Model, ServiceError> {
        if produced_qty < 0 {
            return Err(ServiceError::ValidationError(
                "Produced quantity cannot be negative".to_string(),
            ));
        }

        let before = self.get_job(job_id).await?;
        if Self::current_status(&before)? == JobStatus::Cancelled {
            return Err(ServiceError::InvalidStatus(format!(
                "Job {} is cancelled",
                before.job_number
            )));
        }

        let mut active = before.clone().into_active_model();
        active.produced_qty = Set(produced_qty);
        let after = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::changed(AuditAction::RecordOutput, before, after.clone()),
            )
            .await;
        Ok(after)
    }

    /// Spawns a rework job from `original_id`, numbered `<original>-RW<n>`.
    #[instrument(skip(self, ctx, reason))]
    pub async fn create_rework_job(
        &self,
        ctx: &OperationContext,
        original_id: Uuid,
        quantity: i32,
        reason: String,
    ) -> Result<production_job::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Rework quantity must be positive".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Rework reason is required".to_string(),
            ));
        }

        let original = self.get_job(original_id).await?;
        let rework_number = original.rework_count + 1;
        let job_number = format!("{}-RW{}", original.job_number, rework_number);
        if self.find_by_number(&job_number).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Job number {} already exists",
                job_number
            )));
        }

        let rework = production_job::ActiveModel {
            job_number: Set(job_number),
            order_id: Set(original.order_id),
            product_sku: Set(original.product_sku.clone()),
            title: Set(original.title.clone()),
            garment_type: Set(original.garment_type.clone()),
            print_method: Set(original.print_method.clone()),
            quantity: Set(quantity),
            produced_qty: Set(0),
            passed_qty: Set(0),
            failed_qty: Set(0),
            status: Set(JobStatus::Pending.to_string()),
            priority: Set(original.priority().raised().to_string()),
            progress_percent: Set(0),
            due_date: Set(original.due_date),
            assigned_to: Set(original.assigned_to.clone()),
            started_at: Set(None),
            completed_at: Set(None),
            is_rework: Set(true),
            rework_of: Set(Some(original.id)),
            rework_count: Set(0),
            rework_reason: Set(Some(reason)),
            notes: Set(original.notes.clone()),
            created_by: Set(ctx.actor_id),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        let mut active = original.clone().into_active_model();
        active.rework_count = Set(rework_number);
        let original_after = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        info!(
            original = %original.job_number,
            rework = %rework.job_number,
            "Rework job created"
        );

        self.audit
            .record_or_warn(ctx, AuditEntry::created(AuditAction::Rework, rework.clone()))
            .await;
        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::changed(AuditAction::Rework, original, original_after),
            )
            .await;

        Ok(rework)
    }

    /// Records one row per checkpoint and moves the job to `qc_passed` or
    /// `qc_failed`. The produced quantity is counted wholly as passed or
    /// failed according to `overall_passed`.
    #[instrument(skip(self, ctx, checkpoints), fields(checkpoints = checkpoints.len()))]
    pub async fn perform_qc_check(
        &self,
        ctx: &OperationContext,
        job_id: Uuid,
        checkpoints: Vec<QcCheckpointInput>,
        overall_passed: bool,
    ) -> Result<QcResult, ServiceError> {
        if checkpoints.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one checkpoint is required".to_string(),
            ));
        }
        for checkpoint in &checkpoints {
            checkpoint.validate()?;
        }

        let before = self.get_job(job_id).await?;
        let event = if overall_passed {
            JobEvent::PassQc
        } else {
            JobEvent::FailQc
        };
        let to = job_status::apply(Self::current_status(&before)?, event)?;

        let mut records = Vec::with_capacity(checkpoints.len());
        for checkpoint in &checkpoints {
            let record = qc_record::ActiveModel {
                job_id: Set(before.id),
                checkpoint: Set(checkpoint.checkpoint.clone()),
                passed: Set(checkpoint.passed),
                note: Set(checkpoint.note.clone()),
                inspector_id: Set(ctx.actor_id),
                inspector_name: Set(ctx.actor_name.clone()),
                ..Default::default()
            }
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
            records.push(record);
        }

        let produced = before.produced_qty;
        let (passed_qty, failed_qty) = if overall_passed {
            (produced, 0)
        } else {
            (0, produced)
        };
        let passed_points = checkpoints.iter().filter(|c| c.passed).count();
        let note = format!(
            "QC {}: {}/{} checkpoints passed",
            if overall_passed { "passed" } else { "failed" },
            passed_points,
            checkpoints.len()
        );

        let applied = self
            .write_transition(ctx, &before, to, Some(note), |active| {
                active.passed_qty = Set(passed_qty);
                active.failed_qty = Set(failed_qty);
            })
            .await?;

        self.audit
            .record_or_warn(
                ctx,
                AuditEntry::changed(AuditAction::QcCheck, before, applied.after.clone()),
            )
            .await;
        self.emit_transition_events(&applied).await;

        Ok(QcResult {
            job: applied.after,
            records,
        })
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<production_job::Model, ServiceError> {
        ProductionJobEntity::find_by_id(job_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Production job {} not found", job_id)))
    }

    async fn find_by_number(
        &self,
        job_number: &str,
    ) -> Result<Option<production_job::Model>, ServiceError> {
        ProductionJobEntity::find()
            .filter(production_job::Column::JobNumber.eq(job_number))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_job_by_number(
        &self,
        job_number: &str,
    ) -> Result<production_job::Model, ServiceError> {
        self.find_by_number(job_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Production job {} not found", job_number)))
    }

    #[instrument(skip(self))]
    pub async fn list_jobs(
        &self,
        filter: JobFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<production_job::Model>, u64), ServiceError> {
        let mut query = ProductionJobEntity::find();

        if let Some(status) = filter.status {
            query = query.filter(production_job::Column::Status.eq(status.as_ref()));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(production_job::Column::Priority.eq(priority.as_ref()));
        }
        if let Some(is_rework) = filter.is_rework {
            query = query.filter(production_job::Column::IsRework.eq(is_rework));
        }
        if let Some(order_id) = filter.order_id {
            query = query.filter(production_job::Column::OrderId.eq(order_id));
        }

        let paginator = query
            .order_by_desc(production_job::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let jobs = paginator
            .fetch_page(page.max(1) - 1)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((jobs, total))
    }

    pub async fn job_logs(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<production_job_log::Model>, ServiceError> {
        ProductionJobLogEntity::find()
            .filter(production_job_log::Column::JobId.eq(job_id))
            .order_by_asc(production_job_log::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn qc_records(&self, job_id: Uuid) -> Result<Vec<qc_record::Model>, ServiceError> {
        QcRecordEntity::find()
            .filter(qc_record::Column::JobId.eq(job_id))
            .order_by_asc(qc_record::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}
