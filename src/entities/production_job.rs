use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Production job status. `assigned` and `in_progress` are accepted as
/// aliases of `reserved` and `printing`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    #[serde(alias = "assigned")]
    #[strum(to_string = "reserved", serialize = "assigned")]
    Reserved,
    #[serde(alias = "in_progress")]
    #[strum(to_string = "printing", serialize = "in_progress")]
    Printing,
    Curing,
    Packing,
    Completed,
    QcPassed,
    QcFailed,
    Cancelled,
}

impl JobStatus {
    /// Progress shown for a job sitting in this status. `None` means the
    /// previous value is kept.
    pub fn progress_percent(&self) -> Option<i32> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Reserved => Some(10),
            JobStatus::Printing => Some(40),
            JobStatus::Curing => Some(60),
            JobStatus::Packing => Some(80),
            JobStatus::Completed | JobStatus::QcPassed | JobStatus::QcFailed => Some(100),
            JobStatus::Cancelled => None,
        }
    }

    /// Floor statuses that stamp `started_at` the first time they are entered.
    pub fn is_work_in_progress(&self) -> bool {
        matches!(
            self,
            JobStatus::Printing | JobStatus::Curing | JobStatus::Packing
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl JobPriority {
    /// One level up, saturating at `Urgent`.
    pub fn raised(self) -> Self {
        match self {
            JobPriority::Low => JobPriority::Normal,
            JobPriority::Normal => JobPriority::High,
            JobPriority::High | JobPriority::Urgent => JobPriority::Urgent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ProductionJob)]
#[sea_orm(table_name = "production_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub job_number: String,
    pub order_id: Option<Uuid>,
    pub product_sku: Option<String>,
    pub title: String,
    pub garment_type: Option<String>,
    pub print_method: Option<String>,
    pub quantity: i32,
    pub produced_qty: i32,
    pub passed_qty: i32,
    pub failed_qty: i32,
    pub status: String,
    pub priority: String,
    pub progress_percent: i32,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_rework: bool,
    pub rework_of: Option<Uuid>,
    pub rework_count: i32,
    pub rework_reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn status(&self) -> Option<JobStatus> {
        self.status.parse().ok()
    }

    pub fn priority(&self) -> JobPriority {
        self.priority.parse().unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::production_job_log::Entity")]
    Logs,
    #[sea_orm(has_many = "super::qc_record::Entity")]
    QcRecords,
    #[sea_orm(has_many = "super::stock_reservation::Entity")]
    StockReservations,
}

impl Related<super::production_job_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl Related<super::qc_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QcRecords.def()
    }
}

impl Related<super::stock_reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockReservations.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
        }

        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}
