use crate::entities::notification::NotificationKind;
use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Domain events raised by the factory services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    LowStock {
        product_id: Uuid,
        sku: String,
        name: String,
        current_stock: i32,
        min_stock: i32,
    },
    JobStatusChanged {
        job_id: Uuid,
        job_number: String,
        from_status: String,
        to_status: String,
    },
    JobCompleted {
        job_id: Uuid,
        job_number: String,
        produced_qty: i32,
    },
    QcFailed {
        job_id: Uuid,
        job_number: String,
        failed_qty: i32,
    },
}

impl Event {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Event::LowStock { .. } => NotificationKind::LowStock,
            Event::JobStatusChanged { .. } => NotificationKind::JobStatusChanged,
            Event::JobCompleted { .. } => NotificationKind::JobCompleted,
            Event::QcFailed { .. } => NotificationKind::QcFailed,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Event::LowStock { sku, .. } => format!("Low stock: {}", sku),
            Event::JobStatusChanged { job_number, .. } => format!("Job {} updated", job_number),
            Event::JobCompleted { job_number, .. } => format!("Job {} completed", job_number),
            Event::QcFailed { job_number, .. } => format!("Job {} failed QC", job_number),
        }
    }

    /// Human-readable text pushed to the messaging channel.
    pub fn message(&self) -> String {
        match self {
            Event::LowStock {
                sku,
                name,
                current_stock,
                min_stock,
                ..
            } => format!(
                "{} ({}) is down to {} (minimum {})",
                name, sku, current_stock, min_stock
            ),
            Event::JobStatusChanged {
                job_number,
                from_status,
                to_status,
                ..
            } => format!("{}: {} -> {}", job_number, from_status, to_status),
            Event::JobCompleted {
                job_number,
                produced_qty,
                ..
            } => format!("{} completed with {} pieces produced", job_number, produced_qty),
            Event::QcFailed {
                job_number,
                failed_qty,
                ..
            } => format!(
                "{} failed QC; {} pieces need rework",
                job_number, failed_qty
            ),
        }
    }

    /// `(entity_type, entity_id)` the event refers to
    pub fn entity(&self) -> (&'static str, Uuid) {
        match self {
            Event::LowStock { product_id, .. } => ("product", *product_id),
            Event::JobStatusChanged { job_id, .. }
            | Event::JobCompleted { job_id, .. }
            | Event::QcFailed { job_id, .. } => ("production_job", *job_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Channel pair sized from configuration
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), ServiceError>;
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>, handler: Arc<dyn EventHandler>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(kind = %event.kind(), "Received event");

        if let Err(e) = handler.handle_event(event.clone()).await {
            error!(kind = %event.kind(), error = %e, "Failed to handle event");
        }
    }

    warn!("Event processing loop has ended");
}
