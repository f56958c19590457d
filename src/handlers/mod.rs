pub mod audit;
pub mod common;
pub mod customers;
pub mod messaging;
pub mod notifications;
pub mod orders;
pub mod production_jobs;
pub mod products;
pub mod reservations;
pub mod stock;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    audit::AuditService, customers::CustomerService, notifications::NotificationService,
    orders::OrderService, production_jobs::ProductionJobService, products::ProductService,
    reservations::ReservationService, stock_ledger::StockLedgerService,
};
use crate::webhooks::MessagingClient;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub audit: Arc<AuditService>,
    pub products: Arc<ProductService>,
    pub ledger: Arc<StockLedgerService>,
    pub reservations: Arc<ReservationService>,
    pub jobs: Arc<ProductionJobService>,
    pub customers: Arc<CustomerService>,
    pub orders: Arc<OrderService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    /// Wire every service against one pool. Services that raise domain
    /// events get a clone of `event_sender` when one is supplied.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<EventSender>,
        messaging: Option<MessagingClient>,
        config: &AppConfig,
    ) -> Self {
        let audit = AuditService::new(db_pool.clone());
        let ledger =
            StockLedgerService::new(db_pool.clone(), audit.clone(), event_sender.clone());
        let reservations = ReservationService::new(db_pool.clone(), ledger.clone());
        let jobs = ProductionJobService::new(db_pool.clone(), audit.clone(), event_sender);

        Self {
            products: Arc::new(ProductService::new(
                db_pool.clone(),
                audit.clone(),
                ledger.clone(),
            )),
            customers: Arc::new(CustomerService::new(db_pool.clone(), audit.clone())),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                audit.clone(),
                config.default_tax_rate,
            )),
            notifications: Arc::new(NotificationService::new(db_pool, messaging)),
            audit: Arc::new(audit),
            ledger: Arc::new(ledger),
            reservations: Arc::new(reservations),
            jobs: Arc::new(jobs),
        }
    }
}
