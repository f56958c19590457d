// Inventory
pub mod products;
pub mod reservations;
pub mod stock_ledger;

// Production floor
pub mod job_status;
pub mod production_jobs;

// Sales
pub mod customers;
pub mod orders;

// Cross-cutting
pub mod audit;
pub mod notifications;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

/// Human-facing reference numbers such as `JOB-20240315-7K2QX9`.
pub fn generate_reference(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().format("%Y%m%d"), suffix)
}
