pub mod audit_log;
pub mod customer;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod production_job;
pub mod production_job_log;
pub mod qc_record;
pub mod stock_reservation;
pub mod stock_transaction;
