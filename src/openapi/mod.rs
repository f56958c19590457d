use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Garment Factory API",
        version = "0.1.0",
        description = r#"
# Garment Factory API

Stock, production and order management for a garment print shop.

## Features

- **Stock Ledger**: IN / OUT / ADJUST movements with a full transaction history
- **Reservations**: Earmark stock for production jobs without moving it
- **Production Jobs**: Status workflow, output, QC inspections and rework jobs
- **Customers & Orders**: Orders with server-computed totals
- **Audit Trail**: Before/after snapshots of every change
- **Notifications**: Low stock and job events, pushed to the messaging channel

## Acting user

Mutating requests may carry `X-Actor-Id` (UUID) and `X-Actor-Name`. They are
recorded in audit rows, job logs and ledger entries.

## Error Handling

Errors use one body format with the mapped HTTP status code:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: requested 70 of SKU-1 but only 60 available",
  "request_id": "5c1f...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalogue and availability"),
        (name = "Stock", description = "Stock ledger movements"),
        (name = "Reservations", description = "Stock reservations for production jobs"),
        (name = "Production Jobs", description = "Job workflow, QC and rework"),
        (name = "Customers", description = "Customer records"),
        (name = "Orders", description = "Customer orders"),
        (name = "Audit", description = "Audit trail"),
        (name = "Notifications", description = "Operational notifications"),
        (name = "Messaging", description = "Messaging channel webhook")
    ),
    paths(
        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::get_availability,
        crate::handlers::products::list_transactions,
        crate::handlers::products::list_product_reservations,

        // Stock ledger
        crate::handlers::stock::stock_in,
        crate::handlers::stock::stock_out,
        crate::handlers::stock::stock_adjust,

        // Reservations
        crate::handlers::reservations::create_reservation,
        crate::handlers::reservations::release_reservation,
        crate::handlers::reservations::mark_reservation_used,

        // Production jobs
        crate::handlers::production_jobs::create_job,
        crate::handlers::production_jobs::list_jobs,
        crate::handlers::production_jobs::get_job,
        crate::handlers::production_jobs::get_job_by_number,
        crate::handlers::production_jobs::update_job_status,
        crate::handlers::production_jobs::apply_job_event,
        crate::handlers::production_jobs::record_output,
        crate::handlers::production_jobs::create_rework_job,
        crate::handlers::production_jobs::perform_qc_check,
        crate::handlers::production_jobs::list_qc_records,
        crate::handlers::production_jobs::list_job_logs,
        crate::handlers::production_jobs::list_job_reservations,
        crate::handlers::production_jobs::reserve_materials,
        crate::handlers::production_jobs::consume_materials,

        // Customers & orders
        crate::handlers::customers::create_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,

        // Audit, notifications, messaging
        crate::handlers::audit::list_audit_logs,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_notification_read,
        crate::handlers::messaging::messaging_webhook,
    ),
    components(
        schemas(
            crate::entities::production_job::JobStatus,
            crate::entities::production_job::JobPriority,
            crate::entities::order::OrderStatus,
            crate::services::job_status::JobEvent,
            crate::services::reservations::BatchPolicy,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_factory_endpoints() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Garment Factory API"));
        assert!(json.contains("/api/v1/production-jobs/{id}/status"));
        assert!(json.contains("/api/v1/stock/out"));
    }
}
