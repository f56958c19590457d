mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

const ACTOR: &str = "6f1c1a52-3b7e-4c1e-9d53-0c8f3a3f2b11";

async fn create_product(app: &TestApp, sku: &str, stock: i32) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": sku, "name": "Blank tee", "initial_stock": stock, "min_stock": 5 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["id"].as_str().expect("product id").to_string()
}

async fn create_job(app: &TestApp, quantity: i32) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/production-jobs",
            Some(json!({ "title": "Team hoodies", "quantity": quantity, "print_method": "dtg" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["id"].as_str().expect("job id").to_string()
}

#[tokio::test]
async fn health_and_status_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "healthy");

    let response = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["service"], "garment-factory-api");
}

#[tokio::test]
async fn request_id_is_echoed_back() {
    let app = TestApp::new().await;
    let response = app
        .request_with_headers(Method::GET, "/health", None, &[("x-request-id", "trace-me-42")])
        .await;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("trace-me-42")
    );
}

#[tokio::test]
async fn stock_out_over_available_maps_to_unprocessable_entity() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "SKU-API-1", 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/stock/out",
            Some(json!({ "product_id": product_id, "quantity": 11 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Unprocessable Entity");
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Insufficient stock"));
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn stock_in_records_the_acting_user() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "SKU-API-2", 0).await;

    let response = app
        .request_with_headers(
            Method::POST,
            "/api/v1/stock/in",
            Some(json!({ "product_id": product_id, "quantity": 40, "note": "Delivery #88" })),
            &[("x-actor-id", ACTOR), ("x-actor-name", "Somchai")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["current_stock"], 40);
    assert_eq!(body["data"]["transaction"]["created_by"], ACTOR);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/audit-logs?entity_type=product&entity_id={}", product_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let rows = body["data"].as_array().expect("audit rows");
    let stock_in = rows.iter().find(|r| r["action"] == "stock_in").expect("stock_in row");
    assert_eq!(stock_in["actor_name"], "Somchai");
}

#[tokio::test]
async fn malformed_actor_header_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_with_headers(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "SKU-X", "name": "X" })),
            &[("x-actor-id", "not-a-uuid")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn audit_filter_needs_both_entity_fields() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/audit-logs?entity_type=product", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reservation_flow_over_http() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "SKU-1", 100).await;
    let job_id = create_job(&app, 40).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/reservations",
            Some(json!({ "job_id": job_id, "product_id": product_id, "quantity": 40 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let reservation_id = response_json(response).await["data"]["id"]
        .as_str()
        .expect("reservation id")
        .to_string();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/availability", product_id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["available"], 60);

    let response = app
        .request(
            Method::POST,
            "/api/v1/reservations",
            Some(json!({ "job_id": job_id, "product_id": product_id, "quantity": 70 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/reservations/{}/release", reservation_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/reservations/{}/release", reservation_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn job_status_workflow_over_http() {
    let app = TestApp::new().await;
    let job_id = create_job(&app, 25).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/production-jobs/{}/status", job_id),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // `in_progress` is accepted as an alias of `printing`.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/production-jobs/{}/status", job_id),
            Some(json!({ "status": "in_progress", "note": "Started on press 3" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "printing");
    assert!(body["data"]["started_at"].is_string());

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/production-jobs/{}/events", job_id),
            Some(json!({ "event": "start_packing" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/production-jobs/{}/logs", job_id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn list_endpoints_paginate() {
    let app = TestApp::new().await;
    for i in 0..3 {
        create_job(&app, 10 + i).await;
    }

    let response = app
        .request(Method::GET, "/api/v1/production-jobs?page=1&per_page=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"]["pagination"]["total"], 3);
    assert_eq!(body["data"]["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn out_of_range_pages_come_back_empty() {
    let app = TestApp::new().await;
    create_product(&app, "SKU-PAGE-1", 2).await;
    create_job(&app, 5).await;

    for uri in [
        "/api/v1/products?low_stock=true&page=18446744073709551615",
        "/api/v1/products?page=18446744073709551615",
        "/api/v1/production-jobs?page=18446744073709551615&per_page=1",
        "/api/v1/orders?page=18446744073709551615",
    ] {
        let response = app.request(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let body = response_json(response).await;
        assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0), "{}", uri);
    }
}

#[tokio::test]
async fn orders_over_http_compute_totals() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "Lakeside School", "email": "office@lakeside.example" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let customer_id = response_json(response).await["data"]["id"]
        .as_str()
        .expect("customer id")
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "items": [{ "description": "PE shirt", "quantity": 200, "unit_price": "5" }],
                "tax_rate": "0"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id = body["data"]["order"]["id"].as_str().expect("order id").to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["order"]["status"], "confirmed");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "customer_id": customer_id, "items": [] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_return_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/production-jobs/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn metrics_and_openapi_are_served() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["info"]["title"], "Garment Factory API");
}
