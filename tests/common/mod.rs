#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use garment_factory_api::{
    config::AppConfig,
    context::OperationContext,
    db,
    entities::{product, production_job},
    events::{self, EventHandler},
    handlers::AppServices,
    services::{production_jobs::CreateJobInput, products::CreateProductInput},
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Application state backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fresh database and services; `tweak` adjusts the config before wiring.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("factory_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.cors_allow_any_origin = true;
        // One connection keeps SQLite writers from tripping over each other.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let services = AppServices::new(db_arc.clone(), Some(event_sender), None, &cfg);
        let handler: Arc<dyn EventHandler> = services.notifications.clone();
        let event_task = tokio::spawn(events::process_events(event_rx, handler));

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };
        let router = garment_factory_api::build_router(state.clone(), CorsLayer::permissive());

        Self {
            router,
            state,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Context of a named shop-floor user.
    pub fn ctx(&self) -> OperationContext {
        OperationContext::new(Some(Uuid::new_v4()), Some("Test Operator".to_string()))
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Raw body request, for endpoints that verify signatures over bytes.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_product(&self, sku: &str, stock: i32, min_stock: i32) -> product::Model {
        self.services()
            .products
            .create_product(
                &self.ctx(),
                CreateProductInput {
                    sku: sku.to_string(),
                    name: format!("Blank {}", sku),
                    unit: Some("pcs".to_string()),
                    initial_stock: stock,
                    min_stock,
                    unit_cost: None,
                },
            )
            .await
            .expect("seed product for tests")
    }

    pub async fn seed_job(&self, quantity: i32) -> production_job::Model {
        self.services()
            .jobs
            .create_job(&self.ctx(), job_input(quantity))
            .await
            .expect("seed production job for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn job_input(quantity: i32) -> CreateJobInput {
    CreateJobInput {
        job_number: None,
        order_id: None,
        product_sku: Some("TEE-BLK-L".to_string()),
        title: "Club tees, front print".to_string(),
        garment_type: Some("t-shirt".to_string()),
        print_method: Some("screen".to_string()),
        quantity,
        priority: None,
        due_date: None,
        assigned_to: Some("Line 2".to_string()),
        notes: None,
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}
