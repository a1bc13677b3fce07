//! Shared fixtures for the integration tests.
//!
//! Every fixture runs on the in-memory backends, so the suite needs no
//! external services.
//!
//! # Note
//!
//! `#![allow(dead_code)]` is needed because each integration test file is
//! compiled as its own crate and uses only some of these helpers.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use taskpulse::api::create_router;
use taskpulse::domain::{TaskContent, TaskId, Username};
use taskpulse::infrastructure::{
    AppConfig, AppDependencies, Backends, StreamIngestor, TokenSigner,
};

// =============================================================================
// Application Fixture
// =============================================================================

/// A fully wired service on in-memory backends.
pub struct TestApp {
    pub backends: Backends,
    pub dependencies: AppDependencies,
    pub ingestor: StreamIngestor,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let backends = Backends::in_memory();
        let ingestor = backends.ingestor(&config);
        let signer = TokenSigner::generate().expect("key pair");
        let dependencies = AppDependencies::build(config, &backends, signer)
            .await
            .expect("in-memory dependencies");
        Self {
            backends,
            dependencies,
            ingestor,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.dependencies.clone())
    }

    /// Registers `name` with a fixed password and returns its token.
    pub async fn register(&self, name: &str) -> (Username, String) {
        self.dependencies
            .accounts()
            .register(name, "correct horse battery staple")
            .await
            .expect("registration")
    }

    /// Creates a task through the create-with-bootstrap workflow.
    pub async fn create_task(&self, owner: &Username, title: &str) -> TaskId {
        self.dependencies
            .workflows()
            .create_task(owner, TaskContent::new(title, "", "open"))
            .await
            .expect("task creation")
    }

    /// Moves everything published so far into the analytics store.
    pub async fn ingest(&self) -> usize {
        self.ingestor.drain_once().await.expect("ingestion")
    }
}

pub fn username(name: &str) -> Username {
    Username::parse(name).expect("valid username")
}

// =============================================================================
// HTTP Helpers
// =============================================================================

/// Sends one request through `router` and returns the status and JSON body
/// (`Value::Null` for an empty body).
pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (Response<()>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = router.oneshot(request).await.expect("response");
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (Response::from_parts(parts, ()), json)
}
