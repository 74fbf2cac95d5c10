//! Common test utilities for in-process API testing.
//!
//! The fixture wires the real router to a file-backed store and mock
//! collaborators, so tests exercise the full HTTP surface without Stripe
//! or Twilio.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use valet_core::{
    config::OpsAuthConfig,
    create_authenticator,
    testing::{MockPaymentProvider, MockSmsSender},
    AuthMethod, PaymentIntentService, PaymentProvider, SmsSender, SqliteTicketStore, TicketFeed,
    TicketRequestHandler, TicketStore, WebhookAuth, WebhookReconciler,
};
use valet_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use valet_core::testing::fixtures;

/// In-process server with mock payment and SMS collaborators.
pub struct TestFixture {
    pub router: Router,
    pub store: Arc<dyn TicketStore>,
    pub feed: TicketFeed,
    pub provider: Arc<MockPaymentProvider>,
    /// Present when the fixture was built with SMS enabled
    pub sms: Option<Arc<MockSmsSender>>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Guard operator routes with this API key
    pub api_key: Option<String>,
    pub enable_sms: bool,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_sms() -> Self {
        Self {
            enable_sms: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = fixtures::config();
        config.database.path = temp_dir.path().join("test.db");
        if let Some(key) = &test_config.api_key {
            config.ops = OpsAuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(key.clone()),
            };
        }

        let feed = TicketFeed::new(config.live.channel_capacity);
        let store: Arc<dyn TicketStore> = Arc::new(
            SqliteTicketStore::new(&config.database.path)
                .expect("Failed to create ticket store")
                .with_feed(feed.clone()),
        );

        let provider = Arc::new(MockPaymentProvider::new());
        let sms = test_config
            .enable_sms
            .then(|| Arc::new(MockSmsSender::new()));

        let authenticator =
            create_authenticator(&config.ops).expect("Failed to create authenticator");

        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::from(authenticator),
            Arc::clone(&store),
            feed.clone(),
            PaymentIntentService::new(
                Arc::clone(&store),
                Arc::clone(&provider) as Arc<dyn PaymentProvider>,
                &config.stripe,
            ),
            WebhookReconciler::new(
                Arc::clone(&store),
                WebhookAuth::from_config(&config.stripe),
                &config.stripe.currency,
            ),
            TicketRequestHandler::new(Arc::clone(&store)),
            sms.clone().map(|s| s as Arc<dyn SmsSender>),
        ));

        Self {
            router: create_router(state),
            store,
            feed,
            provider,
            sms,
            temp_dir,
        }
    }

    /// Create a job and a ticket for it through the operator API.
    ///
    /// Returns the ticket JSON.
    pub async fn open_ticket(&self, payment_config: Option<Value>) -> Value {
        let mut job_body = json!({ "title": "Gala Dinner", "location": "Main Entrance" });
        if let Some(cfg) = payment_config {
            job_body["payment_config"] = cfg;
        }
        let job = self.post("/api/v1/ops/jobs", job_body).await;
        assert_eq!(job.status, StatusCode::CREATED, "job: {}", job.body);

        let vehicle = self
            .post(
                "/api/v1/ops/vehicles",
                json!({
                    "make": "Honda",
                    "model": "Civic",
                    "color": "Blue",
                    "license_plate": "7ABC123"
                }),
            )
            .await;
        assert_eq!(vehicle.status, StatusCode::CREATED);

        let ticket = self
            .post(
                "/api/v1/ops/tickets",
                json!({
                    "job_id": job.body["id"],
                    "vehicle_id": vehicle.body["id"],
                    "parking": { "zone": "B", "level": "2" }
                }),
            )
            .await;
        assert_eq!(ticket.status, StatusCode::CREATED, "ticket: {}", ticket.body);
        ticket.body
    }

    /// Move a ticket through the operator status endpoint.
    /// Serve the router on an ephemeral local port, for clients that need
    /// a real socket (WebSocket upgrades).
    pub async fn serve(&self) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        addr
    }

    pub async fn set_status(&self, ticket_id: &str, status: &str) -> TestResponse {
        self.put(
            &format!("/api/v1/ops/tickets/{}/status", ticket_id),
            json!({ "status": status }),
        )
        .await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path), Body::empty())
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.send_json("POST", path, body).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.send_json("PUT", path, body).await
    }

    /// POST a raw body with extra headers (webhooks, malformed JSON).
    pub async fn post_raw(&self, path: &str, body: Vec<u8>, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder, Body::from(body)).await
    }

    /// GET with extra headers (operator auth).
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder, Body::empty()).await
    }

    async fn send_json(&self, method: &str, path: &str, body: Value) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        self.send(builder, Body::from(serde_json::to_vec(&body).unwrap()))
            .await
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let request = builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
