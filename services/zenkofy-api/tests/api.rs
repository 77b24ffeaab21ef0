//! Router-level tests against in-memory repositories and storage

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;
use uuid::Uuid;

use zenkofy_api::{build_router, AppState, Config};
use zenkofy_auth::AccessClaims;
use zenkofy_billing::{
    BillingError, CheckoutRequest, PaymentProvider, StripeCheckoutSession, StripeCustomer,
    StripePlan, StripeSubscription,
};
use zenkofy_db::memory::MemoryRepositories;
use zenkofy_db::{CreateDocument, DocumentRepository, SubscriptionRepository};
use zenkofy_storage::MemoryStore;

const JWT_SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";
const WEBHOOK_SECRET: &str = "whsec_test_secret";
const SUPABASE_URL: &str = "https://test.supabase.co";

// ============================================================================
// Fixtures
// ============================================================================

/// Stand-in for Stripe
#[derive(Default)]
struct StubProvider {
    checkouts: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn retrieve_customer(&self, _customer_id: &str) -> Result<StripeCustomer, BillingError> {
        Err(BillingError::ProviderError("No such customer".to_string()))
    }

    async fn retrieve_subscription(
        &self,
        _subscription_id: &str,
    ) -> Result<StripeSubscription, BillingError> {
        Err(BillingError::ProviderError("No such subscription".to_string()))
    }

    async fn update_subscription_metadata(
        &self,
        _subscription_id: &str,
        _metadata: &std::collections::BTreeMap<String, String>,
    ) -> Result<StripeSubscription, BillingError> {
        Err(BillingError::ProviderError("No such subscription".to_string()))
    }

    async fn list_active_plans(&self) -> Result<Vec<StripePlan>, BillingError> {
        Ok(vec![serde_json::from_value(json!({
            "id": "price_month",
            "active": true,
            "amount": 999,
            "currency": "usd",
            "interval": "month",
            "interval_count": 1,
            "nickname": "Monthly",
            "product": "prod_reader"
        }))
        .unwrap()])
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeCheckoutSession, BillingError> {
        self.checkouts.lock().unwrap().push(request.clone());
        Ok(serde_json::from_value(json!({
            "id": "cs_test_1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        }))
        .unwrap())
    }
}

struct TestApp {
    router: Router,
    mem: MemoryRepositories,
    store: MemoryStore,
    payments: Arc<StubProvider>,
}

fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut env: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/zenkofy_test"),
        ("SUPABASE_URL", SUPABASE_URL),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-role"),
        ("SUPABASE_JWT_SECRET", JWT_SECRET),
        ("STRIPE_SECRET_KEY", "sk_test_123"),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("APP_URL", "https://app.zenkofy.test"),
    ]);
    env.extend(overrides.iter().copied());
    Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap()
}

fn test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let mem = MemoryRepositories::new();
    let store = MemoryStore::new();
    let payments = Arc::new(StubProvider::default());
    let state = AppState::new(
        test_config(overrides),
        mem.repositories(),
        Arc::new(store.clone()),
        payments.clone(),
    );
    TestApp {
        router: build_router(state, None),
        mem,
        store,
        payments,
    }
}

fn test_app() -> TestApp {
    test_app_with(&[])
}

fn token_for(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        aud: "authenticated".to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: Some(format!("{SUPABASE_URL}/auth/v1")),
        email: Some("reader@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn seed_document(&self, user_id: Uuid, title: &str, tags: &[&str]) -> Uuid {
        let id = Uuid::new_v4();
        self.mem
            .documents
            .create(CreateDocument {
                id,
                user_id,
                title: title.to_string(),
                author: Some("Jane Author".to_string()),
                file_path: format!("{user_id}/1700000000000-{id}.pdf"),
                file_url: format!("memory://pdfs/{user_id}/{id}.pdf"),
                cover_url: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            })
            .await
            .unwrap();
        id
    }
}

/// Hand-rolled multipart/form-data body
struct Form {
    boundary: &'static str,
    body: Vec<u8>,
}

impl Form {
    fn new() -> Self {
        Self {
            boundary: "zenkofy-test-boundary",
            body: Vec::new(),
        }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn request(mut self, user: Uuid) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

fn sign_webhook(payload: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn webhook_request(payload: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn subscription_created_event(event_id: &str, user_id: Uuid) -> String {
    json!({
        "id": event_id,
        "type": "customer.subscription.created",
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "id": "sub_api_1",
            "customer": "cus_1",
            "status": "active",
            "currency": "usd",
            "current_period_start": 1_700_000_000,
            "current_period_end": 1_702_592_000,
            "cancel_at_period_end": false,
            "metadata": { "user_id": user_id.to_string() },
            "items": { "data": [{
                "id": "si_1",
                "price": { "id": "price_month" },
                "plan": { "id": "price_month", "interval": "month", "amount": 999 }
            }]}
        }}
    })
    .to_string()
}

const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF";

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let app = test_app();

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "zenkofy-api");
    assert!(body["version"].is_string());

    let (status, body) = app.call("GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["postgres"], "up");
    assert!(body["postgres_latency_ms"].is_u64());

    app.mem.health.set_down(true);
    let (status, body) = app.call("GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["postgres"], "down");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = test_app();

    for (method, uri) in [
        ("GET", "/api/pdfs"),
        ("GET", "/api/analytics"),
        ("GET", "/api/subscription"),
        ("GET", "/api/plans"),
    ] {
        let (status, body) = app.call(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(body["error"]["code"].is_string());
    }
}

#[tokio::test]
async fn test_bad_token_and_cookie_token() {
    let app = test_app();
    let user = Uuid::new_v4();

    let req = Request::builder()
        .uri("/api/pdfs")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/pdfs")
        .header(header::COOKIE, format!("sb-access-token={}", token_for(user)))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdfs"], json!([]));
}

// ============================================================================
// Documents
// ============================================================================

#[tokio::test]
async fn test_list_documents_with_filters() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.seed_document(user, "Deep Work", &["productivity"]).await;
    app.seed_document(user, "Dune", &["fiction"]).await;

    let (status, body) = app.call("GET", "/api/pdfs", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdfs"].as_array().unwrap().len(), 2);

    let (_, body) = app.call("GET", "/api/pdfs?search=DEEP", Some(user), None).await;
    let pdfs = body["pdfs"].as_array().unwrap();
    assert_eq!(pdfs.len(), 1);
    assert_eq!(pdfs[0]["title"], "Deep Work");

    let (_, body) = app.call("GET", "/api/pdfs?search=jane", Some(user), None).await;
    assert_eq!(body["pdfs"].as_array().unwrap().len(), 2);

    let (_, body) = app.call("GET", "/api/pdfs?tag=fiction", Some(user), None).await;
    assert_eq!(body["pdfs"][0]["title"], "Dune");

    let (_, body) = app.call("GET", "/api/pdfs?status=completed", Some(user), None).await;
    assert_eq!(body["pdfs"], json!([]));

    let (status, _) = app.call("GET", "/api/pdfs?status=done", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_document_validation() {
    let app = test_app();
    let user = Uuid::new_v4();
    let id = app.seed_document(user, "Deep Work", &[]).await;

    let (status, body) = app
        .call("PATCH", "/api/pdfs", Some(user), Some(json!({ "progress": 10 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "PDF ID is required");

    let (status, _) = app
        .call("PATCH", "/api/pdfs", Some(user), Some(json!({ "id": id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call("PATCH", "/api/pdfs", Some(user), Some(json!({ "id": id, "progress": 101 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call("PATCH", "/api/pdfs", Some(user), Some(json!({ "id": id, "status": "done" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call("PATCH", "/api/pdfs", Some(user), Some(json!({ "id": "nope", "progress": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            "PATCH",
            "/api/pdfs",
            Some(user),
            Some(json!({ "id": id, "progress": 42, "status": "reading", "tags": ["focus"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdf"]["progress"], 42);
    assert_eq!(body["pdf"]["status"], "reading");
    assert_eq!(body["pdf"]["tags"], json!(["focus"]));
    assert!(body["pdf"]["last_read"].is_string());
}

#[tokio::test]
async fn test_update_progress_explicit_last_read_wins() {
    let app = test_app();
    let user = Uuid::new_v4();
    let id = app.seed_document(user, "Dune", &[]).await;

    let (status, body) = app
        .call(
            "PATCH",
            &format!("/api/pdf/{id}"),
            Some(user),
            Some(json!({ "progress": 100, "status": "completed", "last_read": "2024-01-02T03:04:05Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdf"]["status"], "completed");
    assert_eq!(body["pdf"]["last_read"], "2024-01-02T03:04:05Z");

    let (status, _) = app
        .call("PATCH", &format!("/api/pdf/{id}"), Some(user), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_documents_are_isolated_between_users() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let id = app.seed_document(owner, "Private Notes", &[]).await;

    let (status, body) = app.call("GET", "/api/pdfs", Some(intruder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdfs"], json!([]));

    let (status, _) = app
        .call("GET", &format!("/api/pdf/{id}"), Some(intruder), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("PATCH", "/api/pdfs", Some(intruder), Some(json!({ "id": id, "progress": 99 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("DELETE", &format!("/api/pdfs?id={id}"), Some(intruder), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/pdf/{id}/notes"),
            Some(intruder),
            Some(json!({ "text": "mine now" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/pdf/{id}/bookmarks"),
            Some(intruder),
            Some(json!({ "page": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Owner still sees it untouched
    let (status, body) = app.call("GET", &format!("/api/pdf/{id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdf"]["progress"], 0);
}

#[tokio::test]
async fn test_notes_and_bookmarks_are_isolated_between_users() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let id = app.seed_document(owner, "Private Notes", &[]).await;
    let notes_uri = format!("/api/pdf/{id}/notes");
    let bookmarks_uri = format!("/api/pdf/{id}/bookmarks");

    let (status, body) = app
        .call("POST", &notes_uri, Some(owner), Some(json!({ "text": "secret", "page": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let note_id = body["note"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call("POST", &bookmarks_uri, Some(owner), Some(json!({ "page": 5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let bookmark_id = body["bookmark"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call("GET", &notes_uri, Some(intruder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], json!([]));

    let (status, body) = app.call("GET", &bookmarks_uri, Some(intruder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookmarks"], json!([]));

    let (status, _) = app
        .call(
            "DELETE",
            &format!("{notes_uri}?noteId={note_id}"),
            Some(intruder),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            "DELETE",
            &format!("{bookmarks_uri}?bookmarkId={bookmark_id}"),
            Some(intruder),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.call("GET", &notes_uri, Some(owner), None).await;
    assert_eq!(body["notes"].as_array().unwrap().len(), 1);
    assert_eq!(body["notes"][0]["id"], note_id.as_str());

    let (_, body) = app.call("GET", &bookmarks_uri, Some(owner), None).await;
    assert_eq!(body["bookmarks"].as_array().unwrap().len(), 1);
    assert_eq!(body["bookmarks"][0]["id"], bookmark_id.as_str());
}

#[tokio::test]
async fn test_invalid_document_id_is_bad_request() {
    let app = test_app();
    let user = Uuid::new_v4();

    let (status, _) = app.call("GET", "/api/pdf/not-a-uuid", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call("DELETE", "/api/pdfs", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_and_delete_document() {
    let app = test_app();
    let user = Uuid::new_v4();

    let req = Form::new()
        .text("title", "Deep Work")
        .text("author", "Cal Newport")
        .text("tags", r#"["productivity","focus"]"#)
        .file("file", "Deep  Work.pdf", "application/pdf", PDF_BYTES)
        .request(user);
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let pdf = &body["pdf"];
    assert_eq!(pdf["title"], "Deep Work");
    assert_eq!(pdf["author"], "Cal Newport");
    assert_eq!(pdf["status"], "to-read");
    assert_eq!(pdf["progress"], 0);
    assert_eq!(pdf["tags"], json!(["productivity", "focus"]));
    assert!(pdf["cover_url"]
        .as_str()
        .unwrap()
        .starts_with("https://images.unsplash.com/photo-"));

    let path = pdf["file_path"].as_str().unwrap().to_string();
    assert!(path.starts_with(&format!("{user}/")));
    assert!(path.ends_with("-Deep_Work.pdf"));
    let stored = app.store.get(&path).unwrap();
    assert_eq!(stored.body.as_ref(), PDF_BYTES);
    assert_eq!(stored.content_type, "application/pdf");

    let id = pdf["id"].as_str().unwrap().to_string();
    let (status, body) = app
        .call("DELETE", &format!("/api/pdfs?id={id}"), Some(user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(app.store.is_empty());
    assert!(app.mem.documents.is_empty());
}

#[tokio::test]
async fn test_upload_validation() {
    let app = test_app();
    let user = Uuid::new_v4();

    let req = Form::new()
        .file("file", "book.pdf", "application/pdf", PDF_BYTES)
        .request(user);
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "File and title are required");

    let req = Form::new()
        .text("title", "Not a PDF")
        .file("file", "notes.txt", "text/plain", b"hello")
        .request(user);
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Only PDF files are allowed");

    let req = Form::new()
        .text("title", "Tagged")
        .text("tags", "fiction, classics")
        .file("file", "book.pdf", "application/pdf", PDF_BYTES)
        .request(user);
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.store.is_empty());
    assert!(app.mem.documents.is_empty());
}

#[tokio::test]
async fn test_upload_size_limit() {
    let app = test_app_with(&[("MAX_UPLOAD_BYTES", "1048576")]);
    let user = Uuid::new_v4();

    let oversized = vec![b'x'; 1_048_576 + 1];
    let req = Form::new()
        .text("title", "Huge")
        .file("file", "huge.pdf", "application/pdf", &oversized)
        .request(user);
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "File size exceeds 1MB limit");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_upload_removes_object_when_insert_fails() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.mem.documents.fail_inserts(true);

    let req = Form::new()
        .text("title", "Doomed")
        .file("file", "doomed.pdf", "application/pdf", PDF_BYTES)
        .request(user);
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_upload_storage_failure() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.store.fail_uploads(true);

    let req = Form::new()
        .text("title", "Unlucky")
        .file("file", "unlucky.pdf", "application/pdf", PDF_BYTES)
        .request(user);
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.mem.documents.is_empty());
}

// ============================================================================
// Notes & bookmarks
// ============================================================================

#[tokio::test]
async fn test_notes_lifecycle() {
    let app = test_app();
    let user = Uuid::new_v4();
    let id = app.seed_document(user, "Dune", &[]).await;
    let uri = format!("/api/pdf/{id}/notes");

    let (status, body) = app
        .call("POST", &uri, Some(user), Some(json!({ "text": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Note text is required");

    let (status, _) = app
        .call("POST", &uri, Some(user), Some(json!({ "text": "spice", "page": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call("POST", &uri, Some(user), Some(json!({ "text": "spice", "page": 12 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["color"], "yellow");
    assert_eq!(body["note"]["page"], 12);
    assert_eq!(body["note"]["pdf_id"], id.to_string());
    let note_id = body["note"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.call("GET", &uri, Some(user), None).await;
    assert_eq!(body["notes"].as_array().unwrap().len(), 1);

    let (status, body) = app.call("DELETE", &uri, Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Note ID is required");

    let other = Uuid::new_v4();
    let (status, _) = app
        .call("DELETE", &format!("{uri}?noteId={note_id}"), Some(other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call("DELETE", &format!("{uri}?noteId={note_id}"), Some(user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app
        .call("DELETE", &format!("{uri}?noteId={note_id}"), Some(user), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bookmarks_lifecycle() {
    let app = test_app();
    let user = Uuid::new_v4();
    let id = app.seed_document(user, "Dune", &[]).await;
    let uri = format!("/api/pdf/{id}/bookmarks");

    let (status, body) = app.call("POST", &uri, Some(user), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Page number is required");

    let (status, _) = app
        .call("POST", &uri, Some(user), Some(json!({ "page": -1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call("POST", &uri, Some(user), Some(json!({ "page": 40 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookmark"]["title"], "Page 40");

    let (status, _) = app
        .call("POST", &uri, Some(user), Some(json!({ "page": 7, "title": "Litany" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call("POST", &uri, Some(user), Some(json!({ "page": 40, "title": "Again" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Bookmark already exists for this page");

    let (_, body) = app.call("GET", &uri, Some(user), None).await;
    let pages: Vec<i64> = body["bookmarks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["page"].as_i64().unwrap())
        .collect();
    assert_eq!(pages, vec![7, 40]);

    let (status, body_err) = app.call("DELETE", &uri, Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body_err["error"]["message"], "Bookmark ID is required");

    let bookmark_id = body["bookmarks"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .call("DELETE", &format!("{uri}?bookmarkId={bookmark_id}"), Some(user), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call("DELETE", &format!("{uri}?bookmarkId={bookmark_id}"), Some(user), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Analytics
// ============================================================================

#[tokio::test]
async fn test_analytics() {
    let app = test_app();
    let user = Uuid::new_v4();
    let done = app.seed_document(user, "Dune", &["fiction"]).await;
    app.seed_document(user, "Deep Work", &["productivity", "fiction"]).await;
    app.seed_document(Uuid::new_v4(), "Someone else", &["other"]).await;

    app.call(
        "PATCH",
        &format!("/api/pdf/{done}"),
        Some(user),
        Some(json!({ "progress": 100, "status": "completed" })),
    )
    .await;

    let (status, body) = app.call("GET", "/api/analytics", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_documents"], 2);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["to_read"], 1);
    assert_eq!(body["average_progress"], 50.0);
    assert_eq!(body["completion_rate"], 50.0);
    assert_eq!(body["unique_tags"], 2);
    assert_eq!(body["recent_activity"][0]["title"], "Dune");
}

// ============================================================================
// Billing
// ============================================================================

#[tokio::test]
async fn test_webhook_signature_required() {
    let app = test_app();
    let payload = subscription_created_event("evt_sig", Uuid::new_v4());

    let (status, body) = app.send(webhook_request(&payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No signature found");

    let forged = format!("t={},v1={}", Utc::now().timestamp(), "ab".repeat(32));
    let (status, body) = app.send(webhook_request(&payload, Some(&forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid signature");

    assert!(app.mem.webhook_events.is_empty());
}

#[tokio::test]
async fn test_webhook_redelivery_converges() {
    let app = test_app();
    let user = Uuid::new_v4();
    let payload = subscription_created_event("evt_redelivered", user);

    for _ in 0..2 {
        let signature = sign_webhook(&payload);
        let (status, body) = app.send(webhook_request(&payload, Some(&signature))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Subscription created successfully");
        assert_eq!(body["subscriptionId"], "sub_api_1");
    }

    assert_eq!(app.mem.webhook_events.len(), 1);
    let row = app
        .mem
        .subscriptions
        .find_by_stripe_id("sub_api_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.user_id, user);
    assert_eq!(row.status, "active");

    let (status, body) = app.call("GET", "/api/subscription", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscribed"], true);
    assert_eq!(body["subscription"]["stripe_id"], "sub_api_1");

    let (_, body) = app
        .call("GET", "/api/subscription", Some(Uuid::new_v4()), None)
        .await;
    assert_eq!(body["subscribed"], false);
    assert!(body["subscription"].is_null());
}

#[tokio::test]
async fn test_webhook_unhandled_event_type() {
    let app = test_app();
    let payload = json!({
        "id": "evt_other",
        "type": "customer.created",
        "created": Utc::now().timestamp(),
        "data": { "object": { "id": "cus_9" } }
    })
    .to_string();

    let signature = sign_webhook(&payload);
    let (status, body) = app.send(webhook_request(&payload, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Unhandled event type: customer.created");
    assert_eq!(app.mem.webhook_events.len(), 1);
}

#[tokio::test]
async fn test_webhook_unresolvable_owner() {
    let app = test_app();
    let payload = json!({
        "id": "evt_orphan",
        "type": "customer.subscription.created",
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "id": "sub_orphan",
            "customer": "cus_unknown",
            "status": "active",
            "metadata": {}
        }}
    })
    .to_string();

    let signature = sign_webhook(&payload);
    let (status, body) = app.send(webhook_request(&payload, Some(&signature))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Unable to find associated user");
}

#[tokio::test]
async fn test_plans_and_checkout() {
    let app = test_app();
    let user = Uuid::new_v4();

    let (status, body) = app.call("GET", "/api/plans", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plans"][0]["id"], "price_month");

    let (status, _) = app
        .call("POST", "/api/checkout", Some(user), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            "POST",
            "/api/checkout",
            Some(user),
            Some(json!({ "price_id": "price_month" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "cs_test_1");
    assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_1");

    let checkouts = app.payments.checkouts.lock().unwrap();
    assert_eq!(checkouts.len(), 1);
    assert_eq!(checkouts[0].user_id, user.to_string());
    assert_eq!(checkouts[0].email.as_deref(), Some("reader@example.com"));
    assert_eq!(checkouts[0].success_url, "https://app.zenkofy.test/dashboard");
    assert_eq!(checkouts[0].cancel_url, "https://app.zenkofy.test/pricing");
}

#[tokio::test]
async fn test_malformed_json_body_is_bad_request() {
    let app = test_app();
    let user = Uuid::new_v4();

    let req = Request::builder()
        .method("PATCH")
        .uri("/api/pdfs")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
