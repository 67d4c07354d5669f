//! Test utilities and fixtures for paydesk integration tests

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::Value;
use tower::ServiceExt;

pub use paydesk::config::StripeSettings;
pub use paydesk::db::{AppState, init_db, queries};
pub use paydesk::models::*;
pub use paydesk::payments::StripeClient;

pub const TEST_STRIPE_KEY: &str = "sk_test_paydesk";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

pub fn stripe_settings(api_base: &str) -> StripeSettings {
    StripeSettings {
        api_key: TEST_STRIPE_KEY.to_string(),
        api_base: api_base.to_string(),
        success_url: "http://localhost:3000/payment/success".to_string(),
        cancel_url: "http://localhost:3000/payment/cancel".to_string(),
    }
}

/// App state over a single-connection in-memory pool. The pool size of one
/// keeps every request on the same in-memory database.
pub fn test_state(stripe_base: &str) -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        stripe: StripeClient::new(&stripe_settings(stripe_base)),
        pdf_max_rows: 100,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Full router with auth, over a fresh database. Stripe calls go to `stripe_base`.
pub fn test_app_with_stripe(stripe_base: &str) -> (Router, AppState) {
    let state = test_state(stripe_base);
    let app = paydesk::handlers::router(state.clone()).with_state(state.clone());
    (app, state)
}

/// Full router whose Stripe base points nowhere reachable.
pub fn test_app() -> (Router, AppState) {
    test_app_with_stripe("http://127.0.0.1:9")
}

/// Create a test user with the given permissions. Returns the user and its token.
pub fn create_test_user(
    conn: &Connection,
    email: &str,
    permissions: &[Permission],
) -> (User, String) {
    let input = CreateUser {
        email: email.to_string(),
        name: format!("Test User {}", email),
        permissions: permissions.to_vec(),
    };
    let user = queries::create_user(conn, &input).expect("Failed to create test user");
    let (_, token) =
        queries::create_api_token(conn, &user.id).expect("Failed to create test token");
    (user, token)
}

/// Create a user with every permission on the app's database.
pub fn admin_token(state: &AppState) -> String {
    let conn = state.db.get().unwrap();
    create_test_user(&conn, "admin@paydesk.test", &Permission::all()).1
}

/// Create a user with only the given permissions on the app's database.
pub fn token_with(state: &AppState, email: &str, permissions: &[Permission]) -> String {
    let conn = state.db.get().unwrap();
    create_test_user(&conn, email, permissions).1
}

pub fn month(year: i32, m: u32) -> BatchMonth {
    BatchMonth::new(year, m).expect("valid month")
}

/// Build a contribution row; total is left to be computed.
pub fn new_row(batch: BatchMonth, sss_no: &str, name: &str, ss_centavos: i64) -> NewContribution {
    NewContribution {
        batch_date: batch,
        sss_no: sss_no.to_string(),
        name: name.to_string(),
        ss: Amount::from_centavos(ss_centavos),
        ec: Amount::from_centavos(1_000),
        total: None,
        sbr_no: None,
        sbr_date: None,
    }
}

/// Insert a record directly through the query layer.
pub fn insert_record(
    conn: &Connection,
    batch: BatchMonth,
    sss_no: &str,
    name: &str,
) -> ContributionRecord {
    queries::create_contribution(conn, &new_row(batch, sss_no, name, 50_000))
        .expect("Failed to create test record")
}

pub fn seed_records(state: &AppState, batch: BatchMonth, count: usize) {
    let conn = state.db.get().unwrap();
    for i in 0..count {
        insert_record(&conn, batch, &format!("34-{:07}-0", i), &format!("Employee {:03}", i));
    }
}

pub fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub const BOUNDARY: &str = "paydesk-test-boundary";

/// Encode a multipart upload form. `None` fields are left out.
pub fn upload_body(csv: Option<&str>, batch_date: Option<&str>, overwrite: bool) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(csv) = csv {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"csv\"; filename=\"batch.csv\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
        body.extend_from_slice(csv.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    let mut text_field = |name: &str, value: &str| {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    };
    if let Some(batch_date) = batch_date {
        text_field("batchDate", batch_date);
    }
    if overwrite {
        text_field("overwrite", "true");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/record/v1/upload")
        .header("Authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("Response should be valid JSON")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(app, request).await;
    let status = response.status();
    (status, body_json(response).await)
}
