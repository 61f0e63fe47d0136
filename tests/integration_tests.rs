//! End-to-end tests driving a real in-process server over HTTP.
//!
//! Each test gets its own server on an ephemeral port backed by its own
//! temporary SQLite file, so tests are fully isolated and can run in
//! parallel.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tokio::time::sleep;

use manga_api::middleware::RateLimitLayer;
use manga_api::store::{Db, Store};
use manga_api::{AppState, Config, build_router};

/// Find an available port for the test server.
fn find_available_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to ephemeral port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Test fixture that owns an in-process server and a direct store handle.
struct TestFixture {
    base_url: String,
    client: Client,
    /// Direct store access for test setup (permission grants, races).
    store: Store,
    db_path: std::path::PathBuf,
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

impl TestFixture {
    /// Start a server with rate limiting disabled.
    async fn new() -> Self {
        Self::start(None).await
    }

    /// Start a server with the given per-client rate limit.
    async fn with_rate_limit(rps: u32, burst: u32) -> Self {
        Self::start(Some((rps, burst))).await
    }

    async fn start(rate_limit: Option<(u32, u32)>) -> Self {
        let port = find_available_port();
        let base_url = format!("http://127.0.0.1:{port}");

        let db_path = std::env::temp_dir().join(format!("manga-api-test-{}.db", uuid::Uuid::new_v4()));
        let database_url = format!("sqlite:{}", db_path.display());

        let config = Config {
            host: "127.0.0.1".to_string(),
            port,
            database_url: database_url.clone(),
            db_max_connections: 5,
            rate_limit_enabled: rate_limit.is_some(),
            rate_limit_rps: rate_limit.map(|(rps, _)| rps).unwrap_or(0),
            rate_limit_burst: rate_limit.map(|(_, burst)| burst).unwrap_or(0),
            metrics_port: 0,
            ..Config::default()
        };

        let db = Db::connect(
            &config.database_url,
            config.db_max_connections,
            config.db_query_timeout,
        )
        .await
        .expect("Failed to open test database");
        let store = Store::new(db.clone());

        let limit_layer = rate_limit
            .map(|(rps, burst)| RateLimitLayer::new(rps, burst).expect("invalid test rate limit"));

        let state = AppState::new(db, config, limit_layer);
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .expect("Failed to bind test server");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        wait_for_server(&client, &base_url).await;

        Self {
            base_url,
            client,
            store,
            db_path,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register, activate, and authenticate a user; returns the bearer token.
    ///
    /// Registration grants `mangas:read`. Pass extra permission codes to
    /// grant more (e.g. `mangas:write`).
    async fn authenticated_user(&self, email: &str, extra_permissions: &[&str]) -> String {
        let response = self
            .client
            .post(self.url("/v1/users"))
            .json(&json!({
                "name": "Test Reader",
                "email": email,
                "password": "pa55word-long-enough",
            }))
            .send()
            .await
            .expect("register request failed");
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("register body");

        let user_id = body["user"]["id"].as_i64().expect("user id");
        let activation_token = body["activation_token"].as_str().expect("activation token");

        let response = self
            .client
            .put(self.url("/v1/users/activated"))
            .json(&json!({ "token": activation_token }))
            .send()
            .await
            .expect("activate request failed");
        assert_eq!(response.status(), 200);

        if !extra_permissions.is_empty() {
            self.store
                .permissions
                .add_for_user(user_id, extra_permissions)
                .await
                .expect("failed to grant permissions");
        }

        self.bearer_token(email).await
    }

    /// Exchange credentials for an authentication token.
    async fn bearer_token(&self, email: &str) -> String {
        let response = self
            .client
            .post(self.url("/v1/tokens/authentication"))
            .json(&json!({
                "email": email,
                "password": "pa55word-long-enough",
            }))
            .send()
            .await
            .expect("token request failed");
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.expect("token body");
        body["authentication_token"]["token"]
            .as_str()
            .expect("token plaintext")
            .to_string()
    }

    /// Create a manga via the API, returning the response body.
    async fn create_manga(&self, token: &str, payload: Value) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .post(self.url("/v1/mangas"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .expect("create manga request failed");
        let status = response.status();
        let body: Value = response.json().await.expect("create manga body");
        (status, body)
    }
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, base_url: &str) {
    let health_url = format!("{base_url}/v1/healthcheck");
    let max_attempts = 60;

    for attempt in 1..=max_attempts {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => return,
            _ if attempt == max_attempts => {
                panic!("Server failed to respond after {max_attempts} attempts");
            }
            _ => sleep(Duration::from_millis(100)).await,
        }
    }
}

fn sample_manga() -> Value {
    json!({
        "title": "Fullmetal Alchemist",
        "studio": "Square Enix",
        "year": 2001,
        "chapters": 108,
        "rating": 4.8,
    })
}

// ============================================================================
// Health Check
// ============================================================================

#[tokio::test]
async fn test_healthcheck_is_open_and_available() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .get(fixture.url("/v1/healthcheck"))
        .send()
        .await
        .expect("healthcheck request failed");

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("healthcheck body");
    assert_eq!(body["status"], "available");
    assert!(body["system_info"]["version"].is_string());
    assert!(body["system_info"]["environment"].is_string());
}

// ============================================================================
// Manga CRUD
// ============================================================================

#[tokio::test]
async fn test_create_fetch_update_delete_cycle() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("writer@example.com", &["mangas:write"])
        .await;

    // Create
    let (status, body) = fixture.create_manga(&token, sample_manga()).await;
    assert_eq!(status, 201);
    let id = body["manga"]["id"].as_i64().expect("manga id");
    assert_eq!(body["manga"]["version"], 1);
    assert_eq!(body["manga"]["title"], "Fullmetal Alchemist");

    // Fetch
    let response = fixture
        .client
        .get(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .expect("show request failed");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("show body");
    assert_eq!(body["manga"]["studio"], "Square Enix");

    // Partial update bumps the version
    let response = fixture
        .client
        .patch(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "rating": 4.9 }))
        .send()
        .await
        .expect("update request failed");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("update body");
    assert_eq!(body["manga"]["rating"], 4.9);
    assert_eq!(body["manga"]["version"], 2);
    // Unspecified fields keep their stored values
    assert_eq!(body["manga"]["chapters"], 108);

    // Delete
    let response = fixture
        .client
        .delete(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete request failed");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("delete body");
    assert_eq!(body["message"], "manga successfully deleted");

    // Gone
    let response = fixture
        .client
        .get(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .expect("show-after-delete request failed");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_create_sets_location_header() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("location@example.com", &["mangas:write"])
        .await;

    let response = fixture
        .client
        .post(fixture.url("/v1/mangas"))
        .bearer_auth(&token)
        .json(&sample_manga())
        .send()
        .await
        .expect("create request failed");
    assert_eq!(response.status(), 201);

    let location = response
        .headers()
        .get("Location")
        .expect("Location header missing")
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = response.json().await.expect("create body");
    let id = body["manga"]["id"].as_i64().unwrap();
    assert_eq!(location, format!("/v1/mangas/{id}"));
}

#[tokio::test]
async fn test_stale_version_in_patch_returns_conflict() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("conflict@example.com", &["mangas:write"])
        .await;

    let (_, body) = fixture.create_manga(&token, sample_manga()).await;
    let id = body["manga"]["id"].as_i64().unwrap();

    // First writer wins, version becomes 2.
    let response = fixture
        .client
        .patch(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "chapters": 109, "version": 1 }))
        .send()
        .await
        .expect("first update failed");
    assert_eq!(response.status(), 200);

    // Second writer still holds version 1 and must lose.
    let response = fixture
        .client
        .patch(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "chapters": 110, "version": 1 }))
        .send()
        .await
        .expect("second update failed");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("conflict body");
    assert_eq!(
        body["error"],
        "unable to update the record due to an edit conflict, please try again"
    );

    // The record still holds the winner's value.
    let response = fixture
        .client
        .get(fixture.url(&format!("/v1/mangas/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .expect("show request failed");
    let body: Value = response.json().await.expect("show body");
    assert_eq!(body["manga"]["chapters"], 109);
    assert_eq!(body["manga"]["version"], 2);
}

#[tokio::test]
async fn test_racing_updates_have_exactly_one_winner() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("racer@example.com", &["mangas:write"])
        .await;

    let (_, body) = fixture.create_manga(&token, sample_manga()).await;
    let id = body["manga"]["id"].as_i64().unwrap();

    // Both writers read version 1, then race on the conditional update.
    let base = fixture.store.mangas.get(id).await.expect("fetch base");

    let mut first = base.clone();
    first.chapters = 200;
    let mut second = base.clone();
    second.chapters = 300;

    let (a, b) = tokio::join!(
        fixture.store.mangas.update(&first),
        fixture.store.mangas.update(&second),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one concurrent update must win");

    let current = fixture.store.mangas.get(id).await.expect("fetch final");
    assert_eq!(current.version, 2);
    assert!(current.chapters == 200 || current.chapters == 300);
}

#[tokio::test]
async fn test_delete_missing_manga_returns_404() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("deleter@example.com", &["mangas:write"])
        .await;

    let response = fixture
        .client
        .delete(fixture.url("/v1/mangas/999999"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete request failed");
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"], "the requested resource could not be found");
}

#[tokio::test]
async fn test_non_positive_id_returns_404() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("zero@example.com", &[])
        .await;

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas/0"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("show request failed");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_non_numeric_id_returns_structured_404() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("nonnumeric@example.com", &[])
        .await;

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas/abc"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("show request failed");
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"], "the requested resource could not be found");
}

#[tokio::test]
async fn test_validation_failures_report_per_field_messages() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("validator@example.com", &["mangas:write"])
        .await;

    let (status, body) = fixture
        .create_manga(
            &token,
            json!({
                "title": "",
                "studio": "Somewhere",
                "year": 1800,
                "chapters": 0,
                "rating": 6.5,
            }),
        )
        .await;

    assert_eq!(status, 422);
    assert_eq!(body["error"]["title"], "title must be provided");
    assert_eq!(body["error"]["year"], "year must be greater than 1900");
    assert_eq!(body["error"]["chapters"], "must be at least 1 chapter");
    assert_eq!(
        body["error"]["rating"],
        "the maximum rating limit has been reached"
    );
}

#[tokio::test]
async fn test_malformed_json_body_returns_400() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("syntax@example.com", &["mangas:write"])
        .await;

    let response = fixture
        .client
        .post(fixture.url("/v1/mangas"))
        .bearer_auth(&token)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("create request failed");
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("error body");
    assert!(body["error"].is_string());
}

// ============================================================================
// Listing, Filtering, Pagination
// ============================================================================

#[tokio::test]
async fn test_list_with_sort_and_pagination() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("lister@example.com", &["mangas:write"])
        .await;

    for (title, year) in [
        ("Akira", 1982),
        ("Monster", 1994),
        ("Vagabond", 1998),
    ] {
        let (status, _) = fixture
            .create_manga(
                &token,
                json!({
                    "title": title,
                    "studio": "Various",
                    "year": year,
                    "chapters": 50,
                    "rating": 4.5,
                }),
            )
            .await;
        assert_eq!(status, 201);
    }

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas?sort=-year&page=1&page_size=2"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("list body");
    let mangas = body["mangas"].as_array().expect("mangas array");
    assert_eq!(mangas.len(), 2);
    assert_eq!(mangas[0]["title"], "Vagabond");
    assert_eq!(mangas[1]["title"], "Monster");

    assert_eq!(body["metadata"]["current_page"], 1);
    assert_eq!(body["metadata"]["page_size"], 2);
    assert_eq!(body["metadata"]["last_page"], 2);
    assert_eq!(body["metadata"]["total_records"], 3);
}

#[tokio::test]
async fn test_list_title_filter() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("filter@example.com", &["mangas:write"])
        .await;

    for title in ["Berserk", "Bleach", "One Piece"] {
        fixture
            .create_manga(
                &token,
                json!({
                    "title": title,
                    "studio": "Various",
                    "year": 2000,
                    "chapters": 100,
                    "rating": 4.0,
                }),
            )
            .await;
    }

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas?title=Ble"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list request failed");
    let body: Value = response.json().await.expect("list body");
    let mangas = body["mangas"].as_array().unwrap();
    assert_eq!(mangas.len(), 1);
    assert_eq!(mangas[0]["title"], "Bleach");
}

#[tokio::test]
async fn test_list_rejects_unknown_sort_key() {
    let fixture = TestFixture::new().await;
    let token = fixture
        .authenticated_user("sorter@example.com", &[])
        .await;

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas?sort=sneaky"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"]["sort"], "invalid sort value");
}

// ============================================================================
// Authentication and Authorization
// ============================================================================

#[tokio::test]
async fn test_anonymous_request_to_protected_route_gets_401() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas"))
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(
        body["error"],
        "you must be authenticated to access this resource"
    );
}

#[tokio::test]
async fn test_malformed_bearer_token_gets_401_with_challenge() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas"))
        .header("Authorization", "Bearer nope")
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 401);
    assert_eq!(
        response
            .headers()
            .get("WWW-Authenticate")
            .expect("challenge header")
            .to_str()
            .unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn test_unknown_token_gets_401() {
    let fixture = TestFixture::new().await;

    // Correct length, never issued.
    let response = fixture
        .client
        .get(fixture.url("/v1/mangas"))
        .bearer_auth("A".repeat(26))
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_reader_cannot_write() {
    let fixture = TestFixture::new().await;
    // Registration grants mangas:read only.
    let token = fixture
        .authenticated_user("reader@example.com", &[])
        .await;

    // Reads work.
    let response = fixture
        .client
        .get(fixture.url("/v1/mangas"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 200);

    // Writes are forbidden.
    let (status, body) = fixture.create_manga(&token, sample_manga()).await;
    assert_eq!(status, 403);
    assert_eq!(
        body["error"],
        "your user account doesn't have the necessary permissions"
    );
}

#[tokio::test]
async fn test_unactivated_account_is_forbidden() {
    let fixture = TestFixture::new().await;

    // Register but skip activation.
    let response = fixture
        .client
        .post(fixture.url("/v1/users"))
        .json(&json!({
            "name": "Unactivated",
            "email": "pending@example.com",
            "password": "pa55word-long-enough",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(response.status(), 201);

    let token = fixture.bearer_token("pending@example.com").await;

    let response = fixture
        .client
        .get(fixture.url("/v1/mangas"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list request failed");
    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(
        body["error"],
        "your user account must be activated to access this resource"
    );
}

#[tokio::test]
async fn test_wrong_password_gets_401() {
    let fixture = TestFixture::new().await;
    fixture
        .authenticated_user("victim@example.com", &[])
        .await;

    let response = fixture
        .client
        .post(fixture.url("/v1/tokens/authentication"))
        .json(&json!({
            "email": "victim@example.com",
            "password": "definitely-not-the-password",
        }))
        .send()
        .await
        .expect("token request failed");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_duplicate_email_reports_validation_failure() {
    let fixture = TestFixture::new().await;
    fixture
        .authenticated_user("taken@example.com", &[])
        .await;

    let response = fixture
        .client
        .post(fixture.url("/v1/users"))
        .json(&json!({
            "name": "Second",
            "email": "taken@example.com",
            "password": "pa55word-long-enough",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(
        body["error"]["email"],
        "a user with this email address already exists"
    );
}

#[tokio::test]
async fn test_registration_accepts_trailing_slash() {
    let fixture = TestFixture::new().await;

    // No slash redirect happens in routing, so the slashed spelling is
    // registered explicitly and must behave like the bare one.
    let response = fixture
        .client
        .post(fixture.url("/v1/users/"))
        .json(&json!({
            "name": "Slash",
            "email": "slash@example.com",
            "password": "pa55word-long-enough",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("user body");
    assert_eq!(body["user"]["email"], "slash@example.com");
    assert_eq!(body["user"]["activated"], false);
}

#[tokio::test]
async fn test_invalid_activation_token_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .put(fixture.url("/v1/users/activated"))
        .json(&json!({ "token": "B".repeat(26) }))
        .send()
        .await
        .expect("activate request failed");
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"]["token"], "invalid or expired activation token");
}

// ============================================================================
// Routing Fallbacks
// ============================================================================

#[tokio::test]
async fn test_unknown_path_returns_structured_404() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .get(fixture.url("/v1/nonexistent"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"], "the requested resource could not be found");
}

#[tokio::test]
async fn test_unsupported_method_returns_structured_405() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .delete(fixture.url("/v1/users"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), 405);

    let body: Value = response.json().await.expect("error body");
    assert_eq!(
        body["error"],
        "the DELETE method is not supported for this resource"
    );
}

// ============================================================================
// Rate Limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limit_admits_burst_then_rejects() {
    let fixture = TestFixture::with_rate_limit(1, 2).await;

    // All requests share one client key, so the burst of 2 is admitted and
    // the next request is rejected.
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = fixture
            .client
            .get(fixture.url("/v1/healthcheck"))
            .header("X-Real-IP", "10.9.9.9")
            .send()
            .await
            .expect("healthcheck request failed");
        statuses.push(response.status().as_u16());

        if response.status().as_u16() == 429 {
            assert!(response.headers().contains_key("Retry-After"));
            assert_eq!(
                response
                    .headers()
                    .get("X-RateLimit-Remaining")
                    .expect("remaining header")
                    .to_str()
                    .unwrap(),
                "0"
            );
            let body: Value = response.json().await.expect("error body");
            assert_eq!(body["error"], "rate limit exceeded");
        }
    }

    assert_eq!(statuses[0], 200);
    assert_eq!(statuses[1], 200);
    assert_eq!(statuses[2], 429);

    // At 1 req/s the bucket refills one token after a second, so the same
    // client is admitted again.
    sleep(Duration::from_millis(1100)).await;
    let readmitted = fixture
        .client
        .get(fixture.url("/v1/healthcheck"))
        .header("X-Real-IP", "10.9.9.9")
        .send()
        .await
        .expect("healthcheck request failed");
    assert_eq!(readmitted.status(), 200);
}

#[tokio::test]
async fn test_rate_limit_buckets_are_per_client() {
    let fixture = TestFixture::with_rate_limit(1, 1).await;

    let first = fixture
        .client
        .get(fixture.url("/v1/healthcheck"))
        .header("X-Real-IP", "10.1.1.1")
        .send()
        .await
        .expect("request failed");
    assert_eq!(first.status(), 200);

    let exhausted = fixture
        .client
        .get(fixture.url("/v1/healthcheck"))
        .header("X-Real-IP", "10.1.1.1")
        .send()
        .await
        .expect("request failed");
    assert_eq!(exhausted.status(), 429);

    // A different client is unaffected.
    let other = fixture
        .client
        .get(fixture.url("/v1/healthcheck"))
        .header("X-Real-IP", "10.2.2.2")
        .send()
        .await
        .expect("request failed");
    assert_eq!(other.status(), 200);
}
