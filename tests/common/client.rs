//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all discolog-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as the primary test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the given user
    pub async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "user_handle": handle,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Collection Endpoints
    // ========================================================================

    /// POST /v1/collection/albums
    pub async fn upsert_album(&self, body: &serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/collection/albums", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Upsert album request failed")
    }

    /// GET /v1/collection/reviews?sort_by=...
    pub async fn list_reviews(&self, sort_by: Option<&str>) -> Response {
        let mut url = format!("{}/v1/collection/reviews", self.base_url);
        if let Some(sort_by) = sort_by {
            url.push_str(&format!("?sort_by={}", sort_by));
        }
        self.client
            .get(url)
            .send()
            .await
            .expect("List reviews request failed")
    }

    /// POST /v1/collection/reviews
    pub async fn create_review(&self, body: &serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/collection/reviews", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Create review request failed")
    }

    /// GET /v1/collection/reviews/{id}
    pub async fn get_review(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/collection/reviews/{}", self.base_url, id))
            .send()
            .await
            .expect("Get review request failed")
    }

    /// PUT /v1/collection/reviews/{id}
    pub async fn update_review(&self, id: &str, body: &serde_json::Value) -> Response {
        self.client
            .put(format!("{}/v1/collection/reviews/{}", self.base_url, id))
            .json(body)
            .send()
            .await
            .expect("Update review request failed")
    }

    /// DELETE /v1/collection/reviews/{id}
    pub async fn delete_review(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/collection/reviews/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete review request failed")
    }

    // ========================================================================
    // Convenience helpers
    // ========================================================================

    /// Upserts the standard first test album and asserts success.
    pub async fn seed_album_1(&self) {
        let response = self
            .upsert_album(&json!({
                "id": ALBUM_1_ID,
                "title": ALBUM_1_TITLE,
                "artist": ALBUM_1_ARTIST,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    }

    /// Upserts the standard second test album and asserts success.
    pub async fn seed_album_2(&self) {
        let response = self
            .upsert_album(&json!({
                "id": ALBUM_2_ID,
                "title": ALBUM_2_TITLE,
                "artist": ALBUM_2_ARTIST,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    }
}
