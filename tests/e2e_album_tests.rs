//! End-to-end tests for the album upsert endpoint.

mod common;

use common::{
    TestClient, TestServer, ALBUM_1_ARTIST, ALBUM_1_ID, ALBUM_1_TITLE, MANUAL_ALBUM_ID,
};
use discolog_server::collection_store::CollectionStore;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_upsert_album_creates_row() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .upsert_album(&json!({
            "id": ALBUM_1_ID,
            "title": ALBUM_1_TITLE,
            "artist": ALBUM_1_ARTIST,
            "image_url": "https://example.com/okc.jpg",
            "release_year": "1997",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let album: serde_json::Value = response.json().await.unwrap();
    assert_eq!(album["id"].as_str(), Some(ALBUM_1_ID));
    assert_eq!(album["title"].as_str(), Some(ALBUM_1_TITLE));
    assert_eq!(album["artist"].as_str(), Some(ALBUM_1_ARTIST));
    assert_eq!(
        album["image_url"].as_str(),
        Some("https://example.com/okc.jpg")
    );
    assert_eq!(album["spotify_id"], serde_json::Value::Null);

    let stored = server.collection_store.get_album(ALBUM_1_ID).unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_upsert_album_same_id_is_full_replace() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .upsert_album(&json!({
            "id": ALBUM_1_ID,
            "title": ALBUM_1_TITLE,
            "artist": ALBUM_1_ARTIST,
            "release_year": "1997",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first: serde_json::Value = response.json().await.unwrap();

    let response = client
        .upsert_album(&json!({
            "id": ALBUM_1_ID,
            "title": "OK Computer OKNOTOK",
            "artist": ALBUM_1_ARTIST,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second: serde_json::Value = response.json().await.unwrap();

    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["title"].as_str(), Some("OK Computer OKNOTOK"));
    // Full replace, not a merge: the omitted release_year is cleared
    assert_eq!(second["release_year"], serde_json::Value::Null);
    // The original insertion time is preserved
    assert_eq!(second["created_at"], first["created_at"]);

    let stored = server
        .collection_store
        .get_album(ALBUM_1_ID)
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "OK Computer OKNOTOK");
}

#[tokio::test]
async fn test_upsert_album_with_manual_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    // Manually entered albums carry an opaque client-generated id
    let response = client
        .upsert_album(&json!({
            "id": MANUAL_ALBUM_ID,
            "title": "Obscure Bootleg",
            "artist": "Unknown Artist",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let album: serde_json::Value = response.json().await.unwrap();
    assert_eq!(album["id"].as_str(), Some(MANUAL_ALBUM_ID));
}

#[tokio::test]
async fn test_upsert_album_missing_required_field_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .upsert_album(&json!({
            "id": ALBUM_1_ID,
            "title": ALBUM_1_TITLE,
        }))
        .await;
    assert!(response.status().is_client_error());
}
