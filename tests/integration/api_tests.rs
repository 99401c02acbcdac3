//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000";

fn unique_isbn() -> String {
    format!("it-{}", std::process::id())
        + &std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
            .to_string()
}

async fn create_book(client: &Client, isbn: &str) -> Value {
    let response = client
        .post(format!("{}/api/books", BASE_URL))
        .json(&json!({
            "title": "Integration Book",
            "author": "Tester",
            "genre": "Fiction",
            "isbn": isbn
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn delete_book(client: &Client, id: &str) {
    let _ = client
        .delete(format!("{}/api/books/{}", BASE_URL, id))
        .send()
        .await;
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
#[ignore]
async fn test_list_genres() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/books/genres", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.as_array().unwrap().contains(&json!("Fiction")));
}

#[tokio::test]
#[ignore]
async fn test_archive_lifecycle() {
    let client = Client::new();
    let book = create_book(&client, &unique_isbn()).await;
    let id = book["id"].as_str().expect("No book ID").to_string();
    assert_eq!(book["isArchived"], false);
    assert!(book["archivedAt"].is_null());

    let response = client
        .put(format!("{}/api/books/{}/archive", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["book"]["isArchived"], true);

    let active: Value = client
        .get(format!("{}/api/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(active.as_array().unwrap().iter().all(|b| b["id"] != id));

    let archived: Value = client
        .get(format!("{}/api/books?isArchived=true", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(archived.as_array().unwrap().iter().any(|b| b["id"] == id));

    delete_book(&client, &id).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn() {
    let client = Client::new();
    let isbn = unique_isbn();
    let book = create_book(&client, &isbn).await;

    let response = client
        .post(format!("{}/api/books", BASE_URL))
        .json(&json!({
            "title": "Second",
            "author": "Tester",
            "genre": "Fiction",
            "isbn": isbn
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    delete_book(&client, book["id"].as_str().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_get_missing_book() {
    let client = Client::new();

    let response = client
        .get(format!(
            "{}/api/books/00000000-0000-0000-0000-000000000000",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}
