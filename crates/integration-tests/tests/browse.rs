//! Integration tests for catalog browsing.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bazaar_core::Role;
use bazaar_integration_tests::{ItemSpec, TestApp};

const AJAX: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[tokio::test]
async fn test_query_and_categories_filter_unsold_items() {
    let mut app = TestApp::spawn().await;
    let owner = app.create_user("stocker", Role::InventoryManager).await;
    let clothing = app.create_category("Clothing").await;
    let kitchen = app.create_category("Kitchen").await;
    let hats = app.create_category("Hats").await;

    app.create_item(ItemSpec::new(&owner, clothing, "Red shirt")).await;
    app.create_item(ItemSpec::new(&owner, clothing, "Blue shirt")).await;
    app.create_item(ItemSpec {
        stock: 0,
        ..ItemSpec::new(&owner, kitchen, "Red kettle")
    })
    .await;
    app.create_item(ItemSpec {
        description: Some("Bright RED glaze"),
        ..ItemSpec::new(&owner, kitchen, "Plain cup")
    })
    .await;
    app.create_item(ItemSpec::new(&owner, hats, "Red cap")).await;

    let uri = format!("/items?query=red&category={clothing}&category={kitchen}");
    let response = app.get(&uri).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Red shirt"));
    assert!(response.body.contains("Plain cup"));
    assert!(!response.body.contains("Blue shirt"));
    assert!(!response.body.contains("Red kettle"));
    assert!(!response.body.contains("Red cap"));
}

#[tokio::test]
async fn test_ajax_returns_fragment_and_page_count() {
    let mut app = TestApp::spawn().await;
    let owner = app.create_user("stocker", Role::InventoryManager).await;
    let category = app.create_category("Books").await;
    for n in 1..=10 {
        let name = format!("Novel-{n:02}");
        app.create_item(ItemSpec::new(&owner, category, &name)).await;
    }

    let response = app.get_with("/items", &[AJAX]).await;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["numPages"], 2);
    let html = json["html_content"].as_str().unwrap();
    assert!(html.contains("Novel-01"));
    assert!(html.contains("Novel-09"));
    assert!(!html.contains("Novel-10"));
    assert!(!html.contains("<html"));
}

#[tokio::test]
async fn test_ajax_with_no_matches_reports_one_page() {
    let mut app = TestApp::spawn().await;

    let response = app.get_with("/items?query=nothing", &[AJAX]).await;

    let json = response.json();
    assert_eq!(json["numPages"], 1);
    assert!(json["html_content"].as_str().unwrap().contains("No items match"));
}

#[tokio::test]
async fn test_out_of_range_page_shows_last_page() {
    let mut app = TestApp::spawn().await;
    let owner = app.create_user("stocker", Role::InventoryManager).await;
    let category = app.create_category("Books").await;
    for n in 1..=10 {
        let name = format!("Novel-{n:02}");
        app.create_item(ItemSpec::new(&owner, category, &name)).await;
    }

    for uri in ["/items?page=99", "/items?page=2"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains("Novel-10"), "{uri}");
        assert!(!response.body.contains("Novel-01"), "{uri}");
    }

    let response = app.get("/items?page=abc").await;
    assert!(response.body.contains("Novel-01"));
}

#[tokio::test]
async fn test_trailing_slash_is_normalized() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/items/").await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_home_lists_categories() {
    let mut app = TestApp::spawn().await;
    let owner = app.create_user("stocker", Role::InventoryManager).await;
    let category = app.create_category("Garden").await;
    app.create_item(ItemSpec::new(&owner, category, "Watering can")).await;

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Garden"));
    assert!(response.body.contains("Watering can"));
}

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::spawn().await;

    assert_eq!(app.get("/health").await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}
