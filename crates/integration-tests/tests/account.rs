//! Integration tests for the profile page.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bazaar_core::Role;
use bazaar_integration_tests::{PNG_BYTES, TestApp};
use bazaar_storefront::db::UserRepository;

fn profile_fields<'a>(username: &'a str, email: &'a str, phone: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("username", username),
        ("email", email),
        ("address", "1 Main St"),
        ("phone", phone),
    ]
}

#[tokio::test]
async fn test_profile_shows_account() {
    let mut app = TestApp::spawn().await;
    app.create_user("ann", Role::InventoryManager).await;
    app.login("ann").await;

    let response = app.get("/account").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(r#"value="ann""#));
    assert!(response.body.contains("ann@example.com"));
    assert!(response.body.contains("Inventory Manager"));
    assert!(response.body.contains(r#"enctype="multipart/form-data""#));
}

#[tokio::test]
async fn test_profile_update_saves_and_renames() {
    let mut app = TestApp::spawn().await;
    let user = app.create_user("ann", Role::Customer).await;
    app.login("ann").await;

    let response = app
        .post_multipart(
            "/account",
            &profile_fields("annie", "annie@example.com", "+1 555-0100"),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/account?saved=1"));

    let page = app.get("/account?saved=1").await;
    assert!(page.body.contains("Your profile has been updated."));
    assert!(page.body.contains(r#"value="1 Main St""#));

    let home = app.get("/").await;
    assert!(home.body.contains("annie"));

    let users = UserRepository::new(app.pool());
    let stored = users.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "annie");
    let profile = users.get_profile(user.id).await.unwrap();
    assert_eq!(profile.phone, "+1 555-0100");
    assert_eq!(profile.image, None);
}

#[tokio::test]
async fn test_profile_picture_upload_and_removal() {
    let mut app = TestApp::spawn().await;
    let user = app.create_user("ann", Role::Customer).await;
    app.login("ann").await;

    let response = app
        .post_multipart_files(
            "/account",
            &profile_fields("ann", "ann@example.com", ""),
            "image",
            &[PNG_BYTES],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let pool = app.pool().clone();
    let users = UserRepository::new(&pool);
    let path = users.get_profile(user.id).await.unwrap().image.unwrap();
    assert!(path.starts_with("profile_images/"));

    let page = app.get("/account").await;
    assert!(page.body.contains(&format!(r#"src="/media/{path}""#)));
    let served = app.get(&format!("/media/{path}")).await;
    assert_eq!(served.status, StatusCode::OK);

    let mut fields = profile_fields("ann", "ann@example.com", "");
    fields.push(("clear_image", "on"));
    let response = app.post_multipart("/account", &fields, &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    assert_eq!(users.get_profile(user.id).await.unwrap().image, None);
    assert_eq!(app.get(&format!("/media/{path}")).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_rejects_non_image_picture() {
    let mut app = TestApp::spawn().await;
    let user = app.create_user("ann", Role::Customer).await;
    app.login("ann").await;

    let response = app
        .post_multipart_files(
            "/account",
            &profile_fields("ann", "ann@example.com", ""),
            "image",
            &[b"%PDF-1.7 not a picture".as_slice()],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Upload a valid image."));
    let users = UserRepository::new(app.pool());
    assert_eq!(users.get_profile(user.id).await.unwrap().image, None);
}

#[tokio::test]
async fn test_profile_rejects_bad_phone() {
    let mut app = TestApp::spawn().await;
    app.create_user("ann", Role::Customer).await;
    app.login("ann").await;

    let response = app
        .post_multipart(
            "/account",
            &profile_fields("ann", "ann@example.com", "call me"),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(r#"class="error""#));
}

#[tokio::test]
async fn test_profile_rejects_taken_username() {
    let mut app = TestApp::spawn().await;
    app.create_user("ann", Role::Customer).await;
    app.create_user("bob", Role::Customer).await;
    app.login("ann").await;

    let response = app
        .post_multipart(
            "/account",
            &[("username", "bob"), ("email", "ann@example.com")],
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("A user with that username already exists."));
}
