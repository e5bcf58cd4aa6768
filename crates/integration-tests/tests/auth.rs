//! Integration tests for signup, login and role-based access.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bazaar_core::Role;
use bazaar_integration_tests::{PASSWORD, TestApp};
use bazaar_storefront::db::UserRepository;

const STAFF_PAGES: [&str; 3] = ["/dashboard", "/items/new", "/items/export-csv"];

fn signup_body(username: &str, role: &str) -> String {
    format!(
        "username={username}&email={username}%40example.com&password1=s3cret-pass&password2=s3cret-pass&role={role}"
    )
}

#[tokio::test]
async fn test_signup_then_login() {
    let mut app = TestApp::spawn().await;

    let response = app.post_form("/signup", &signup_body("newbie", "customer")).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/login"));

    let response = app
        .post_form("/login", "username=newbie&password=s3cret-pass")
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));

    let home = app.get("/").await;
    assert!(home.body.contains("newbie"));
    assert!(home.body.contains("Log out"));
    assert!(!home.body.contains("/dashboard"));
}

#[tokio::test]
async fn test_signup_as_inventory_manager_shows_staff_links() {
    let mut app = TestApp::spawn().await;

    app.post_form("/signup", &signup_body("keeper", "inventory_manager"))
        .await;
    app.post_form("/login", "username=keeper&password=s3cret-pass")
        .await;

    let home = app.get("/").await;
    assert!(home.body.contains(r#"href="/dashboard""#));
    assert!(home.body.contains(r#"href="/items/new""#));
}

#[tokio::test]
async fn test_signup_cannot_pick_admin() {
    let mut app = TestApp::spawn().await;

    let response = app.post_form("/signup", &signup_body("sneaky", "admin")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Select a valid choice."));
    let login = app
        .post_form("/login", "username=sneaky&password=s3cret-pass")
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_rejects_taken_username() {
    let mut app = TestApp::spawn().await;
    app.create_user("taken", Role::Customer).await;

    let response = app.post_form("/signup", &signup_body("taken", "customer")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("A user with that username already exists."));
}

#[tokio::test]
async fn test_signup_rejects_mismatched_passwords() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/signup",
            "username=ann&email=ann%40example.com&password1=s3cret-pass&password2=other-pass&role=customer",
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("password fields didn"));
}

#[tokio::test]
async fn test_login_with_wrong_password_rerenders() {
    let mut app = TestApp::spawn().await;
    app.create_user("ann", Role::Customer).await;

    let response = app
        .post_form("/login", "username=ann&password=wrong-password")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Please enter a correct username and password."));
    assert!(response.body.contains(r#"value="ann""#));
}

#[tokio::test]
async fn test_anonymous_is_sent_to_login() {
    let mut app = TestApp::spawn().await;

    for uri in STAFF_PAGES.into_iter().chain(["/account"]) {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(response.location(), Some("/login"), "{uri}");
    }
}

#[tokio::test]
async fn test_customer_is_forbidden_from_staff_pages() {
    let mut app = TestApp::spawn().await;
    app.create_user("shopper", Role::Customer).await;
    app.login("shopper").await;

    for uri in STAFF_PAGES {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{uri}");
    }
    assert_eq!(app.get("/account").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let mut app = TestApp::spawn().await;
    app.create_user("keeper", Role::InventoryManager).await;
    app.login("keeper").await;
    assert_eq!(app.get("/dashboard").await.status, StatusCode::OK);

    let response = app.post("/logout").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let response = app.get("/dashboard").await;
    assert_eq!(response.location(), Some("/login"));
}

#[tokio::test]
async fn test_password_constant_logs_in() {
    let mut app = TestApp::spawn().await;
    app.create_user("boss", Role::Admin).await;

    let response = app
        .post_form("/login", &format!("username=boss&password={PASSWORD}"))
        .await;

    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn test_demoted_manager_loses_staff_pages_without_relogin() {
    let mut app = TestApp::spawn().await;
    app.create_user("mgr", Role::InventoryManager).await;
    app.login("mgr").await;
    assert_eq!(app.get("/items/new").await.status, StatusCode::OK);

    UserRepository::new(app.pool())
        .set_role("mgr", Role::Customer)
        .await
        .unwrap();

    for page in STAFF_PAGES {
        assert_eq!(app.get(page).await.status, StatusCode::FORBIDDEN, "{page}");
    }
    let home = app.get("/").await;
    assert!(!home.body.contains(r#"href="/dashboard""#));
}

#[tokio::test]
async fn test_promoted_customer_gains_staff_pages_without_relogin() {
    let mut app = TestApp::spawn().await;
    app.create_user("shopper", Role::Customer).await;
    app.login("shopper").await;
    assert_eq!(app.get("/dashboard").await.status, StatusCode::FORBIDDEN);

    UserRepository::new(app.pool())
        .set_role("shopper", Role::Admin)
        .await
        .unwrap();

    assert_eq!(app.get("/dashboard").await.status, StatusCode::OK);
}
