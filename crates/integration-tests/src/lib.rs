//! Integration tests for Bazaar.
//!
//! Every test builds the full storefront router over a fresh in-memory
//! `SQLite` database and drives it in-process, so no server or external
//! database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Signup, login, logout and role-based access
//! - `browse` - Catalog filtering, pagination and the AJAX fragment
//! - `cart` - Session cart actions and totals
//! - `items` - Item detail, edit/delete ownership and CSV export
//! - `account` - Profile updates

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::{Service, ServiceExt};
use tower_http::normalize_path::NormalizePath;

use bazaar_core::{CategoryId, ItemId, Money, Role};
use bazaar_storefront::app::build_app;
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::db::{self, CategoryRepository, ItemRepository};
use bazaar_storefront::middleware::{SESSION_COOKIE_NAME, create_session_store};
use bazaar_storefront::models::{NewItem, User};
use bazaar_storefront::services::AuthService;
use bazaar_storefront::state::AppState;

/// Password given to every account created by [`TestApp::create_user`].
pub const PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "bazaar-test-boundary";

/// Smallest byte string recognised as a PNG upload.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

/// The storefront under test, with a one-user cookie jar.
pub struct TestApp {
    app: NormalizePath<Router>,
    pool: SqlitePool,
    cookie: Option<String>,
    _media: TempDir,
}

impl TestApp {
    /// Build the application over a fresh database.
    ///
    /// # Panics
    ///
    /// Panics if the database or configuration cannot be set up.
    pub async fn spawn() -> Self {
        let media = TempDir::new().expect("create media dir");
        let media_dir = media.path().to_string_lossy().into_owned();
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static");

        let config = StorefrontConfig::from_lookup(|key| match key {
            "BAZAAR_BASE_URL" => Some("http://localhost:8000".to_owned()),
            "BAZAAR_MEDIA_DIR" => Some(media_dir.clone()),
            "BAZAAR_STATIC_DIR" => Some(static_dir.to_owned()),
            _ => None,
        })
        .expect("test configuration");

        let pool = db::memory_pool().await.expect("in-memory database");
        let store = create_session_store(&pool).await.expect("session store");
        let app = build_app(AppState::new(config, pool.clone()), store);

        Self {
            app,
            pool,
            cookie: None,
            _media: media,
        }
    }

    /// The database behind the app.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether the jar holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    /// Send a request, attaching and updating the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let mut request = request;
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                cookie.parse().expect("cookie header value"),
            );
        }

        let response = ServiceExt::<Request<Body>>::ready(&mut self.app)
            .await
            .expect("router ready")
            .call(request)
            .await
            .expect("infallible router");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();

        self.store_cookie(&headers);

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        let prefix = format!("{SESSION_COOKIE_NAME}=");
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            if !value.starts_with(&prefix) {
                continue;
            }
            if value.contains("Max-Age=0") {
                self.cookie = None;
            } else {
                self.cookie = value.split(';').next().map(str::to_owned);
            }
        }
    }

    /// GET a path.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.get_with(uri, &[]).await
    }

    /// GET a path with extra headers.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn get_with(&mut self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::get(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).expect("request"))
            .await
    }

    /// POST an urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_form(&mut self, uri: &str, body: &str) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .expect("request");
        self.send(request).await
    }

    /// POST a `multipart/form-data` body of text fields and `images` files.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        images: &[&[u8]],
    ) -> TestResponse {
        self.post_multipart_files(uri, fields, "images", images).await
    }

    /// POST a `multipart/form-data` body of text fields plus files under
    /// `file_field`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_multipart_files(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file_field: &str,
        files: &[&[u8]],
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (n, bytes) in files.iter().enumerate() {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{file_field}\"; filename=\"image{n}.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    /// POST with an empty body, like the cart buttons.
    pub async fn post(&mut self, uri: &str) -> TestResponse {
        self.post_form(uri, "").await
    }

    /// POST the same empty-body request `count` times at once, sharing the
    /// current session cookie, and return every status.
    ///
    /// # Panics
    ///
    /// Panics if a request fails or a task panics.
    pub async fn post_concurrently(&self, uri: &str, count: usize) -> Vec<StatusCode> {
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..count {
            let mut app = self.app.clone();
            let mut request = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::empty())
                .expect("request");
            if let Some(cookie) = &self.cookie {
                request.headers_mut().insert(
                    header::COOKIE,
                    cookie.parse().expect("cookie header value"),
                );
            }
            tasks.spawn(async move {
                ServiceExt::<Request<Body>>::ready(&mut app)
                    .await
                    .expect("router ready")
                    .call(request)
                    .await
                    .expect("infallible router")
                    .status()
            });
        }

        tasks.join_all().await
    }

    /// Create an account with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if the account cannot be created.
    pub async fn create_user(&self, username: &str, role: Role) -> User {
        AuthService::new(&self.pool)
            .create_user(username, &format!("{username}@example.com"), PASSWORD, role)
            .await
            .expect("create user")
    }

    /// Log in through the login form.
    ///
    /// # Panics
    ///
    /// Panics if the login does not redirect home.
    pub async fn login(&mut self, username: &str) {
        let response = self
            .post_form("/login", &format!("username={username}&password={PASSWORD}"))
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "login failed: {}", response.body);
        assert_eq!(response.location(), Some("/"));
    }

    /// Create a category.
    ///
    /// # Panics
    ///
    /// Panics if the category cannot be created.
    pub async fn create_category(&self, name: &str) -> CategoryId {
        CategoryRepository::new(&self.pool)
            .create(name)
            .await
            .expect("create category")
            .id
    }

    /// Insert an item without images.
    ///
    /// # Panics
    ///
    /// Panics if the item cannot be inserted.
    pub async fn create_item(&self, item: ItemSpec<'_>) -> ItemId {
        let new_item = NewItem {
            category_id: item.category,
            name: item.name.to_owned(),
            description: item.description.map(str::to_owned),
            price: Money::from_cents(item.price_cents),
            stock: item.stock,
            created_by: item.owner.id,
        };
        ItemRepository::new(&self.pool)
            .create(&new_item, &[])
            .await
            .expect("create item")
    }
}

/// Fields for [`TestApp::create_item`].
#[derive(Debug, Clone, Copy)]
pub struct ItemSpec<'a> {
    pub owner: &'a User,
    pub category: CategoryId,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price_cents: i64,
    pub stock: u32,
}

impl<'a> ItemSpec<'a> {
    /// An item with no description, priced at 10.00 with 5 in stock.
    #[must_use]
    pub const fn new(owner: &'a User, category: CategoryId, name: &'a str) -> Self {
        Self {
            owner,
            category,
            name,
            description: None,
            price_cents: 1000,
            stock: 5,
        }
    }
}
