//! Integration tests for the authenticated session gate.
//!
//! These tests verify that:
//! - Unauthenticated requests are redirected to login with the original
//!   path remembered (API action paths collapse to the panel root)
//! - Login success redirects back to the remembered path and marks the
//!   session authenticated; failure re-renders the form
//! - Public assets pass through without touching session state
//! - Logout always lands on the login page
//! - Authenticated requests reach the panel's controllers

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use shortlinkd::config::DatabaseConfig;
use shortlinkd::db::{Database, DbPool};
use shortlinkd::gate::{GateSettings, build_authenticated_router};
use shortlinkd::panel::FormConfig;
use shortlinkd::session::{SessionStore, SqliteSessionStore};
use shortlinkd::shortener::{AdminDirectory, Branding, LinkStore, ShortlinkAdmin};

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const PASSWORD: &str = "correct-horse-battery";

/// Test fixture with the full gated panel router and direct pool access
/// for asserting on persisted session state.
struct TestFixture {
    _temp_dir: TempDir,
    app: Router,
    pool: DbPool,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&DatabaseConfig::default(), temp_dir.path())
            .await
            .unwrap();
        let pool = db.pool();

        let directory = Arc::new(AdminDirectory::new(pool.clone()));
        directory.create_user("admin", PASSWORD).await.unwrap();

        let links = Arc::new(LinkStore::new(pool.clone()));
        links
            .create("docs", "https://example.com/docs")
            .await
            .unwrap();

        let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(
            pool.clone(),
            chrono::Duration::hours(1),
        ));

        let assets_dir = temp_dir.path().join("static");
        std::fs::create_dir_all(&assets_dir).unwrap();
        std::fs::write(assets_dir.join("panel.css"), "body{color:#111}").unwrap();

        let panel = Arc::new(ShortlinkAdmin::new(
            "/admin",
            Branding {
                name: "Shortlink Admin".to_string(),
                logo: None,
            },
            assets_dir,
        ));
        let actions = panel.actions(links);

        let settings = GateSettings::new("shortlink_session", SECRET, None, false);
        let gated = build_authenticated_router(
            panel,
            &actions,
            directory,
            Router::new(),
            sessions,
            settings,
            &FormConfig::default(),
        )
        .await
        .unwrap();

        Self {
            _temp_dir: temp_dir,
            app: Router::new().nest("/admin", gated),
            pool,
        }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        body: &str,
    ) -> axum::response::Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// All (principal, redirect_to) pairs currently persisted.
    async fn session_rows(&self) -> Vec<(Option<String>, Option<String>)> {
        use sqlx::Row;
        sqlx::query("SELECT principal, redirect_to FROM sessions")
            .fetch_all(&self.pool)
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.get("principal"), row.get("redirect_to")))
            .collect()
    }
}

/// Extract the `name=value` pair from a response's Set-Cookie header.
fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets a session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response is a redirect")
        .to_str()
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn unauthenticated_request_redirects_to_login_and_remembers_target() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/admin/resources/links", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let rows = fixture.session_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, None);
    assert_eq!(rows[0].1.as_deref(), Some("/admin/resources/links"));
}

#[tokio::test]
async fn api_action_path_collapses_to_panel_root() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .get("/admin/api/resources/links/actions/list", None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let rows = fixture.session_rows().await;
    assert_eq!(rows[0].1.as_deref(), Some("/admin"));
}

#[tokio::test]
async fn login_redirects_back_to_remembered_target() {
    let fixture = TestFixture::new().await;

    let first = fixture.get("/admin/resources/links", None).await;
    let cookie = session_cookie(&first);

    let response = fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            &format!("username=admin&password={PASSWORD}"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/resources/links");

    let rows = fixture.session_rows().await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].0.is_some(), "principal stored after login");

    // The authenticated session now reaches the panel's pages.
    let page = fixture.get("/admin/resources/links", Some(&cookie)).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = body_string(page).await;
    assert!(html.contains("docs"));
}

#[tokio::test]
async fn login_without_target_redirects_to_panel_root() {
    let fixture = TestFixture::new().await;

    // Visit the login page first so the client has a session cookie.
    let first = fixture.get("/admin/login", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first);

    let response = fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            &format!("username=admin&password={PASSWORD}"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
}

#[tokio::test]
async fn failed_login_rerenders_form_and_leaves_session_unauthenticated() {
    let fixture = TestFixture::new().await;

    let first = fixture.get("/admin/resources/links", None).await;
    let cookie = session_cookie(&first);

    let response = fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            "username=admin&password=wrong",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("invalid credentials"));

    let rows = fixture.session_rows().await;
    assert_eq!(rows[0].0, None, "principal stays empty after rejection");
}

#[tokio::test]
async fn unknown_identifier_gets_the_same_answer_as_wrong_password() {
    let fixture = TestFixture::new().await;

    let first = fixture.get("/admin/login", None).await;
    let cookie = session_cookie(&first);

    let ghost = fixture
        .post_form("/admin/login", Some(&cookie), "username=ghost&password=x")
        .await;
    let wrong = fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            "username=admin&password=wrong",
        )
        .await;

    assert_eq!(ghost.status(), StatusCode::OK);
    assert_eq!(wrong.status(), StatusCode::OK);
    let ghost_html = body_string(ghost).await;
    let wrong_html = body_string(wrong).await;
    assert_eq!(ghost_html, wrong_html);
}

#[tokio::test]
async fn login_page_always_renders() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/admin/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains(r#"action="/admin/login""#));
    assert!(!html.contains("invalid credentials"));
}

#[tokio::test]
async fn public_asset_passes_through_without_session_state() {
    let fixture = TestFixture::new().await;

    for _ in 0..2 {
        let response = fixture
            .get("/admin/frontend/assets/panel.css", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let css = body_string(response).await;
        assert_eq!(css, "body{color:#111}");
    }

    // Repeated asset fetches never persist session state.
    assert!(fixture.session_rows().await.is_empty());
}

#[tokio::test]
async fn logout_redirects_to_login_with_and_without_session() {
    let fixture = TestFixture::new().await;

    // Without any session cookie.
    let response = fixture.get("/admin/logout", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    // With an authenticated session: the session row is destroyed.
    let first = fixture.get("/admin/resources/links", None).await;
    let cookie = session_cookie(&first);
    fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            &format!("username=admin&password={PASSWORD}"),
        )
        .await;
    assert_eq!(fixture.session_rows().await.len(), 1);

    let response = fixture.get("/admin/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(fixture.session_rows().await.is_empty());

    // The old cookie no longer opens the panel.
    let after = fixture.get("/admin/resources/links", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&after), "/admin/login");
}

#[tokio::test]
async fn authenticated_session_reaches_json_actions() {
    let fixture = TestFixture::new().await;

    let first = fixture.get("/admin", None).await;
    let cookie = session_cookie(&first);
    fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            &format!("username=admin&password={PASSWORD}"),
        )
        .await;

    let response = fixture
        .get("/admin/api/resources/links/actions/list", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap(),
        "application/json"
    );
    let body = body_string(response).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["records"][0]["slug"], "docs");

    let created = fixture
        .post_form(
            "/admin/api/resources/links/actions/new",
            Some(&cookie),
            "slug=blog&target_url=https%3A%2F%2Fexample.com%2Fblog",
        )
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let body = body_string(created).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["record"]["slug"], "blog");
}

#[tokio::test]
async fn unknown_panel_path_redirects_like_any_protected_route() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/admin/resources/secrets", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
}

#[tokio::test]
async fn record_pages_resolve_path_placeholders() {
    let fixture = TestFixture::new().await;

    let first = fixture.get("/admin", None).await;
    let cookie = session_cookie(&first);
    fixture
        .post_form(
            "/admin/login",
            Some(&cookie),
            &format!("username=admin&password={PASSWORD}"),
        )
        .await;

    let response = fixture
        .get("/admin/resources/links/records/1/show", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("https://example.com/docs"));

    let missing = fixture
        .get("/admin/resources/links/records/999/show", Some(&cookie))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
