//! Authenticated session gate in front of the panel router.
//!
//! Wraps the routes built by [`build_router`] with:
//! - session middleware (load-or-create, signed cookie)
//! - a login/logout flow rendered by the panel
//! - a guard that only lets sessions with a principal (or requests for
//!   declared public assets) through, remembering where unauthenticated
//!   clients were headed so login can send them back
//!
//! The gate and the router builder share one `Router` value, so every
//! panel route and asset sits behind the same middleware chain.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, OriginalUri, Request, State};
use axum::http::Uri;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::panel::{
    ActionRegistry, AdminPanel, AssetDescriptor, BuildError, FormConfig, LoginPage, PanelError,
    build_router,
};
use crate::session::{Principal, Session, SessionError, SessionStore};

/// Error indicator passed to the login renderer on rejected credentials.
/// Deliberately silent about which part of the credentials was wrong.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Indicator when the credential check itself failed.
pub const LOGIN_UNAVAILABLE: &str = "login temporarily unavailable";

/// Checks submitted credentials against some user base.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the principal for valid credentials, `None` for rejected
    /// ones. Errors are infrastructure failures, not rejections.
    async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> anyhow::Result<Option<Principal>>;
}

/// Cookie and redirect behavior for the gate.
#[derive(Clone)]
pub struct GateSettings {
    cookie_name: String,
    cookie_domain: Option<String>,
    cookie_secure: bool,
    /// Path segment marking API action suffixes when computing the
    /// post-login redirect target.
    action_segment: String,
    key: Key,
}

impl GateSettings {
    /// Build settings, deriving the cookie signing key from the secret.
    pub fn new(
        cookie_name: impl Into<String>,
        secret: &str,
        cookie_domain: Option<String>,
        cookie_secure: bool,
    ) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        Self {
            cookie_name: cookie_name.into(),
            cookie_domain,
            cookie_secure,
            action_segment: "/actions".to_string(),
            key: Key::derive_from(digest.as_slice()),
        }
    }

    /// Override the API action path segment.
    pub fn with_action_segment(mut self, segment: impl Into<String>) -> Self {
        self.action_segment = segment.into();
        self
    }

    fn session_cookie(&self, id: &str, path: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((self.cookie_name.clone(), id.to_string()))
            .path(path.to_string())
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Strict);
        if let Some(domain) = &self.cookie_domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}

/// Per-request gate failures.
///
/// None of these are retried; they surface as a generic 500 with the
/// detail in the log.
#[derive(Debug, Error)]
pub enum GateError {
    /// The session middleware did not attach a session to the request.
    #[error("no session attached to request")]
    MissingSession,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Panel(#[from] PanelError),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            GateError::Panel(e) => e.into_response(),
            other => {
                error!(error = %other, "gate request failed");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error",
                )
                    .into_response()
            }
        }
    }
}

/// State shared by the gate's middleware and handlers.
#[derive(Clone)]
struct GateState {
    panel: Arc<dyn AdminPanel>,
    authenticator: Arc<dyn Authenticator>,
    sessions: Arc<dyn SessionStore>,
    settings: GateSettings,
    assets: Arc<Vec<AssetDescriptor>>,
}

impl FromRef<GateState> for Key {
    fn from_ref(state: &GateState) -> Key {
        state.settings.key.clone()
    }
}

/// Build the session-authenticated panel router on top of `router`.
///
/// The returned router is relative to the panel root; mount it with
/// `Router::nest(panel.root_path(), ...)`.
pub async fn build_authenticated_router(
    panel: Arc<dyn AdminPanel>,
    actions: &ActionRegistry,
    authenticator: Arc<dyn Authenticator>,
    router: Router,
    sessions: Arc<dyn SessionStore>,
    settings: GateSettings,
    form: &FormConfig,
) -> Result<Router, BuildError> {
    let assets = Arc::new(panel.assets());
    let state = GateState {
        panel: panel.clone(),
        authenticator,
        sessions,
        settings,
        assets,
    };

    let login_route = relative_to_root(panel.root_path(), panel.login_path());
    let logout_route = relative_to_root(panel.root_path(), panel.logout_path());

    // Unmatched paths get an explicit fallback so the guard covers them
    // too: unauthenticated probes are redirected, not told what exists.
    let protected = build_router(panel, actions, router, form)
        .await?
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), guard));

    Ok(Router::new()
        .route(&login_route, get(login_page).post(login_submit))
        .route(&logout_route, get(logout))
        .with_state(state.clone())
        .merge(protected)
        .layer(middleware::from_fn_with_state(state, session_middleware)))
}

/// Strip the panel root from an absolute path, for route registration.
fn relative_to_root(root: &str, path: &str) -> String {
    match path.strip_prefix(root) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Load the session named by the cookie, or start a fresh one. The
/// session rides on request extensions; a fresh id is pushed back to the
/// client on the response.
async fn session_middleware(
    State(state): State<GateState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, GateError> {
    let (session, fresh) = match jar.get(&state.settings.cookie_name) {
        Some(cookie) => match state.sessions.load(cookie.value()).await? {
            Some(session) => (session, false),
            // Expired or unknown id: start over with a fresh session.
            None => (Session::new(), true),
        },
        None => (Session::new(), true),
    };

    let cookie = fresh.then(|| {
        state
            .settings
            .session_cookie(&session.id, state.panel.root_path())
    });
    request.extensions_mut().insert(session);

    let response = next.run(request).await;

    Ok(match cookie {
        Some(cookie) => (jar.add(cookie), response).into_response(),
        None => response,
    })
}

/// Let public asset requests and authenticated sessions through; send
/// everyone else to login, remembering where they were headed.
async fn guard(
    State(state): State<GateState>,
    OriginalUri(original): OriginalUri,
    request: Request,
    next: Next,
) -> Result<Response, GateError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or(GateError::MissingSession)?;

    let is_asset = state
        .assets
        .iter()
        .any(|asset| asset.path == request.uri().path());
    if is_asset || session.is_authenticated() {
        return Ok(next.run(request).await);
    }

    let mut session = session;
    session.redirect_to = Some(redirect_target(
        state.panel.root_path(),
        &state.settings.action_segment,
        &original,
    ));
    state.sessions.save(&session).await?;

    Ok(Redirect::to(state.panel.login_path()).into_response())
}

/// Compute where a successful login should send the client.
///
/// The original URL is truncated before any action suffix; a target
/// under the panel's API prefix collapses to the panel root, since API
/// paths are not pages a browser should land on.
fn redirect_target(root: &str, action_segment: &str, original: &Uri) -> String {
    let full = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| original.path());
    let truncated = full.split(action_segment).next().unwrap_or(full);

    let api_prefix = format!("{root}/api");
    if truncated.starts_with(&api_prefix) {
        root.to_string()
    } else {
        truncated.to_string()
    }
}

async fn login_page(State(state): State<GateState>) -> Result<Html<String>, GateError> {
    let page = LoginPage {
        action: state.panel.login_path(),
        error: None,
    };
    Ok(Html(state.panel.render_login(page).await?))
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login_submit(
    State(state): State<GateState>,
    session: Option<Extension<Session>>,
    axum::Form(credentials): axum::Form<Credentials>,
) -> Result<Response, GateError> {
    let Some(Extension(mut session)) = session else {
        return Err(GateError::MissingSession);
    };

    match state
        .authenticator
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(Some(principal)) => {
            session.principal = Some(principal);
            state.sessions.save(&session).await?;
            let target = session
                .redirect_to
                .clone()
                .unwrap_or_else(|| state.panel.root_path().to_string());
            info!(identifier = %credentials.username, "admin login");
            Ok(Redirect::to(&target).into_response())
        }
        Ok(None) => {
            warn!(identifier = %credentials.username, "rejected login");
            let page = LoginPage {
                action: state.panel.login_path(),
                error: Some(INVALID_CREDENTIALS),
            };
            Ok(Html(state.panel.render_login(page).await?).into_response())
        }
        Err(e) => {
            // An authenticator failure is not a credential rejection, but
            // the client gets the same shaped answer either way.
            error!(error = %e, "authenticator failure");
            let page = LoginPage {
                action: state.panel.login_path(),
                error: Some(LOGIN_UNAVAILABLE),
            };
            Ok(Html(state.panel.render_login(page).await?).into_response())
        }
    }
}

async fn logout(
    State(state): State<GateState>,
    jar: SignedCookieJar,
    session: Option<Extension<Session>>,
) -> Result<Response, GateError> {
    if let Some(Extension(session)) = session {
        state.sessions.destroy(&session.id).await?;
    }

    let cookie = Cookie::build((state.settings.cookie_name.clone(), String::new()))
        .path(state.panel.root_path().to_string())
        .build();
    Ok((jar.remove(cookie), Redirect::to(state.panel.login_path())).into_response())
}

async fn not_found() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_redirect_target_keeps_plain_paths() {
        assert_eq!(
            redirect_target("/admin", "/actions", &uri("/admin/resources/links")),
            "/admin/resources/links"
        );
        assert_eq!(
            redirect_target("/admin", "/actions", &uri("/admin/resources/links?page=2")),
            "/admin/resources/links?page=2"
        );
    }

    #[test]
    fn test_redirect_target_strips_action_suffix() {
        assert_eq!(
            redirect_target(
                "/admin",
                "/actions",
                &uri("/admin/resources/links/actions/bulk-delete")
            ),
            "/admin/resources/links"
        );
    }

    #[test]
    fn test_redirect_target_collapses_api_paths_to_root() {
        assert_eq!(
            redirect_target(
                "/admin",
                "/actions",
                &uri("/admin/api/resources/links/actions/list")
            ),
            "/admin"
        );
        assert_eq!(
            redirect_target("/admin", "/actions", &uri("/admin/api/search?q=x")),
            "/admin"
        );
    }

    #[test]
    fn test_redirect_target_respects_configured_segment() {
        assert_eq!(
            redirect_target("/admin", "/ops", &uri("/admin/resources/links/ops/list")),
            "/admin/resources/links"
        );
    }

    #[test]
    fn test_relative_to_root() {
        assert_eq!(relative_to_root("/admin", "/admin/login"), "/login");
        assert_eq!(relative_to_root("/admin", "/admin/logout"), "/logout");
        // Paths outside the root are left alone.
        assert_eq!(relative_to_root("/admin", "/login"), "/login");
    }
}
