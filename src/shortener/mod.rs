//! The shortlink application: records, administrators, and the concrete
//! panel served by the daemon.

pub mod admin;
pub mod auth;
pub mod store;
mod templates;

pub use admin::{Branding, ShortlinkAdmin};
pub use auth::{AdminDirectory, AdminUser};
pub use store::{Link, LinkStore};

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use tracing::{error, warn};

/// Public routes of the shortener itself, mounted outside the panel root.
pub fn public_router(links: Arc<LinkStore>) -> Router {
    Router::new()
        .route("/{slug}", get(follow_link))
        .with_state(links)
}

/// Resolve a slug, count the visit, and send the client on.
async fn follow_link(
    State(links): State<Arc<LinkStore>>,
    Path(slug): Path<String>,
) -> Response {
    match links.find_by_slug(&slug).await {
        Ok(Some(link)) => {
            if let Err(e) = links.record_hit(link.id).await {
                warn!(slug = %slug, error = %e, "hit count update failed");
            }
            Redirect::temporary(&link.target_url).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "no such link").into_response(),
        Err(e) => {
            error!(slug = %slug, error = %e, "link lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}
