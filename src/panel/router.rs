//! Router construction from panel descriptors.
//!
//! Translates the panel's declared route table into live handlers on an
//! axum [`Router`] and registers one streaming GET handler per declared
//! asset. Handlers merge path parameters, query parameters, and the
//! parsed payload into an [`ActionRequest`] and dispatch it through the
//! action registry; failures propagate to the error-handling layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request};
use axum::http::{Method, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use anyhow::anyhow;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::panel::error::{BuildError, PanelError};
use crate::panel::request::{ActionReply, ActionRequest, FieldValue};
use crate::panel::route::{RouteMethod, rewrite_template};
use crate::panel::{ActionRegistry, AdminPanel, Controller};
use crate::session::Session;

/// Body-parsing limits applied to panel routes.
#[derive(Debug, Clone, Copy)]
pub struct FormConfig {
    pub max_body_bytes: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Per-route dispatch data attached as a request extension.
#[derive(Clone)]
struct RouteBinding {
    controller: Arc<dyn Controller>,
    action: Arc<str>,
    content_type: Option<Arc<str>>,
}

/// Build the panel router on top of `router`.
///
/// Awaits panel initialization before registering anything; callers must
/// observe completion before serving traffic. Malformed templates and
/// dangling controller references fail here, at startup.
pub async fn build_router<S>(
    panel: Arc<dyn AdminPanel>,
    actions: &ActionRegistry,
    mut router: Router<S>,
    form: &FormConfig,
) -> Result<Router<S>, BuildError>
where
    S: Clone + Send + Sync + 'static,
{
    panel.initialize().await.map_err(BuildError::Init)?;
    info!(root = %panel.root_path(), "admin panel initialized");

    for route in panel.routes() {
        let path = rewrite_template(&route.path)?;
        let controller =
            actions
                .get(&route.controller)
                .ok_or_else(|| BuildError::UnknownController {
                    path: route.path.clone(),
                    controller: route.controller.clone(),
                })?;

        let binding = RouteBinding {
            controller,
            action: route.action.into(),
            content_type: route.content_type.map(Into::into),
        };
        let method_router = match route.method {
            RouteMethod::Get => get(route_handler),
            RouteMethod::Post => post(route_handler),
        };
        router = router.route(&path, method_router.layer(Extension(binding)));
    }

    for asset in panel.assets() {
        let source = Arc::new(
            std::path::absolute(&asset.source).map_err(|e| BuildError::InvalidTemplate {
                path: asset.path.clone(),
                reason: format!("asset source cannot be resolved: {e}"),
            })?,
        );
        router = router.route(
            &asset.path,
            get(move || {
                let source = source.clone();
                async move { serve_asset(source).await }
            }),
        );
    }

    Ok(router.layer(DefaultBodyLimit::max(form.max_body_bytes)))
}

async fn route_handler(
    Extension(binding): Extension<RouteBinding>,
    method: Method,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
    session: Option<Extension<Session>>,
    request: Request,
) -> Result<Response, PanelError> {
    let payload = parse_payload(request).await?;
    let method = if method == Method::POST {
        RouteMethod::Post
    } else {
        RouteMethod::Get
    };

    let request = ActionRequest {
        method,
        params,
        query,
        payload,
        principal: session.and_then(|Extension(session)| session.principal),
    };

    let reply: ActionReply = binding.controller.call(&binding.action, request).await?;

    Ok(match reply.body {
        Some(body) => match &binding.content_type {
            Some(content_type) => {
                ([(header::CONTENT_TYPE, content_type.to_string())], body).into_response()
            }
            None => Html(body).into_response(),
        },
        None => StatusCode::OK.into_response(),
    })
}

/// Parse the request body into named fields: multipart fields and
/// uploads, or urlencoded fields. Other bodies yield an empty payload.
async fn parse_payload(request: Request) -> Result<HashMap<String, FieldValue>, PanelError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut payload = HashMap::new();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| PanelError::BadRequest(format!("multipart body: {e}")))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| PanelError::BadRequest(format!("multipart field: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if field.file_name().is_some() {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| PanelError::BadRequest(format!("upload {name}: {e}")))?;
                payload.insert(
                    name,
                    FieldValue::File {
                        filename,
                        content_type,
                        data,
                    },
                );
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| PanelError::BadRequest(format!("field {name}: {e}")))?;
                payload.insert(name, FieldValue::Text(text));
            }
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let bytes = Bytes::from_request(request, &())
            .await
            .map_err(|e| anyhow!("failed to read request body: {e}"))?;
        let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
            .map_err(|e| PanelError::BadRequest(format!("form body: {e}")))?;
        for (name, value) in fields {
            payload.insert(name, FieldValue::Text(value));
        }
    }

    Ok(payload)
}

/// Stream a declared asset from its resolved source path.
async fn serve_asset(source: Arc<PathBuf>) -> Response {
    match tokio::fs::File::open(source.as_ref()).await {
        Ok(file) => {
            let mime = mime_guess::from_path(source.as_ref()).first_or_octet_stream();
            let body = Body::from_stream(ReaderStream::new(file));
            ([(header::CONTENT_TYPE, mime.to_string())], body).into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            error!(path = %source.display(), error = %e, "asset read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
