//! Admin panel seam.
//!
//! Provides:
//! - The [`AdminPanel`] trait a panel implementation supplies (route and
//!   asset tables, paths, login rendering, one-time initialization)
//! - The [`Controller`] dispatch interface and its [`ActionRegistry`]
//! - Route/asset descriptors and the router builder that turns them into
//!   live HTTP handlers

pub mod error;
pub mod request;
pub mod route;
pub mod router;

pub use error::{BuildError, PanelError};
pub use request::{ActionReply, ActionRequest, FieldValue};
pub use route::{AssetDescriptor, RouteDescriptor, RouteMethod};
pub use router::{FormConfig, build_router};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// Context handed to the panel's login renderer.
#[derive(Debug, Clone, Copy)]
pub struct LoginPage<'a> {
    /// Absolute path the login form should POST to.
    pub action: &'a str,
    /// Error indicator to display, if any.
    pub error: Option<&'a str>,
}

/// What a panel implementation supplies to the router builder and gate.
///
/// Route and asset tables are fixed at startup; the panel never sees raw
/// HTTP, only [`ActionRequest`]s dispatched through its controllers.
#[async_trait]
pub trait AdminPanel: Send + Sync + 'static {
    /// Base path the panel is mounted under, e.g. `/admin`.
    fn root_path(&self) -> &str;

    /// Absolute login path, e.g. `/admin/login`.
    fn login_path(&self) -> &str;

    /// Absolute logout path, e.g. `/admin/logout`.
    fn logout_path(&self) -> &str;

    /// Declared routes, with paths relative to the root.
    fn routes(&self) -> Vec<RouteDescriptor>;

    /// Declared public assets, with paths relative to the root.
    fn assets(&self) -> Vec<AssetDescriptor>;

    /// One-time startup work. Idempotent; callers await this before
    /// serving traffic.
    async fn initialize(&self) -> Result<(), PanelError>;

    /// Render the login page.
    async fn render_login(&self, page: LoginPage<'_>) -> Result<String, PanelError>;
}

/// One controller: handles the actions declared for it in the route table.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn call(&self, action: &str, request: ActionRequest)
    -> Result<ActionReply, PanelError>;
}

/// Explicit dispatch registry keyed by controller identifier.
///
/// Routes name a controller; the builder resolves the name here at
/// startup, so a dangling reference is a build error rather than a 500.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, controller: Arc<dyn Controller>) {
        self.controllers.insert(name.into(), controller);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.get(name).cloned()
    }
}
