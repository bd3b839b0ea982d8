//! Concrete admin panel for shortlink records.

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::panel::{
    ActionRegistry, ActionReply, ActionRequest, AdminPanel, AssetDescriptor, Controller,
    LoginPage, PanelError, RouteDescriptor,
};
use crate::shortener::store::LinkStore;
use crate::shortener::templates::{LinkDetailTemplate, LinksTemplate, LoginTemplate};

/// Branding shown on panel pages.
#[derive(Debug, Clone)]
pub struct Branding {
    pub name: String,
    pub logo: Option<String>,
}

/// The shortlink panel: declares routes for the link resource and
/// renders its pages.
pub struct ShortlinkAdmin {
    root: String,
    login_path: String,
    logout_path: String,
    branding: Branding,
    assets_dir: PathBuf,
    ready: OnceCell<()>,
}

impl ShortlinkAdmin {
    pub fn new(root: impl Into<String>, branding: Branding, assets_dir: PathBuf) -> Self {
        let root = root.into();
        Self {
            login_path: format!("{root}/login"),
            logout_path: format!("{root}/logout"),
            root,
            branding,
            assets_dir,
            ready: OnceCell::new(),
        }
    }

    /// Registry with this panel's controllers bound to the given store.
    pub fn actions(&self, links: Arc<LinkStore>) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry.register(
            "links",
            Arc::new(LinksController {
                links: links.clone(),
                branding: self.branding.clone(),
                root: self.root.clone(),
            }),
        );
        registry.register("links_api", Arc::new(LinksApiController { links }));
        registry
    }
}

#[async_trait]
impl AdminPanel for ShortlinkAdmin {
    fn root_path(&self) -> &str {
        &self.root
    }

    fn login_path(&self) -> &str {
        &self.login_path
    }

    fn logout_path(&self) -> &str {
        &self.logout_path
    }

    fn routes(&self) -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::get("/", "links", "list"),
            RouteDescriptor::get("/resources/links", "links", "list"),
            RouteDescriptor::get("/resources/links/records/{id}/show", "links", "show"),
            RouteDescriptor::post("/resources/links/records/new", "links", "new"),
            RouteDescriptor::post("/resources/links/records/{id}/delete", "links", "delete"),
            RouteDescriptor::get("/api/resources/links/actions/list", "links_api", "list")
                .with_content_type("application/json"),
            RouteDescriptor::post("/api/resources/links/actions/new", "links_api", "new")
                .with_content_type("application/json"),
        ]
    }

    fn assets(&self) -> Vec<AssetDescriptor> {
        vec![AssetDescriptor {
            path: "/frontend/assets/panel.css".to_string(),
            source: self.assets_dir.join("panel.css"),
        }]
    }

    async fn initialize(&self) -> Result<(), PanelError> {
        self.ready
            .get_or_try_init(|| async {
                for asset in self.assets() {
                    if !asset.source.exists() {
                        warn!(path = %asset.source.display(), "asset source missing");
                    }
                }
                info!(panel = %self.branding.name, "panel assets ready");
                Ok(())
            })
            .await
            .map(|_| ())
    }

    async fn render_login(&self, page: LoginPage<'_>) -> Result<String, PanelError> {
        let template = LoginTemplate {
            panel_name: &self.branding.name,
            root: &self.root,
            logo: self.branding.logo.as_deref(),
            action: page.action,
            error: page.error,
        };
        Ok(template.render()?)
    }
}

/// HTML pages for the link resource.
struct LinksController {
    links: Arc<LinkStore>,
    branding: Branding,
    root: String,
}

impl LinksController {
    async fn render_list(&self) -> Result<ActionReply, PanelError> {
        let links = self.links.list().await?;
        let template = LinksTemplate {
            panel_name: &self.branding.name,
            root: &self.root,
            links: &links,
        };
        Ok(ActionReply::rendered(template.render()?))
    }

    fn record_id(request: &ActionRequest) -> Result<i64, PanelError> {
        request
            .param("id")
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| PanelError::NotFound("link".to_string()))
    }
}

#[async_trait]
impl Controller for LinksController {
    async fn call(
        &self,
        action: &str,
        request: ActionRequest,
    ) -> Result<ActionReply, PanelError> {
        match action {
            "list" => self.render_list().await,
            "show" => {
                let id = Self::record_id(&request)?;
                let link = self
                    .links
                    .get(id)
                    .await?
                    .ok_or_else(|| PanelError::NotFound(format!("link {id}")))?;
                let template = LinkDetailTemplate {
                    panel_name: &self.branding.name,
                    root: &self.root,
                    link: &link,
                };
                Ok(ActionReply::rendered(template.render()?))
            }
            "new" => {
                let (slug, target_url) = creation_fields(&request)?;
                self.links.create(slug, target_url).await?;
                self.render_list().await
            }
            "delete" => {
                let id = Self::record_id(&request)?;
                self.links.delete(id).await?;
                self.render_list().await
            }
            other => Err(PanelError::UnknownAction(other.to_string())),
        }
    }
}

/// JSON actions for the link resource.
struct LinksApiController {
    links: Arc<LinkStore>,
}

#[async_trait]
impl Controller for LinksApiController {
    async fn call(
        &self,
        action: &str,
        request: ActionRequest,
    ) -> Result<ActionReply, PanelError> {
        match action {
            "list" => {
                let links = self.links.list().await?;
                ActionReply::json(&serde_json::json!({ "records": links }))
            }
            "new" => {
                let (slug, target_url) = creation_fields(&request)?;
                let link = self.links.create(slug, target_url).await?;
                ActionReply::json(&serde_json::json!({ "record": link }))
            }
            other => Err(PanelError::UnknownAction(other.to_string())),
        }
    }
}

fn creation_fields(request: &ActionRequest) -> Result<(&str, &str), PanelError> {
    let slug = request
        .text("slug")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PanelError::BadRequest("missing field: slug".to_string()))?;
    let target_url = request
        .text("target_url")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PanelError::BadRequest("missing field: target_url".to_string()))?;
    Ok((slug, target_url))
}
