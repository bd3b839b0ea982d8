//! Route and asset descriptors declared by a panel implementation.

use std::fmt;
use std::path::PathBuf;

use crate::panel::error::BuildError;

/// HTTP methods a panel route may declare.
///
/// Anything else is a configuration error at descriptor construction,
/// not at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RouteMethod {
    type Error = BuildError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(RouteMethod::Get),
            "POST" => Ok(RouteMethod::Post),
            other => Err(BuildError::UnsupportedMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// One declared panel endpoint.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub method: RouteMethod,
    /// Path template relative to the panel root, with `{name}` placeholders.
    pub path: String,
    /// Controller identifier, resolved in the action registry at build time.
    pub controller: String,
    /// Action name passed to the controller's dispatch method.
    pub action: String,
    /// Content type set on rendered responses. HTML when absent.
    pub content_type: Option<String>,
}

impl RouteDescriptor {
    pub fn get(
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            method: RouteMethod::Get,
            path: path.into(),
            controller: controller.into(),
            action: action.into(),
            content_type: None,
        }
    }

    pub fn post(
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            method: RouteMethod::Post,
            path: path.into(),
            controller: controller.into(),
            action: action.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// One declared public static asset.
#[derive(Debug, Clone)]
pub struct AssetDescriptor {
    /// Public path relative to the panel root.
    pub path: String,
    /// Filesystem source the asset is streamed from.
    pub source: PathBuf,
}

/// Convert a `{name}` route template into the router's capture syntax.
///
/// Placeholder names become captures under the same name; no other
/// characters are altered. Placeholders must span a whole path segment
/// and names must be identifiers; a stray brace or a mid-segment
/// placeholder is rejected at build time.
pub fn rewrite_template(path: &str) -> Result<String, BuildError> {
    let invalid = |reason: &str| BuildError::InvalidTemplate {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        if let Some(rest) = segment.strip_prefix('{') {
            let Some(name) = rest.strip_suffix('}') else {
                return Err(invalid("unclosed placeholder"));
            };
            if name.is_empty() {
                return Err(invalid("empty placeholder name"));
            }
            if !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(invalid("placeholder name must be an identifier"));
            }
            segments.push(format!("{{{name}}}"));
        } else if segment.contains('{') || segment.contains('}') {
            return Err(invalid("placeholder must span a whole path segment"));
        } else {
            segments.push(segment.to_string());
        }
    }

    Ok(segments.join("/"))
}
