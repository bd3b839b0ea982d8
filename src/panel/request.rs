//! Request context handed to controller actions.

use std::collections::HashMap;

use bytes::Bytes;

use crate::panel::route::RouteMethod;
use crate::session::Principal;

/// One submitted form value: a text field or an uploaded file.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    File {
        filename: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    },
}

/// Everything a controller action sees about one request: path and query
/// parameters, the parsed payload, and the caller's principal (absent
/// when the route was reached without the gate).
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub method: RouteMethod,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub payload: HashMap<String, FieldValue>,
    pub principal: Option<Principal>,
}

impl ActionRequest {
    /// Path parameter by placeholder name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Text payload field by name. Files yield `None`.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.payload.get(name) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// What a controller action produced.
#[derive(Debug, Clone, Default)]
pub struct ActionReply {
    /// Rendered content, written with the route's declared content type.
    /// `None` means an empty 200.
    pub body: Option<String>,
}

impl ActionReply {
    pub fn rendered(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    pub fn empty() -> Self {
        Self { body: None }
    }

    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, crate::panel::PanelError> {
        Ok(Self {
            body: Some(serde_json::to_string(value)?),
        })
    }
}
