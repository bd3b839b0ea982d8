//! Askama templates for the shortlink panel.

use askama::Template;

use crate::shortener::store::Link;

/// Login page template
#[derive(Template)]
#[template(path = "panel/login.html")]
pub struct LoginTemplate<'a> {
    pub panel_name: &'a str,
    pub root: &'a str,
    pub logo: Option<&'a str>,
    pub action: &'a str,
    pub error: Option<&'a str>,
}

/// Link list page template
#[derive(Template)]
#[template(path = "panel/links.html")]
pub struct LinksTemplate<'a> {
    pub panel_name: &'a str,
    pub root: &'a str,
    pub links: &'a [Link],
}

/// Link detail page template
#[derive(Template)]
#[template(path = "panel/link_detail.html")]
pub struct LinkDetailTemplate<'a> {
    pub panel_name: &'a str,
    pub root: &'a str,
    pub link: &'a Link,
}
