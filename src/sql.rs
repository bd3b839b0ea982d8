//! SQL query constants.

pub const UPSERT_SESSION: &str = r#"
    INSERT INTO sessions (id, principal, redirect_to, created_at, expires_at)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        principal = excluded.principal,
        redirect_to = excluded.redirect_to,
        expires_at = excluded.expires_at
"#;

pub const SELECT_SESSION: &str =
    "SELECT id, principal, redirect_to, expires_at FROM sessions WHERE id = ?";

pub const DELETE_SESSION: &str = "DELETE FROM sessions WHERE id = ?";

pub const DELETE_EXPIRED_SESSIONS: &str = "DELETE FROM sessions WHERE expires_at < ?";

pub const INSERT_ADMIN_USER: &str = r#"
    INSERT INTO admin_users (username, password_hash, created_at)
    VALUES (?, ?, ?)
"#;

pub const SELECT_ADMIN_USER: &str =
    "SELECT username, password_hash, created_at, last_login FROM admin_users WHERE username = ?";

pub const SELECT_ALL_ADMIN_USERS: &str =
    "SELECT username, password_hash, created_at, last_login FROM admin_users ORDER BY username";

pub const DELETE_ADMIN_USER: &str = "DELETE FROM admin_users WHERE username = ?";

pub const UPDATE_ADMIN_USER_LAST_LOGIN: &str =
    "UPDATE admin_users SET last_login = ? WHERE username = ?";

pub const INSERT_LINK: &str = r#"
    INSERT INTO links (slug, target_url, created_at)
    VALUES (?, ?, ?)
"#;

pub const SELECT_LINK: &str =
    "SELECT id, slug, target_url, created_at, hits FROM links WHERE id = ?";

pub const SELECT_LINK_BY_SLUG: &str =
    "SELECT id, slug, target_url, created_at, hits FROM links WHERE slug = ?";

pub const SELECT_ALL_LINKS: &str =
    "SELECT id, slug, target_url, created_at, hits FROM links ORDER BY created_at DESC";

pub const DELETE_LINK: &str = "DELETE FROM links WHERE id = ?";

pub const BUMP_LINK_HITS: &str = "UPDATE links SET hits = hits + 1 WHERE id = ?";
