//! Panel administrators: accounts and credential checks.
//!
//! Handles password hashing (argon2) and admin user management, and
//! implements the gate's authenticate callback on top of both.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::Row;

use crate::db::DbPool;
use crate::gate::Authenticator;
use crate::session::Principal;
use crate::sql;

/// Admin user record
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Database-backed storage for panel administrators.
pub struct AdminDirectory {
    pool: DbPool,
}

impl AdminDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Hash a password using Argon2id.
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Create a new admin user.
    pub async fn create_user(&self, username: &str, password: &str) -> Result<()> {
        let password_hash = Self::hash_password(password)?;

        sqlx::query(sql::INSERT_ADMIN_USER)
            .bind(username)
            .bind(&password_hash)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to create admin user")?;

        Ok(())
    }

    /// Get an admin user by username.
    pub async fn get_user(&self, username: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query(sql::SELECT_ADMIN_USER)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query admin user")?;

        let user = match row {
            Some(row) => Some(AdminUser {
                username: row.get("username"),
                password_hash: row.get("password_hash"),
                created_at: DateTime::parse_from_rfc3339(row.get("created_at"))
                    .context("Invalid created_at timestamp")?
                    .with_timezone(&Utc),
                last_login: row
                    .get::<Option<String>, _>("last_login")
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            }),
            None => None,
        };

        Ok(user)
    }

    /// List all admin users.
    pub async fn list_users(&self) -> Result<Vec<AdminUser>> {
        let rows = sqlx::query(sql::SELECT_ALL_ADMIN_USERS)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list admin users")?;

        let users = rows
            .into_iter()
            .filter_map(|row| {
                Some(AdminUser {
                    username: row.get("username"),
                    password_hash: row.get("password_hash"),
                    created_at: DateTime::parse_from_rfc3339(row.get("created_at"))
                        .ok()?
                        .with_timezone(&Utc),
                    last_login: row
                        .get::<Option<String>, _>("last_login")
                        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })
            .collect();

        Ok(users)
    }

    /// Delete an admin user.
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let result = sqlx::query(sql::DELETE_ADMIN_USER)
            .bind(username)
            .execute(&self.pool)
            .await
            .context("Failed to delete admin user")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("User not found: {username}"));
        }

        Ok(())
    }
}

#[async_trait]
impl Authenticator for AdminDirectory {
    async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Option<Principal>> {
        let user = match self.get_user(identifier).await? {
            Some(u) => u,
            None => return Ok(None),
        };

        if !Self::verify_password(secret, &user.password_hash) {
            return Ok(None);
        }

        // Update last login
        sqlx::query(sql::UPDATE_ADMIN_USER_LAST_LOGIN)
            .bind(Utc::now().to_rfc3339())
            .bind(identifier)
            .execute(&self.pool)
            .await
            .ok(); // Don't fail if this doesn't work

        Ok(Some(json!({ "username": user.username })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::Database;
    use tempfile::TempDir;

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = AdminDirectory::hash_password(password).unwrap();

        // Hash should be different from password
        assert_ne!(hash, password);

        // Should verify correctly
        assert!(AdminDirectory::verify_password(password, &hash));

        // Wrong password should fail
        assert!(!AdminDirectory::verify_password("wrong_password", &hash));
    }

    async fn test_directory() -> (TempDir, AdminDirectory) {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&DatabaseConfig::default(), temp.path())
            .await
            .unwrap();
        (temp, AdminDirectory::new(db.pool()))
    }

    #[tokio::test]
    async fn test_authenticate_accepts_valid_credentials() {
        let (_temp, directory) = test_directory().await;
        directory.create_user("admin", "hunter2hunter2").await.unwrap();

        let principal = directory
            .authenticate("admin", "hunter2hunter2")
            .await
            .unwrap()
            .expect("valid credentials accepted");
        assert_eq!(principal["username"], "admin");

        let user = directory.get_user("admin").await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_unknown_and_wrong() {
        let (_temp, directory) = test_directory().await;
        directory.create_user("admin", "hunter2hunter2").await.unwrap();

        // Same negative answer whether the user or the password is wrong.
        assert!(directory.authenticate("ghost", "whatever").await.unwrap().is_none());
        assert!(directory.authenticate("admin", "wrong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_management() {
        let (_temp, directory) = test_directory().await;
        directory.create_user("a", "password-aaaa").await.unwrap();
        directory.create_user("b", "password-bbbb").await.unwrap();

        let users = directory.list_users().await.unwrap();
        assert_eq!(users.len(), 2);

        directory.delete_user("a").await.unwrap();
        assert!(directory.delete_user("a").await.is_err());
        assert!(directory.get_user("a").await.unwrap().is_none());
    }
}
