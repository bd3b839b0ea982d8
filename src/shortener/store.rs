//! Shortlink records.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::db::{DbPool, DbRow};
use crate::sql;

/// One shortlink record.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub id: i64,
    pub slug: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub hits: i64,
}

/// Database-backed storage for shortlink records.
pub struct LinkStore {
    pool: DbPool,
}

impl LinkStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new shortlink.
    pub async fn create(&self, slug: &str, target_url: &str) -> Result<Link> {
        sqlx::query(sql::INSERT_LINK)
            .bind(slug)
            .bind(target_url)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to create link")?;

        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| anyhow!("link {slug} vanished after insert"))
    }

    /// List all shortlinks, newest first.
    pub async fn list(&self) -> Result<Vec<Link>> {
        let rows = sqlx::query(sql::SELECT_ALL_LINKS)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list links")?;

        rows.into_iter().map(link_from_row).collect()
    }

    /// Get a shortlink by id.
    pub async fn get(&self, id: i64) -> Result<Option<Link>> {
        let row = sqlx::query(sql::SELECT_LINK)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query link")?;

        row.map(link_from_row).transpose()
    }

    /// Get a shortlink by its public slug.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Link>> {
        let row = sqlx::query(sql::SELECT_LINK_BY_SLUG)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query link by slug")?;

        row.map(link_from_row).transpose()
    }

    /// Delete a shortlink. Returns whether a record existed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(sql::DELETE_LINK)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete link")?;

        Ok(result.rows_affected() > 0)
    }

    /// Count one visit to a shortlink.
    pub async fn record_hit(&self, id: i64) -> Result<()> {
        sqlx::query(sql::BUMP_LINK_HITS)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to record hit")?;

        Ok(())
    }
}

fn link_from_row(row: DbRow) -> Result<Link> {
    Ok(Link {
        id: row.get("id"),
        slug: row.get("slug"),
        target_url: row.get("target_url"),
        created_at: DateTime::parse_from_rfc3339(row.get("created_at"))
            .context("Invalid created_at timestamp")?
            .with_timezone(&Utc),
        hits: row.get("hits"),
    })
}
