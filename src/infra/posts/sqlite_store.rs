// SQLite-backed history of posts shared in each conversation.
//
// Tables:
// - posts: one row per (peer_id, link); re-sharing refreshes created_at

use crate::core::moderation::{ItemRef, PostStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

#[derive(Clone)]
pub struct SqlitePostStore {
    pool: Pool<Sqlite>,
}

impl SqlitePostStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                peer_id INTEGER NOT NULL,
                link TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (peer_id, link)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_peer_created ON posts(peer_id, created_at);",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(
        &self,
        item: ItemRef,
        peer_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts (peer_id, link, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(peer_id, link) DO UPDATE SET
                created_at = excluded.created_at
            "#,
        )
        .bind(peer_id)
        .bind(item.to_string())
        .bind(timestamp(at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop posts that can no longer fall inside any history window.
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE created_at < ?")
            .bind(timestamp(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// Fixed-width UTC text so string order matches time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn record_item(&self, item: ItemRef, peer_id: i64) -> Result<(), StoreError> {
        self.upsert(item, peer_id, Utc::now()).await
    }

    async fn recent_items(
        &self,
        peer_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ItemRef>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT link
            FROM posts
            WHERE peer_id = ? AND created_at >= ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(peer_id)
        .bind(timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let link: String = row.get("link");
                link.parse()
                    .map_err(|_| StoreError::Corrupt(format!("bad post link {:?}", link)))
            })
            .collect()
    }
}
