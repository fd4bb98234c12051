use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::fs;
use std::path::PathBuf;
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

/// SQLite-backed cache of raw provider responses, keyed by
/// `provider:method:query`. Entries carry hit counts and last-access times;
/// when the entry cap is exceeded the least-hit, least-recently-used
/// entries go first.
pub struct GeocodeCache {
    pool: SqlitePool,
    max_entries: u64,
}

impl GeocodeCache {
    pub async fn new(cache_dir: PathBuf, max_entries: u64) -> Result<Self> {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let db_path = cache_dir.join("geocode_cache.db");
        let opts = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                hit_count INTEGER DEFAULT 1,
                last_access_at INTEGER NOT NULL
            )"
        ).execute(&pool).await?;

        Ok(Self { pool, max_entries })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT body, hit_count FROM responses WHERE key = ?"
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((body, hit_count)) = row {
            sqlx::query(
                "UPDATE responses SET hit_count = ?, last_access_at = ? WHERE key = ?"
            )
            .bind(hit_count + 1)
            .bind(Utc::now().timestamp())
            .bind(key)
            .execute(&self.pool)
            .await?;

            debug!("cache hit: {}", key);
            return Ok(Some(body));
        }

        debug!("cache miss: {}", key);
        Ok(None)
    }

    pub async fn insert(&self, key: &str, body: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO responses (key, body, last_access_at)
             VALUES (?, ?, ?)"
        )
        .bind(key)
        .bind(body)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        self.evict_if_needed().await?;
        Ok(())
    }

    async fn evict_if_needed(&self) -> Result<()> {
        let count: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM responses")
            .fetch_one(&self.pool)
            .await?;

        if count as u64 > self.max_entries {
            let excess = count as u64 - self.max_entries;
            info!("cache limit reached, evicting {} entries", excess);

            let to_evict: Vec<(String,)> = sqlx::query_as(
                "SELECT key FROM responses
                 ORDER BY hit_count ASC, last_access_at ASC
                 LIMIT ?"
            )
            .bind(excess as i64)
            .fetch_all(&self.pool)
            .await?;

            for (key,) in to_evict {
                sqlx::query("DELETE FROM responses WHERE key = ?").bind(&key).execute(&self.pool).await?;
                debug!("evicted: {}", key);
            }
        }
        Ok(())
    }
}
