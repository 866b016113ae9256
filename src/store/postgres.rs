//! PostgreSQL content store for durable deployments.
//!
//! ## Schema
//!
//! ```text
//! post(id PK, text, author, commentable)
//! comment(id PK, text, author, post_id FK -> post.id, parent_comment_id FK -> comment.id NULL)
//! ```
//!
//! Tables are created if absent when the store is constructed.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use crate::types::{Comment, CommentId, Page, Post, PostId};
use super::{check_text, unstorable, ContentStore, StoreError};

/// Idempotent schema statements, run in order at startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS post (
        id          TEXT PRIMARY KEY,
        text        TEXT NOT NULL,
        author      TEXT NOT NULL,
        commentable BOOLEAN NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comment (
        id                TEXT PRIMARY KEY,
        text              TEXT NOT NULL,
        author            TEXT NOT NULL,
        post_id           TEXT NOT NULL REFERENCES post(id),
        parent_comment_id TEXT NULL REFERENCES comment(id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS comment_top_level_idx
        ON comment (post_id) WHERE parent_comment_id IS NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS comment_parent_idx
        ON comment (parent_comment_id)
    "#,
];

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Byte-order sort key, so ordering matches the in-memory store regardless
/// of the database collation.
const ORDER_BY_ID: &str = r#" ORDER BY id COLLATE "C""#;

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/threads".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }

    /// Configuration for a specific URL with default pool settings.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => StoreError::BackendUnavailable(err.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// Append the ordering and, when the page is active, `LIMIT`/`OFFSET`
/// placeholders numbered from `next_param`.
fn paged_sql(base: &str, next_param: usize, page: Page) -> (String, Option<(i64, i64)>) {
    let mut sql = String::with_capacity(base.len() + 48);
    sql.push_str(base);
    sql.push_str(ORDER_BY_ID);

    let bounds = page.bounds().map(|(limit, offset)| {
        sql.push_str(&format!(" LIMIT ${} OFFSET ${}", next_param, next_param + 1));
        (to_i64(limit), to_i64(offset))
    });
    (sql, bounds)
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// PostgreSQL content store.
///
/// Shares one connection pool across requests and relies on the database
/// for concurrency control.
pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    /// Connect with the given configuration and ensure the schema exists.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Wrap an existing pool and ensure the schema exists.
    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if absent.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Content schema ready");
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn parse_post_row(row: &PgRow) -> Result<Post, sqlx::Error> {
        let id: String = row.try_get("id")?;
        Ok(Post::new(
            PostId::from(id),
            row.try_get::<String, _>("text")?,
            row.try_get::<String, _>("author")?,
            row.try_get("commentable")?,
        ))
    }

    fn parse_comment_row(row: &PgRow) -> Result<Comment, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let post_id: String = row.try_get("post_id")?;
        let parent: Option<String> = row.try_get("parent_comment_id")?;

        Ok(Comment {
            id: CommentId::from(id),
            text: row.try_get("text")?,
            author: row.try_get("author")?,
            post_id: PostId::from(post_id),
            parent_comment_id: parent.map(CommentId::from),
        })
    }

    async fn fetch_comments(
        &self,
        base: &str,
        filter: Option<&str>,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        let first_param = if filter.is_some() { 2 } else { 1 };
        let (sql, bounds) = paged_sql(base, first_param, page);

        let mut query = sqlx::query::<sqlx::Postgres>(&sql);
        if let Some(value) = filter {
            query = query.bind(value);
        }
        if let Some((limit, offset)) = bounds {
            query = query.bind(limit).bind(offset);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::parse_comment_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn create_post(
        &self,
        id: PostId,
        text: String,
        commentable: bool,
        author: String,
    ) -> Result<Post, StoreError> {
        check_text("post id", id.as_str())?;
        check_text("text", &text)?;
        check_text("author", &author)?;

        sqlx::query(
            r#"
            INSERT INTO post (id, text, author, commentable)
            VALUES ($1, $2, $3, $4)
            "#
        )
        .bind(id.as_str())
        .bind(&text)
        .bind(&author)
        .bind(commentable)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicatePostId(id.clone())
            } else {
                StoreError::from(e)
            }
        })?;

        tracing::debug!(post_id = %id, commentable, "Post created");
        Ok(Post::new(id, text, author, commentable))
    }

    async fn get_post_by_id(&self, id: &PostId) -> Result<Post, StoreError> {
        if unstorable(id.as_str()) {
            return Err(StoreError::PostNotFound(id.clone()));
        }

        let row = sqlx::query(
            r#"
            SELECT id, text, author, commentable
            FROM post
            WHERE id = $1
            "#
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Self::parse_post_row(r)?),
            None => Err(StoreError::PostNotFound(id.clone())),
        }
    }

    async fn get_all_posts(&self, page: Page) -> Result<Vec<Post>, StoreError> {
        let (sql, bounds) = paged_sql("SELECT id, text, author, commentable FROM post", 1, page);

        let mut query = sqlx::query::<sqlx::Postgres>(&sql);
        if let Some((limit, offset)) = bounds {
            query = query.bind(limit).bind(offset);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::parse_post_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn create_comment(
        &self,
        text: String,
        item_id: &str,
        author: String,
    ) -> Result<Comment, StoreError> {
        check_text("text", &text)?;
        check_text("author", &author)?;
        if unstorable(item_id) {
            return Err(StoreError::ItemNotFound(item_id.to_string()));
        }

        // Resolution and insert share one transaction; an early return
        // drops `tx` and rolls back.
        let mut tx = self.pool.begin().await?;

        let commentable: Option<bool> =
            sqlx::query_scalar("SELECT commentable FROM post WHERE id = $1 FOR SHARE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;

        let id = CommentId::generate();
        let comment = match commentable {
            Some(false) => return Err(StoreError::CommentingDisabled(PostId::new(item_id))),
            Some(true) => Comment::top_level(id, PostId::new(item_id), text, author),
            None => {
                let thread_root: Option<String> =
                    sqlx::query_scalar("SELECT post_id FROM comment WHERE id = $1 FOR SHARE")
                        .bind(item_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                match thread_root {
                    Some(post_id) => Comment {
                        id,
                        text,
                        author,
                        post_id: PostId::from(post_id),
                        parent_comment_id: Some(CommentId::new(item_id)),
                    },
                    None => return Err(StoreError::ItemNotFound(item_id.to_string())),
                }
            }
        };

        sqlx::query(
            r#"
            INSERT INTO comment (id, text, author, post_id, parent_comment_id)
            VALUES ($1, $2, $3, $4, $5)
            "#
        )
        .bind(comment.id.as_str())
        .bind(&comment.text)
        .bind(&comment.author)
        .bind(comment.post_id.as_str())
        .bind(comment.parent_comment_id.as_ref().map(CommentId::as_str))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateCommentId(comment.id.clone())
            } else {
                StoreError::from(e)
            }
        })?;

        tx.commit().await?;

        tracing::debug!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_comment_id = ?comment.parent_comment_id,
            "Comment created"
        );
        Ok(comment)
    }

    async fn get_comment_by_id(&self, id: &CommentId) -> Result<Comment, StoreError> {
        if unstorable(id.as_str()) {
            return Err(StoreError::CommentNotFound(id.clone()));
        }

        let row = sqlx::query(
            r#"
            SELECT id, text, author, post_id, parent_comment_id
            FROM comment
            WHERE id = $1
            "#
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Self::parse_comment_row(r)?),
            None => Err(StoreError::CommentNotFound(id.clone())),
        }
    }

    async fn get_all_comments(&self, page: Page) -> Result<Vec<Comment>, StoreError> {
        self.fetch_comments(
            "SELECT id, text, author, post_id, parent_comment_id FROM comment",
            None,
            page,
        )
        .await
    }

    async fn get_comments_by_post_id(
        &self,
        post_id: &PostId,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        if unstorable(post_id.as_str()) {
            return Ok(Vec::new());
        }
        self.fetch_comments(
            "SELECT id, text, author, post_id, parent_comment_id FROM comment \
             WHERE post_id = $1 AND parent_comment_id IS NULL",
            Some(post_id.as_str()),
            page,
        )
        .await
    }

    async fn get_comments_by_parent_id(
        &self,
        parent_id: &CommentId,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        if unstorable(parent_id.as_str()) {
            return Ok(Vec::new());
        }
        self.fetch_comments(
            "SELECT id, text, author, post_id, parent_comment_id FROM comment \
             WHERE parent_comment_id = $1",
            Some(parent_id.as_str()),
            page,
        )
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
