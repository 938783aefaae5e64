//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `groups` - Users, groups and the `GroupStore` implementation
//! - `members` - Group membership and avatar color assignment
//! - `categories` - Per-group expense categories

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod categories;
mod groups;
mod members;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) a database file and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise get its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Users (identity shared across groups)
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Expense groups
            CREATE TABLE IF NOT EXISTS expense_groups (
                id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
                name TEXT NOT NULL,
                split_type TEXT NOT NULL DEFAULT 'equal',  -- equal, percentage
                next_color_index INTEGER NOT NULL DEFAULT 0, -- next MEMBER_COLORS slot
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Group membership
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
                group_id TEXT NOT NULL REFERENCES expense_groups(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL REFERENCES users(id),
                role TEXT NOT NULL DEFAULT 'member',      -- admin, member
                state TEXT NOT NULL DEFAULT 'active',     -- pending, active, left, removed
                default_split REAL,                       -- percent, percentage groups only
                color TEXT NOT NULL,
                background_color TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(group_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_members_group_state ON members(group_id, state);
            CREATE INDEX IF NOT EXISTS idx_members_user ON members(user_id);

            -- Expense categories (names unique among a group's active categories)
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
                group_id TEXT NOT NULL REFERENCES expense_groups(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'active',     -- active, inactive
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_categories_group_state ON categories(group_id, state);
            "#,
        )?;

        info!(path = %self.db_path, "Database migrations complete");
        Ok(())
    }
}
