use anyhow::Result;
use sqlx::{Pool, Sqlite, migrate::MigrateDatabase, sqlite::SqlitePoolOptions};
use std::time::Duration;

pub mod client_store;
pub mod shipment_store;
pub mod user_store;

pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
pub async fn init_db_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    // Create the database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    setup_database(&pool).await?;
    tracing::info!(max_connections, "database ready");

    Ok(pool)
}

/// Set up the database schema
async fn setup_database(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            company_name TEXT,
            company_address TEXT,
            contact_number TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consignees (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            registered_name TEXT NOT NULL DEFAULT '',
            business_address TEXT NOT NULL,
            tin TEXT NOT NULL DEFAULT '',
            brn TEXT NOT NULL DEFAULT '',
            contact_person TEXT NOT NULL DEFAULT '',
            contact_number TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            user_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consignee_documents (
            id TEXT PRIMARY KEY NOT NULL,
            consignee_id TEXT NOT NULL REFERENCES consignees(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            file_url TEXT NOT NULL,
            uploaded_at TEXT NOT NULL,
            is_verified INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exporters (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            business_address TEXT NOT NULL,
            contact_person TEXT NOT NULL DEFAULT '',
            contact_number TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            user_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // JSON columns hold one sub-document each
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shipments (
            id TEXT PRIMARY KEY NOT NULL,
            reference_number TEXT NOT NULL UNIQUE,
            freight_type TEXT NOT NULL,
            status TEXT NOT NULL,
            user_id TEXT NOT NULL REFERENCES users(id),
            consignee_id TEXT REFERENCES consignees(id),
            exporter_id TEXT REFERENCES exporters(id),
            consignee_data TEXT NOT NULL DEFAULT '{}',
            exporter_data TEXT NOT NULL DEFAULT '{}',
            shipment_details TEXT NOT NULL DEFAULT '{}',
            documents_data TEXT NOT NULL DEFAULT '[]',
            timeline_data TEXT NOT NULL DEFAULT '[]',
            notes_data TEXT NOT NULL DEFAULT '[]',
            cargo_data TEXT NOT NULL DEFAULT '[]',
            computations TEXT,
            statement_of_facts_data TEXT NOT NULL DEFAULT '[]',
            is_locked INTEGER NOT NULL DEFAULT 0,
            completion_date TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shipments_user ON shipments(user_id);")
        .execute(pool)
        .await?;

    Ok(())
}
