use crate::database::{Result, StoreError};
/// Database schema definitions for the SQLite record store
use sqlx::SqlitePool;

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Candidates table; `position` keeps registration order across rewrites
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            place TEXT NOT NULL,
            external_id TEXT NOT NULL,
            party TEXT NOT NULL,
            symbol TEXT NOT NULL,
            assets TEXT NOT NULL,
            criminal_cases TEXT NOT NULL,
            manifesto TEXT NOT NULL,
            votes INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Voters table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voters (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            external_id TEXT NOT NULL,
            has_voted BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_candidates_external_id ON candidates(external_id)",
        "CREATE INDEX IF NOT EXISTS idx_voters_identity ON voters(name, external_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    Ok(())
}

/// Verify database schema integrity
pub async fn verify_schema(pool: &SqlitePool) -> Result<()> {
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let expected_tables = vec!["candidates", "voters"];

    for expected in &expected_tables {
        if !tables.iter().any(|name| name == expected) {
            return Err(StoreError::Integrity(format!("Missing table: {}", expected)));
        }
    }

    Ok(())
}
