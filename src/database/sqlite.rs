use super::schema::{create_schema, verify_schema};
use super::{RecordStore, Records, Result};
use crate::model::election::{Candidate, Voter};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Record store kept in a single SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    location: String,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let location = format!("sqlite:{}", path.display());
        let options = SqliteConnectOptions::from_str(&location)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::with_pool(pool, location).await
    }

    pub async fn create_in_memory() -> Result<Self> {
        // A single connection, otherwise every pooled connection sees its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool, "sqlite::memory:".to_string()).await
    }

    async fn with_pool(pool: SqlitePool, location: String) -> Result<Self> {
        create_schema(&pool).await?;
        verify_schema(&pool).await?;

        Ok(Self { pool, location })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    name: String,
    place: String,
    external_id: String,
    party: String,
    symbol: String,
    assets: String,
    criminal_cases: String,
    manifesto: String,
    votes: i64,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        let mut candidate = Candidate::new(
            &row.name,
            &row.place,
            &row.external_id,
            &row.party,
            &row.symbol,
            &row.assets,
            &row.criminal_cases,
        );
        candidate.manifesto = row.manifesto;
        candidate.votes = u64::try_from(row.votes).unwrap_or(0);
        candidate
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VoterRow {
    name: String,
    external_id: String,
    has_voted: bool,
}

impl From<VoterRow> for Voter {
    fn from(row: VoterRow) -> Self {
        let mut voter = Voter::new(&row.name, &row.external_id);
        voter.has_voted = row.has_voted;
        voter
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn load(&self) -> Result<Records> {
        let candidates = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT name, place, external_id, party, symbol, assets, criminal_cases, manifesto, votes
            FROM candidates
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let voters = sqlx::query_as::<_, VoterRow>(
            r#"
            SELECT name, external_id, has_voted
            FROM voters
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Records {
            candidates: candidates.into_iter().map(Candidate::from).collect(),
            voters: voters.into_iter().map(Voter::from).collect(),
        })
    }

    async fn save(&self, records: &Records) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM candidates").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM voters").execute(&mut *tx).await?;

        for (position, candidate) in records.candidates.iter().enumerate() {
            let votes = i64::try_from(candidate.votes).unwrap_or(i64::MAX);
            sqlx::query(
                r#"
                INSERT INTO candidates
                (position, name, place, external_id, party, symbol, assets, criminal_cases, manifesto, votes)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&candidate.name)
            .bind(&candidate.place)
            .bind(&candidate.id)
            .bind(&candidate.party)
            .bind(&candidate.symbol)
            .bind(&candidate.assets)
            .bind(&candidate.criminal_cases)
            .bind(&candidate.manifesto)
            .bind(votes)
            .execute(&mut *tx)
            .await?;
        }

        for (position, voter) in records.voters.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO voters (position, name, external_id, has_voted)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&voter.name)
            .bind(&voter.id)
            .bind(voter.has_voted)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Records {
        let mut x = Candidate::new("Xavier", "Springfield", "1", "Green", "Tree", "1000", "0");
        x.votes = 2;
        x.manifesto = "Parks, trains and libraries".to_string();
        let y = Candidate::new("Yara", "Shelbyville", "2", "Red", "Rose", "50", "1");

        let mut alice = Voter::new("Alice", "9");
        alice.has_voted = true;
        let mut bob = Voter::new("Bob", "10");
        bob.has_voted = true;

        Records {
            candidates: vec![x, y],
            voters: vec![alice, bob, Voter::new("Carol", "11")],
        }
    }

    #[tokio::test]
    async fn in_memory_round_trip_keeps_order_and_tallies() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        store.save(&records()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), records());
    }

    #[tokio::test]
    async fn save_replaces_previous_rows() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        store.save(&records()).await.unwrap();

        let mut smaller = records();
        smaller.voters.truncate(1);
        store.save(&smaller).await.unwrap();

        assert_eq!(store.load().await.unwrap().voters.len(), 1);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("election.db");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.save(&records()).await.unwrap();
            store.pool().close().await;
        }

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), records());
    }
}
