use async_trait::async_trait;
use log::{debug, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::PathBuf;

use super::{HoldingsStorage, InsertReport};
use crate::edgar::parsing::HoldingRow;
use crate::edgar::ReportingPeriod;
use crate::error::{IngestError, Result};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS firms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS filings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    firm_id INTEGER NOT NULL REFERENCES firms(id),
    filing_date TEXT NOT NULL,
    quarter TEXT NOT NULL,
    UNIQUE (firm_id, quarter)
);
CREATE TABLE IF NOT EXISTS holdings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filing_id INTEGER NOT NULL REFERENCES filings(id),
    cusip TEXT NOT NULL,
    name_of_issuer TEXT NOT NULL,
    shares INTEGER NOT NULL,
    value INTEGER NOT NULL,
    put_call TEXT
);
CREATE INDEX IF NOT EXISTS holdings_filing_id ON holdings (filing_id);
"#;

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFiling {
    pub id: i64,
    pub firm_id: i64,
    pub filing_date: String,
    pub quarter: String,
}

/// SQLite-backed store. One connection, one writer.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn filing(&self, filing_id: i64) -> Result<Option<StoredFiling>> {
        let row: Option<(i64, i64, String, String)> =
            sqlx::query_as("SELECT id, firm_id, filing_date, quarter FROM filings WHERE id = ?")
                .bind(filing_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, firm_id, filing_date, quarter)| StoredFiling {
            id,
            firm_id,
            filing_date,
            quarter,
        }))
    }

    pub async fn holdings(&self, filing_id: i64) -> Result<Vec<(String, String, i64, i64, Option<String>)>> {
        let rows = sqlx::query_as(
            "SELECT cusip, name_of_issuer, shares, value, put_call \
             FROM holdings WHERE filing_id = ? ORDER BY id",
        )
        .bind(filing_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Close the underlying connection. Pending writes are already committed.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Holdings store closed");
    }
}

#[async_trait]
impl HoldingsStorage for SqliteStorage {
    type Config = SqliteConfig;

    async fn new(config: Self::Config) -> Result<Self> {
        let unavailable = |e: sqlx::Error| IngestError::SourceUnavailable {
            resource: config.path.display().to_string(),
            reason: e.to_string(),
        };

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(unavailable)?;
        }

        debug!("Opened holdings store at {}", config.path.display());
        Ok(Self { pool })
    }

    async fn ensure_firm(&self, name: &str) -> Result<i64> {
        sqlx::query("INSERT INTO firms (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM firms WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        id.ok_or_else(|| IngestError::PersistenceFailure(format!("firm `{}` not found after insert", name)))
    }

    async fn ensure_filing(
        &self,
        firm_id: i64,
        period: &ReportingPeriod,
        filed_date: &str,
    ) -> Result<i64> {
        let quarter = period.to_string();

        sqlx::query(
            "INSERT INTO filings (firm_id, filing_date, quarter) VALUES (?, ?, ?) \
             ON CONFLICT(firm_id, quarter) DO NOTHING",
        )
        .bind(firm_id)
        .bind(filed_date)
        .bind(&quarter)
        .execute(&self.pool)
        .await?;

        let id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM filings WHERE firm_id = ? AND quarter = ?")
                .bind(firm_id)
                .bind(&quarter)
                .fetch_optional(&self.pool)
                .await?;
        id.ok_or_else(|| {
            IngestError::PersistenceFailure(format!(
                "filing not found for firm {} and quarter {}",
                firm_id, quarter
            ))
        })
    }

    async fn insert_holdings(&self, filing_id: i64, rows: &[HoldingRow]) -> Result<InsertReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = InsertReport::default();

        for row in rows {
            match insert_holding(&mut tx, filing_id, row).await {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    warn!("Skipping holding {} ({}): {}", row.cusip, row.name_of_issuer, e);
                    report.failed += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(report)
    }

    async fn holding_count(&self, filing_id: i64) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM holdings WHERE filing_id = ?")
            .bind(filing_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn firm_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM firms")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

async fn insert_holding(
    tx: &mut Transaction<'_, Sqlite>,
    filing_id: i64,
    row: &HoldingRow,
) -> Result<()> {
    let out_of_range =
        |field: &str, n: u64| IngestError::PersistenceFailure(format!("{} {} out of range", field, n));
    let shares = i64::try_from(row.shares).map_err(|_| out_of_range("shares", row.shares))?;
    let value = i64::try_from(row.value).map_err(|_| out_of_range("value", row.value))?;

    sqlx::query(
        "INSERT INTO holdings (filing_id, cusip, name_of_issuer, shares, value, put_call) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(filing_id)
    .bind(&row.cusip)
    .bind(&row.name_of_issuer)
    .bind(shares)
    .bind(value)
    .bind(row.put_call.map(|p| p.to_string()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}
