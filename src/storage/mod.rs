use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::edgar::parsing::HoldingRow;
use crate::edgar::{FilingReference, ReportingPeriod};
use crate::error::Result;

/// Per-filing result of a holdings insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReport {
    pub inserted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub firm_id: i64,
    pub filing_id: i64,
    pub holdings: InsertReport,
}

/// Core trait that must be implemented by all holdings stores.
///
/// Firms and filings are create-or-reuse on their natural keys. Holdings are
/// always appended; nothing is updated or deleted.
#[async_trait]
pub trait HoldingsStorage: Send + Sync {
    /// Configuration type specific to this storage implementation
    type Config: Send;

    /// Open the store, creating the schema when absent
    async fn new(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Id of the firm named exactly `name`, inserting it if needed
    async fn ensure_firm(&self, name: &str) -> Result<i64>;

    /// Id of the filing for (`firm_id`, `period`). An existing filing keeps
    /// the filed date it was first recorded with.
    async fn ensure_filing(
        &self,
        firm_id: i64,
        period: &ReportingPeriod,
        filed_date: &str,
    ) -> Result<i64>;

    /// Insert rows for a filing in one transaction, skipping rows that fail
    async fn insert_holdings(&self, filing_id: i64, rows: &[HoldingRow]) -> Result<InsertReport>;

    async fn holding_count(&self, filing_id: i64) -> Result<u64>;

    async fn firm_count(&self) -> Result<u64>;

    /// Firm, then filing, then holdings. Fails without writing holdings if
    /// the filing cannot be established.
    async fn record_filing(
        &self,
        filing: &FilingReference,
        rows: &[HoldingRow],
    ) -> Result<PersistOutcome> {
        let firm_id = self.ensure_firm(&filing.entity_name).await?;
        let filing_id = self
            .ensure_filing(firm_id, &filing.period, &filing.filed_date)
            .await?;
        let holdings = self.insert_holdings(filing_id, rows).await?;

        log::info!(
            "Stored {} holdings for {} {} ({} failed)",
            holdings.inserted,
            filing.entity_name,
            filing.period,
            holdings.failed
        );

        Ok(PersistOutcome {
            firm_id,
            filing_id,
            holdings,
        })
    }
}

pub mod sqlite;

// Re-export storage implementations
pub use self::sqlite::{SqliteConfig, SqliteStorage};
