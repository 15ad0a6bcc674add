use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::edgar::discovery::extract_xml_links;
use crate::edgar::parsing::{extract_holdings, looks_like_holdings};
use crate::edgar::rate_limiter::RateLimiter;
use crate::edgar::utils::{fetch_text, DocumentSource};
use crate::edgar::{FilingReference, IndexRecord, LocationResolver};
use crate::error::{IngestError, Result};
use crate::storage::HoldingsStorage;
use crate::utils::progress::ProgressTracker;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    /// Transport error or non-success status
    Failed,
    /// Fetched, but nothing usable was found or it could not be stored
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilingOutcome {
    pub entity_name: String,
    pub period: String,
    pub status: FetchStatus,
    pub document: Option<String>,
    pub filing_id: Option<i64>,
    pub holdings_inserted: usize,
    pub holdings_failed: usize,
    pub entries_incomplete: usize,
    /// Error class when the filing was not stored
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl FilingOutcome {
    fn not_stored(filing: &FilingReference, e: &IngestError) -> Self {
        let status = match e {
            IngestError::FetchFailed { .. } => FetchStatus::Failed,
            _ => FetchStatus::Skipped,
        };
        FilingOutcome {
            entity_name: filing.entity_name.clone(),
            period: filing.period.to_string(),
            status,
            document: None,
            filing_id: None,
            holdings_inserted: 0,
            holdings_failed: 0,
            entries_incomplete: 0,
            error_kind: Some(e.kind().to_string()),
            error: Some(e.to_string()),
        }
    }
}

/// Totals for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSummary {
    pub filings_seen: usize,
    pub filings_stored: usize,
    /// Filings not stored, keyed by error class
    pub filings_skipped: BTreeMap<String, usize>,
    pub holdings_inserted: usize,
    pub holdings_failed: usize,
    pub entries_incomplete: usize,
}

impl IngestSummary {
    pub fn record(&mut self, outcome: &FilingOutcome) {
        self.filings_seen += 1;
        self.holdings_inserted += outcome.holdings_inserted;
        self.holdings_failed += outcome.holdings_failed;
        self.entries_incomplete += outcome.entries_incomplete;

        match (&outcome.status, &outcome.error_kind) {
            (FetchStatus::Success, _) => self.filings_stored += 1,
            (_, Some(kind)) => *self.filings_skipped.entry(kind.clone()).or_default() += 1,
            (_, None) => *self.filings_skipped.entry("unknown".to_string()).or_default() += 1,
        }
    }

    pub fn filings_not_stored(&self) -> usize {
        self.filings_skipped.values().sum()
    }
}

/// Resolve index records to filing references, dropping any whose archive
/// path does not form a valid URL.
pub fn resolve_filings(resolver: &LocationResolver, records: &[IndexRecord]) -> Vec<FilingReference> {
    records
        .iter()
        .filter_map(|record| match resolver.resolve(record) {
            Ok(filing) => Some(filing),
            Err(e) => {
                warn!("Skipping {} ({}): {}", record.company_name, record.filename, e);
                None
            }
        })
        .collect()
}

/// Sequential, rate-limited driver: locate, extract and store one filing at
/// a time in index order.
pub struct FetchManager<S, D> {
    source: S,
    storage: D,
    limiter: RateLimiter,
    progress_tracker: Option<ProgressTracker>,
}

impl<S, D> FetchManager<S, D>
where
    S: DocumentSource + Sync,
    D: HoldingsStorage,
{
    pub fn new(source: S, storage: D, limiter: RateLimiter) -> Self {
        Self {
            source,
            storage,
            limiter,
            progress_tracker: None,
        }
    }

    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn storage(&self) -> &D {
        &self.storage
    }

    /// Hand the store back for shutdown.
    pub fn into_storage(self) -> D {
        self.storage
    }

    /// Process every filing. Per-filing failures are logged and counted;
    /// only a run-fatal error stops the run early.
    pub async fn run(&mut self, filings: &[FilingReference]) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();
        info!("Processing {} filings", filings.len());

        for filing in filings {
            self.limiter.acquire().await;
            if let Some(tracker) = &self.progress_tracker {
                tracker.update_message(&filing.entity_name);
            }

            let outcome = match self.process(filing).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_run_fatal() => {
                    error!("Aborting run at {}: {}", filing.entity_name, e);
                    if let Some(tracker) = &self.progress_tracker {
                        tracker.abandon(e.kind());
                    }
                    return Err(e);
                }
                Err(e) => {
                    warn!("Skipping {} {}: {}", filing.entity_name, filing.period, e);
                    FilingOutcome::not_stored(filing, &e)
                }
            };

            summary.record(&outcome);
            if let Some(tracker) = &self.progress_tracker {
                tracker.increment();
            }
        }

        if let Some(tracker) = &self.progress_tracker {
            tracker.finish(summary.filings_stored);
        }
        info!(
            "Run complete: {} of {} filings stored, {} holdings inserted",
            summary.filings_stored, summary.filings_seen, summary.holdings_inserted
        );
        Ok(summary)
    }

    /// Locate, extract and persist a single filing.
    pub async fn process(&self, filing: &FilingReference) -> Result<FilingOutcome> {
        let (document, content) = self.locate_document(filing).await?;
        let extracted = extract_holdings(&content)?;
        let persisted = self.storage.record_filing(filing, &extracted.rows).await?;

        Ok(FilingOutcome {
            entity_name: filing.entity_name.clone(),
            period: filing.period.to_string(),
            status: FetchStatus::Success,
            document: Some(document.to_string()),
            filing_id: Some(persisted.filing_id),
            holdings_inserted: persisted.holdings.inserted,
            holdings_failed: persisted.holdings.failed,
            entries_incomplete: extracted.incomplete,
            error_kind: None,
            error: None,
        })
    }

    /// Direct document first when known, then the first listing candidate
    /// whose content looks like an information table.
    async fn locate_document(&self, filing: &FilingReference) -> Result<(Url, String)> {
        if let Some(direct) = filing.location.direct() {
            match fetch_text(&self.source, direct).await {
                Ok(content) if looks_like_holdings(&content) => return Ok((direct.clone(), content)),
                Ok(_) => debug!("{} is not an information table, trying listing", direct),
                Err(e) => debug!("Direct document unavailable, trying listing: {}", e),
            }
        }

        let listing = filing.location.listing();
        let html = fetch_text(&self.source, listing).await?;
        let candidates = extract_xml_links(&html, listing);
        debug!("{} candidate documents under {}", candidates.len(), listing);

        for candidate in candidates {
            match fetch_text(&self.source, &candidate).await {
                Ok(content) if looks_like_holdings(&content) => return Ok((candidate, content)),
                Ok(_) => debug!("{} is not an information table", candidate),
                Err(e) => debug!("Candidate unavailable: {}", e),
            }
        }

        Err(IngestError::DiscoveryFailed {
            listing: listing.to_string(),
        })
    }
}
