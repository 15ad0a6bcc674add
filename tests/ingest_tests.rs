use async_trait::async_trait;
use holdings::edgar::rate_limiter::RateLimiter;
use holdings::edgar::utils::{DocumentSource, Fetched};
use holdings::edgar::{read_index, FilingReference, LocationResolver, ReportType, ReportingPeriod};
use holdings::fetch::{resolve_filings, FetchManager};
use holdings::storage::{HoldingsStorage, SqliteConfig, SqliteStorage};
use holdings::IngestError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use url::Url;

const ARCHIVES: &str = "https://archive.test/edgar/data/";

const INDEX: &str = "\
Description:           Master Index of EDGAR Dissemination Feed
Last Data Received:    March 31, 2025

CIK|Company Name|Form Type|Date Filed|Filename
--------------------------------------------------------------------------------
100|ALPHA CAPITAL LLC|13F-HR|2025-02-14|edgar/data/100/0000000100-25-000001.txt
200|BETA PARTNERS LP|13F-HR|2025-02-14|edgar/data/200/0000000200-25-000001.txt
250|GAMMA HOLDINGS INC|10-K|2025-02-14|edgar/data/250/0000000250-25-000001.txt
300|DELTA ADVISORS|13F-HR|2025-02-15|edgar/data/300/0000000300-25-000001.txt
400|EPSILON FUND|13F-HR|2025-02-17|edgar/data/400/0000000400-25-000001.txt
";

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src/edgar/parsing/tests/data")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e))
}

fn folder(cik: &str) -> String {
    format!("{}{}/0000000{}25000001/", ARCHIVES, cik, cik)
}

/// In-memory archive; unknown URLs answer 404.
struct FakeArchive {
    pages: HashMap<String, Fetched>,
    requests: Mutex<Vec<String>>,
}

impl FakeArchive {
    fn new() -> Self {
        FakeArchive {
            pages: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn page(mut self, url: String, body: String) -> Self {
        self.pages.insert(url, Fetched::ok(body));
        self
    }

    fn requested(&self, url: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|r| r == url)
    }
}

#[async_trait]
impl DocumentSource for FakeArchive {
    async fn fetch(&self, url: &Url) -> holdings::Result<Fetched> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.pages.get(url.as_str()).cloned().unwrap_or(Fetched {
            status: 404,
            body: b"Not Found".to_vec(),
        }))
    }
}

fn archive() -> FakeArchive {
    FakeArchive::new()
        // ALPHA: document found through the listing
        .page(folder("100"), fixture("listing.html"))
        .page(format!("{}primary_doc.xml", folder("100")), fixture("primary_doc.xml"))
        .page(format!("{}46994.xml", folder("100")), fixture("partial.xml"))
        // BETA: listing without any XML document
        .page(folder("200"), "<html><body>No documents</body></html>".to_string())
        // DELTA: listing is missing entirely
        // EPSILON: the only candidate is an HTML error page
        .page(folder("400"), r#"<a href="infotable.xml">infotable.xml</a>"#.to_string())
        .page(format!("{}infotable.xml", folder("400")), fixture("error_page.html"))
}

async fn setup(dir: &TempDir) -> (Vec<FilingReference>, SqliteStorage) {
    let index_path = dir.path().join("master.idx");
    fs::write(&index_path, INDEX).unwrap();

    let records = read_index(&index_path, &ReportType::Form13FHR).unwrap();
    assert_eq!(records.len(), 4);

    let resolver = LocationResolver::new(Url::parse(ARCHIVES).unwrap(), None);
    let filings = resolve_filings(&resolver, &records);

    let storage = SqliteStorage::new(SqliteConfig {
        path: dir.path().join("holdings.db"),
    })
    .await
    .unwrap();
    (filings, storage)
}

async fn filing_id(storage: &SqliteStorage, firm: &str, filed: &str) -> i64 {
    let firm_id = storage.ensure_firm(firm).await.unwrap();
    storage
        .ensure_filing(firm_id, &ReportingPeriod::from_filed_date(filed), filed)
        .await
        .unwrap()
}

#[tokio::test]
async fn ingests_index_and_skips_bad_filings() {
    let dir = tempdir().unwrap();
    let (filings, storage) = setup(&dir).await;

    let mut manager = FetchManager::new(archive(), storage, RateLimiter::new(Duration::ZERO));
    let summary = manager.run(&filings).await.unwrap();

    assert_eq!(summary.filings_seen, 4);
    assert_eq!(summary.filings_stored, 1);
    assert_eq!(summary.holdings_inserted, 2);
    assert_eq!(summary.holdings_failed, 0);
    assert_eq!(summary.entries_incomplete, 2);
    assert_eq!(summary.filings_skipped["discovery_failed"], 1);
    assert_eq!(summary.filings_skipped["fetch_failed"], 1);
    assert_eq!(summary.filings_skipped["wrong_content_type"], 1);

    let storage = manager.into_storage();
    assert_eq!(storage.firm_count().await.unwrap(), 1);

    let id = filing_id(&storage, "ALPHA CAPITAL LLC", "2025-02-14").await;
    let rows = storage.holdings(id).await.unwrap();
    let cusips: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
    assert_eq!(cusips, vec!["594918104", "02079K305"]);
    assert_eq!(rows[0].2, 4000);

    let stored = storage.filing(id).await.unwrap().unwrap();
    assert_eq!(stored.quarter, "2025Q1");
    assert_eq!(stored.filing_date, "2025-02-14");
    storage.close().await;
}

#[tokio::test]
async fn rerun_appends_duplicate_holdings() {
    let dir = tempdir().unwrap();
    let (filings, storage) = setup(&dir).await;

    let mut manager = FetchManager::new(archive(), storage, RateLimiter::new(Duration::ZERO));
    manager.run(&filings).await.unwrap();
    let second = manager.run(&filings).await.unwrap();
    assert_eq!(second.filings_stored, 1);

    let storage = manager.into_storage();
    assert_eq!(storage.firm_count().await.unwrap(), 1);
    let id = filing_id(&storage, "ALPHA CAPITAL LLC", "2025-02-14").await;
    assert_eq!(storage.holding_count(id).await.unwrap(), 4);
}

/// ALPHA only, with the conventional document name configured.
async fn setup_direct(dir: &TempDir) -> (Vec<FilingReference>, SqliteStorage) {
    let (_, storage) = setup(dir).await;
    let records = read_index(&dir.path().join("master.idx"), &ReportType::Form13FHR).unwrap();
    let resolver = LocationResolver::new(Url::parse(ARCHIVES).unwrap(), Some("infotable.xml".to_string()));
    (resolve_filings(&resolver, &records[..1]), storage)
}

#[tokio::test]
async fn direct_document_skips_listing() {
    let dir = tempdir().unwrap();
    let (filings, storage) = setup_direct(&dir).await;

    let direct = format!("{}infotable.xml", folder("100"));
    let source = FakeArchive::new().page(direct.clone(), fixture("single_entry.xml"));

    let mut manager = FetchManager::new(source, storage, RateLimiter::new(Duration::ZERO));
    let outcome = manager.process(&filings[0]).await.unwrap();
    assert_eq!(outcome.document.as_deref(), Some(direct.as_str()));
    assert_eq!(outcome.holdings_inserted, 1);
    assert!(!manager.source().requested(&folder("100")));

    let summary = manager.run(&filings).await.unwrap();
    assert_eq!(summary.filings_stored, 1);
}

#[tokio::test]
async fn direct_document_falls_back_to_listing() {
    let dir = tempdir().unwrap();
    let (filings, storage) = setup_direct(&dir).await;

    let manager = FetchManager::new(archive(), storage, RateLimiter::new(Duration::ZERO));
    let outcome = manager.process(&filings[0]).await.unwrap();

    let discovered = format!("{}46994.xml", folder("100"));
    assert_eq!(outcome.document.as_deref(), Some(discovered.as_str()));
    assert_eq!(outcome.holdings_inserted, 2);

    let requests = manager.source().requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![
            format!("{}infotable.xml", folder("100")),
            folder("100"),
            format!("{}primary_doc.xml", folder("100")),
            discovered,
        ]
    );
}

#[test]
fn missing_index_is_run_fatal() {
    let err = read_index(Path::new("/nonexistent/master.idx"), &ReportType::Form13FHR).unwrap_err();
    assert!(err.is_run_fatal());
    assert!(matches!(err, IngestError::SourceUnavailable { .. }));
}
