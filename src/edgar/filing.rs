use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::index::{ArchivePath, IndexRecord};

// Hardcoded values
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data/";
pub const USER_AGENT: &str = "holdings/0.1 (contact: software@example.com)";

/// Calendar quarter a filing is attributed to, derived from its filed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportingPeriod {
    Quarter { year: i32, quarter: u32 },
    Unknown,
}

impl ReportingPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        ReportingPeriod::Quarter {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    /// Only the zero-padded `YYYY-MM` prefix is consulted; anything shorter
    /// or non-numeric, including an unpadded month, maps to
    /// [`ReportingPeriod::Unknown`].
    pub fn from_filed_date(filed: &str) -> Self {
        let (Some(year), Some(month)) = (filed.get(0..4), filed.get(5..7)) else {
            return ReportingPeriod::Unknown;
        };
        let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) else {
            return ReportingPeriod::Unknown;
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self::from_date)
            .unwrap_or(ReportingPeriod::Unknown)
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingPeriod::Quarter { year, quarter } => write!(f, "{}Q{}", year, quarter),
            ReportingPeriod::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Where the holdings document of a filing can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocation {
    /// Conventionally named document; the listing is the fallback.
    Direct { document: Url, listing: Url },
    /// Only the filing folder is known; the document must be discovered.
    Listing(Url),
}

impl DocumentLocation {
    pub fn listing(&self) -> &Url {
        match self {
            DocumentLocation::Direct { listing, .. } => listing,
            DocumentLocation::Listing(listing) => listing,
        }
    }

    pub fn direct(&self) -> Option<&Url> {
        match self {
            DocumentLocation::Direct { document, .. } => Some(document),
            DocumentLocation::Listing(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingReference {
    pub entity_name: String,
    pub location: DocumentLocation,
    pub period: ReportingPeriod,
    pub filed_date: String,
}

/// Derives document locations for index records. Performs no I/O.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    archives: Url,
    direct_document: Option<String>,
}

impl LocationResolver {
    pub fn new(archives: Url, direct_document: Option<String>) -> Self {
        Self {
            archives,
            direct_document: direct_document.filter(|name| !name.trim().is_empty()),
        }
    }

    /// Folder URL of a filing, always ending in `/`.
    pub fn listing_url(&self, archive: &ArchivePath) -> Result<Url, url::ParseError> {
        let mut base = self.archives.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        base.join(&format!("{}/{}/", archive.folder, archive.accession_folder()))
    }

    pub fn document_url(&self, archive: &ArchivePath, name: &str) -> Result<Url, url::ParseError> {
        self.listing_url(archive)?.join(name)
    }

    pub fn resolve(&self, record: &IndexRecord) -> Result<FilingReference, url::ParseError> {
        let listing = self.listing_url(&record.archive)?;
        let location = match &self.direct_document {
            Some(name) => DocumentLocation::Direct {
                document: self.document_url(&record.archive, name)?,
                listing,
            },
            None => DocumentLocation::Listing(listing),
        };
        debug!(
            "Resolved {} to {}",
            record.company_name,
            location.direct().unwrap_or(location.listing())
        );

        Ok(FilingReference {
            entity_name: record.company_name.clone(),
            location,
            period: ReportingPeriod::from_filed_date(&record.date_filed),
            filed_date: record.date_filed.clone(),
        })
    }
}

impl LocationResolver {
    /// Resolver for the public EDGAR archives with listing discovery only.
    pub fn edgar() -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(EDGAR_ARCHIVES_URL)?, None))
    }
}
