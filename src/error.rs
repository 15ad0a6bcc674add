use thiserror::Error;

/// Errors raised while resolving, extracting and storing filings.
///
/// Only [`IngestError::SourceUnavailable`] stops a run. Everything else is
/// scoped to a single entry, row, document or filing.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Index file or database could not be opened
    #[error("source unavailable: {resource}: {reason}")]
    SourceUnavailable { resource: String, reason: String },

    /// Transport error or non-success HTTP status
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// No candidate document in the listing looked like an information table
    #[error("no holdings document found under {listing}")]
    DiscoveryFailed { listing: String },

    /// Payload is an HTML page rather than XML
    #[error("received HTML instead of XML")]
    WrongContentType,

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Holding entry is missing one or more required fields
    #[error("entry missing fields: {}", .missing.join(", "))]
    EntryIncomplete { missing: Vec<&'static str> },

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl IngestError {
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, IngestError::SourceUnavailable { .. })
    }

    /// Short stable label used for summary counters and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::SourceUnavailable { .. } => "source_unavailable",
            IngestError::FetchFailed { .. } => "fetch_failed",
            IngestError::DiscoveryFailed { .. } => "discovery_failed",
            IngestError::WrongContentType => "wrong_content_type",
            IngestError::MalformedDocument(_) => "malformed_document",
            IngestError::EntryIncomplete { .. } => "entry_incomplete",
            IngestError::PersistenceFailure(_) => "persistence_failure",
        }
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::PersistenceFailure(e.to_string())
    }
}

impl From<quick_xml::Error> for IngestError {
    fn from(e: quick_xml::Error) -> Self {
        IngestError::MalformedDocument(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_unavailable_is_run_fatal() {
        let fatal = IngestError::SourceUnavailable {
            resource: "master.idx".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert!(fatal.is_run_fatal());

        let scoped = [
            IngestError::FetchFailed {
                url: "https://www.sec.gov/".to_string(),
                reason: "HTTP 404".to_string(),
            },
            IngestError::DiscoveryFailed {
                listing: "https://www.sec.gov/".to_string(),
            },
            IngestError::WrongContentType,
            IngestError::MalformedDocument("unexpected end".to_string()),
            IngestError::EntryIncomplete {
                missing: vec!["cusip"],
            },
            IngestError::PersistenceFailure("constraint".to_string()),
        ];
        for err in scoped {
            assert!(!err.is_run_fatal(), "{} should not abort the run", err.kind());
        }
    }

    #[test]
    fn entry_incomplete_lists_missing_fields() {
        let err = IngestError::EntryIncomplete {
            missing: vec!["nameOfIssuer", "sshPrnamt"],
        };
        assert_eq!(err.to_string(), "entry missing fields: nameOfIssuer, sshPrnamt");
    }
}
