use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::report::ReportType;
use crate::error::{IngestError, Result};

/// Header line that precedes the data rows of a `master.idx` file.
pub const INDEX_HEADER: &str = "CIK|Company Name|Form Type|Date Filed|Filename";

const INDEX_FIELDS: usize = 5;

static ARCHIVE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data/(\d+)/([^/]+)\.txt").expect("archive path pattern"));

/// Location of a submission inside the EDGAR archive, taken from the
/// `Filename` column (`edgar/data/<folder>/<accession>.txt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePath {
    pub folder: String,
    pub accession: String,
}

impl ArchivePath {
    pub fn parse(filename: &str) -> Option<Self> {
        let caps = ARCHIVE_PATH.captures(filename)?;
        Some(ArchivePath {
            folder: caps[1].to_string(),
            accession: caps[2].to_string(),
        })
    }

    /// Accession number as used in archive folder names (dashes removed).
    pub fn accession_folder(&self) -> String {
        self.accession.replace('-', "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub cik: String,
    pub company_name: String,
    pub form_type: String,
    pub date_filed: String,
    pub filename: String,
    pub archive: ArchivePath,
}

/// Parse index text, keeping only rows for `form`.
///
/// Lines before [`INDEX_HEADER`] are ignored, as are rows that do not have
/// exactly five fields or whose filename is not an archive path.
pub fn parse_index(text: &str, form: &ReportType) -> Vec<IndexRecord> {
    let mut records = Vec::new();
    let mut in_body = false;

    for line in text.lines() {
        if !in_body {
            if line.contains(INDEX_HEADER) {
                in_body = true;
            }
            continue;
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != INDEX_FIELDS {
            continue;
        }
        if !form.matches_code(fields[2]) {
            continue;
        }

        let Some(archive) = ArchivePath::parse(fields[4]) else {
            debug!("Dropping index row with unrecognised filename: {}", fields[4]);
            continue;
        };

        records.push(IndexRecord {
            cik: fields[0].to_string(),
            company_name: fields[1].to_string(),
            form_type: fields[2].to_string(),
            date_filed: fields[3].to_string(),
            filename: fields[4].to_string(),
            archive,
        });
    }

    if !in_body {
        warn!("Index header not found; no rows read");
    }

    records
}

/// Read and parse an index file from disk.
pub fn read_index(path: &Path, form: &ReportType) -> Result<Vec<IndexRecord>> {
    let bytes = fs::read(path).map_err(|e| IngestError::SourceUnavailable {
        resource: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let text = decode_index(&bytes);
    let records = parse_index(&text, form);
    debug!(
        "Read {} {} rows from {}",
        records.len(),
        form,
        path.display()
    );
    Ok(records)
}

fn decode_index(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("Index is not valid UTF-8, decoding as Windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}
