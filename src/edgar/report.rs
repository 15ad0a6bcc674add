use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// Form codes as they appear in the `Form Type` column of the EDGAR index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String")]
pub enum ReportType {
    Form13FHR,
    Form13FHRA,
    Form13FNT,
    Form13FNTA,
    Other(String),
}

impl Default for ReportType {
    fn default() -> Self {
        ReportType::Form13FHR
    }
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form13FHR => write!(f, "13F-HR"),
            ReportType::Form13FHRA => write!(f, "13F-HR/A"),
            ReportType::Form13FNT => write!(f, "13F-NT"),
            ReportType::Form13FNTA => write!(f, "13F-NT/A"),
            ReportType::Other(s) => write!(f, "{}", s),
        }
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .filter(|t| !matches!(t, ReportType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }

    /// Index rows are kept only on an exact, case-sensitive code match.
    pub fn matches_code(&self, code: &str) -> bool {
        match self {
            ReportType::Other(s) => s == code,
            known => known.to_string() == code,
        }
    }
}

impl FromStr for ReportType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<ReportType, std::string::String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty form type".to_string());
        }
        match s.to_uppercase().as_str() {
            "13F-HR" => Ok(ReportType::Form13FHR),
            "13F-HR/A" => Ok(ReportType::Form13FHRA),
            "13F-NT" => Ok(ReportType::Form13FNT),
            "13F-NT/A" => Ok(ReportType::Form13FNTA),
            _ => Ok(ReportType::Other(s.to_string())),
        }
    }
}
