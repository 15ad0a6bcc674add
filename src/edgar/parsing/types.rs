use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Put,
    Call,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Put => write!(f, "Put"),
            OptionType::Call => write!(f, "Call"),
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "put" => Ok(OptionType::Put),
            "call" => Ok(OptionType::Call),
            other => Err(format!("unknown option type `{}`", other)),
        }
    }
}

/// One position line from an information table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub name_of_issuer: String,
    /// CUSIP, whitespace-trimmed
    pub cusip: String,
    pub shares: u64,
    /// As reported; units depend on the filing period and are not converted
    pub value: u64,
    pub put_call: Option<OptionType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedHoldings {
    pub rows: Vec<HoldingRow>,
    /// Entries dropped for missing issuer, CUSIP or share count
    pub incomplete: usize,
}
