pub mod infotable;
pub mod markup;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use infotable::{extract_holdings, looks_like_holdings, looks_like_html};
pub use types::{ExtractedHoldings, HoldingRow, OptionType};
