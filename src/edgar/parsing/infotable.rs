use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::markup::{parse_document, Element};
use super::types::{ExtractedHoldings, HoldingRow, OptionType};
use crate::error::{IngestError, Result};

const TABLE_TAG: &str = "informationTable";
const ENTRY_TAG: &str = "infoTable";
const ISSUER_TAG: &str = "nameOfIssuer";
const CUSIP_TAG: &str = "cusip";
const VALUE_TAG: &str = "value";
const PUT_CALL_TAG: &str = "putCall";
const AMOUNT_TAG: &str = "shrsOrPrnAmt";
const SHARES_TAG: &str = "sshPrnamt";

static HTML_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!doctype\s+html|<html[\s>]").expect("html marker pattern"));

/// Cheap content check used to pick the holdings document among candidates.
pub fn looks_like_holdings(content: &str) -> bool {
    content.contains(ENTRY_TAG) || content.contains("<nameOfIssuer")
}

pub fn looks_like_html(content: &str) -> bool {
    HTML_MARKER.is_match(content)
}

/// Extract holding rows from a 13F information table document.
///
/// Entries missing issuer, CUSIP or share count are skipped and counted in
/// [`ExtractedHoldings::incomplete`]; the rest of the table is still read.
pub fn extract_holdings(content: &str) -> Result<ExtractedHoldings> {
    if looks_like_html(content) {
        return Err(IngestError::WrongContentType);
    }

    let root = parse_document(content)?;
    let table = root.find(TABLE_TAG).ok_or_else(|| {
        IngestError::MalformedDocument(format!(
            "no {} element (root is <{}>)",
            TABLE_TAG, root.name
        ))
    })?;

    let mut extracted = ExtractedHoldings::default();
    for (position, entry) in table.children_named(ENTRY_TAG).enumerate() {
        match extract_entry(entry) {
            Ok(row) => extracted.rows.push(row),
            Err(e) => {
                warn!("Skipping entry {}: {}", position + 1, e);
                extracted.incomplete += 1;
            }
        }
    }

    debug!(
        "Extracted {} holdings ({} incomplete)",
        extracted.rows.len(),
        extracted.incomplete
    );
    Ok(extracted)
}

fn extract_entry(entry: &Element) -> Result<HoldingRow> {
    let name = entry.child_text(ISSUER_TAG);
    let cusip = entry.child_text(CUSIP_TAG);
    // share count sits one level deeper than the other fields
    let shares = entry
        .child(AMOUNT_TAG)
        .and_then(|amount| amount.child_text(SHARES_TAG));

    let (Some(name), Some(cusip), Some(shares)) = (name, cusip, shares) else {
        let mut missing = Vec::new();
        if name.is_none() {
            missing.push(ISSUER_TAG);
        }
        if cusip.is_none() {
            missing.push(CUSIP_TAG);
        }
        if shares.is_none() {
            missing.push(SHARES_TAG);
        }
        return Err(IngestError::EntryIncomplete { missing });
    };

    let put_call = entry
        .child_text(PUT_CALL_TAG)
        .and_then(|text| match text.parse::<OptionType>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!("Ignoring putCall for {}: {}", cusip.trim(), e);
                None
            }
        });

    Ok(HoldingRow {
        name_of_issuer: name.to_string(),
        cusip: cusip.trim().to_string(),
        shares: parse_amount(SHARES_TAG, shares),
        value: entry
            .child_text(VALUE_TAG)
            .map(|v| parse_amount(VALUE_TAG, v))
            .unwrap_or(0),
        put_call,
    })
}

fn parse_amount(field: &str, text: &str) -> u64 {
    text.trim().parse::<u64>().unwrap_or_else(|_| {
        warn!("Non-integer {} `{}`, using 0", field, text.trim());
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::tests::read_test_file;

    #[test]
    fn extracts_single_entry_with_nested_shares() {
        let content = read_test_file("single_entry.xml");
        let extracted = extract_holdings(&content).unwrap();

        assert_eq!(extracted.incomplete, 0);
        assert_eq!(
            extracted.rows,
            vec![HoldingRow {
                name_of_issuer: "Apple Inc".to_string(),
                cusip: "037833100".to_string(),
                shares: 300000000,
                value: 69900000000,
                put_call: None,
            }]
        );
    }

    #[test]
    fn ignores_namespace_prefixes() {
        let content = read_test_file("prefixed.xml");
        let extracted = extract_holdings(&content).unwrap();

        assert_eq!(extracted.rows.len(), 3);
        assert_eq!(extracted.rows[0].name_of_issuer, "AMAZON COM INC");
        assert_eq!(extracted.rows[1].put_call, Some(OptionType::Put));
        assert_eq!(extracted.rows[2].put_call, Some(OptionType::Call));
        assert_eq!(extracted.rows[2].cusip, "88160R101");
    }

    #[test]
    fn incomplete_entry_does_not_stop_siblings() {
        let content = read_test_file("partial.xml");
        let extracted = extract_holdings(&content).unwrap();

        assert_eq!(extracted.incomplete, 2);
        let cusips: Vec<&str> = extracted.rows.iter().map(|r| r.cusip.as_str()).collect();
        assert_eq!(cusips, vec!["594918104", "02079K305"]);
    }

    #[test]
    fn html_entity_in_issuer_keeps_whole_table() {
        let content = r#"<informationTable>
  <infoTable>
    <nameOfIssuer>BERKSHIRE&nbsp;HATHAWAY</nameOfIssuer>
    <cusip>084670702</cusip>
    <shrsOrPrnAmt><sshPrnamt>10</sshPrnamt></shrsOrPrnAmt>
  </infoTable>
  <infoTable>
    <nameOfIssuer>MICROSOFT CORP</nameOfIssuer>
    <cusip>594918104</cusip>
    <shrsOrPrnAmt><sshPrnamt>20</sshPrnamt></shrsOrPrnAmt>
  </infoTable>
</informationTable>"#;
        let extracted = extract_holdings(content).unwrap();

        assert_eq!(extracted.incomplete, 0);
        assert_eq!(extracted.rows.len(), 2);
        assert_eq!(extracted.rows[0].name_of_issuer, "BERKSHIRE&nbsp;HATHAWAY");
        assert_eq!(extracted.rows[1].cusip, "594918104");
    }

    #[test]
    fn missing_value_defaults_to_zero_and_bad_numbers_coerce() {
        let content = r#"<informationTable>
            <infoTable>
              <nameOfIssuer>NO VALUE CORP</nameOfIssuer>
              <cusip>000000001</cusip>
              <shrsOrPrnAmt><sshPrnamt>12</sshPrnamt></shrsOrPrnAmt>
            </infoTable>
            <infoTable>
              <nameOfIssuer>GARBLED CORP</nameOfIssuer>
              <cusip>000000002</cusip>
              <value>1,234.5</value>
              <shrsOrPrnAmt><sshPrnamt>n/a</sshPrnamt></shrsOrPrnAmt>
              <putCall>Straddle</putCall>
            </infoTable>
          </informationTable>"#;
        let extracted = extract_holdings(content).unwrap();

        assert_eq!(extracted.rows.len(), 2);
        assert_eq!(extracted.rows[0].value, 0);
        assert_eq!(extracted.rows[0].shares, 12);
        assert_eq!(extracted.rows[1].value, 0);
        assert_eq!(extracted.rows[1].shares, 0);
        assert_eq!(extracted.rows[1].put_call, None);
    }

    #[test]
    fn shares_outside_amount_container_are_not_used() {
        let content = r#"<informationTable><infoTable>
              <nameOfIssuer>FLAT CORP</nameOfIssuer>
              <cusip>000000003</cusip>
              <sshPrnamt>10</sshPrnamt>
            </infoTable></informationTable>"#;
        let extracted = extract_holdings(content).unwrap();
        assert!(extracted.rows.is_empty());
        assert_eq!(extracted.incomplete, 1);
    }

    #[test]
    fn html_payload_is_wrong_content_type() {
        let content = read_test_file("error_page.html");
        let err = extract_holdings(&content).unwrap_err();
        assert!(matches!(err, IngestError::WrongContentType));
    }

    #[test]
    fn html_without_doctype_is_also_rejected() {
        let err = extract_holdings("<html><body>Request Rate Threshold Exceeded</body></html>")
            .unwrap_err();
        assert!(matches!(err, IngestError::WrongContentType));
    }

    #[test]
    fn unparseable_or_unrelated_xml_is_malformed() {
        assert!(matches!(
            extract_holdings("<informationTable><infoTable>"),
            Err(IngestError::MalformedDocument(_))
        ));
        assert!(matches!(
            extract_holdings(&read_test_file("primary_doc.xml")),
            Err(IngestError::MalformedDocument(_))
        ));
    }

    #[test]
    fn empty_table_yields_no_rows() {
        let extracted = extract_holdings("<informationTable/>").unwrap();
        assert!(extracted.rows.is_empty());
        assert_eq!(extracted.incomplete, 0);
    }

    #[test]
    fn signature_check() {
        assert!(looks_like_holdings(&read_test_file("single_entry.xml")));
        assert!(looks_like_holdings(&read_test_file("prefixed.xml")));
        assert!(!looks_like_holdings(&read_test_file("primary_doc.xml")));
        assert!(looks_like_html(&read_test_file("error_page.html")));
        assert!(!looks_like_html(&read_test_file("single_entry.xml")));
    }
}
