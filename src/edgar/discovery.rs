use itertools::Itertools;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// Path-like tokens ending in .xml. Matching is deliberately loose: listing
// pages are flat and the candidates are content-checked before use.
static XML_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\w\-./]+\.xml)\b").expect("xml file pattern"));

/// Strip any `/` or `\` separated prefix.
pub fn bare_filename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Candidate XML documents referenced from a filing listing page, in order of
/// first appearance and unique by bare filename.
pub fn extract_xml_links(html: &str, base: &Url) -> Vec<Url> {
    let links: Vec<Url> = XML_FILE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| bare_filename(m.as_str()))
        .filter(|name| !name.is_empty())
        .unique()
        .filter_map(|name| match base.join(name) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Skipping candidate {} under {}: {}", name, base, e);
                None
            }
        })
        .collect();

    debug!("Found {} xml candidates under {}", links.len(), base);
    links
}
