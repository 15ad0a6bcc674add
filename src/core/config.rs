use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::edgar::filing::{EDGAR_ARCHIVES_URL, USER_AGENT};
use crate::edgar::rate_limiter::RateLimiter;
use crate::edgar::{LocationResolver, ReportType};

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub index_path: PathBuf,
    pub database_path: PathBuf,
    pub user_agent: String,
    pub form_type: ReportType,
    pub archives_url: Url,
    /// Conventional information-table file name probed before the listing
    pub direct_document: Option<String>,
    pub delay: Duration,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let index_path = PathBuf::from(get("HOLDINGS_INDEX").unwrap_or_else(|| "master.idx".to_string()));
        let database_path = PathBuf::from(get("HOLDINGS_DB").unwrap_or_else(|| "holdings.db".to_string()));
        let user_agent = get("USER_AGENT").unwrap_or_else(|| USER_AGENT.to_string());

        let form_type = match get("HOLDINGS_FORM_TYPE") {
            Some(code) => ReportType::from_str(&code).map_err(|e| anyhow!("HOLDINGS_FORM_TYPE: {}", e))?,
            None => ReportType::default(),
        };

        let archives = get("EDGAR_ARCHIVES_URL").unwrap_or_else(|| EDGAR_ARCHIVES_URL.to_string());
        let archives_url = Url::parse(&archives)
            .with_context(|| format!("EDGAR_ARCHIVES_URL is not a valid URL: {}", archives))?;

        let delay = match get("HOLDINGS_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .with_context(|| format!("HOLDINGS_DELAY_MS must be milliseconds, got {}", ms))?,
            ),
            None => Duration::from_secs(1),
        };

        Ok(Self {
            index_path,
            database_path,
            user_agent,
            form_type,
            archives_url,
            direct_document: get("HOLDINGS_DIRECT_DOCUMENT"),
            delay,
        })
    }

    pub fn resolver(&self) -> LocationResolver {
        LocationResolver::new(self.archives_url.clone(), self.direct_document.clone())
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<IngestConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.index_path, PathBuf::from("master.idx"));
        assert_eq!(config.database_path, PathBuf::from("holdings.db"));
        assert_eq!(config.user_agent, USER_AGENT);
        assert_eq!(config.form_type, ReportType::Form13FHR);
        assert_eq!(config.archives_url.as_str(), EDGAR_ARCHIVES_URL);
        assert_eq!(config.direct_document, None);
        assert_eq!(config.delay, Duration::from_secs(1));
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("HOLDINGS_INDEX", "/data/2025-QTR1/master.idx"),
            ("HOLDINGS_FORM_TYPE", "13f-hr/a"),
            ("HOLDINGS_DIRECT_DOCUMENT", "infotable.xml"),
            ("HOLDINGS_DELAY_MS", "250"),
            ("HOLDINGS_DB", " "),
        ])
        .unwrap();
        assert_eq!(config.index_path, PathBuf::from("/data/2025-QTR1/master.idx"));
        assert_eq!(config.form_type, ReportType::Form13FHRA);
        assert_eq!(config.direct_document.as_deref(), Some("infotable.xml"));
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.database_path, PathBuf::from("holdings.db"));
        assert_eq!(config.rate_limiter().interval(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("HOLDINGS_DELAY_MS", "soon")]).is_err());
        assert!(config(&[("EDGAR_ARCHIVES_URL", "not a url")]).is_err());
    }
}
