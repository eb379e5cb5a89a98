// src/validator/headers.rs
// =============================================================================
// Request headers for the web validator.
//
// Some sites need a specific User-Agent, some need a token. The config gives
// us a base header set and an ordered list of (endpoint regex, headers)
// overrides. For a given link the first override whose regex matches is
// merged over the base set; later overrides are ignored.
//
// The overrides are a Vec, not a map: a map has no defined iteration order,
// and "first match wins" needs one.
// =============================================================================

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

// Header name -> one or more values, as written in the config file
pub type HeaderTable = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct HeaderRules {
    base: HeaderMap,
    overrides: Vec<(Regex, HeaderMap)>,
}

impl HeaderRules {
    pub fn new(base: &HeaderTable, overrides: &[(String, HeaderTable)]) -> Result<Self> {
        let base = to_header_map(base).context("invalid base header")?;

        let overrides = overrides
            .iter()
            .map(|(endpoint, headers)| {
                let regex = Regex::new(endpoint)
                    .with_context(|| format!("fail to compile the endpoint expression '{}'", endpoint))?;
                let headers = to_header_map(headers)
                    .with_context(|| format!("invalid header for endpoint '{}'", endpoint))?;
                Ok((regex, headers))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { base, overrides })
    }

    // The headers to send when requesting `target`
    pub fn for_target(&self, target: &str) -> HeaderMap {
        let mut headers = self.base.clone();

        if let Some((_, overwrite)) = self.overrides.iter().find(|(regex, _)| regex.is_match(target)) {
            for name in overwrite.keys() {
                headers.remove(name);
            }
            for (name, value) in overwrite {
                headers.append(name.clone(), value.clone());
            }
        }

        headers
    }
}

fn to_header_map(table: &HeaderTable) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, values) in table {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name '{}'", name))?;
        for value in values {
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header '{}'", name))?;
            map.append(name.clone(), value);
        }
    }
    Ok(map)
}

// Flattens a HeaderMap into readable (name, value) pairs
pub fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &[&str])]) -> HeaderTable {
        entries
            .iter()
            .map(|(name, values)| (name.to_string(), values.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    fn rules() -> HeaderRules {
        HeaderRules::new(
            &table(&[("User-Agent", &["base-agent"]), ("Accept", &["text/html"])]),
            &[
                ("^https://api\\.example\\.com".to_string(), table(&[("User-Agent", &["api-agent"])])),
                ("example\\.com".to_string(), table(&[("Authorization", &["Bearer x"])])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_base_headers_without_match() {
        let headers = rules().for_target("https://other.org");
        assert_eq!(headers["user-agent"], "base-agent");
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let headers = rules().for_target("https://api.example.com/v1");
        assert_eq!(headers["user-agent"], "api-agent");
        assert_eq!(headers["accept"], "text/html");
        // The second override also matches but is never consulted
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn test_later_override_applies_when_first_misses() {
        let headers = rules().for_target("https://www.example.com");
        assert_eq!(headers["user-agent"], "base-agent");
        assert_eq!(headers["authorization"], "Bearer x");
    }

    #[test]
    fn test_multiple_values_are_kept() {
        let rules = HeaderRules::new(&table(&[("Accept", &["a", "b"])]), &[]).unwrap();
        let headers = rules.for_target("https://x");
        assert_eq!(headers.get_all("accept").iter().count(), 2);
    }

    #[test]
    fn test_invalid_endpoint_regex_is_an_error() {
        let result = HeaderRules::new(&HeaderTable::new(), &[("(".to_string(), HeaderTable::new())]);
        assert!(result.is_err());
    }
}
