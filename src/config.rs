// src/config.rs
// =============================================================================
// The YAML configuration file.
//
//   ignore:
//     link: ["^https://localhost"]
//     file: ["/vendor/"]
//   provider:
//     web:
//       timeout: 30
//       header:
//         User-Agent: ["markdown-link-check"]
//       overwrite:
//         - endpoint: "^https://example\\.com"
//           header:
//             Authorization: ["Bearer x"]
//     github:
//       main:
//         owner: my-org
//         token: ghp_xxx
//
// Every section is optional. Patterns and headers are only checked for
// syntax when the validators are built (see app.rs); this file just makes
// sure the shape is right and the GitHub entries are complete.
//
// Rust concepts used:
// - #[serde(default)]: missing fields take their Default value
// - BTreeMap: GitHub entries come back sorted by name
// =============================================================================

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::validator::HeaderTable;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ignore: Ignore,
    pub provider: Provider,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Ignore {
    /// Patterns matched against link targets
    pub link: Vec<String>,
    /// Patterns matched against full document paths
    pub file: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Provider {
    pub web: WebProvider,
    pub github: BTreeMap<String, GitHubProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WebProvider {
    /// Seconds allowed per request
    pub timeout: u64,
    pub header: HeaderTable,
    pub overwrite: Vec<HeaderOverwrite>,
}

impl Default for WebProvider {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            header: HeaderTable::new(),
            overwrite: Vec::new(),
        }
    }
}

impl WebProvider {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    // The overrides in file order, ready for HeaderRules
    pub fn overrides(&self) -> Vec<(String, HeaderTable)> {
        self.overwrite
            .iter()
            .map(|entry| (entry.endpoint.clone(), entry.header.clone()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct HeaderOverwrite {
    pub endpoint: String,
    #[serde(default)]
    pub header: HeaderTable,
}

#[derive(Debug, Deserialize)]
pub struct GitHubProvider {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub token: String,
    /// REST API base, the public API when absent
    pub api: Option<String>,
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("fail to parse the configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("fail to read the configuration file '{}'", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("invalid configuration file '{}'", path.display()))
    }

    fn validate(&self) -> Result<()> {
        for (name, entry) in &self.provider.github {
            if entry.owner.trim().is_empty() {
                bail!("missing 'owner' for the GitHub provider '{}'", name);
            }
            if entry.token.trim().is_empty() {
                bail!("missing 'token' for the GitHub provider '{}'", name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.ignore.link.is_empty());
        assert!(config.provider.github.is_empty());
        assert_eq!(config.provider.web.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_yaml(
            r#"
ignore:
  link: ["^https://localhost"]
  file: ["/vendor/"]
provider:
  web:
    timeout: 5
    header:
      User-Agent: ["markdown-link-check"]
    overwrite:
      - endpoint: "^https://b\\.example"
        header:
          Authorization: ["Bearer b"]
      - endpoint: "^https://a\\.example"
        header:
          Authorization: ["Bearer a"]
  github:
    zeta:
      owner: zeta-org
      token: t2
    alpha:
      owner: alpha-org
      token: t1
      api: http://localhost:9000
"#,
        )
        .unwrap();

        assert_eq!(config.ignore.link, vec!["^https://localhost"]);
        assert_eq!(config.ignore.file, vec!["/vendor/"]);
        assert_eq!(config.provider.web.timeout(), Duration::from_secs(5));
        assert_eq!(config.provider.web.header["User-Agent"], vec!["markdown-link-check"]);

        // Overrides keep file order, GitHub entries come back sorted
        let overrides = config.provider.web.overrides();
        assert_eq!(overrides[0].0, "^https://b\\.example");
        assert_eq!(overrides[1].0, "^https://a\\.example");
        let names: Vec<&String> = config.provider.github.keys().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(config.provider.github["alpha"].api.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.provider.github["zeta"].api, None);
    }

    #[test]
    fn test_github_entry_needs_owner_and_token() {
        let err = Config::from_yaml("provider:\n  github:\n    main:\n      token: x\n").unwrap_err();
        assert!(err.to_string().contains("missing 'owner'"));

        let err = Config::from_yaml("provider:\n  github:\n    main:\n      owner: x\n").unwrap_err();
        assert!(err.to_string().contains("missing 'token'"));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(Config::from_yaml("ignore: [").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ignore:\n  link: ['^mailto:']").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.ignore.link, vec!["^mailto:"]);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = Config::from_file(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.yaml"));
    }
}
