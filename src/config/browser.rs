use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tree::NodeKey;

/// Startup behaviour of the tree browser binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    /// Nodes to expand after the connection list loads, in order.
    /// Each entry is `database` or `database/schema`.
    /// TOML: `browser.expand`. Default: empty.
    #[serde(default)]
    pub expand: Vec<String>,

    /// How long to wait for one node's children before giving up.
    /// TOML: `browser.settle_timeout_secs`. Default: `30`.
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            expand: Vec::new(),
            settle_timeout_secs: default_settle_timeout_secs(),
        }
    }
}

/// A parsed `browser.expand` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsePath {
    pub database: String,
    pub schema: Option<String>,
}

impl BrowsePath {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(2, '/');
        let database = parts.next().filter(|s| !s.is_empty())?.to_string();
        let schema = match parts.next() {
            Some(s) if s.is_empty() || s.contains('/') => return None,
            Some(s) => Some(s.to_string()),
            None => None,
        };
        Some(Self { database, schema })
    }

    pub fn key(&self) -> NodeKey {
        match &self.schema {
            Some(schema) => NodeKey::schema(&self.database, schema),
            None => NodeKey::database(&self.database),
        }
    }
}

impl BrowserConfig {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    /// Valid entries of `expand`; malformed ones are logged and skipped.
    pub fn paths(&self) -> Vec<BrowsePath> {
        self.expand
            .iter()
            .filter_map(|raw| {
                let parsed = BrowsePath::parse(raw);
                if parsed.is_none() {
                    tracing::warn!(entry = %raw, "Ignoring malformed browser.expand entry");
                }
                parsed
            })
            .collect()
    }
}

fn default_settle_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_database_and_schema_paths() {
        assert_eq!(
            BrowsePath::parse("hr"),
            Some(BrowsePath {
                database: "hr".into(),
                schema: None
            })
        );
        assert_eq!(
            BrowsePath::parse(" hr/public ").map(|p| p.key()),
            Some(NodeKey::schema("hr", "public"))
        );
        assert_eq!(BrowsePath::parse(""), None);
        assert_eq!(BrowsePath::parse("hr/"), None);
        assert_eq!(BrowsePath::parse("hr/public/employees"), None);
    }
}
