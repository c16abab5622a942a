use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::field::FieldValue;

/// One entry of `GET database/connections`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionProviderSummary {
    pub name: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Payload of `GET/PUT database/connections/{name}`.
///
/// Unknown properties are kept in `extra` so a PUT sends back everything the
/// backend handed out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProviderDetails {
    pub database_name: FieldValue<String>,

    #[serde(default)]
    pub driver: FieldValue<Option<String>>,

    #[serde(default)]
    pub error_message: FieldValue<Option<String>>,

    #[serde(default)]
    pub false_string: FieldValue<Option<String>>,

    #[serde(default)]
    pub hibernate_dialect: FieldValue<Option<String>>,

    #[serde(default)]
    pub jndi_resource: FieldValue<Option<String>>,

    /// Milliseconds since the epoch of the last connection test.
    #[serde(default)]
    pub last_tested: FieldValue<Option<i64>>,

    #[serde(default)]
    pub password: FieldValue<Option<String>>,

    #[serde(default)]
    pub schemas: Vec<SchemaSelection>,

    #[serde(default)]
    pub status: FieldValue<Option<String>>,

    #[serde(default)]
    pub true_string: FieldValue<Option<String>>,

    #[serde(default)]
    pub url: FieldValue<Option<String>>,

    #[serde(default)]
    pub user: FieldValue<Option<String>>,

    #[serde(default)]
    pub username: FieldValue<Option<String>>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ConnectionProviderDetails {
    pub fn name(&self) -> &str {
        &self.database_name.value
    }

    pub fn last_tested_at(&self) -> Option<DateTime<Utc>> {
        self.last_tested
            .value
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Schemas the operator selected for mapping.
    pub fn selected_schemas(&self) -> impl Iterator<Item = &SchemaSelection> {
        self.schemas.iter().filter(|s| s.selected)
    }
}

/// Schema entry inside connection details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaSelection {
    #[serde(default)]
    pub catalog: Option<String>,

    /// Logical (mapped) name; may differ from the physical schema.
    #[serde(default)]
    pub name: Option<String>,

    /// Physical schema name.
    pub schema: String,

    #[serde(default)]
    pub selected: bool,
}

/// One value of the `GET database/platforms` map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePlatform {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub standard_driver_class_name: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `POST database/connections/{name}/:test`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TestStatus(pub Vec<String>);

impl TestStatus {
    pub const CONNECTED: &'static str = "connected";

    pub fn is_connected(&self) -> bool {
        self.0.first().map(String::as_str) == Some(Self::CONNECTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn details_parse_wrapped_values_and_keep_unknown_fields() {
        let raw = json!({
            "databaseName": { "value": "hr" },
            "driver": { "value": "org.postgresql.Driver" },
            "lastTested": { "value": 1_700_000_000_000_i64, "displayValue": "yesterday" },
            "schemas": [
                { "catalog": null, "name": "public", "schema": "public", "selected": true },
                { "schema": "audit" }
            ],
            "connectionType": { "value": "jdbc" }
        });

        let details: ConnectionProviderDetails =
            serde_json::from_value(raw).expect("valid details payload");

        assert_eq!(details.name(), "hr");
        assert_eq!(details.driver.as_deref(), Some("org.postgresql.Driver"));
        assert_eq!(
            details.last_tested_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(details.schemas.len(), 2);
        assert_eq!(details.selected_schemas().count(), 1);
        assert!(details.extra.contains_key("connectionType"));

        let back = serde_json::to_value(&details).expect("serialize details");
        assert_eq!(back["connectionType"]["value"], "jdbc");
        assert_eq!(back["lastTested"]["displayValue"], "yesterday");
    }

    #[test]
    fn test_status_only_connected_when_first_entry_matches() {
        assert!(TestStatus(vec!["connected".into()]).is_connected());
        assert!(!TestStatus(vec!["error".into(), "connected".into()]).is_connected());
        assert!(!TestStatus(Vec::new()).is_connected());
    }
}
