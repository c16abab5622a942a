use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One entry of `GET database/tables/{db}/{schema}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableSummary {
    pub name: String,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Payload of `GET database/tables/{db}/{schema}/{table}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TableInfo {
    pub table: TableDetails,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Table model as stored by the backend. Sent back verbatim on save.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetails {
    pub table_name: String,

    #[serde(rename = "column")]
    #[serde(default)]
    pub columns: Vec<ColumnDetails>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetails {
    pub column_name: String,

    /// Mapped Java type; `null` lets the backend pick the default mapping.
    #[serde(default)]
    pub java_type: Option<String>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Body of `PUT database/tables/{db}/{schema}/{table}/{column}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnUpdate {
    pub column: ColumnDetails,
    pub annotations: Map<String, Value>,
}

/// Response of `GET .../{column}/:annotations/{type}`.
///
/// `class_accessor` describes the annotation form and is handed to the form
/// engine untouched; `annotations` holds the current values by property name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationsDescriptor {
    #[serde(default)]
    pub class_accessor: Value,

    #[serde(default)]
    pub annotations: Map<String, Value>,
}
