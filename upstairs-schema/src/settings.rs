use serde::{Deserialize, Serialize};

use crate::field::FieldValue;

/// Response of `GET settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub app_name: FieldValue<Option<String>>,

    #[serde(default)]
    pub login_path: FieldValue<Option<String>>,
}

/// Body of `PUT settings`: plain form values, not wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub app_name: String,
    pub login_path: String,
}
