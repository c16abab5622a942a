use serde::{Deserialize, Serialize};

/// Backend property wrapper: `{ "value": ..., "displayValue": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldValue<T> {
    pub value: T,

    #[serde(rename = "displayValue")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

impl<T> FieldValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            display_value: None,
        }
    }
}

impl FieldValue<Option<String>> {
    /// Borrow the inner string, treating `null` as absent.
    pub fn as_deref(&self) -> Option<&str> {
        self.value.as_deref()
    }
}
