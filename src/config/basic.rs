use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Root of the application REST API; `portofino-upstairs/...` is resolved against it.
    /// TOML: `basic.api_root`. Default: `http://localhost:8080/api/`.
    #[serde(default = "default_api_root")]
    pub api_root: Url,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Optional bearer token attached to every backend request.
    /// TOML: `basic.api_token`. Default: unset.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_token_lax")]
    pub api_token: Option<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            loglevel: default_loglevel(),
            api_token: None,
        }
    }
}

fn deserialize_token_lax<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;

    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom(
            "expected a string or a number for basic.api_token",
        )),
    }
}

fn default_api_root() -> Url {
    Url::parse("http://localhost:8080/api/").expect("static default api root is valid")
}

fn default_loglevel() -> String {
    "info".to_string()
}
