use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use upstairs_schema::{
    AnnotationsDescriptor, ColumnUpdate, ConnectionProviderDetails, ConnectionProviderSummary,
    DatabasePlatform, SchemaSelection, Settings, SettingsUpdate, TableDetails, TableInfo,
    TableSummary, TestStatus,
};
use url::Url;

use super::endpoints::UpstairsEndpoints;
use crate::config::{BackendConfig, BasicConfig, Config};
use crate::error::{IsRetryable, MetadataError, UpstairsError};
use crate::tree::MetadataProvider;
use crate::utils::logging::with_pretty_json_debug;

/// Max characters of an error response body kept in [`UpstairsError::UpstreamStatus`].
pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

const USER_AGENT: &str = concat!("upstairs/", env!("CARGO_PKG_VERSION"));

/// Typed client for the `portofino-upstairs` REST API.
///
/// GETs are retried on transport errors, 429 and 5xx; writes are sent once.
#[derive(Clone)]
pub struct UpstairsClient {
    client: reqwest::Client,
    endpoints: UpstairsEndpoints,
    api_token: Option<Arc<str>>,
    retry_policy: ExponentialBuilder,
}

impl UpstairsClient {
    pub fn from_config(cfg: &Config) -> Result<Self, UpstairsError> {
        Self::new(&cfg.basic, &cfg.backend)
    }

    pub fn new(basic: &BasicConfig, backend: &BackendConfig) -> Result<Self, UpstairsError> {
        let client = build_client(backend)?;
        Self::with_client(client, basic, backend)
    }

    /// Use a caller-built reqwest client (shared pools, custom TLS).
    pub fn with_client(
        client: reqwest::Client,
        basic: &BasicConfig,
        backend: &BackendConfig,
    ) -> Result<Self, UpstairsError> {
        let endpoints = UpstairsEndpoints::new(&basic.api_root)?;
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_max_times(backend.retry_max_times)
            .with_jitter();

        Ok(Self {
            client,
            endpoints,
            api_token: basic.api_token.as_deref().map(Arc::from),
            retry_policy,
        })
    }

    pub fn endpoints(&self) -> &UpstairsEndpoints {
        &self.endpoints
    }

    pub async fn list_connections(&self) -> Result<Vec<ConnectionProviderSummary>, UpstairsError> {
        self.get_json(self.endpoints.connections()).await
    }

    pub async fn get_connection(
        &self,
        name: &str,
    ) -> Result<ConnectionProviderDetails, UpstairsError> {
        self.get_json(self.endpoints.connection(name)).await
    }

    pub async fn save_connection(
        &self,
        details: &ConnectionProviderDetails,
    ) -> Result<(), UpstairsError> {
        let url = self.endpoints.connection(details.name());
        self.send_json(Method::PUT, url, details).await?;
        info!(connection = %details.name(), "Connection saved");
        Ok(())
    }

    pub async fn delete_connection(&self, name: &str) -> Result<(), UpstairsError> {
        let resp = self
            .request(Method::DELETE, self.endpoints.connection(name))
            .send()
            .await?;
        check_status(resp).await?;
        info!(connection = %name, "Connection deleted");
        Ok(())
    }

    pub async fn test_connection(&self, name: &str) -> Result<TestStatus, UpstairsError> {
        let resp = self
            .send_json(Method::POST, self.endpoints.test_connection(name), &json!({}))
            .await?;
        let status: TestStatus = read_json(resp).await?;
        debug!(connection = %name, status = ?status.0, "Connection tested");
        Ok(status)
    }

    pub async fn synchronize_connection(&self, name: &str) -> Result<(), UpstairsError> {
        self.send_json(
            Method::POST,
            self.endpoints.synchronize_connection(name),
            &json!({}),
        )
        .await?;
        info!(connection = %name, "Connection synchronized");
        Ok(())
    }

    /// Known database platforms, ordered by platform name.
    pub async fn list_platforms(&self) -> Result<Vec<(String, DatabasePlatform)>, UpstairsError> {
        let platforms: BTreeMap<String, DatabasePlatform> =
            self.get_json(self.endpoints.platforms()).await?;
        Ok(platforms.into_iter().collect())
    }

    pub async fn list_tables(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<TableSummary>, UpstairsError> {
        self.get_json(self.endpoints.tables(database, schema)).await
    }

    pub async fn get_table(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Result<TableInfo, UpstairsError> {
        self.get_json(self.endpoints.table(database, schema, table))
            .await
    }

    pub async fn save_table(
        &self,
        database: &str,
        schema: &str,
        table: &TableDetails,
    ) -> Result<(), UpstairsError> {
        let url = self.endpoints.table(database, schema, &table.table_name);
        self.send_json(Method::PUT, url, table).await?;
        info!(database, schema, table = %table.table_name, "Table saved");
        Ok(())
    }

    pub async fn save_column(
        &self,
        database: &str,
        schema: &str,
        table: &str,
        update: &ColumnUpdate,
    ) -> Result<(), UpstairsError> {
        let url = self
            .endpoints
            .column(database, schema, table, &update.column.column_name);
        self.send_json(Method::PUT, url, update).await?;
        info!(
            database,
            schema,
            table,
            column = %update.column.column_name,
            "Column saved"
        );
        Ok(())
    }

    pub async fn column_annotations(
        &self,
        database: &str,
        schema: &str,
        table: &str,
        column: &str,
        java_type: &str,
    ) -> Result<AnnotationsDescriptor, UpstairsError> {
        let url = self
            .endpoints
            .column_annotations(database, schema, table, column, java_type);
        self.get_json(url).await
    }

    pub async fn get_settings(&self) -> Result<Settings, UpstairsError> {
        self.get_json(self.endpoints.settings()).await
    }

    pub async fn save_settings(&self, settings: &SettingsUpdate) -> Result<(), UpstairsError> {
        self.send_json(Method::PUT, self.endpoints.settings(), settings)
            .await?;
        info!("Settings saved");
        Ok(())
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, UpstairsError>
    where
        T: DeserializeOwned,
    {
        let op = || {
            let request = self.request(Method::GET, url.clone());
            async move {
                let resp = request.send().await?;
                read_json(resp).await
            }
        };

        op.retry(self.retry_policy)
            .when(|err: &UpstairsError| err.is_retryable())
            .notify(|err, dur: Duration| {
                warn!(url = %url, "Upstairs GET retrying after error {} in {:?}", err, dur);
            })
            .await
    }

    async fn send_json<B>(&self, method: Method, url: Url, body: &B) -> Result<Response, UpstairsError>
    where
        B: Serialize,
    {
        with_pretty_json_debug(body, |json| {
            debug!(%method, url = %url, body = json, "Upstairs request body");
        });
        let resp = self.request(method, url).json(body).send().await?;
        check_status(resp).await
    }
}

#[async_trait]
impl MetadataProvider for UpstairsClient {
    async fn list_schemas(&self, database_id: &str) -> Result<Vec<SchemaSelection>, MetadataError> {
        let details = self.get_connection(database_id).await?;
        Ok(details.schemas)
    }

    async fn list_tables(
        &self,
        database_id: &str,
        schema: &str,
    ) -> Result<Vec<TableSummary>, MetadataError> {
        Ok(UpstairsClient::list_tables(self, database_id, schema).await?)
    }
}

fn build_client(cfg: &BackendConfig) -> Result<reqwest::Client, UpstairsError> {
    let mut headers = HeaderMap::new();

    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.timeout());

    if let Some(proxy_url) = &cfg.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if cfg.enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    Ok(builder.default_headers(headers).build()?)
}

async fn check_status(resp: Response) -> Result<Response, UpstairsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = match resp.bytes().await {
        Ok(bytes) => {
            let raw_body = String::from_utf8_lossy(&bytes);
            format!("{:.len$}", raw_body, len = UPSTREAM_BODY_PREVIEW_CHARS)
        }
        Err(e) => format!("<failed to read body: {e}>"),
    };

    debug!(%status, body = %body, "Upstairs backend returned error status");
    Err(UpstairsError::UpstreamStatus { status, body })
}

async fn read_json<T>(resp: Response) -> Result<T, UpstairsError>
where
    T: DeserializeOwned,
{
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_optional_and_root_is_validated() {
        let basic = BasicConfig {
            api_token: Some("secret".to_string()),
            ..BasicConfig::default()
        };
        let client =
            UpstairsClient::new(&basic, &BackendConfig::default()).expect("client builds");
        assert_eq!(client.api_token.as_deref(), Some("secret"));
        assert_eq!(
            client.endpoints().base().as_str(),
            "http://localhost:8080/api/portofino-upstairs"
        );

        let basic = BasicConfig {
            api_root: Url::parse("data:text/plain,hello").expect("valid url"),
            ..BasicConfig::default()
        };
        assert!(matches!(
            UpstairsClient::new(&basic, &BackendConfig::default()),
            Err(UpstairsError::InvalidApiRoot(_))
        ));
    }

    #[test]
    fn multiplexing_client_builds_with_proxy() {
        let backend = BackendConfig {
            proxy: Some(Url::parse("http://127.0.0.1:1080").expect("valid url")),
            enable_multiplexing: true,
            ..BackendConfig::default()
        };
        assert!(build_client(&backend).is_ok());
    }
}
