//! Server-delivered client configuration.
//!
//! The server answers `GET /config` with a small JSON object:
//!
//! ```json
//! { "title": "RuTTY Server", "reconnect": 5 }
//! ```
//!
//! Both fields are optional. A missing or negative `reconnect` disables
//! automatic reconnection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::endpoint::Origin;
use crate::error::ConfigError;

/// Settings fetched once per session activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Title for the hosting window.
    #[serde(default)]
    pub title: Option<String>,

    /// Automatic reconnection delay in seconds.
    #[serde(default, rename = "reconnect")]
    pub reconnect_seconds: Option<i64>,
}

impl Configuration {
    /// The reconnection delay, if reconnection is enabled.
    pub fn reconnect_interval(&self) -> Option<u64> {
        self.reconnect_seconds.and_then(|s| u64::try_from(s).ok())
    }
}

/// Where configuration comes from.
#[async_trait]
pub trait ConfigSource: Send + Sync + 'static {
    async fn fetch(&self) -> Result<Configuration, ConfigError>;
}

/// Fetches configuration over HTTP from `<origin>/config`.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpConfigSource {
    pub fn new(origin: &Origin) -> Self {
        Self::with_client(origin, reqwest::Client::new())
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, TLS roots).
    pub fn with_client(origin: &Origin, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: origin.config_endpoint(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<Configuration, ConfigError> {
        let body = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// A fixed configuration, for hosts that have no server-side settings.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource(pub Configuration);

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self) -> Result<Configuration, ConfigError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_object() {
        let config: Configuration =
            serde_json::from_str(r#"{"title":"RuTTY Server","reconnect":5}"#).unwrap();
        assert_eq!(config.title.as_deref(), Some("RuTTY Server"));
        assert_eq!(config.reconnect_interval(), Some(5));
    }

    #[test]
    fn missing_fields_disable_reconnect() {
        let config: Configuration = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.reconnect_interval(), None);

        let config: Configuration = serde_json::from_str(r#"{"reconnect":null}"#).unwrap();
        assert_eq!(config.reconnect_interval(), None);
    }

    #[test]
    fn negative_reconnect_disables() {
        let config: Configuration = serde_json::from_str(r#"{"reconnect":-1}"#).unwrap();
        assert_eq!(config.reconnect_seconds, Some(-1));
        assert_eq!(config.reconnect_interval(), None);
    }

    #[test]
    fn rejects_non_object() {
        assert!(serde_json::from_str::<Configuration>("42").is_err());
    }

    #[tokio::test]
    async fn static_source_returns_its_config() {
        let source = StaticConfigSource(Configuration {
            title: Some("t".into()),
            reconnect_seconds: Some(0),
        });
        let config = source.fetch().await.unwrap();
        assert_eq!(config.reconnect_interval(), Some(0));
    }

    #[test]
    fn http_source_targets_config_path() {
        let origin = Origin::parse("http://127.0.0.1:3000").unwrap();
        let source = HttpConfigSource::new(&origin);
        assert_eq!(source.endpoint().as_str(), "http://127.0.0.1:3000/config");
    }

    /// Answer one HTTP request with `body` and return the origin to query.
    async fn serve_once(body: &'static str) -> Origin {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = tcp.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            tcp.write_all(response.as_bytes()).await.unwrap();
        });
        Origin::parse(&format!("http://{addr}")).unwrap()
    }

    fn direct_source(origin: &Origin) -> HttpConfigSource {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpConfigSource::with_client(origin, client)
    }

    #[tokio::test]
    async fn http_source_fetches_config() {
        let origin = serve_once(r#"{"title":"RuTTY Server","reconnect":3}"#).await;
        let config = direct_source(&origin).fetch().await.unwrap();
        assert_eq!(config.title.as_deref(), Some("RuTTY Server"));
        assert_eq!(config.reconnect_interval(), Some(3));
    }

    #[tokio::test]
    async fn http_source_rejects_invalid_body() {
        let origin = serve_once("<html>").await;
        let err = direct_source(&origin).fetch().await.unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
