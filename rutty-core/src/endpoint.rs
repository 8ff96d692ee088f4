//! Well-known endpoints derived from the server origin.
//!
//! The socket lives at `/ws` on the origin's host with the scheme upgraded
//! to its WebSocket equivalent; the client configuration at `/config`.

use url::Url;

use crate::error::RuttyError;

pub const SOCKET_PATH: &str = "/ws";
pub const CONFIG_PATH: &str = "/config";

/// The server origin, e.g. `http://127.0.0.1:3000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin(Url);

impl Origin {
    /// Parse an origin. Only `http` and `https` are accepted; any path,
    /// query or fragment is discarded.
    pub fn parse(origin: &str) -> Result<Self, RuttyError> {
        let mut url = Url::parse(origin)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RuttyError::Endpoint(format!(
                "unsupported scheme {:?} in {origin}",
                url.scheme()
            )));
        }
        if url.host().is_none() {
            return Err(RuttyError::Endpoint(format!("missing host in {origin}")));
        }
        url.set_path("");
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self(url))
    }

    /// `ws(s)://host[:port]/ws`.
    pub fn socket_endpoint(&self) -> Url {
        let mut url = self.0.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // http(s) -> ws(s) stays within the "special" schemes, so this
        // cannot fail.
        let _ = url.set_scheme(scheme);
        url.set_path(SOCKET_PATH);
        url
    }

    /// `http(s)://host[:port]/config`.
    pub fn config_endpoint(&self) -> Url {
        let mut url = self.0.clone();
        url.set_path(CONFIG_PATH);
        url
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str().trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_upgrades_to_ws() {
        let origin = Origin::parse("http://localhost:3000").unwrap();
        assert_eq!(origin.socket_endpoint().as_str(), "ws://localhost:3000/ws");
        assert_eq!(origin.config_endpoint().as_str(), "http://localhost:3000/config");
    }

    #[test]
    fn https_upgrades_to_wss() {
        let origin = Origin::parse("https://term.example.com/some/page?x=1#top").unwrap();
        assert_eq!(origin.socket_endpoint().as_str(), "wss://term.example.com/ws");
        assert_eq!(
            origin.config_endpoint().as_str(),
            "https://term.example.com/config"
        );
        assert_eq!(origin.to_string(), "https://term.example.com");
    }

    #[test]
    fn rejects_non_http_origins() {
        assert!(Origin::parse("ftp://example.com").is_err());
        assert!(Origin::parse("not a url").is_err());
    }
}
