use std::time::Duration;

use reqwest::{
    StatusCode,
    header::{HeaderMap, HeaderValue},
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    HttpStatus,
}

/// Why a single locator couldn't be retrieved
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to fetch {locator}: {source}")]
    Network {
        locator: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{locator} responded with {status}")]
    HttpStatus { locator: String, status: StatusCode },
}

impl FetchError {
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } => FetchErrorKind::Network,
            Self::HttpStatus { .. } => FetchErrorKind::HttpStatus,
        }
    }

    #[must_use]
    pub fn locator(&self) -> &str {
        match self {
            Self::Network { locator, .. } | Self::HttpStatus { locator, .. } => locator,
        }
    }

    /// Whether the request ran out of time
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { source, .. } if source.is_timeout())
    }
}

/// Retrieves playlist text over HTTP with a bounded time per request
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Builds a fetcher whose every request is cut off after `timeout`
    ///
    /// # Errors
    /// Errors when the TLS backend can't be initialized
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, user_agent());

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Performs a single GET and returns the decoded body.
    ///
    /// # Errors
    /// [`FetchError::HttpStatus`] on a non-2xx response, [`FetchError::Network`] on
    /// anything else (bad URL, connection failure, timeout, unreadable body)
    #[instrument(skip(self))]
    pub async fn fetch(&self, locator: &str) -> Result<String, FetchError> {
        let network = |source| FetchError::Network {
            locator: locator.to_string(),
            source,
        };

        let res = self.client.get(locator).send().await.map_err(network)?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                locator: locator.to_string(),
                status,
            });
        }

        let body = res.text().await.map_err(network)?;
        debug!("Fetched {} bytes", body.len());

        Ok(body)
    }
}

fn user_agent() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}/{} (+{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(env!("CARGO_PKG_NAME")))
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header_exists, method, path},
    };

    use super::*;

    #[tokio::test]
    async fn returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.txt"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("http://a/1.ts\n"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        let body = fetcher
            .fetch(&format!("{}/list.txt", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, "http://a/1.ts\n");
    }

    #[tokio::test]
    async fn non_success_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let locator = format!("{}/missing.m3u", server.uri());
        let err = Fetcher::new(DEFAULT_TIMEOUT)
            .unwrap()
            .fetch(&locator)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FetchErrorKind::HttpStatus);
        assert_eq!(err.locator(), locator);
        assert!(matches!(err, FetchError::HttpStatus { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = Fetcher::new(Duration::from_millis(200))
            .unwrap()
            .fetch(&format!("{}/slow.m3u", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FetchErrorKind::Network);
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn invalid_locator_is_a_network_error() {
        let err = Fetcher::new(DEFAULT_TIMEOUT)
            .unwrap()
            .fetch("not a url")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FetchErrorKind::Network);
        assert!(!err.is_timeout());
    }
}
