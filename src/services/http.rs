// src/services/http.rs

//! HTTP(S) retrieval.
//!
//! One GET per attempt, no retries. Request options are applied in order and
//! the first one that rejects its input aborts the fetch before any network
//! I/O happens.

use reqwest::header::{ACCEPT, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::models::{CorrelationId, FetchAttempt, FetchConfig};
use crate::utils::http::{classify_error, create_client};

/// A single customization of an outgoing request.
#[derive(Clone)]
pub enum FetchOption {
    /// `accept` header; the value must contain a `/`
    Accept(String),
    BasicAuth {
        user: String,
        password: Option<String>,
    },
    Header {
        name: String,
        value: String,
    },
    UserAgent(String),
    /// `x-<app_name>-request-id: <id>`
    Correlation {
        id: CorrelationId,
        app_name: String,
    },
}

impl std::fmt::Debug for FetchOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOption::Accept(v) => f.debug_tuple("Accept").field(v).finish(),
            FetchOption::BasicAuth { user, .. } => f
                .debug_struct("BasicAuth")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            FetchOption::Header { name, value } => f
                .debug_struct("Header")
                .field("name", name)
                .field("value", value)
                .finish(),
            FetchOption::UserAgent(v) => f.debug_tuple("UserAgent").field(v).finish(),
            FetchOption::Correlation { id, app_name } => f
                .debug_struct("Correlation")
                .field("id", id)
                .field("app_name", app_name)
                .finish(),
        }
    }
}

impl FetchOption {
    /// Apply this option to a request under construction.
    pub fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder, FetchError> {
        match self {
            FetchOption::Accept(value) => {
                if !value.contains('/') {
                    return Err(FetchError::request_config(format!(
                        "accept value {value:?} doesn't contain /"
                    )));
                }
                log::debug!("Option accept={}", value);
                Ok(builder.header(ACCEPT, header_value(value)?))
            }
            FetchOption::BasicAuth { user, password } => {
                log::debug!("Option basic auth user={} pass=<redacted>", user);
                Ok(builder.basic_auth(user, password.as_deref()))
            }
            FetchOption::Header { name, value } => {
                let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    FetchError::request_config(format!("invalid header name {name:?}: {e}"))
                })?;
                log::debug!("Option header {}={}", header, value);
                Ok(builder.header(header, header_value(value)?))
            }
            FetchOption::UserAgent(value) => {
                log::debug!("Option user-agent={}", value);
                Ok(builder.header(USER_AGENT, header_value(value)?))
            }
            FetchOption::Correlation { id, app_name } => {
                let name = CorrelationId::header_name(app_name);
                let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    FetchError::request_config(format!("invalid correlation header {name:?}: {e}"))
                })?;
                log::debug!("Option request-id={} header-used={}", id, header);
                Ok(builder.header(header, header_value(&id.to_string())?))
            }
        }
    }

    /// Caller-supplied options from configuration, in application order.
    pub fn from_config(config: &FetchConfig) -> Vec<FetchOption> {
        let mut options = Vec::new();
        if let Some(accept) = &config.accept {
            options.push(FetchOption::Accept(accept.clone()));
        }
        if let Some(auth) = &config.basic_auth {
            options.push(FetchOption::BasicAuth {
                user: auth.user.clone(),
                password: auth.password.clone(),
            });
        }
        options.extend(config.headers.iter().map(|h| FetchOption::Header {
            name: h.name.clone(),
            value: h.value.clone(),
        }));
        options
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::request_config(format!("invalid header value {value:?}: {e}")))
}

/// Bounded-redirect, timeout-bounded HTTP fetcher.
pub struct HttpFetcher {
    client: Client,
    app_name: String,
    options: Vec<FetchOption>,
}

impl HttpFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: &FetchConfig, app_name: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self::with_options(
            create_client(config)?,
            app_name,
            FetchOption::from_config(config),
        ))
    }

    /// Build a fetcher around an existing client.
    pub fn with_options(
        client: Client,
        app_name: impl Into<String>,
        options: Vec<FetchOption>,
    ) -> Self {
        Self {
            client,
            app_name: app_name.into(),
            options,
        }
    }

    /// Build the GET request for an attempt.
    ///
    /// Caller options come first, then user agent and correlation header.
    pub fn build_request(&self, attempt: &FetchAttempt) -> Result<reqwest::Request, FetchError> {
        let url = attempt.source.as_str();
        let mut builder = self.client.get(url);

        let identity = [
            FetchOption::UserAgent(self.app_name.clone()),
            FetchOption::Correlation {
                id: attempt.id,
                app_name: self.app_name.clone(),
            },
        ];
        for option in self.options.iter().chain(identity.iter()) {
            builder = option.apply(builder).inspect_err(|e| {
                log::error!("[{}] Option {:?} failed for GET {}: {}", attempt.id, option, url, e);
            })?;
        }

        builder.build().map_err(|e| {
            log::error!("[{}] Request creation failed for GET {}: {}", attempt.id, url, e);
            FetchError::request_config(e)
        })
    }

    /// Retrieve the full body of `attempt.source`.
    ///
    /// Returns [`FetchError::Cancelled`] if `cancel` fires before the body has
    /// been read.
    pub async fn fetch(
        &self,
        attempt: &FetchAttempt,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let request = self.build_request(attempt)?;
        let method = request.method().clone();
        let url = request.url().clone();
        log::debug!("[{}] Request created: {} {}", attempt.id, method, url);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = self.client.execute(request) => result,
        }
        .map_err(|e| {
            log::error!("[{}] Request {} {} failed: {}", attempt.id, method, url, e);
            classify_error(e)
        })?;

        log_response(attempt, &response);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = response.bytes() => result,
        }
        .map_err(|e| {
            log::error!("[{}] Reading body of {} {} failed: {}", attempt.id, method, url, e);
            classify_error(e)
        })?;

        Ok(body.to_vec())
    }
}

fn log_response(attempt: &FetchAttempt, response: &Response) {
    let status = response.status();
    let content_length = response
        .content_length()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    log::debug!(
        "[{}] Received response: status={} content_length={} url={} headers={:?}",
        attempt.id,
        status,
        content_length,
        response.url(),
        response.headers()
    );
    if !status.is_success() {
        log::warn!(
            "[{}] Non-success status {} from {}, keeping body",
            attempt.id,
            status,
            response.url()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BasicAuth, HeaderEntry, SourceDescriptor};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn attempt(url: &str) -> FetchAttempt {
        FetchAttempt::begin(SourceDescriptor::parse(url).unwrap()).unwrap()
    }

    fn fetcher(options: Vec<FetchOption>) -> HttpFetcher {
        let config = FetchConfig::default();
        HttpFetcher::with_options(create_client(&config).unwrap(), "collector", options)
    }

    async fn redirect(server: &MockServer, from: &str, to: &str) {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}{}", server.uri(), to)),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_request_carries_identity_headers() {
        let attempt = attempt("https://example.com/feed.json");
        let request = fetcher(Vec::new()).build_request(&attempt).unwrap();

        assert_eq!(request.headers()[USER_AGENT], "collector");
        assert_eq!(
            request.headers()["x-collector-request-id"],
            attempt.id.to_string().as_str()
        );
    }

    #[test]
    fn test_options_from_config_in_order() {
        let config = FetchConfig {
            accept: Some("application/json".into()),
            basic_auth: Some(BasicAuth {
                user: "alice".into(),
                password: Some("secret".into()),
            }),
            headers: vec![HeaderEntry {
                name: "x-extra".into(),
                value: "1".into(),
            }],
            ..FetchConfig::default()
        };
        let options = FetchOption::from_config(&config);
        assert!(matches!(options[0], FetchOption::Accept(_)));
        assert!(matches!(options[1], FetchOption::BasicAuth { .. }));
        assert!(matches!(options[2], FetchOption::Header { .. }));

        let request = fetcher(options)
            .build_request(&attempt("https://example.com/"))
            .unwrap();
        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert_eq!(request.headers()["x-extra"], "1");
        assert!(request.headers().contains_key(reqwest::header::AUTHORIZATION));
    }

    #[test]
    fn test_invalid_accept_aborts_before_io() {
        let err = fetcher(vec![FetchOption::Accept("json".into())])
            .build_request(&attempt("https://example.com/"))
            .unwrap_err();
        assert!(matches!(err, FetchError::RequestConfiguration(_)));
    }

    #[test]
    fn test_invalid_app_name_is_configuration_error() {
        let config = FetchConfig::default();
        let client = create_client(&config).unwrap();
        let fetcher = HttpFetcher::with_options(client, "bad app", Vec::new());
        let err = fetcher
            .build_request(&attempt("https://example.com/"))
            .unwrap_err();
        assert!(matches!(err, FetchError::RequestConfiguration(_)));
    }

    #[tokio::test]
    async fn test_first_failing_option_stops_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let options = vec![
            FetchOption::Header {
                name: "bad header".into(),
                value: "x".into(),
            },
            FetchOption::Accept("text/plain".into()),
        ];
        let err = fetcher(options)
            .fetch(&attempt(&server.uri()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::RequestConfiguration(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_headers_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .and(header("user-agent", "collector"))
            .and(header_exists("x-collector-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher(Vec::new())
            .fetch(
                &attempt(&format!("{}/feed.json", server.uri())),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(body, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_single_redirect_then_ok_succeeds() {
        let server = MockServer::start().await;
        redirect(&server, "/a", "/b").await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(&server)
            .await;

        let body = fetcher(Vec::new())
            .fetch(
                &attempt(&format!("{}/a", server.uri())),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(body, b"done");
    }

    #[tokio::test]
    async fn test_redirect_beyond_cap_fails() {
        let server = MockServer::start().await;
        redirect(&server, "/a", "/b").await;
        redirect(&server, "/b", "/c").await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = fetcher(Vec::new())
            .fetch(
                &attempt(&format!("{}/a", server.uri())),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            FetchError::TooManyRedirects { destination, hops } => {
                assert_eq!(hops, 2);
                assert!(destination.ends_with("/c"));
            }
            other => panic!("expected TooManyRedirects, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_still_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let body = fetcher(Vec::new())
            .fetch(&attempt(&server.uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, b"maintenance");
    }

    #[tokio::test]
    async fn test_cancelled_fetch_unwinds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(30)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetcher(Vec::new())
            .fetch(&attempt(&server.uri()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }
}
