//! Authenticated JSON access to a forge API.
//!
//! [`ApiClient::get_from_api`] is the only way the tally engine talks to a
//! platform. It always returns an [`ApiOutcome`]: failures are reported
//! through the progress callback and `tracing`, then handed back as
//! [`ApiOutcome::Failed`] instead of being propagated.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use url::Url;

use crate::aggregate::{ProgressCallback, TallyProgress, emit};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpRequest, HttpTransport, header_set};
use crate::platform::{self, ApiError, ApiRateLimiter, short_error_message};
use crate::retry::{RetryConfig, RetryingTransport};
use crate::settings::Settings;

/// Result of one API call.
///
/// Distinguishes a legitimately empty answer from a failed one, so "zero
/// items" (`Data([])`) never looks like an error and vice versa.
#[derive(Debug)]
pub enum ApiOutcome<T> {
    /// The server answered 2xx with a body.
    Data(T),
    /// The server answered 2xx with no body or a JSON `null`.
    Empty,
    /// The call failed; the failure has already been reported.
    Failed(ApiError),
}

impl<T> ApiOutcome<T> {
    /// Extract data, treating `Empty` and `Failed` alike.
    pub fn into_data(self) -> Option<T> {
        match self {
            ApiOutcome::Data(data) => Some(data),
            ApiOutcome::Empty | ApiOutcome::Failed(_) => None,
        }
    }

    /// The failure, if the call failed.
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ApiOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-call overrides, applied after the client's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Headers that replace same-named defaults (case-insensitive).
    pub headers: HttpHeaders,
    /// Timeout for this call only.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Add or replace a header override.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        header_set(&mut self.headers, name, value);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Authenticated client for one forge account.
///
/// Cheap to clone; clones share the transport and the rate limiter.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    username: String,
    token: String,
    timeout: Option<Duration>,
    rate_limiter: Option<ApiRateLimiter>,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl ApiClient {
    /// Create a client over the real network transport.
    ///
    /// The transport retries transient failures `settings.max_retries` times
    /// and requests are paced at `settings.requests_per_second`.
    pub fn new(settings: &Settings) -> platform::Result<Self> {
        let timeout = Duration::from_secs(settings.request_timeout_secs.max(1));
        let transport = ReqwestTransport::with_timeout(timeout)?;
        let retry = RetryConfig {
            max_retries: usize::try_from(settings.max_retries).unwrap_or(usize::MAX),
            ..RetryConfig::default()
        };
        let transport = RetryingTransport::new(Arc::new(transport), retry);

        Ok(Self::new_with_transport(settings, Arc::new(transport))
            .with_rate_limiter(ApiRateLimiter::from_setting(settings.requests_per_second)))
    }

    /// Create a client over an arbitrary transport, without pacing.
    pub fn new_with_transport(settings: &Settings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            username: settings.username.clone(),
            token: settings.access_token.clone(),
            timeout: None,
            rate_limiter: None,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Option<ApiRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Default per-request timeout, applied unless a call overrides it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Report request failures through `on_progress`.
    #[must_use]
    pub fn with_progress(mut self, on_progress: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    fn default_headers(&self) -> HttpHeaders {
        let credentials = STANDARD.encode(format!("{}:{}", self.username, self.token));
        vec![
            ("Authorization".to_string(), format!("Basic {credentials}")),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
    }

    /// GET `endpoint` with `params` as the query string.
    ///
    /// Never fails: every problem ends up as [`ApiOutcome::Failed`] after it
    /// has been reported.
    pub async fn get_from_api(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        options: &RequestOptions,
    ) -> ApiOutcome<Value> {
        let url = match Url::parse_with_params(endpoint, params) {
            Ok(url) => url,
            Err(e) => return self.fail(endpoint, ApiError::from(e)),
        };

        let mut headers = self.default_headers();
        for (name, value) in &options.headers {
            header_set(&mut headers, name, value.clone());
        }

        let request = HttpRequest {
            url: url.to_string(),
            headers,
            timeout: options.timeout.or(self.timeout),
        };

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        tracing::debug!("GET {}", request.url);
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => return self.fail(url.as_str(), ApiError::from(e)),
        };

        if !response.is_success() {
            let payload = serde_json::from_slice::<Value>(&response.body).ok();
            let message = payload
                .as_ref()
                .and_then(|p| p.get("message").or_else(|| p.get("error")))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| String::from_utf8_lossy(&response.body).trim().to_string());
            return self.fail(
                url.as_str(),
                ApiError::Status {
                    status: response.status,
                    message,
                    payload,
                },
            );
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            emit(
                self.on_progress.as_deref(),
                TallyProgress::EmptyResponse {
                    url: url.to_string(),
                },
            );
            return ApiOutcome::Empty;
        }

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Null) => {
                emit(
                    self.on_progress.as_deref(),
                    TallyProgress::EmptyResponse {
                        url: url.to_string(),
                    },
                );
                ApiOutcome::Empty
            }
            Ok(value) => ApiOutcome::Data(value),
            Err(e) => self.fail(url.as_str(), ApiError::from(e)),
        }
    }

    fn fail<T>(&self, url: &str, error: ApiError) -> ApiOutcome<T> {
        tracing::debug!("GET {} failed: {}", url, error);
        emit(
            self.on_progress.as_deref(),
            TallyProgress::RequestFailed {
                url: url.to_string(),
                status: error.status(),
                error: short_error_message(&error),
                payload: error.payload().cloned(),
            },
        );
        ApiOutcome::Failed(error)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::http::{HttpResponse, MockTransport, header_get};

    const URL: &str = "https://forge.test/api/repos";

    fn settings() -> Settings {
        Settings {
            username: "octocat".to_string(),
            access_token: "secret".to_string(),
            ..Settings::default()
        }
    }

    fn client(mock: &MockTransport) -> ApiClient {
        ApiClient::new_with_transport(&settings(), Arc::new(mock.clone()))
    }

    fn raw(status: u16, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_vec(),
        }
    }

    fn capture() -> (Arc<ProgressCallback>, Arc<Mutex<Vec<TallyProgress>>>) {
        let events: Arc<Mutex<Vec<TallyProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        });
        (Arc::new(callback), events)
    }

    #[tokio::test]
    async fn test_sends_basic_auth_json_headers_and_query() {
        let mock = MockTransport::new();
        mock.push_json(format!("{URL}?page=1&per_page=100"), &json!([{"id": 1}]));

        let params = vec![
            ("page".to_string(), "1".to_string()),
            ("per_page".to_string(), "100".to_string()),
        ];
        let outcome = client(&mock)
            .get_from_api(URL, &params, &RequestOptions::default())
            .await;

        assert_eq!(outcome.into_data(), Some(json!([{"id": 1}])));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;
        // base64("octocat:secret")
        assert_eq!(
            header_get(headers, "authorization"),
            Some("Basic b2N0b2NhdDpzZWNyZXQ=")
        );
        assert_eq!(header_get(headers, "content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_caller_overrides_win_over_defaults() {
        let mock = MockTransport::new();
        mock.push_json(URL, &json!({}));

        let options = RequestOptions::default()
            .header("authorization", "Bearer abc")
            .header("Accept", "application/vnd.github+json")
            .timeout(Duration::from_secs(3));
        let _ = client(&mock).get_from_api(URL, &[], &options).await;

        let request = &mock.requests()[0];
        assert_eq!(header_get(&request.headers, "Authorization"), Some("Bearer abc"));
        assert_eq!(
            header_get(&request.headers, "accept"),
            Some("application/vnd.github+json")
        );
        assert_eq!(
            request
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
                .count(),
            1
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_client_timeout_applies_when_not_overridden() {
        let mock = MockTransport::new();
        mock.push_json(URL, &json!([]));

        let client = client(&mock).with_timeout(Duration::from_secs(9));
        let _ = client.get_from_api(URL, &[], &RequestOptions::default()).await;

        assert_eq!(mock.requests()[0].timeout, Some(Duration::from_secs(9)));
    }

    #[tokio::test]
    async fn test_empty_body_and_null_are_empty_not_data() {
        let mock = MockTransport::new();
        mock.push_response(URL, raw(200, b""));
        mock.push_response(URL, raw(200, b"null"));
        mock.push_response(URL, raw(200, b"[]"));
        let client = client(&mock);
        let opts = RequestOptions::default();

        assert!(matches!(client.get_from_api(URL, &[], &opts).await, ApiOutcome::Empty));
        assert!(matches!(client.get_from_api(URL, &[], &opts).await, ApiOutcome::Empty));
        match client.get_from_api(URL, &[], &opts).await {
            ApiOutcome::Data(value) => assert_eq!(value, json!([])),
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_reported_with_payload() {
        let mock = MockTransport::new();
        mock.push_response(
            URL,
            raw(401, br#"{"message":"Bad credentials","documentation_url":"x"}"#),
        );
        let (callback, events) = capture();

        let outcome = client(&mock)
            .with_progress(callback)
            .get_from_api(URL, &[], &RequestOptions::default())
            .await;

        let err = outcome.error().expect("should fail");
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("Bad credentials"));

        let events = events.lock().unwrap_or_else(|e| e.into_inner());
        match events.as_slice() {
            [TallyProgress::RequestFailed {
                status, payload, ..
            }] => {
                assert_eq!(*status, Some(401));
                assert_eq!(payload.as_ref().map(|p| p["documentation_url"].clone()), Some(json!("x")));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_becomes_message() {
        let mock = MockTransport::new();
        mock.push_response(URL, raw(502, b"Bad Gateway\n"));

        let outcome = client(&mock)
            .get_from_api(URL, &[], &RequestOptions::default())
            .await;

        match outcome {
            ApiOutcome::Failed(ApiError::Status {
                status,
                message,
                payload,
            }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
                assert!(payload.is_none());
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_errors_become_failed() {
        let mock = MockTransport::new();
        mock.push_error(URL, "connection refused");

        let outcome = client(&mock)
            .get_from_api(URL, &[], &RequestOptions::default())
            .await;

        assert!(matches!(outcome, ApiOutcome::Failed(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn test_malformed_json_becomes_failed() {
        let mock = MockTransport::new();
        mock.push_response(URL, raw(200, b"{not json"));

        let outcome = client(&mock)
            .get_from_api(URL, &[], &RequestOptions::default())
            .await;

        assert!(matches!(outcome, ApiOutcome::Failed(ApiError::Json(_))));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_becomes_failed_without_a_request() {
        let mock = MockTransport::new();

        let outcome = client(&mock)
            .get_from_api("not a url", &[], &RequestOptions::default())
            .await;

        assert!(matches!(outcome, ApiOutcome::Failed(ApiError::InvalidUrl(_))));
        assert!(mock.requests().is_empty());
    }
}
