use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{BACKEND_REQUEST_DURATION, BACKEND_REQUEST_ERRORS, BACKEND_REQUESTS};
use crate::types::{
    ChatRequest, ChatResponse, EndSessionResponse, ReviewSummary, Role, SessionRequest,
    StartResponse,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The conversational backend, seen from the client.
///
/// Every method is a single attempt; retries are the caller's business.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /start?role=<role>`: opens (or reopens) the thread for `role`.
    async fn start(&self, role: &Role) -> Result<StartResponse>;

    /// `POST /chat`: sends one user turn.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// `POST /end_session`: releases a thread.
    async fn end_session(&self, request: &SessionRequest) -> Result<EndSessionResponse>;

    /// `POST /review_session`: asks for an HTML summary of a thread.
    async fn review_session(&self, request: &SessionRequest) -> Result<ReviewSummary>;
}

#[async_trait::async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for Arc<B> {
    async fn start(&self, role: &Role) -> Result<StartResponse> {
        (**self).start(role).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        (**self).chat(request).await
    }

    async fn end_session(&self, request: &SessionRequest) -> Result<EndSessionResponse> {
        (**self).end_session(request).await
    }

    async fn review_session(&self, request: &SessionRequest) -> Result<ReviewSummary> {
        (**self).review_session(request).await
    }
}

/// [`ChatBackend`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a backend rooted at `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(Some(base_url), None)
    }

    /// Create a backend with custom settings.
    ///
    /// `base_url` defaults to `http://127.0.0.1:5000/`.  Endpoints are resolved relative to it,
    /// so a base of `https://host/game` posts to `https://host/game/chat`.
    pub fn with_options(base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.unwrap_or(DEFAULT_BASE_URL))?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The URL endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Sends a request and decodes a JSON success body, recording metrics.
    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        BACKEND_REQUESTS.click();
        let started = Instant::now();
        let result = self.execute_inner(request).await;
        BACKEND_REQUEST_DURATION.add(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            BACKEND_REQUEST_ERRORS.click();
            tracing::debug!(endpoint, error = %err, "backend request failed");
        }
        result
    }

    async fn execute_inner<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Convert a non-success response into an error.
    ///
    /// A JSON body carrying `error` is the backend explaining itself and becomes
    /// [`Error::Backend`]; anything else is reported with its status code.
    async fn process_error_response(response: Response) -> Error {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.error)
        {
            Some(message) => Error::backend(message),
            None if body.trim().is_empty() => Error::api(status_code, "empty response body"),
            None => Error::api(status_code, body),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpBackend {
    async fn start(&self, role: &Role) -> Result<StartResponse> {
        let url = self.endpoint("start")?;
        let request = self.client.get(url).query(&[("role", role.as_str())]);
        self.execute("start", request).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint("chat")?;
        let request = self.client.post(url).json(request);
        self.execute("chat", request).await
    }

    async fn end_session(&self, request: &SessionRequest) -> Result<EndSessionResponse> {
        let url = self.endpoint("end_session")?;
        let request = self.client.post(url).json(request);
        self.execute("end_session", request).await
    }

    async fn review_session(&self, request: &SessionRequest) -> Result<ReviewSummary> {
        let url = self.endpoint("review_session")?;
        let request = self.client.post(url).json(request);
        self.execute("review_session", request).await
    }
}

/// Create and return default headers for backend requests.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(concat!("rolechat/", env!("CARGO_PKG_VERSION"))),
    );
    headers
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())?;
    if url.cannot_be_a_base() {
        return Err(Error::url(
            format!("base URL cannot have endpoints: {base_url}"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
