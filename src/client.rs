// Collaborators the search pipeline talks to: the provider search transport, city
// resolution and link shortening. Each is a trait so the engine can run against fixtures.

use crate::config::EngineConfig;
use crate::model::CityInfo;
use crate::provider::RawProviderPayload;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

// Errors raised by collaborator calls
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Other error: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Provider flight search
#[async_trait]
pub trait FlightTransport: Send + Sync + 'static {
    async fn search(&self, url: &str, body: &Value) -> Result<RawProviderPayload, ApiError>;
}

// Free-text city/airport lookup
#[async_trait]
pub trait CityResolver: Send + Sync + 'static {
    async fn resolve_city(&self, name: &str) -> Result<CityInfo, ApiError>;
}

#[async_trait]
pub trait LinkShortener: Send + Sync + 'static {
    async fn shorten(&self, url: &str) -> Result<String, ApiError>;
}

fn build_http_client(config: &EngineConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|e| ClientError::InitError(e.to_string()))
}

fn map_send_error(error: reqwest::Error, timeout_ms: u64) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout(timeout_ms)
    } else {
        ApiError::NetworkError(error.to_string())
    }
}

// POST a JSON body and return the raw response bytes of a 2xx answer
async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
    timeout_ms: u64,
) -> Result<Bytes, ApiError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| map_send_error(e, timeout_ms))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::ApiResponseError {
            status_code: status.as_u16(),
            message,
        });
    }

    response.bytes().await.map_err(|e| map_send_error(e, timeout_ms))
}

pub struct HttpFlightTransport {
    client: reqwest::Client,
    timeout_ms: u64,
    auth_token: Option<String>,
}

impl HttpFlightTransport {
    pub fn new(config: &EngineConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_http_client(config)?,
            timeout_ms: config.timeout_ms,
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl FlightTransport for HttpFlightTransport {
    async fn search(&self, url: &str, body: &Value) -> Result<RawProviderPayload, ApiError> {
        let mut body = body.clone();
        if let (Some(token), Some(fields)) = (&self.auth_token, body.as_object_mut()) {
            fields.insert("TKN".to_string(), Value::String(token.clone()));
        }

        let bytes = post_json(&self.client, url, &body, self.timeout_ms).await?;
        debug!(bytes = bytes.len(), "provider search response received");

        // An empty 2xx body is an empty result, not a failure
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawProviderPayload::default());
        }
        match serde_json::from_slice::<Value>(&bytes) {
            // the provider reports some failures as a bare JSON string
            Ok(Value::String(message)) => Err(ApiError::InvalidResponse(message)),
            Ok(_) => RawProviderPayload::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string())),
            Err(e) => Err(ApiError::InvalidResponse(e.to_string())),
        }
    }
}

pub struct HttpCityResolver {
    client: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

impl HttpCityResolver {
    pub fn new(config: &EngineConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_http_client(config)?,
            url: config.endpoints.autosuggest_url.clone(),
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl CityResolver for HttpCityResolver {
    async fn resolve_city(&self, name: &str) -> Result<CityInfo, ApiError> {
        let term = name.trim();
        if term.is_empty() {
            return Err(ApiError::ClientError("empty city name".to_string()));
        }
        let body = json!({ "Prefix": term, "Search": term });
        let bytes = post_json(&self.client, &self.url, &body, self.timeout_ms).await?;
        let suggestions: Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        suggestions
            .as_array()
            .and_then(|items| items.first())
            .and_then(parse_city_suggestion)
            .ok_or_else(|| ApiError::InvalidResponse(format!("no usable suggestion for {:?}", term)))
    }
}

// One autosuggest entry: {"City": "Jaipur(JAI)", "CityName": "Jaipur", "Country": "India"}
pub fn parse_city_suggestion(suggestion: &Value) -> Option<CityInfo> {
    let text = |key: &str| {
        suggestion
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let city = text("City").or_else(|| text("CityName"))?;
    let (code, name) = match (city.find('('), city.find(')')) {
        (Some(open), Some(close)) if open < close => {
            (city[open + 1..close].trim(), city[..open].trim())
        }
        _ => (city, ""),
    };
    if code.is_empty() {
        return None;
    }
    let display_name = Some(name)
        .filter(|n| !n.is_empty())
        .or_else(|| text("CityName"))
        .unwrap_or(code);

    Some(CityInfo {
        code: code.to_string(),
        country: text("Country").unwrap_or_default().to_string(),
        display_name: display_name.to_string(),
    })
}

pub struct HttpLinkShortener {
    client: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

impl HttpLinkShortener {
    pub fn new(config: &EngineConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_http_client(config)?,
            url: config.endpoints.short_link_url.clone(),
            timeout_ms: config.timeout_ms,
        })
    }
}

#[async_trait]
impl LinkShortener for HttpLinkShortener {
    async fn shorten(&self, url: &str) -> Result<String, ApiError> {
        let body = json!([{ "deepLink": url, "productType": "flight" }]);
        let bytes = post_json(&self.client, &self.url, &body, self.timeout_ms).await?;
        let reply: Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        parse_short_link(&reply)
            .ok_or_else(|| ApiError::InvalidResponse("short-link response had no deepLink".to_string()))
    }
}

// `[{"deepLink": "..."}]` or `{"deepLink": "..."}`
pub fn parse_short_link(reply: &Value) -> Option<String> {
    let entry = match reply {
        Value::Array(items) => items.first()?,
        other => other,
    };
    entry
        .get("deepLink")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
}

// Offline collaborators for replaying captured payloads

pub struct FixtureTransport {
    payload: RawProviderPayload,
}

impl FixtureTransport {
    pub fn new(payload: RawProviderPayload) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl FlightTransport for FixtureTransport {
    async fn search(&self, _url: &str, _body: &Value) -> Result<RawProviderPayload, ApiError> {
        Ok(self.payload.clone())
    }
}

// Resolves every name to itself, with no country
pub struct EchoCityResolver;

#[async_trait]
impl CityResolver for EchoCityResolver {
    async fn resolve_city(&self, name: &str) -> Result<CityInfo, ApiError> {
        Ok(CityInfo::echo(name))
    }
}

pub struct IdentityShortener;

#[async_trait]
impl LinkShortener for IdentityShortener {
    async fn shorten(&self, url: &str) -> Result<String, ApiError> {
        Ok(url.to_string())
    }
}

// Mock collaborators for testing
#[cfg(test)]
pub mod mock_collaborators {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    pub struct MockTransport {
        response: Mutex<Option<Result<RawProviderPayload, String>>>,
        pub calls: AtomicUsize,
        pub last_url: Mutex<Option<String>>,
        pub last_body: Mutex<Option<Value>>,
    }

    impl MockTransport {
        pub fn with_payload(payload: RawProviderPayload) -> Self {
            Self::new(Ok(payload))
        }

        pub fn failing(message: &str) -> Self {
            Self::new(Err(message.to_string()))
        }

        fn new(response: Result<RawProviderPayload, String>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                calls: AtomicUsize::new(0),
                last_url: Mutex::new(None),
                last_body: Mutex::new(None),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FlightTransport for MockTransport {
        async fn search(&self, url: &str, body: &Value) -> Result<RawProviderPayload, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().await = Some(url.to_string());
            *self.last_body.lock().await = Some(body.clone());

            match self.response.lock().await.as_ref() {
                Some(Ok(payload)) => Ok(payload.clone()),
                Some(Err(message)) => Err(ApiError::NetworkError(message.clone())),
                None => Err(ApiError::Other("no response configured".to_string())),
            }
        }
    }

    // Known names resolve; anything else fails
    pub struct MockCityResolver {
        cities: HashMap<String, CityInfo>,
        pub calls: AtomicUsize,
    }

    impl MockCityResolver {
        pub fn new(cities: &[(&str, &str, &str, &str)]) -> Self {
            let cities = cities
                .iter()
                .map(|(query, code, country, name)| {
                    (
                        query.to_lowercase(),
                        CityInfo {
                            code: code.to_string(),
                            country: country.to_string(),
                            display_name: name.to_string(),
                        },
                    )
                })
                .collect();
            Self {
                cities,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn india() -> Self {
            Self::new(&[
                ("delhi", "DEL", "India", "New Delhi"),
                ("mumbai", "BOM", "India", "Mumbai"),
                ("london", "LHR", "United Kingdom", "London"),
                ("dubai", "DXB", "United Arab Emirates", "Dubai"),
            ])
        }
    }

    #[async_trait]
    impl CityResolver for MockCityResolver {
        async fn resolve_city(&self, name: &str) -> Result<CityInfo, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cities
                .get(&name.trim().to_lowercase())
                .cloned()
                .ok_or_else(|| ApiError::ApiResponseError {
                    status_code: 404,
                    message: format!("unknown city {}", name),
                })
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub enum ShortenerMode {
        Prefix,
        Fail,
        Empty,
    }

    pub struct MockShortener {
        mode: ShortenerMode,
        pub calls: AtomicUsize,
    }

    impl MockShortener {
        pub fn new(mode: ShortenerMode) -> Self {
            Self {
                mode,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LinkShortener for MockShortener {
        async fn shorten(&self, url: &str) -> Result<String, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                ShortenerMode::Prefix => Ok(format!("https://s.example/{}?len={}", n, url.len())),
                ShortenerMode::Fail => Err(ApiError::Timeout(50)),
                ShortenerMode::Empty => Ok(String::new()),
            }
        }
    }
}
