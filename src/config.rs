// Engine configuration: endpoints, locale constants and pipeline switches

use crate::client::ClientError;
use crate::combo::ComboPairing;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub endpoints: EndpointConfig,
    pub locale: LocaleConfig,
    pub timeout_ms: u64,
    // Optional static provider token sent as `TKN`
    pub auth_token: Option<String>,
    pub combo_pairing: ComboPairing,
    pub shorten_itinerary_links: bool,
    pub shorten_concurrency: usize,
    pub pair_domestic_roundtrips: bool,
    pub min_turnaround_hours: i64,
    pub result_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            locale: LocaleConfig::default(),
            timeout_ms: 30000,
            auth_token: None,
            combo_pairing: ComboPairing::default(),
            shorten_itinerary_links: false,
            shorten_concurrency: 4,
            pair_domestic_roundtrips: false,
            min_turnaround_hours: 4,
            result_limit: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub provider_base_url: String,
    pub search_path: String,
    pub deep_link_base_url: String,
    pub view_all_base_url: String,
    pub short_link_url: String,
    pub autosuggest_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            provider_base_url: "https://flightservice-node.easemytrip.com".to_string(),
            search_path: "/AirAvail_Lights/AirBus_New".to_string(),
            deep_link_base_url: "https://flight.easemytrip.com/RemoteSearchHandlers/index".to_string(),
            view_all_base_url: "https://www.easemytrip.com/flight-search/listing".to_string(),
            short_link_url: "https://deeplinkapi.easemytrip.com/api/fire/GetShortLinkRawV1".to_string(),
            autosuggest_url: "https://www.easemytrip.com/api/Flight/GetAutoSuggestNew".to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn search_url(&self) -> String {
        format!(
            "{}/{}",
            self.provider_base_url.trim_end_matches('/'),
            self.search_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub currency: String,
    pub user_language: String,
    pub listing_language: String,
    pub point_of_sale_country: String,
    pub app_type: String,
    // Searches between two cities of this country are domestic
    pub home_country: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            user_language: "en".to_string(),
            listing_language: "en-us".to_string(),
            point_of_sale_country: "IN".to_string(),
            app_type: "B2C".to_string(),
            home_country: "India".to_string(),
        }
    }
}

impl EngineConfig {
    // Defaults overlaid with FLIGHT_* environment variables. Nested settings take a double
    // underscore: FLIGHT_TIMEOUT_MS, FLIGHT_ENDPOINTS__PROVIDER_BASE_URL, FLIGHT_LOCALE__CURRENCY.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::load(None)
    }

    // Same overlay, read from the given variables instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::load(Some(vars))
    }

    fn load(vars: Option<config::Map<String, String>>) -> Result<Self, ClientError> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("FLIGHT")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .source(vars),
            )
            .build()
            .map_err(config_error)?;

        let mut config: EngineConfig = settings.try_deserialize().map_err(config_error)?;
        config.auth_token = config
            .auth_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let urls = [
            ("provider base URL", &self.endpoints.provider_base_url),
            ("deep-link base URL", &self.endpoints.deep_link_base_url),
            ("view-all base URL", &self.endpoints.view_all_base_url),
            ("short-link URL", &self.endpoints.short_link_url),
            ("autosuggest URL", &self.endpoints.autosuggest_url),
        ];
        for (name, value) in urls {
            Url::parse(value)
                .map_err(|e| ClientError::ConfigError(format!("invalid {}: {:?} ({})", name, value, e)))?;
        }
        Url::parse(&self.endpoints.search_url())
            .map_err(|e| ClientError::ConfigError(format!("invalid search URL: {}", e)))?;

        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError("timeout_ms must be positive".to_string()));
        }
        if self.shorten_concurrency == 0 {
            return Err(ClientError::ConfigError(
                "shorten_concurrency must be at least 1".to_string(),
            ));
        }
        if self.min_turnaround_hours < 0 {
            return Err(ClientError::ConfigError(
                "min_turnaround_hours cannot be negative".to_string(),
            ));
        }
        if self.locale.currency.trim().is_empty() {
            return Err(ClientError::ConfigError("currency cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn config_error(error: config::ConfigError) -> ClientError {
    ClientError::ConfigError(error.to_string())
}
