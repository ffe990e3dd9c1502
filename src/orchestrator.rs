// Search orchestration: request validation, city context, the provider call and the
// build -> filter -> sort -> link pipeline over its answer.

use crate::calendar::build_calendar_suggestions;
use crate::client::{
    ClientError, CityResolver, FlightTransport, HttpCityResolver, HttpFlightTransport, HttpLinkShortener,
    LinkShortener,
};
use crate::combo::ComboMatcher;
use crate::config::EngineConfig;
use crate::dates::is_iso_date;
use crate::deeplink::DeepLinkComposer;
use crate::filter::{FilterCriteria, FilterSortPipeline};
use crate::itinerary::ItineraryBuilder;
use crate::leg::ProviderIndex;
use crate::model::{CabinClass, CityInfo, Passengers, SearchContext, SearchResults};
use crate::pairing::pair_domestic_roundtrips;
use crate::provider::{ProcessingError, RawProviderPayload};
use crate::route::RouteShape;
use crate::time_window::TimeWindow;
use crate::view_all::ViewAllLinkBuilder;
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub const TRANSPORT_FAILURE: &str = "INVALID_SEARCH";
pub const NO_FLIGHTS_MESSAGE: &str = "No flights available for the selected route/date.";
pub const NO_MATCHES_MESSAGE: &str = "No flights match the selected filters.";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search request: {0}")]
    InvalidRequest(#[from] ProcessingError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

// Search as a user (or chat layer) asks for it
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    // YYYY-MM-DD
    pub outbound_date: String,
    pub return_date: Option<String>,
    pub adults: i32,
    pub children: i32,
    pub infants: i32,
    pub cabin: Option<String>,
    pub stops: Option<u32>,
    pub fastest: bool,
    pub refundable: Option<bool>,
    pub fare_type: u8,
    pub departure_time_window: Option<String>,
    pub arrival_time_window: Option<String>,
    pub airline_names: Vec<String>,
}

impl Default for FlightSearchRequest {
    fn default() -> Self {
        Self {
            origin: String::new(),
            destination: String::new(),
            outbound_date: String::new(),
            return_date: None,
            adults: 1,
            children: 0,
            infants: 0,
            cabin: None,
            stops: None,
            fastest: false,
            refundable: None,
            fare_type: 0,
            departure_time_window: None,
            arrival_time_window: None,
            airline_names: Vec::new(),
        }
    }
}

impl FlightSearchRequest {
    pub fn validate(&self) -> Result<(), ProcessingError> {
        for (field, value) in [
            ("origin", &self.origin),
            ("destination", &self.destination),
            ("outbound_date", &self.outbound_date),
        ] {
            if value.trim().is_empty() {
                return Err(ProcessingError::MissingRequiredField(field.to_string()));
            }
        }

        if !is_iso_date(&self.outbound_date) {
            return Err(ProcessingError::InvalidFormat(format!(
                "outbound_date must be YYYY-MM-DD, got {:?}",
                self.outbound_date
            )));
        }
        if let Some(return_date) = self.return_date() {
            if !is_iso_date(return_date) {
                return Err(ProcessingError::InvalidFormat(format!(
                    "return_date must be YYYY-MM-DD, got {:?}",
                    return_date
                )));
            }
            // same format on both sides, so string order is date order
            if return_date.trim() < self.outbound_date.trim() {
                return Err(ProcessingError::InvalidFormat(
                    "return_date is before outbound_date".to_string(),
                ));
            }
        }

        let counts = [
            ("adults", self.adults, 1, 9),
            ("children", self.children, 0, 8),
            ("infants", self.infants, 0, 8),
        ];
        for (field, value, min, max) in counts {
            if !(min..=max).contains(&value) {
                return Err(ProcessingError::InvalidFormat(format!(
                    "{} must be between {} and {}, got {}",
                    field, min, max, value
                )));
            }
        }
        Ok(())
    }

    // Blank return dates mean one-way
    pub fn return_date(&self) -> Option<&str> {
        self.return_date
            .as_deref()
            .map(str::trim)
            .filter(|date| !date.is_empty())
    }

    pub fn filters(&self) -> FilterCriteria {
        FilterCriteria {
            stops: self.stops,
            fastest: self.fastest,
            refundable: self.refundable,
            departure_window: TimeWindow::parse(self.departure_time_window.as_deref().unwrap_or_default()),
            arrival_window: TimeWindow::parse(self.arrival_time_window.as_deref().unwrap_or_default()),
            airline_names: self.airline_names.clone(),
        }
    }

    pub fn passengers(&self) -> Passengers {
        Passengers {
            adults: self.adults,
            children: self.children,
            infants: self.infants,
        }
    }
}

// International unless both countries are the home country. An unknown country on
// either side counts as domestic.
pub fn is_international_route(origin: &CityInfo, destination: &CityInfo, home_country: &str) -> bool {
    let origin_country = origin.country.trim();
    let destination_country = destination.country.trim();
    if origin_country.is_empty() || destination_country.is_empty() {
        return false;
    }
    !(origin_country.eq_ignore_ascii_case(home_country) && destination_country.eq_ignore_ascii_case(home_country))
}

// "trace" + epoch millis + six random hex digits
pub fn generate_trace_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!("trace{}{:06x}", Utc::now().timestamp_millis(), suffix)
}

// Provider search body
pub fn build_provider_request(context: &SearchContext, trace_id: &str, config: &EngineConfig) -> Value {
    let passengers = context.passengers.normalized();
    let is_roundtrip = context.is_roundtrip();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    json!({
        "org": context.origin.code,
        "dept": context.destination.code,
        "adt": passengers.adults.to_string(),
        "chd": passengers.children.to_string(),
        "inf": passengers.infants.to_string(),
        "queryname": trace_id,
        "deptDT": context.outbound_date,
        "arrDT": if is_roundtrip { context.return_date.clone() } else { None },
        "FareTypeUI": context.fare_type,
        "userid": "",
        "IsDoubelSeat": false,
        "isDomestic": !context.is_international,
        "isOneway": !is_roundtrip,
        "airline": "undefined",
        "VIP_CODE": "",
        "VIP_UNIQUE": "",
        "Cabin": context.cabin.code(),
        "currCode": config.locale.currency,
        "appType": 1,
        "isSingleView": false,
        "ResType": if context.is_international { 0 } else { 2 },
        "IsNBA": true,
        "CouponCode": "",
        "IsArmedForce": context.fare_type == 1,
        "AgentCode": "",
        "IsWLAPP": false,
        "IsFareFamily": context.fare_type != 1,
        "serviceid": "EMTSERVICE",
        "serviceDepatment": "",
        "IpAddress": "",
        "LoginKey": "",
        "UUID": "",
        "TKN": "",
        "requesttime": now,
        "tokenResponsetime": now,
    })
}

pub struct SearchOrchestrator {
    config: EngineConfig,
    transport: Arc<dyn FlightTransport>,
    cities: Arc<dyn CityResolver>,
    shortener: Arc<dyn LinkShortener>,
}

impl SearchOrchestrator {
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn FlightTransport>,
        cities: Arc<dyn CityResolver>,
        shortener: Arc<dyn LinkShortener>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            cities,
            shortener,
        })
    }

    // Orchestrator wired to the real provider endpoints
    pub fn with_http(config: EngineConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpFlightTransport::new(&config)?);
        let cities = Arc::new(HttpCityResolver::new(&config)?);
        let shortener = Arc::new(HttpLinkShortener::new(&config)?);
        Self::new(config, transport, cities, shortener)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(
        skip(self, request),
        fields(origin = %request.origin, destination = %request.destination, trace_id = tracing::field::Empty)
    )]
    pub async fn search(&self, request: &FlightSearchRequest) -> Result<SearchResults, SearchError> {
        request.validate()?;

        let (origin, destination) = futures::join!(
            self.resolve_city(&request.origin),
            self.resolve_city(&request.destination)
        );
        let context = self.build_context(request, origin, destination);

        let trace_id = generate_trace_id();
        tracing::Span::current().record("trace_id", trace_id.as_str());
        info!(
            roundtrip = context.is_roundtrip(),
            international = context.is_international,
            "searching flights"
        );

        let body = build_provider_request(&context, &trace_id, &self.config);
        let payload = match self
            .transport
            .search(&self.config.endpoints.search_url(), &body)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "provider search failed");
                let mut results = base_results(&context);
                results.error = Some(TRANSPORT_FAILURE.to_string());
                results.message = Some(e.to_string());
                return Ok(results);
            }
        };

        let mut results = self.process_payload(&payload, &context);
        if !payload.journeys.is_empty() {
            let view_all = ViewAllLinkBuilder::new(&self.config)
                .build(&context, self.shortener.as_ref())
                .await;
            results.view_all_link = Some(view_all).filter(|link| !link.is_empty());
        }
        if self.config.shorten_itinerary_links {
            self.shorten_result_links(&mut results).await;
        }

        info!(
            outbound = results.outbound_itineraries.len(),
            inbound = results.return_itineraries.len(),
            combos = results.international_combos.len(),
            "search finished"
        );
        Ok(results)
    }

    pub fn build_context(
        &self,
        request: &FlightSearchRequest,
        origin: CityInfo,
        destination: CityInfo,
    ) -> SearchContext {
        let is_international = is_international_route(&origin, &destination, &self.config.locale.home_country);
        SearchContext {
            origin,
            destination,
            outbound_date: request.outbound_date.trim().to_string(),
            return_date: request.return_date().map(str::to_string),
            passengers: request.passengers().normalized(),
            cabin: CabinClass::resolve(request.cabin.as_deref()),
            fare_type: request.fare_type,
            is_international,
            filters: request.filters(),
        }
    }

    // Pure part of the pipeline: everything that needs no collaborator
    pub fn process_payload(&self, payload: &RawProviderPayload, context: &SearchContext) -> SearchResults {
        let mut results = base_results(context);
        results.calendar_suggestions = build_calendar_suggestions(&payload.calendar_fares);

        if payload.journeys.is_empty() {
            results.message = Some(
                payload
                    .error_description()
                    .unwrap_or(NO_FLIGHTS_MESSAGE)
                    .to_string(),
            );
            return results;
        }

        let shape = RouteShape::select(context.is_international, context.is_roundtrip());
        let index = ProviderIndex::new(payload);
        let links = DeepLinkComposer::new(&self.config, context.passengers);

        let (outbound, inbound) = ItineraryBuilder::new(index, shape, context, &links).build_all(payload);
        let combos = if shape.pairs_combos() {
            ComboMatcher::new(index, self.config.combo_pairing, &links).match_all(payload)
        } else {
            Vec::new()
        };

        let pipeline = FilterSortPipeline::new(&context.filters);
        let mut outbound = pipeline.apply(outbound);
        let mut inbound = pipeline.apply(inbound);
        let mut combos = pipeline.apply_combos(combos);

        if self.config.pair_domestic_roundtrips && shape == RouteShape::Domestic && context.is_roundtrip() {
            let paired = pair_domestic_roundtrips(outbound, inbound, self.config.min_turnaround_hours);
            outbound = paired.outbound;
            inbound = paired.inbound;
            results.domestic_pairs = paired.pairs;
        }

        if let Some(limit) = self.config.result_limit {
            outbound.truncate(limit);
            inbound.truncate(limit);
            combos.truncate(limit);
            results
                .domestic_pairs
                .retain(|&(o, r)| o < outbound.len() && r < inbound.len());
        }

        results.outbound_itineraries = outbound;
        results.return_itineraries = inbound;
        results.international_combos = combos;
        if results.is_empty() {
            let fallback = if context.filters.is_empty() {
                NO_FLIGHTS_MESSAGE
            } else {
                NO_MATCHES_MESSAGE
            };
            results.message = Some(payload.error_description().unwrap_or(fallback).to_string());
        }
        results
    }

    async fn resolve_city(&self, name: &str) -> CityInfo {
        match self.cities.resolve_city(name).await {
            Ok(city) => city,
            Err(e) => {
                warn!(city = name, error = %e, "city resolution failed, using the raw input");
                CityInfo::echo(name.trim())
            }
        }
    }

    // Replace every itinerary and combo link with its short form, a bounded number of
    // shortening calls at a time. Failed calls keep the raw link.
    async fn shorten_result_links(&self, results: &mut SearchResults) {
        let raw_links: Vec<String> = results
            .outbound_itineraries
            .iter()
            .chain(results.return_itineraries.iter())
            .map(|itinerary| itinerary.deep_link.clone())
            .chain(results.international_combos.iter().map(|combo| combo.deep_link.clone()))
            .collect();

        let shortener = self.shortener.as_ref();
        let short_links: Vec<String> = stream::iter(raw_links)
            .map(|link| shorten_or_keep(shortener, link))
            .buffered(self.config.shorten_concurrency.max(1))
            .collect()
            .await;

        let targets = results
            .outbound_itineraries
            .iter_mut()
            .chain(results.return_itineraries.iter_mut())
            .map(|itinerary| &mut itinerary.deep_link)
            .chain(results.international_combos.iter_mut().map(|combo| &mut combo.deep_link));
        for (target, short) in targets.zip(short_links) {
            *target = short;
        }
    }
}

async fn shorten_or_keep(shortener: &dyn LinkShortener, link: String) -> String {
    if link.is_empty() {
        return link;
    }
    match shortener.shorten(&link).await {
        Ok(short) if !short.trim().is_empty() => short.trim().to_string(),
        Ok(_) => link,
        Err(e) => {
            warn!(error = %e, "deep-link shortening failed, keeping the raw link");
            link
        }
    }
}

fn base_results(context: &SearchContext) -> SearchResults {
    SearchResults {
        origin: context.origin.code.clone(),
        destination: context.destination.code.clone(),
        outbound_date: context.outbound_date.clone(),
        return_date: context.return_date.clone(),
        cabin: context.cabin.display_name().to_string(),
        is_roundtrip: context.is_roundtrip(),
        is_international: context.is_international,
        ..Default::default()
    }
}
