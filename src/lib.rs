// Flight-search result processing: provider payload in, filtered itineraries, combos and
// booking links out

// Payload decoding and normalized entities
pub mod model;
pub mod provider;

// Building blocks of the pipeline
pub mod calendar;
pub mod combo;
pub mod dates;
pub mod deeplink;
pub mod fare;
pub mod filter;
pub mod itinerary;
pub mod leg;
pub mod pairing;
pub mod route;
pub mod time_window;
pub mod view_all;

// Configuration, collaborators and the search entry point
pub mod client;
pub mod config;
pub mod orchestrator;

// Re-export key types for convenience
pub use client::{ApiError, CityResolver, ClientError, FlightTransport, LinkShortener};
pub use combo::{ComboMatcher, ComboPairing};
pub use config::EngineConfig;
pub use deeplink::{DeepLinkComposer, TripType};
pub use filter::{FilterCriteria, FilterSortPipeline};
pub use itinerary::ItineraryBuilder;
pub use model::{
    CabinClass, CalendarSuggestion, CityInfo, Combo, Direction, FareOption, Itinerary, Leg, Passengers,
    SearchContext, SearchResults,
};
pub use orchestrator::{FlightSearchRequest, SearchError, SearchOrchestrator};
pub use provider::{ProcessingError, RawProviderPayload};
pub use route::RouteShape;
pub use time_window::TimeWindow;
pub use view_all::ViewAllLinkBuilder;
