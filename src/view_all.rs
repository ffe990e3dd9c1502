// "See all results" listing link for a whole search

use crate::client::LinkShortener;
use crate::config::EngineConfig;
use crate::dates::to_listing_date;
use crate::model::{CityInfo, SearchContext};
use tracing::warn;
use url::Url;

pub struct ViewAllLinkBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> ViewAllLinkBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    // Unshortened listing URL, or "" when origin, destination or outbound date is missing
    pub fn raw_link(&self, context: &SearchContext) -> String {
        let origin = context.origin.code.trim();
        let destination = context.destination.code.trim();
        let outbound = to_listing_date(&context.outbound_date);
        if origin.is_empty() || destination.is_empty() || outbound.is_empty() {
            return String::new();
        }

        let return_date = context
            .return_date
            .as_deref()
            .map(to_listing_date)
            .filter(|date| !date.is_empty());
        let is_roundtrip = return_date.is_some();

        let mut search_token = format!(
            "{}|{}|{}",
            location_token(&context.origin),
            location_token(&context.destination),
            outbound
        );
        if let Some(date) = &return_date {
            search_token.push('-');
            search_token.push_str(date);
        }

        let mut url = match Url::parse(&self.config.endpoints.view_all_base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "view-all base URL does not parse");
                return String::new();
            }
        };
        let locale = &self.config.locale;
        url.query_pairs_mut()
            .append_pair("srch", &search_token)
            .append_pair("px", &context.passengers.listing_token())
            .append_pair("cbn", &context.cabin.code().to_string())
            .append_pair("ar", "undefined")
            .append_pair("isow", &(!is_roundtrip).to_string())
            .append_pair("isdm", &(!context.is_international).to_string())
            .append_pair("lang", &locale.listing_language)
            .append_pair("IsDoubleSeat", "false")
            .append_pair("CCODE", &locale.point_of_sale_country)
            .append_pair("curr", &locale.currency)
            .append_pair("apptype", &locale.app_type)
            .append_pair("fn", &context.fare_type.to_string());
        url.into()
    }

    // Shortened link; any shortener failure or empty answer keeps the raw URL
    pub async fn build(&self, context: &SearchContext, shortener: &dyn LinkShortener) -> String {
        let raw = self.raw_link(context);
        if raw.is_empty() {
            return raw;
        }
        match shortener.shorten(&raw).await {
            Ok(short) if !short.trim().is_empty() => short.trim().to_string(),
            Ok(_) => {
                warn!("link shortener returned an empty link, keeping the raw URL");
                raw
            }
            Err(e) => {
                warn!(error = %e, "link shortening failed, keeping the raw URL");
                raw
            }
        }
    }
}

// "DEL-New Delhi-India": code, display name (defaults to the code) and country
fn location_token(city: &CityInfo) -> String {
    let code = city.code.trim();
    let name = Some(city.display_name.trim()).filter(|n| !n.is_empty()).unwrap_or(code);
    [code, name, city.country.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
