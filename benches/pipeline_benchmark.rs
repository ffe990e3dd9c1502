use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_results::client::{EchoCityResolver, FixtureTransport, IdentityShortener};
use flight_results::deeplink::DeepLinkComposer;
use flight_results::leg::ProviderIndex;
use flight_results::model::{CityInfo, SearchContext};
use flight_results::provider::{load_sample, SAMPLE_DOMESTIC_ROUNDTRIP_PATH, SAMPLE_INTERNATIONAL_ROUNDTRIP_PATH};
use flight_results::{
    EngineConfig, FilterCriteria, FilterSortPipeline, ItineraryBuilder, RawProviderPayload, RouteShape,
    SearchOrchestrator, TimeWindow,
};
use rand::{thread_rng, Rng};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const AIRLINES: &[(&str, &str)] = &[("6E", "IndiGo"), ("AI", "Air India"), ("UK", "Vistara"), ("SG", "SpiceJet")];

// Domestic payload with `segments` outbound and `segments` return options
fn synthetic_payload(segments: usize) -> RawProviderPayload {
    let mut rng = thread_rng();
    let mut flight_details = HashMap::new();
    let mut journeys = Vec::new();

    for (journey, (from, to, date)) in [("DEL", "BOM", "Mon-19Jan2026"), ("BOM", "DEL", "Sat-24Jan2026")]
        .into_iter()
        .enumerate()
    {
        let mut list: Vec<Value> = Vec::with_capacity(segments);
        for i in 0..segments {
            let id = format!("{}-{}", journey, i);
            let (code, _) = AIRLINES[rng.gen_range(0..AIRLINES.len())];
            let departure = rng.gen_range(0..20 * 60);
            let minutes = rng.gen_range(110..160);
            let arrival = departure + minutes;
            flight_details.insert(
                id.clone(),
                json!({
                    "AC": code, "FN": rng.gen_range(100..9999), "OG": from, "DT": to,
                    "DDT": date, "DTM": format!("{:02}:{:02}", departure / 60, departure % 60),
                    "ADT": date, "ATM": format!("{:02}:{:02}", arrival / 60, arrival % 60),
                    "CB": "E", "FCLS": "R", "DUR": format!("{:02}h {:02}m", minutes / 60, minutes % 60)
                }),
            );
            let fare = rng.gen_range(3500..12000);
            list.push(json!({
                "id": id, "SK": format!("SK-{}", id), "RF": rng.gen_range(0..2),
                "b": [{ "JyTm": format!("{:02}h {:02}m", minutes / 60, minutes % 60), "stp": "0", "FL": [id] }],
                "lstFr": [{ "SID": "F", "FN": "Saver", "BF": fare - 700, "TF": fare, "TTXMP": 700 }]
            }));
        }
        journeys.push(json!({ "s": list }));
    }

    let airlines: HashMap<String, Value> = AIRLINES
        .iter()
        .map(|(code, name)| (code.to_string(), json!(format!("{}|1|0", name))))
        .collect();
    let raw = json!({ "C": airlines, "dctFltDtl": flight_details, "j": journeys });
    serde_json::from_value(raw).expect("synthetic payload decodes")
}

fn context(is_international: bool, return_date: &str) -> SearchContext {
    let city = |code: &str| CityInfo {
        code: code.to_string(),
        country: "India".to_string(),
        display_name: code.to_string(),
    };
    SearchContext {
        origin: city("DEL"),
        destination: city("BOM"),
        outbound_date: "2026-01-19".to_string(),
        return_date: Some(return_date.to_string()),
        is_international,
        ..Default::default()
    }
}

fn orchestrator(payload: &RawProviderPayload) -> SearchOrchestrator {
    SearchOrchestrator::new(
        EngineConfig::default(),
        Arc::new(FixtureTransport::new(payload.clone())),
        Arc::new(EchoCityResolver),
        Arc::new(IdentityShortener),
    )
    .expect("default config is valid")
}

// Full pure pipeline over generated payloads of growing size
pub fn payload_processing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_processing");
    let ctx = context(false, "2026-01-24");

    for segments in [10, 100, 500].iter() {
        let payload = synthetic_payload(*segments);
        let orchestrator = orchestrator(&payload);
        group.bench_with_input(BenchmarkId::from_parameter(segments), segments, |b, _| {
            b.iter(|| black_box(orchestrator.process_payload(black_box(&payload), &ctx)))
        });
    }
    group.finish();
}

pub fn sample_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("captured_samples");

    let domestic = load_sample(SAMPLE_DOMESTIC_ROUNDTRIP_PATH).expect("domestic sample loads");
    let domestic_ctx = context(false, "2026-01-24");
    let domestic_orchestrator = orchestrator(&domestic);
    group.bench_function("domestic_roundtrip", |b| {
        b.iter(|| black_box(domestic_orchestrator.process_payload(black_box(&domestic), &domestic_ctx)))
    });

    let international = load_sample(SAMPLE_INTERNATIONAL_ROUNDTRIP_PATH).expect("international sample loads");
    let international_ctx = context(true, "2026-01-26");
    let international_orchestrator = orchestrator(&international);
    group.bench_function("international_roundtrip", |b| {
        b.iter(|| {
            black_box(international_orchestrator.process_payload(black_box(&international), &international_ctx))
        })
    });

    group.finish();
}

// Filtering and fastest ordering alone, itineraries prebuilt
pub fn filter_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_sort");
    let ctx = context(false, "2026-01-24");
    let config = EngineConfig::default();
    let links = DeepLinkComposer::new(&config, ctx.passengers);

    let cases = [
        ("none", FilterCriteria::default()),
        (
            "fastest_morning_nonstop",
            FilterCriteria {
                stops: Some(0),
                fastest: true,
                departure_window: TimeWindow::parse("morning"),
                ..Default::default()
            },
        ),
        (
            "airline_refundable",
            FilterCriteria {
                refundable: Some(true),
                airline_names: vec!["indigo".to_string(), "vistara".to_string()],
                ..Default::default()
            },
        ),
    ];

    let payload = synthetic_payload(500);
    let (outbound, _) =
        ItineraryBuilder::new(ProviderIndex::new(&payload), RouteShape::Domestic, &ctx, &links).build_all(&payload);

    for (name, criteria) in cases.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), criteria, |b, criteria| {
            let pipeline = FilterSortPipeline::new(criteria);
            b.iter(|| black_box(pipeline.apply(outbound.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, payload_processing_benchmark, sample_benchmark, filter_benchmark);
criterion_main!(benches);
