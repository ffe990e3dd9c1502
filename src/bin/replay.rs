// Replay a captured provider payload through the search pipeline and print the results.
//
//   replay <payload.json> <origin> <destination> <outbound YYYY-MM-DD> [return YYYY-MM-DD]
//
// Cities resolve to themselves and links stay unshortened. Settings come from the
// FLIGHT_* environment variables, logging from RUST_LOG.

use anyhow::{bail, Context, Result};
use flight_results::client::{EchoCityResolver, FixtureTransport, IdentityShortener};
use flight_results::provider::load_sample;
use flight_results::{EngineConfig, FlightSearchRequest, SearchOrchestrator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "flight_results=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        bail!("usage: replay <payload.json> <origin> <destination> <outbound YYYY-MM-DD> [return YYYY-MM-DD]");
    }

    let payload = load_sample(&args[0]).with_context(|| format!("reading payload {}", args[0]))?;
    let config = EngineConfig::from_env().context("loading configuration")?;
    let orchestrator = SearchOrchestrator::new(
        config,
        Arc::new(FixtureTransport::new(payload)),
        Arc::new(EchoCityResolver),
        Arc::new(IdentityShortener),
    )?;

    let request = FlightSearchRequest {
        origin: args[1].clone(),
        destination: args[2].clone(),
        outbound_date: args[3].clone(),
        return_date: args.get(4).cloned(),
        ..Default::default()
    };
    let results = orchestrator.search(&request).await?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
