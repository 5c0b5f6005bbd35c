use anyhow::Context;
use housing_sync::models::Credential;
use housing_sync::{Config, HomeSearch, SearchOutcome};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏠 Housing Sync");

    let config = Config::from_env()?;
    let app = HomeSearch::connect(config)?;

    if let Ok(token) = env::var("HOUSING_TOKEN") {
        if let Err(e) = app.restore_session(Credential::new(token)).await {
            warn!("Continuing without a session: {}", e);
        }
    } else if let (Ok(username), Ok(password)) =
        (env::var("HOUSING_USERNAME"), env::var("HOUSING_PASSWORD"))
    {
        if let Err(e) = app.login(&username, &password).await {
            warn!("Continuing without a session: {}", e);
        }
    }

    // First argument is a URL query string, e.g. "free_text_search=Södermalm&min_rooms=2"
    let query = env::args().nth(1).unwrap_or_default();
    let session = app.search_session(&query);
    info!("Searching with ?{}", session.url_query());

    match session.refresh().await {
        SearchOutcome::Ready { count } => info!("✅ Found {} listings", count),
        SearchOutcome::Failed { message } => anyhow::bail!(message),
        SearchOutcome::Superseded => anyhow::bail!("Search was cancelled"),
    }

    let filters = session.filters();
    info!("{} · {}", filters.rooms_summary(), filters.types_summary());

    for (i, property) in session.results().iter().enumerate() {
        let saved = if app.favorites().contains(&property.id) { " ★" } else { "" };
        println!("{}. {} ({} kr){}", i + 1, property.address, property.price, saved);
        println!("   {} rum, {} kvm, {}", property.rooms, property.area, property.kind);
        println!("   Broker: {} ({})", property.broker.name, property.broker.phone);
        println!("   ID: {}", property.id);
        println!();
    }

    for search in app.saved_searches().list() {
        println!("Saved search: {}", search.query);
    }

    let json = serde_json::to_string_pretty(&session.results())?;
    tokio::fs::write("search_results.json", json)
        .await
        .context("Failed to write search_results.json")?;
    info!("💾 Saved results to search_results.json");

    Ok(())
}
