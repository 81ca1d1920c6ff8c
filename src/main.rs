//! Geo News: binary entrypoint.
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use geo_news::{metrics::Metrics, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geo_news=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // try_init: shuttle may already have installed a subscriber
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        eprintln!("tracing subscriber already set, keeping the existing one");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let state = AppState::from_env().map_err(shuttle_runtime::Error::Custom)?;
    let ttl_secs = state.trending.cache_ttl().as_secs();

    let mut router = geo_news::router(state);
    match Metrics::init(ttl_secs) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = %e, "metrics disabled"),
    }

    info!("geo-news router ready");
    Ok(router.into())
}
