use axum::{
    extract::{Query, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use errorgeo::config::Config;
use errorgeo::geocode_cache::GeocodeCache;
use errorgeo::geocoders::GeocoderPool;
use errorgeo::models::{GeocodeQuery, ReverseQuery, ReverseResponse};
use errorgeo::render::MapView;

struct AppState {
    config: Config,
    pool: GeocoderPool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let config = Config::load()?;
    let thread_count = config.thread_count.unwrap_or_else(|| num_cpus::get());

    info!("starting server with {} threads", thread_count);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(thread_count)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn log_request_response(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    info!("incoming request: {} {}", method, path);
    let response = next.run(req).await;
    info!("request result: {} for {} {}", response.status(), method, path);
    response
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("errorgeo/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let cache_dir = std::path::Path::new("data/cache").to_path_buf();
    let max_entries = config.cache_max_entries.unwrap_or(10_000);
    let cache = GeocodeCache::new(cache_dir, max_entries).await?;

    let pool = GeocoderPool::from_config(&config, http_client, Some(cache));
    info!(
        "geocoder pool ready with {} providers",
        pool.geocoders().len()
    );

    let state = Arc::new(AppState { config, pool });

    let app = Router::new()
        .route("/", get(forward_raw))
        .route("/forward/cluster", get(forward_cluster))
        .route("/forward/cluster/style", get(forward_cluster_style))
        .route("/reverse", get(reverse))
        .layer(middleware::from_fn(log_request_response))
        .with_state(state.clone());

    let addr = state
        .config
        .bind_addr
        .clone()
        .unwrap_or_else(|| "0.0.0.0:5000".to_string());
    info!("listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

async fn forward_raw(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeQuery>,
) -> Response {
    let location = state.pool.geocode(&params.address).await;
    if location.is_empty() {
        return (
            axum::http::StatusCode::NOT_FOUND,
            "no geocoder could match that address",
        )
            .into_response();
    }
    ([("content-type", "text/plain")], location.wkt_multipoint()).into_response()
}

async fn forward_cluster(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeQuery>,
) -> Response {
    let location = state.pool.geocode(&params.address).await;
    if location.is_empty() {
        return (
            axum::http::StatusCode::NOT_FOUND,
            "no geocoder could match that address",
        )
            .into_response();
    }
    let clusters = location.clusters(state.config.cluster_epsilon_km());
    Json(clusters.to_feature_collection()).into_response()
}

async fn forward_cluster_style(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeQuery>,
) -> Response {
    let location = state.pool.geocode(&params.address).await;
    if location.is_empty() {
        return (
            axum::http::StatusCode::NOT_FOUND,
            "no geocoder could match that address",
        )
            .into_response();
    }
    let fc = location
        .clusters(state.config.cluster_epsilon_km())
        .to_feature_collection();
    let mut view = MapView::new();
    view.render(&fc);
    Json(view.style_json()).into_response()
}

async fn reverse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQuery>,
) -> Response {
    let address = state.pool.reverse(params.lat, params.lon).await;
    if address.is_empty() {
        return (
            axum::http::StatusCode::NOT_FOUND,
            "no geocoder could match that point",
        )
            .into_response();
    }
    let longest_common_substring = address.longest_common_substring(false);
    Json(ReverseResponse {
        addresses: address.candidates().to_vec(),
        longest_common_substring,
    })
    .into_response()
}
