use crate::{
    db::{format_date, ClimateAccess, ClimateData, DateBounds},
    index_handler, precipitation, routes, stations, temp_start, temp_start_end, tobs,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub remote_url: String,
    pub climate_db: Arc<dyn ClimateData>,
    /// Computed once before the listener starts accepting requests and never
    /// mutated afterwards.
    pub bounds: DateBounds,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::climate::climate_routes::precipitation,
        routes::climate::climate_routes::stations,
        routes::climate::climate_routes::tobs,
        routes::climate::climate_routes::temp_start,
        routes::climate::climate_routes::temp_start_end,
    ),
    components(
        schemas(
                routes::climate::climate_routes::StartParams,
                routes::climate::climate_routes::StartEndParams,
                routes::climate::climate_routes::TemperatureSummary,
            )
    ),
    tags(
        (name = "hawaii climate api", description = "a read-only RESTful api serving aggregate queries over the Hawaii daily climate observations")
    )
)]
struct ApiDoc;

pub async fn build_app_state(
    remote_url: String,
    database_path: String,
) -> Result<AppState, anyhow::Error> {
    let climate_db = Arc::new(
        ClimateAccess::new(&database_path)
            .await
            .map_err(|e| anyhow!("error opening climate database: {}", e))?,
    );

    let bounds = climate_db
        .date_bounds()
        .await
        .map_err(|e| anyhow!("error deriving dataset date bounds: {}", e))?;

    info!(
        "dataset covers {} through {}, trailing-year cutoff {}",
        format_date(bounds.first),
        format_date(bounds.last),
        format_date(bounds.cutoff)
    );

    Ok(AppState {
        remote_url,
        climate_db,
        bounds,
    })
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/v1.0/precipitation", get(precipitation))
        .route("/api/v1.0/stations", get(stations))
        .route("/api/v1.0/tobs", get(tobs))
        .route("/api/v1.0/temp/start", post(temp_start))
        .route("/api/v1.0/temp/start/end", post(temp_start_end))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
