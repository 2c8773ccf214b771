use axum::{extract::State, http::StatusCode, Form, Json};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use time::Date;
use utoipa::ToSchema;

use crate::{
    db::{format_date, DailyTemperatureStats, DateBounds, DATE_FORMAT},
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartParams {
    /// Start date, YYYY-MM-DD, inclusive
    pub start_date: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartEndParams {
    /// Start date, YYYY-MM-DD, inclusive
    pub start_date: String,
    /// End date, YYYY-MM-DD, inclusive
    pub end_date: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemperatureSummary {
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
}

/// One single-entry map per distinct date, keyed by the date string.
pub type DailySummaries = Vec<BTreeMap<String, TemperatureSummary>>;

enum BoundCheck {
    /// Date must sit inside `[first, last]`
    Both,
    /// Date must not precede `first`
    Lower,
    /// Date must not exceed `last`
    Upper,
}

/// Parses a form-supplied date and rejects values outside the window the
/// dataset covers. Note that `start <= end` is deliberately not cross-checked
/// anywhere: an inverted range passes validation and matches nothing.
fn parse_date_in_bounds(
    bounds: &DateBounds,
    value: &str,
    check: BoundCheck,
) -> Result<Date, (StatusCode, String)> {
    let rejection = || {
        (
            StatusCode::BAD_REQUEST,
            format!(
                "Error: '{}' is not a valid date in range. Please enter a date between {} and {}",
                value,
                format_date(bounds.first),
                format_date(bounds.last)
            ),
        )
    };

    let date = Date::parse(value, DATE_FORMAT).map_err(|e| {
        warn!("rejected malformed date {:?}: {}", value, e);
        rejection()
    })?;

    let in_range = match check {
        BoundCheck::Both => date >= bounds.first && date <= bounds.last,
        BoundCheck::Lower => date >= bounds.first,
        BoundCheck::Upper => date <= bounds.last,
    };
    if !in_range {
        warn!("rejected out-of-range date {:?}", value);
        return Err(rejection());
    }

    Ok(date)
}

fn group_by_date(stats: Vec<DailyTemperatureStats>) -> DailySummaries {
    stats
        .into_iter()
        .map(|s| {
            BTreeMap::from([(
                s.date,
                TemperatureSummary {
                    min_temp: s.min_temp,
                    max_temp: s.max_temp,
                    avg_temp: s.avg_temp,
                },
            )])
        })
        .collect()
}

fn internal_error(context: &str, err: crate::db::Error) -> (StatusCode, String) {
    error!("error {}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed {}: {}", context, err),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1.0/precipitation",
    responses(
        (status = OK, description = "Precipitation readings over the trailing year of the dataset, keyed by date", body = BTreeMap<String, Option<f64>>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query measurements")
    ))]
pub async fn precipitation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Option<f64>>>, (StatusCode, String)> {
    let readings = state
        .climate_db
        .precipitation_since(state.bounds.cutoff)
        .await
        .map_err(|err| internal_error("fetching precipitation", err))?;

    // Duplicate dates across stations collapse last-wins
    let mut scores = BTreeMap::new();
    for reading in readings {
        scores.insert(reading.date, reading.value);
    }
    Ok(Json(scores))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/stations",
    responses(
        (status = OK, description = "All weather stations, keyed by station id", body = BTreeMap<String, String>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query stations")
    ))]
pub async fn stations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, String>>, (StatusCode, String)> {
    let stations = state
        .climate_db
        .stations()
        .await
        .map_err(|err| internal_error("fetching stations", err))?;

    Ok(Json(
        stations
            .into_iter()
            .map(|s| (s.station_id, s.name))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/tobs",
    responses(
        (status = OK, description = "Temperature observations for the most active station over the trailing year, keyed by date", body = BTreeMap<String, Option<f64>>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query measurements")
    ))]
pub async fn tobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Option<f64>>>, (StatusCode, String)> {
    let Some(station_id) = state
        .climate_db
        .most_active_station()
        .await
        .map_err(|err| internal_error("finding most active station", err))?
    else {
        return Ok(Json(BTreeMap::new()));
    };

    let readings = state
        .climate_db
        .temperature_observations(&station_id, state.bounds.cutoff)
        .await
        .map_err(|err| internal_error("fetching temperature observations", err))?;

    let mut observations = BTreeMap::new();
    for reading in readings {
        observations.insert(reading.date, reading.value);
    }
    Ok(Json(observations))
}

#[utoipa::path(
    post,
    path = "/api/v1.0/temp/start",
    request_body(content = StartParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Per-date min/max/avg temperature from the start date onward", body = Vec<BTreeMap<String, TemperatureSummary>>),
        (status = BAD_REQUEST, description = "Start date is malformed or outside the dataset window", content_type = "text/plain"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query measurements")
    ))]
pub async fn temp_start(
    State(state): State<Arc<AppState>>,
    Form(params): Form<StartParams>,
) -> Result<Json<DailySummaries>, (StatusCode, String)> {
    let start = parse_date_in_bounds(&state.bounds, &params.start_date, BoundCheck::Both)?;

    let stats = state
        .climate_db
        .daily_temperature_stats(start, None)
        .await
        .map_err(|err| internal_error("aggregating temperatures", err))?;

    Ok(Json(group_by_date(stats)))
}

#[utoipa::path(
    post,
    path = "/api/v1.0/temp/start/end",
    request_body(content = StartEndParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Per-date min/max/avg temperature within the inclusive date range", body = Vec<BTreeMap<String, TemperatureSummary>>),
        (status = BAD_REQUEST, description = "A date is malformed or outside the dataset window", content_type = "text/plain"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query measurements")
    ))]
pub async fn temp_start_end(
    State(state): State<Arc<AppState>>,
    Form(params): Form<StartEndParams>,
) -> Result<Json<DailySummaries>, (StatusCode, String)> {
    let start = parse_date_in_bounds(&state.bounds, &params.start_date, BoundCheck::Lower)?;
    let end = parse_date_in_bounds(&state.bounds, &params.end_date, BoundCheck::Upper)?;

    let stats = state
        .climate_db
        .daily_temperature_stats(start, Some(end))
        .await
        .map_err(|err| internal_error("aggregating temperatures", err))?;

    Ok(Json(group_by_date(stats)))
}
