use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use climate_api::{
    app, AppState, ClimateAccess, ClimateData, DailyReading, DailyTemperatureStats, DateBounds,
    Error, Station,
};
use hyper::{header, Method};
use mockall::mock;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use time::Date;
use tower::ServiceExt;

mock! {
    pub ClimateStore {}

    #[async_trait::async_trait]
    impl ClimateData for ClimateStore {
        async fn date_bounds(&self) -> Result<DateBounds, Error>;
        async fn precipitation_since(&self, cutoff: Date) -> Result<Vec<DailyReading>, Error>;
        async fn stations(&self) -> Result<Vec<Station>, Error>;
        async fn most_active_station(&self) -> Result<Option<String>, Error>;
        async fn temperature_observations(
            &self,
            station_id: &str,
            cutoff: Date,
        ) -> Result<Vec<DailyReading>, Error>;
        async fn daily_temperature_stats(
            &self,
            start: Date,
            end: Option<Date>,
        ) -> Result<Vec<DailyTemperatureStats>, Error>;
    }
}

pub struct TestApp {
    pub app: Router,
}

/// Builds the router over any store, deriving the date bounds the way startup
/// does.
pub async fn spawn_app_with_store(store: Arc<dyn ClimateData>) -> TestApp {
    let bounds = store
        .date_bounds()
        .await
        .expect("test store must report date bounds");

    let state = AppState {
        remote_url: "http://127.0.0.1:0".to_string(),
        climate_db: store,
        bounds,
    };

    TestApp { app: app(state) }
}

/// Builds the router over an in-memory sqlite seeded with the shared fixture.
pub async fn spawn_app() -> TestApp {
    let pool = seeded_pool().await;
    spawn_app_with_store(Arc::new(ClimateAccess::from_pool(pool))).await
}

/// Fixture dataset: first date 2016-01-01, last date 2017-08-23, so the
/// trailing-year cutoff is 2016-08-23. USC00519281 is the most active station
/// (7 rows against 2).
pub async fn seeded_pool() -> SqlitePool {
    // A single connection keeps every checkout on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    sqlx::query("CREATE TABLE measurement (station TEXT, date TEXT, prcp REAL, tobs REAL)")
        .execute(&pool)
        .await
        .expect("Failed to create measurement table");
    sqlx::query("CREATE TABLE station (station TEXT, name TEXT)")
        .execute(&pool)
        .await
        .expect("Failed to create station table");

    let stations = [
        ("USC00519281", "WAIHEE 837.5, HI US"),
        ("USC00514830", "KUALOA RANCH HEADQUARTERS 886.9, HI US"),
    ];
    for (station, name) in stations {
        sqlx::query("INSERT INTO station (station, name) VALUES (?, ?)")
            .bind(station)
            .bind(name)
            .execute(&pool)
            .await
            .expect("Failed to seed station");
    }

    let measurements: [(&str, &str, Option<f64>, Option<f64>); 9] = [
        ("USC00519281", "2016-01-01", Some(0.50), Some(68.0)),
        ("USC00519281", "2016-08-22", Some(0.10), Some(71.0)),
        ("USC00519281", "2016-08-23", Some(0.00), Some(70.0)),
        ("USC00519281", "2017-08-20", Some(0.45), Some(70.0)),
        ("USC00519281", "2017-08-21", Some(0.56), Some(75.0)),
        ("USC00519281", "2017-08-22", Some(0.50), Some(80.0)),
        ("USC00519281", "2017-08-23", Some(0.08), Some(82.0)),
        ("USC00514830", "2016-08-23", Some(0.02), Some(77.0)),
        ("USC00514830", "2017-08-19", None, Some(76.0)),
    ];
    for (station, date, prcp, tobs) in measurements {
        sqlx::query("INSERT INTO measurement (station, date, prcp, tobs) VALUES (?, ?, ?, ?)")
            .bind(station)
            .bind(date)
            .bind(prcp)
            .bind(tobs)
            .execute(&pool)
            .await
            .expect("Failed to seed measurement");
    }

    pool
}

pub async fn get(app: &Router, path: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();

    app.clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.")
}

pub async fn post_form(app: &Router, path: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();

    app.clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.")
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("Response body is not utf-8")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not json")
}
