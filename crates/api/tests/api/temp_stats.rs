use crate::helpers::{body_json, body_text, post_form, spawn_app, spawn_app_with_store, MockClimateStore};
use axum::http::StatusCode;
use climate_api::DateBounds;
use serde_json::json;
use std::sync::Arc;
use time::macros::date;

#[tokio::test]
async fn temp_start_groups_aggregates_by_date() {
    let test_app = spawn_app().await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start",
        "start_date=2017-08-21",
    )
    .await;
    assert!(response.status().is_success());

    let summaries = body_json(response).await;
    assert_eq!(
        summaries,
        json!([
            {"2017-08-21": {"min_temp": 75.0, "max_temp": 75.0, "avg_temp": 75.0}},
            {"2017-08-22": {"min_temp": 80.0, "max_temp": 80.0, "avg_temp": 80.0}},
            {"2017-08-23": {"min_temp": 82.0, "max_temp": 82.0, "avg_temp": 82.0}},
        ])
    );
}

#[tokio::test]
async fn temp_start_aggregates_across_stations() {
    let test_app = spawn_app().await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start",
        "start_date=2016-08-23",
    )
    .await;
    assert!(response.status().is_success());

    let summaries = body_json(response).await;
    let summaries = summaries.as_array().expect("expected a json array");
    assert_eq!(summaries.len(), 6);

    // Both stations reported on 2016-08-23
    assert_eq!(
        summaries[0],
        json!({"2016-08-23": {"min_temp": 70.0, "max_temp": 77.0, "avg_temp": 73.5}})
    );

    for group in summaries {
        let (_, summary) = group
            .as_object()
            .and_then(|g| g.iter().next())
            .expect("each group holds one date");
        let min = summary["min_temp"].as_f64().unwrap();
        let max = summary["max_temp"].as_f64().unwrap();
        let avg = summary["avg_temp"].as_f64().unwrap();
        assert!(min <= avg && avg <= max);
    }
}

#[tokio::test]
async fn temp_range_is_inclusive_on_both_edges() {
    let test_app = spawn_app().await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start/end",
        "start_date=2017-08-21&end_date=2017-08-22",
    )
    .await;
    assert!(response.status().is_success());

    let summaries = body_json(response).await;
    assert_eq!(
        summaries,
        json!([
            {"2017-08-21": {"min_temp": 75.0, "max_temp": 75.0, "avg_temp": 75.0}},
            {"2017-08-22": {"min_temp": 80.0, "max_temp": 80.0, "avg_temp": 80.0}},
        ])
    );
}

#[tokio::test]
async fn inverted_range_yields_an_empty_sequence() {
    let test_app = spawn_app().await;

    // end < start is allowed and simply matches nothing
    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start/end",
        "start_date=2017-08-22&end_date=2017-08-21",
    )
    .await;
    assert!(response.status().is_success());

    let summaries = body_json(response).await;
    assert_eq!(summaries, json!([]));
}

#[tokio::test]
async fn malformed_start_date_names_the_valid_window() {
    let test_app = spawn_app().await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start",
        "start_date=08-21-2017",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_text(response).await;
    assert!(body.contains("2016-01-01"));
    assert!(body.contains("2017-08-23"));
}

#[tokio::test]
async fn out_of_range_start_date_is_rejected() {
    let test_app = spawn_app().await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start",
        "start_date=2015-01-01",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn end_date_past_the_dataset_is_rejected() {
    let test_app = spawn_app().await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start/end",
        "start_date=2017-01-01&end_date=2018-01-01",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_text(response).await;
    assert!(body.contains("2017-08-23"));
}

#[tokio::test]
async fn validation_rejects_before_touching_the_store() {
    let mut store = MockClimateStore::new();
    store
        .expect_date_bounds()
        .returning(|| Ok(DateBounds::new(date!(2016 - 01 - 01), date!(2017 - 08 - 23))));
    // No expectation on daily_temperature_stats: the mock panics if the
    // handler reaches the store with an invalid date

    let test_app = spawn_app_with_store(Arc::new(store)).await;

    let response = post_form(
        &test_app.app,
        "/api/v1.0/temp/start",
        "start_date=not-a-date",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
