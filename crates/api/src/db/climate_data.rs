use async_trait::async_trait;
use log::info;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use time::{format_description::BorrowedFormatItem, macros::format_description, Date, Duration};
use utoipa::ToSchema;

/// Wire format for every date in the dataset.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query sqlite: {0}")]
    Query(#[from] sqlx::Error),
    #[error("Failed to format date: {0}")]
    DateFormat(#[from] time::error::Format),
    #[error("Stored date is not YYYY-MM-DD: {0}")]
    DateParse(#[from] time::error::Parse),
    #[error("measurement table has no rows, cannot derive date bounds")]
    EmptyDataset,
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Date window covered by the dataset, derived once at startup and treated as
/// immutable afterwards. Requests validate against these bounds; the store is
/// never re-scanned, so later inserts into the file are not picked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateBounds {
    pub first: Date,
    pub last: Date,
    /// Fixed lower bound for the trailing-year routes: one year before `last`,
    /// inclusive. Anchored to the dataset, not to the current day.
    pub cutoff: Date,
}

impl DateBounds {
    pub fn new(first: Date, last: Date) -> Self {
        Self {
            first,
            last,
            cutoff: last - Duration::days(365),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Station {
    pub station_id: String,
    pub name: String,
}

/// One (date, value) pair from the measurement table. `value` stays optional
/// since gauges report empty readings for some days.
#[derive(Debug, Clone)]
pub struct DailyReading {
    pub date: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyTemperatureStats {
    pub date: String,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
}

#[async_trait]
pub trait ClimateData: Send + Sync {
    /// First and last measurement dates; errors when the table is empty.
    async fn date_bounds(&self) -> Result<DateBounds, Error>;
    async fn precipitation_since(&self, cutoff: Date) -> Result<Vec<DailyReading>, Error>;
    async fn stations(&self) -> Result<Vec<Station>, Error>;
    /// Station id with the highest measurement row count. Ties resolve to
    /// whichever station sqlite returns first.
    async fn most_active_station(&self) -> Result<Option<String>, Error>;
    async fn temperature_observations(
        &self,
        station_id: &str,
        cutoff: Date,
    ) -> Result<Vec<DailyReading>, Error>;
    /// Min/max/avg temperature per distinct date with `date >= start` (and
    /// `date <= end` when given), ordered by date. One row per date, never a
    /// single overall aggregate.
    async fn daily_temperature_stats(
        &self,
        start: Date,
        end: Option<Date>,
    ) -> Result<Vec<DailyTemperatureStats>, Error>;
}

pub struct ClimateAccess {
    pool: SqlitePool,
}

impl ClimateAccess {
    /// Opens a read-only pool over a pre-populated database file. Each request
    /// checks a connection out of the pool and returns it when the query
    /// finishes, on the error path included.
    pub async fn new(db_path: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
            .read_only(true)
            .pragma("busy_timeout", "5000")
            .pragma("cache_size", "-64000");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!("SQLite database opened read-only at: {}", db_path);
        Ok(Self { pool })
    }

    /// Wraps an existing pool, used by tests that seed an in-memory database.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ClimateData for ClimateAccess {
    async fn date_bounds(&self) -> Result<DateBounds, Error> {
        let row: (Option<String>, Option<String>) =
            sqlx::query_as("SELECT MIN(date), MAX(date) FROM measurement")
                .fetch_one(&self.pool)
                .await?;

        let (Some(first), Some(last)) = row else {
            return Err(Error::EmptyDataset);
        };

        Ok(DateBounds::new(
            Date::parse(&first, DATE_FORMAT)?,
            Date::parse(&last, DATE_FORMAT)?,
        ))
    }

    async fn precipitation_since(&self, cutoff: Date) -> Result<Vec<DailyReading>, Error> {
        let cutoff = cutoff.format(DATE_FORMAT)?;
        let rows: Vec<(String, Option<f64>)> =
            sqlx::query_as("SELECT date, prcp FROM measurement WHERE date >= ?")
                .bind(&cutoff)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(date, value)| DailyReading { date, value })
            .collect())
    }

    async fn stations(&self) -> Result<Vec<Station>, Error> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT station, name FROM station")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(station_id, name)| Station { station_id, name })
            .collect())
    }

    async fn most_active_station(&self) -> Result<Option<String>, Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT station FROM measurement GROUP BY station \
             ORDER BY COUNT(station) DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(station,)| station))
    }

    async fn temperature_observations(
        &self,
        station_id: &str,
        cutoff: Date,
    ) -> Result<Vec<DailyReading>, Error> {
        let cutoff = cutoff.format(DATE_FORMAT)?;
        let rows: Vec<(String, Option<f64>)> =
            sqlx::query_as("SELECT date, tobs FROM measurement WHERE station = ? AND date >= ?")
                .bind(station_id)
                .bind(&cutoff)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(date, value)| DailyReading { date, value })
            .collect())
    }

    async fn daily_temperature_stats(
        &self,
        start: Date,
        end: Option<Date>,
    ) -> Result<Vec<DailyTemperatureStats>, Error> {
        let start = start.format(DATE_FORMAT)?;

        let rows: Vec<(String, f64, f64, f64)> = match end {
            Some(end) => {
                let end = end.format(DATE_FORMAT)?;
                sqlx::query_as(
                    "SELECT date, MIN(tobs), MAX(tobs), AVG(tobs) FROM measurement \
                     WHERE tobs IS NOT NULL AND date >= ? AND date <= ? \
                     GROUP BY date ORDER BY date",
                )
                .bind(&start)
                .bind(&end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT date, MIN(tobs), MAX(tobs), AVG(tobs) FROM measurement \
                     WHERE tobs IS NOT NULL AND date >= ? \
                     GROUP BY date ORDER BY date",
                )
                .bind(&start)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(date, min_temp, max_temp, avg_temp)| DailyTemperatureStats {
                date,
                min_temp,
                max_temp,
                avg_temp,
            })
            .collect())
    }
}
