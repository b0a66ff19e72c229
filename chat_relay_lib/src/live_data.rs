use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tokio::{sync::Mutex, time::Instant};

use crate::{config::RelayConfig, error::RelayError, LOG_TARGET};

/// Maximum age of a cached weather snapshot.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

const CURRENT_FIELDS: &str = "temperature_2m,precipitation,wind_speed_10m";

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub wind_kmh: f64,
    pub precipitation_mm: f64,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn fact_line(&self) -> String {
        format!(
            "Weather in Galway: temperature {}°C, wind {} km/h, precipitation {} mm",
            self.temperature_c, self.wind_kmh, self.precipitation_mm
        )
    }
}

pub fn format_local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz)
        .format("%A, %d %B %Y %H:%M (%Z)")
        .to_string()
}

/// e.g. `Monday, 19 October 2026 14:05 (IST)`
pub fn current_local_time(tz: Tz) -> String {
    format_local_time(Utc::now(), tz)
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, RelayError>;
}

/// Open-Meteo forecast API, `current` block only.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    http: Client,
    url: String,
    timezone: String,
}

impl OpenMeteoSource {
    pub fn new(url: &str, timezone: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            timezone: timezone.to_string(),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, RelayError> {
        let res = self
            .http
            .get(&self.url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(RelayError::upstream)?;

        let status = res.status();
        let body = res.text().await.map_err(RelayError::upstream)?;

        if !status.is_success() {
            return Err(RelayError::UpstreamUnavailable(format!(
                "forecast request failed with status {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        parse_current(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentFields>,
}

#[derive(Debug, Deserialize)]
struct CurrentFields {
    temperature_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    precipitation: Option<f64>,
}

/// Parse a forecast body into a snapshot with display precision applied.
pub fn parse_current(body: &str) -> Result<WeatherSnapshot, RelayError> {
    let parsed: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| RelayError::upstream(format!("malformed forecast JSON: {e}")))?;

    let current = parsed
        .current
        .ok_or_else(|| RelayError::upstream("forecast response has no 'current' block"))?;

    let field = |v: Option<f64>, name: &str| {
        v.ok_or_else(|| RelayError::upstream(format!("forecast response missing current.{name}")))
    };

    Ok(WeatherSnapshot {
        temperature_c: round_to(field(current.temperature_2m, "temperature_2m")?, 1),
        wind_kmh: round_to(field(current.wind_speed_10m, "wind_speed_10m")?, 1),
        precipitation_mm: round_to(field(current.precipitation, "precipitation")?, 2),
        observed_at: Utc::now(),
    })
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Time and weather for one fixed location, with a single-slot weather cache.
pub struct LiveDataProvider {
    tz: Tz,
    latitude: f64,
    longitude: f64,
    source: Arc<dyn WeatherSource>,
    cache: Mutex<Option<(Instant, WeatherSnapshot)>>,
}

impl LiveDataProvider {
    pub fn new(tz: Tz, latitude: f64, longitude: f64, source: Arc<dyn WeatherSource>) -> Self {
        Self {
            tz,
            latitude,
            longitude,
            source,
            cache: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &RelayConfig) -> Result<Self, anyhow::Error> {
        let source = OpenMeteoSource::new(&cfg.weather_url, &cfg.timezone, cfg.weather_timeout())?;
        Ok(Self::new(cfg.tz()?, cfg.latitude, cfg.longitude, Arc::new(source)))
    }

    pub fn local_time(&self) -> String {
        current_local_time(self.tz)
    }

    /// Cached snapshot if younger than [`FRESHNESS_WINDOW`], otherwise a fresh
    /// fetch. The slot is only overwritten when the fetch succeeds.
    pub async fn weather(&self) -> Result<WeatherSnapshot, RelayError> {
        let mut slot = self.cache.lock().await;

        if let Some((fetched_at, snapshot)) = slot.as_ref() {
            if fetched_at.elapsed() < FRESHNESS_WINDOW {
                tracing::debug!(target: LOG_TARGET, "weather cache hit");
                return Ok(snapshot.clone());
            }
        }

        let snapshot = self
            .source
            .current_weather(self.latitude, self.longitude)
            .await?;
        tracing::info!(
            target: LOG_TARGET,
            "weather refreshed: {}C wind {}km/h precip {}mm",
            snapshot.temperature_c,
            snapshot.wind_kmh,
            snapshot.precipitation_mm
        );
        *slot = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }
}
