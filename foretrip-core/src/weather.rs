//! Client for the ForeTrip weather backend.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{
    Config,
    error::{WeatherError, truncate_body},
    model::{SatelliteStatus, WeatherRequest, WeatherSnapshot, validate_coordinates},
};

pub const DEFAULT_WEATHER_API_URL: &str = "http://localhost:8001";

/// Fetches weather for a point. Invoked by the coordinator on every refresh.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct HttpWeatherProvider {
    base_url: String,
    http: Client,
}

impl HttpWeatherProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }

    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        Self::new(config.weather_api_url(), config.request_timeout())
    }

    /// `GET /health`; returns the backend's status document.
    pub async fn health(&self) -> Result<serde_json::Value, WeatherError> {
        let res = self.http.get(format!("{}/health", self.base_url)).send().await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(WeatherError::Server {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct WxResponse {
    current: WxCurrent,
    #[serde(default)]
    forecast: Vec<serde_json::Value>,
    satellite_data: Option<WxSatelliteData>,
}

#[derive(Debug, Deserialize)]
struct WxCurrent {
    temperature: f64,
    temperature_feels_like: Option<f64>,
    precipitation: Option<f64>,
    precipitation_24h: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    wind_direction: Option<f64>,
    cloud_cover: Option<f64>,
    uv_index: Option<f64>,
    visibility: Option<f64>,
    pressure: Option<f64>,
    condition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WxSatelliteData {
    modis: Option<WxSatellite>,
    gpm: Option<WxSatellite>,
}

#[derive(Debug, Deserialize)]
struct WxSatellite {
    #[serde(default)]
    available: bool,
}

#[async_trait]
impl WeatherProvider for HttpWeatherProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot, WeatherError> {
        validate_coordinates(request.latitude, request.longitude)
            .map_err(|e| WeatherError::InputInvalid(e.to_string()))?;

        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", request.latitude.to_string()),
                ("lon", request.longitude.to_string()),
                ("location_name", request.location_name.clone()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Server {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: WxResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        let satellite = parsed
            .satellite_data
            .map(|s| SatelliteStatus {
                modis: s.modis.is_some_and(|m| m.available),
                gpm: s.gpm.is_some_and(|g| g.available),
            })
            .unwrap_or_default();

        let current = parsed.current;
        Ok(WeatherSnapshot {
            location_name: request.location_name.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            temperature: current.temperature,
            feels_like: current.temperature_feels_like,
            precipitation: current.precipitation,
            precipitation_24h: current.precipitation_24h,
            humidity: current.humidity,
            wind_speed: current.wind_speed,
            wind_direction: current.wind_direction,
            cloud_cover: current.cloud_cover,
            uv_index: current.uv_index,
            visibility: current.visibility,
            pressure: current.pressure,
            condition: current.condition,
            forecast: parsed.forecast,
            satellite,
            fetched_at: Utc::now(),
        })
    }
}
