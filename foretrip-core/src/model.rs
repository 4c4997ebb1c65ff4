use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::LocateError,
    provider::ProviderId,
    zoom::{Span, ZoomClass},
};

/// Name shown for refreshes driven by the position watch.
pub const CURRENT_LOCATION_NAME: &str = "Your Location";

/// Name shown for a point tapped on the map.
pub const CUSTOM_LOCATION_NAME: &str = "Custom Location";

/// Visible map region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

impl Viewport {
    pub fn around(latitude: f64, longitude: f64, span: Span) -> Self {
        Self {
            center_latitude: latitude,
            center_longitude: longitude,
            latitude_span: span.latitude,
            longitude_span: span.longitude,
        }
    }

    pub fn span(&self) -> Span {
        Span { latitude: self.latitude_span, longitude: self.longitude_span }
    }

    /// The smaller of the two spans; small means zoomed in.
    pub fn min_span(&self) -> f64 {
        self.latitude_span.min(self.longitude_span)
    }

    pub fn is_finite(&self) -> bool {
        [self.center_latitude, self.center_longitude, self.latitude_span, self.longitude_span]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// A fix from the position watch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, timestamp: Utc::now() }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// A place returned by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zoom_class: ZoomClass,
    pub source: ProviderId,
    pub rating: Option<f64>,
}

impl PlaceCandidate {
    pub fn new(
        display_name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        zoom_class: ZoomClass,
        source: ProviderId,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            latitude,
            longitude,
            zoom_class,
            source,
            rating: None,
        }
    }

    /// A point the user tapped on the map.
    pub fn pin(latitude: f64, longitude: f64) -> Self {
        Self::new(CUSTOM_LOCATION_NAME, latitude, longitude, ZoomClass::Route, ProviderId::Pin)
    }

    /// Text before the first comma of the display name.
    pub fn short_name(&self) -> &str {
        self.display_name.split(',').next().map(str::trim).unwrap_or(&self.display_name)
    }

    pub fn target_viewport(&self) -> Viewport {
        Viewport::around(self.latitude, self.longitude, self.zoom_class.span())
    }

    pub fn refresh_target(&self) -> RefreshTarget {
        RefreshTarget {
            latitude: self.latitude,
            longitude: self.longitude,
            display_name: self.short_name().to_string(),
        }
    }
}

/// What a weather refresh is requested for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTarget {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl RefreshTarget {
    pub fn new(latitude: f64, longitude: f64, display_name: impl Into<String>) -> Self {
        Self { latitude, longitude, display_name: display_name.into() }
    }

    pub fn validate(&self) -> Result<(), LocateError> {
        validate_coordinates(self.latitude, self.longitude)
    }

    pub fn request(&self) -> WeatherRequest {
        WeatherRequest {
            latitude: self.latitude,
            longitude: self.longitude,
            location_name: self.display_name.clone(),
        }
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), LocateError> {
    if latitude.is_finite() && longitude.is_finite() {
        Ok(())
    } else {
        Err(LocateError::InputInvalid(format!(
            "coordinates must be finite numbers, got ({latitude}, {longitude})"
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
}

/// Current conditions and forecast returned by the weather backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub feels_like: Option<f64>,
    pub precipitation: Option<f64>,
    pub precipitation_24h: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub uv_index: Option<f64>,
    pub visibility: Option<f64>,
    pub pressure: Option<f64>,
    pub condition: Option<String>,
    pub forecast: Vec<serde_json::Value>,
    pub satellite: SatelliteStatus,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteStatus {
    pub modis: bool,
    pub gpm: bool,
}
