use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::{LocateError, truncate_body},
    model::PlaceCandidate,
    provider::{PlaceProvider, ProviderId, http_client, request_error},
    zoom::ZoomClass,
};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
const TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";

/// Google Places Text Search.
#[derive(Debug, Clone)]
pub struct GooglePlacesProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl GooglePlacesProvider {
    pub fn new(api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: http_client(timeout)? })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GpResponse {
    #[serde(default)]
    results: Vec<GpPlace>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GpPlace {
    name: Option<String>,
    formatted_address: Option<String>,
    geometry: GpGeometry,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GpGeometry {
    location: GpLatLng,
}

#[derive(Debug, Deserialize)]
struct GpLatLng {
    lat: f64,
    lng: f64,
}

impl GpPlace {
    fn into_candidate(self) -> PlaceCandidate {
        let display_name = match (self.name, self.formatted_address) {
            (Some(name), Some(address)) if !address.starts_with(&name) => {
                format!("{name}, {address}")
            }
            (_, Some(address)) => address,
            (Some(name), None) => name,
            (None, None) => {
                format!("{:.4}, {:.4}", self.geometry.location.lat, self.geometry.location.lng)
            }
        };

        PlaceCandidate {
            display_name,
            latitude: self.geometry.location.lat,
            longitude: self.geometry.location.lng,
            zoom_class: ZoomClass::from_google_types(&self.types),
            source: ProviderId::GooglePlaces,
            rating: self.rating,
        }
    }
}

#[async_trait]
impl PlaceProvider for GooglePlacesProvider {
    fn id(&self) -> ProviderId {
        ProviderId::GooglePlaces
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, LocateError> {
        let url = format!("{}{}", self.base_url, TEXT_SEARCH_PATH);

        let res = self
            .http
            .get(&url)
            .query(&[("query", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| request_error(self.id(), e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| request_error(self.id(), e))?;

        if !status.is_success() {
            return Err(LocateError::unavailable(
                self.id(),
                format!("status {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: GpResponse = serde_json::from_str(&body).map_err(|e| {
            LocateError::unavailable(self.id(), format!("failed to parse response: {e}"))
        })?;

        match parsed.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => {
                return Err(LocateError::unavailable(
                    self.id(),
                    format!("{other}: {}", parsed.error_message.unwrap_or_default()),
                ));
            }
        }

        Ok(parsed.results.into_iter().map(GpPlace::into_candidate).collect())
    }
}
