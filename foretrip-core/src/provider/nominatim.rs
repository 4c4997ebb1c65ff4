//! Forward geocoding through Nominatim (OpenStreetMap). Free, no API key.

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

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const RESULT_LIMIT: &str = "8";

#[derive(Debug, Clone)]
pub struct NominatimProvider {
    base_url: String,
    http: Client,
}

impl NominatimProvider {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self { base_url: DEFAULT_BASE_URL.to_string(), http: http_client(timeout)? })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    // Nominatim sends coordinates as strings
    lat: String,
    lon: String,
    #[serde(rename = "type")]
    osm_type: Option<String>,
    class: Option<String>,
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<PlaceCandidate> {
        let latitude = self.lat.parse::<f64>().ok().filter(|v| v.is_finite())?;
        let longitude = self.lon.parse::<f64>().ok().filter(|v| v.is_finite())?;

        Some(PlaceCandidate {
            zoom_class: ZoomClass::from_osm(self.osm_type.as_deref(), self.class.as_deref()),
            display_name: self.display_name,
            latitude,
            longitude,
            source: ProviderId::Nominatim,
            rating: None,
        })
    }
}

#[async_trait]
impl PlaceProvider for NominatimProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Nominatim
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, LocateError> {
        let url = format!("{}/search", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", RESULT_LIMIT),
                ("addressdetails", "1"),
            ])
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

        let parsed: Vec<NominatimPlace> = serde_json::from_str(&body).map_err(|e| {
            LocateError::unavailable(self.id(), format!("failed to parse response: {e}"))
        })?;

        let total = parsed.len();
        let candidates: Vec<PlaceCandidate> =
            parsed.into_iter().filter_map(NominatimPlace::into_candidate).collect();

        if candidates.len() < total {
            tracing::debug!(
                "Dropped {} Nominatim results with unusable coordinates",
                total - candidates.len()
            );
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_coordinates_are_parsed() {
        let json = r#"{
            "display_name": "London, Greater London, England, United Kingdom",
            "lat": "51.5074456",
            "lon": "-0.1277653",
            "type": "city",
            "class": "place"
        }"#;
        let place: NominatimPlace = serde_json::from_str(json).expect("valid place");
        let candidate = place.into_candidate().expect("usable coordinates");

        assert_eq!(candidate.short_name(), "London");
        assert_eq!(candidate.zoom_class, ZoomClass::Locality);
        assert!((candidate.latitude - 51.5074).abs() < 1e-3);
    }

    #[test]
    fn unparsable_coordinates_are_dropped() {
        let json = r#"{ "display_name": "Nowhere", "lat": "north", "lon": "0.0" }"#;
        let place: NominatimPlace = serde_json::from_str(json).expect("valid place");

        assert!(place.into_candidate().is_none());
    }
}
