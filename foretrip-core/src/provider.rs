use crate::{Config, PlaceCandidate, error::LocateError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod google;
pub mod local;
pub mod nominatim;

pub use google::GooglePlacesProvider;
pub use local::LocalPlaces;
pub use nominatim::NominatimProvider;

/// Sent with every geocoding request; Nominatim rejects anonymous clients.
pub const USER_AGENT: &str = concat!("ForeTrip/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    GooglePlaces,
    Nominatim,
    Local,
    Pin,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::GooglePlaces => "google",
            ProviderId::Nominatim => "nominatim",
            ProviderId::Local => "local",
            ProviderId::Pin => "pin",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::GooglePlaces, ProviderId::Nominatim, ProviderId::Local, ProviderId::Pin]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "google" | "google_places" => Ok(ProviderId::GooglePlaces),
            "nominatim" | "osm" => Ok(ProviderId::Nominatim),
            "local" => Ok(ProviderId::Local),
            "pin" => Ok(ProviderId::Pin),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: google, nominatim, local."
            )),
        }
    }
}

/// A place search backend.
#[async_trait]
pub trait PlaceProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, LocateError>;
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn request_error(provider: ProviderId, err: reqwest::Error) -> LocateError {
    if err.is_timeout() {
        LocateError::unavailable(provider, "request timed out")
    } else {
        LocateError::unavailable(provider, err.to_string())
    }
}

/// Build the network chain from config, most capable first.
///
/// Google Places joins only when an API key is configured; Nominatim is
/// always present.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Vec<Box<dyn PlaceProvider>>> {
    let timeout = config.request_timeout();
    let mut chain: Vec<Box<dyn PlaceProvider>> = Vec::new();

    if let Some(api_key) = config.provider_api_key(ProviderId::GooglePlaces) {
        let mut google = GooglePlacesProvider::new(api_key.to_owned(), timeout)?;
        if let Some(url) = config.provider_base_url(ProviderId::GooglePlaces) {
            google = google.with_base_url(url);
        }
        chain.push(Box::new(google));
    }

    let mut nominatim = NominatimProvider::new(timeout)?;
    if let Some(url) = config.provider_base_url(ProviderId::Nominatim) {
        nominatim = nominatim.with_base_url(url);
    }
    chain.push(Box::new(nominatim));

    Ok(chain)
}
