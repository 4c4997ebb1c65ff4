use async_trait::async_trait;

use crate::{
    error::LocateError,
    model::PlaceCandidate,
    provider::{PlaceProvider, ProviderId},
    zoom::ZoomClass,
};

struct PopularPlace {
    name: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
}

const fn place(
    name: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
) -> PopularPlace {
    PopularPlace { name, country, latitude, longitude }
}

static POPULAR_PLACES: &[PopularPlace] = &[
    place("New York City", "USA", 40.7128, -74.0060),
    place("London", "UK", 51.5074, -0.1278),
    place("Paris", "France", 48.8566, 2.3522),
    place("Tokyo", "Japan", 35.6762, 139.6503),
    place("Sydney", "Australia", -33.8688, 151.2093),
    place("Dubai", "UAE", 25.2048, 55.2708),
    place("Los Angeles", "USA", 34.0522, -118.2437),
    place("Singapore", "Singapore", 1.3521, 103.8198),
    place("Hong Kong", "China", 22.3193, 114.1694),
    place("Barcelona", "Spain", 41.3851, 2.1734),
    place("Mumbai", "India", 19.0760, 72.8777),
    place("São Paulo", "Brazil", -23.5505, -46.6333),
    place("Cairo", "Egypt", 30.0444, 31.2357),
    place("Moscow", "Russia", 55.7558, 37.6176),
    place("Seoul", "South Korea", 37.5665, 126.9780),
    place("Bangkok", "Thailand", 13.7563, 100.5018),
    place("Istanbul", "Turkey", 41.0082, 28.9784),
    place("Mexico City", "Mexico", 19.4326, -99.1332),
    place("Cape Town", "South Africa", -33.9249, 18.4241),
    place("Miami", "USA", 25.7617, -80.1918),
];

/// Built-in list of popular destinations, used when the network chain is
/// exhausted or offline mode is on. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPlaces;

impl LocalPlaces {
    /// Case-insensitive substring match on name and country.
    fn matching(&self, query: &str) -> Vec<PlaceCandidate> {
        let needle = query.trim().to_lowercase();

        POPULAR_PLACES
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.country.to_lowercase().contains(&needle)
            })
            .map(|p| {
                PlaceCandidate::new(
                    format!("{}, {}", p.name, p.country),
                    p.latitude,
                    p.longitude,
                    ZoomClass::Locality,
                    ProviderId::Local,
                )
            })
            .collect()
    }
}

#[async_trait]
impl PlaceProvider for LocalPlaces {
    fn id(&self) -> ProviderId {
        ProviderId::Local
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, LocateError> {
        Ok(self.matching(query))
    }
}
