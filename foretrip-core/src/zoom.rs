//! Zoom classes: how specific a resolved place is, and the map span that
//! fits it.

use serde::{Deserialize, Serialize};

/// Span used when nothing is known about the place.
pub const DEFAULT_SPAN: Span = Span { latitude: 0.0922, longitude: 0.0421 };

/// Viewport size in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub latitude: f64,
    pub longitude: f64,
}

impl Span {
    pub const fn square(degrees: f64) -> Self {
        Self { latitude: degrees, longitude: degrees }
    }
}

/// Ordered from most to least granular.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ZoomClass {
    StreetAddress,
    Route,
    Neighborhood,
    #[default]
    Locality,
    #[serde(rename = "admin_level_3")]
    AdminLevel3,
    #[serde(rename = "admin_level_2")]
    AdminLevel2,
    #[serde(rename = "admin_level_1")]
    AdminLevel1,
    Country,
}

impl ZoomClass {
    pub const fn all() -> &'static [ZoomClass] {
        &[
            ZoomClass::StreetAddress,
            ZoomClass::Route,
            ZoomClass::Neighborhood,
            ZoomClass::Locality,
            ZoomClass::AdminLevel3,
            ZoomClass::AdminLevel2,
            ZoomClass::AdminLevel1,
            ZoomClass::Country,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomClass::StreetAddress => "street_address",
            ZoomClass::Route => "route",
            ZoomClass::Neighborhood => "neighborhood",
            ZoomClass::Locality => "locality",
            ZoomClass::AdminLevel3 => "admin_level_3",
            ZoomClass::AdminLevel2 => "admin_level_2",
            ZoomClass::AdminLevel1 => "admin_level_1",
            ZoomClass::Country => "country",
        }
    }

    /// Map span for the class.
    pub fn span(&self) -> Span {
        match self {
            ZoomClass::StreetAddress => Span::square(0.002),
            ZoomClass::Route => Span::square(0.005),
            ZoomClass::Neighborhood => Span::square(0.01),
            ZoomClass::Locality => Span::square(0.02),
            ZoomClass::AdminLevel3 => Span::square(0.05),
            ZoomClass::AdminLevel2 => Span::square(0.1),
            ZoomClass::AdminLevel1 => Span::square(0.2),
            ZoomClass::Country => Span::square(2.0),
        }
    }

    /// Canonical names plus the Google `administrative_area_level_N` aliases.
    pub fn parse(value: &str) -> Option<ZoomClass> {
        match value.trim().to_lowercase().as_str() {
            "street_address" => Some(ZoomClass::StreetAddress),
            "route" => Some(ZoomClass::Route),
            "neighborhood" => Some(ZoomClass::Neighborhood),
            "locality" => Some(ZoomClass::Locality),
            "admin_level_3" | "administrative_area_level_3" => Some(ZoomClass::AdminLevel3),
            "admin_level_2" | "administrative_area_level_2" => Some(ZoomClass::AdminLevel2),
            "admin_level_1" | "administrative_area_level_1" => Some(ZoomClass::AdminLevel1),
            "country" => Some(ZoomClass::Country),
            _ => None,
        }
    }

    /// Google Places `types`: the first recognised entry wins.
    pub fn from_google_types<S: AsRef<str>>(types: &[S]) -> ZoomClass {
        types
            .iter()
            .find_map(|t| match t.as_ref() {
                "sublocality" => Some(ZoomClass::Neighborhood),
                "establishment" | "point_of_interest" | "tourist_attraction" => {
                    Some(ZoomClass::Route)
                }
                other => ZoomClass::parse(other),
            })
            .unwrap_or_default()
    }

    /// Nominatim (OpenStreetMap) `type`, then `class`.
    pub fn from_osm(osm_type: Option<&str>, osm_class: Option<&str>) -> ZoomClass {
        osm_type
            .and_then(osm_zoom_class)
            .or_else(|| osm_class.and_then(osm_zoom_class))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for ZoomClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn osm_zoom_class(value: &str) -> Option<ZoomClass> {
    match value {
        "house" => Some(ZoomClass::StreetAddress),
        "building" | "highway" | "amenity" | "shop" | "tourism" | "leisure" => {
            Some(ZoomClass::Route)
        }
        "suburb" | "neighbourhood" => Some(ZoomClass::Neighborhood),
        "city" | "town" | "village" | "hamlet" => Some(ZoomClass::Locality),
        "county" => Some(ZoomClass::AdminLevel3),
        "state" => Some(ZoomClass::AdminLevel1),
        "country" => Some(ZoomClass::Country),
        _ => None,
    }
}

/// Span for a zoom class name; unknown names get [`DEFAULT_SPAN`].
pub fn zoom_span(value: &str) -> Span {
    ZoomClass::parse(value).map(|class| class.span()).unwrap_or(DEFAULT_SPAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_round_trips_through_its_name() {
        for class in ZoomClass::all() {
            assert_eq!(ZoomClass::parse(class.as_str()), Some(*class));
            assert_eq!(zoom_span(class.as_str()), class.span());
        }
    }

    #[test]
    fn unknown_names_get_the_default_span() {
        assert_eq!(zoom_span("galaxy"), DEFAULT_SPAN);
        assert_eq!(zoom_span(""), DEFAULT_SPAN);
        assert_eq!(DEFAULT_SPAN.latitude, 0.0922);
        assert_eq!(DEFAULT_SPAN.longitude, 0.0421);
    }

    #[test]
    fn classes_are_ordered_by_granularity() {
        assert!(ZoomClass::StreetAddress < ZoomClass::Route);
        assert!(ZoomClass::Locality < ZoomClass::AdminLevel3);
        assert!(ZoomClass::AdminLevel1 < ZoomClass::Country);

        let spans: Vec<f64> = ZoomClass::all().iter().map(|c| c.span().latitude).collect();
        assert!(spans.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn google_types_take_the_first_known_entry() {
        assert_eq!(
            ZoomClass::from_google_types(&["political", "locality"]),
            ZoomClass::Locality
        );
        assert_eq!(
            ZoomClass::from_google_types(&["tourist_attraction", "locality"]),
            ZoomClass::Route
        );
        assert_eq!(
            ZoomClass::from_google_types(&["administrative_area_level_1", "political"]),
            ZoomClass::AdminLevel1
        );
        assert_eq!(ZoomClass::from_google_types(&["sublocality"]), ZoomClass::Neighborhood);
        assert_eq!(ZoomClass::from_google_types::<&str>(&[]), ZoomClass::Locality);
    }

    #[test]
    fn osm_type_wins_over_class() {
        assert_eq!(ZoomClass::from_osm(Some("city"), Some("place")), ZoomClass::Locality);
        assert_eq!(ZoomClass::from_osm(Some("yes"), Some("building")), ZoomClass::Route);
        assert_eq!(ZoomClass::from_osm(Some("house"), None), ZoomClass::StreetAddress);
        assert_eq!(ZoomClass::from_osm(Some("county"), None), ZoomClass::AdminLevel3);
        assert_eq!(ZoomClass::from_osm(Some("unknown"), Some("nope")), ZoomClass::Locality);
        assert_eq!(ZoomClass::from_osm(None, None), ZoomClass::Locality);
    }
}
