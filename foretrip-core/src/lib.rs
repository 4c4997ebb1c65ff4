//! Core library for ForeTrip.
//!
//! This crate defines:
//! - The location update coordinator (debounced, throttled weather refreshes)
//! - Place resolution over a chain of geocoding providers with offline fallback
//! - The weather backend client
//! - Configuration & shared domain models
//!
//! It is used by `foretrip-cli`, but any front-end that owns a tokio runtime
//! can drive it.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod geo;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod scheduler;
pub mod weather;
pub mod zoom;

pub use config::{Config, ProviderConfig};
pub use coordinator::{CoordinatorEvent, LocationCoordinator, RefreshPolicy, UpdateOutcome};
pub use error::{LocateError, WeatherError};
pub use model::{PlaceCandidate, Position, RefreshTarget, Viewport, WeatherRequest, WeatherSnapshot};
pub use provider::{PlaceProvider, ProviderId};
pub use resolver::{PlaceResolver, Resolution, ResolveOptions};
pub use weather::{HttpWeatherProvider, WeatherProvider};
pub use zoom::{Span, ZoomClass, zoom_span};
