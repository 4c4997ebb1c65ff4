use std::{sync::Arc, time::Duration};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use foretrip_core::{
    Config, CoordinatorEvent, HttpWeatherProvider, LocationCoordinator, PlaceCandidate,
    PlaceResolver, Position, ProviderId, RefreshTarget, ResolveOptions, UpdateOutcome,
    WeatherProvider, WeatherSnapshot,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::UnboundedReceiver,
};
use tracing::{debug, warn};

/// Extra wait after the last update before `track` gives up on pending work.
const SETTLE_MARGIN: Duration = Duration::from_secs(1);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "foretrip", version, about = "Weather along the places you look at")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigureTarget {
    /// Google Places API key.
    Google,
    /// Weather backend URL.
    Weather,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively configure a provider key or the weather backend.
    Configure {
        #[arg(value_enum)]
        target: ConfigureTarget,
    },

    /// Search for places.
    Search {
        query: String,

        /// Only search the built-in list of popular places.
        #[arg(long, conflicts_with = "online_only")]
        offline: bool,

        /// Fail instead of falling back to the built-in list.
        #[arg(long)]
        online_only: bool,
    },

    /// Show the weather for a place or a point.
    Show {
        /// Place name; the first match is used.
        #[arg(required_unless_present = "at", conflicts_with = "at")]
        query: Option<String>,

        /// Coordinates as "lat,lon".
        #[arg(long, value_parser = parse_lat_lon, allow_hyphen_values = true)]
        at: Option<(f64, f64)>,
    },

    /// Follow "lat,lon" lines from stdin like a position watch.
    Track,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { target } => configure(target),
            Command::Search { query, offline, online_only } => {
                search(&query, offline, online_only).await
            }
            Command::Show { query, at } => show(query, at).await,
            Command::Track => track().await,
        }
    }
}

fn configure(target: ConfigureTarget) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    match target {
        ConfigureTarget::Google => {
            let api_key = inquire::Password::new("Google Places API key:")
                .without_confirmation()
                .prompt()
                .context("Failed to read API key")?;

            if api_key.trim().is_empty() {
                bail!("API key must not be empty");
            }
            cfg.upsert_provider_api_key(ProviderId::GooglePlaces, api_key.trim().to_string());
        }
        ConfigureTarget::Weather => {
            let url = inquire::Text::new("Weather backend URL:")
                .with_default(cfg.weather_api_url())
                .prompt()
                .context("Failed to read weather backend URL")?;

            let url = url.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Weather backend URL must start with http:// or https://");
            }
            cfg.set_weather_api_url(url);
        }
    }

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn search(query: &str, offline: bool, online_only: bool) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let resolver = PlaceResolver::from_config(&cfg)?;
    resolver.set_offline(offline);

    let resolution =
        resolver.resolve_with(query, ResolveOptions { require_online: online_only }).await?;

    if resolution.candidates.is_empty() {
        println!("No places found for '{query}'.");
        return Ok(());
    }

    if resolution.offline {
        println!("(offline: showing built-in places)");
    }
    for (i, place) in resolution.candidates.iter().enumerate() {
        print_candidate(i + 1, place);
    }

    Ok(())
}

async fn show(query: Option<String>, at: Option<(f64, f64)>) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let (coordinator, mut events) = coordinator(&cfg)?;

    let outcome = match (query, at) {
        (_, Some((lat, lon))) => coordinator.select_point(lat, lon),
        (Some(query), None) => {
            let resolver = PlaceResolver::from_config(&cfg)?;
            let resolution = resolver.resolve(&query).await?;
            let place = resolution
                .candidates
                .first()
                .ok_or_else(|| anyhow!("No places found for '{query}'"))?;

            print_candidate(1, place);
            coordinator.select_location(place)
        }
        (None, None) => bail!("Either a place name or --at is required"),
    };

    if outcome != UpdateOutcome::Fired {
        bail!("Location rejected ({outcome:?})");
    }

    while let Some(event) = events.recv().await {
        if let CoordinatorEvent::Weather { target, result } = event {
            match result {
                Ok(snapshot) => print_weather(&target, &snapshot),
                Err(err) => {
                    warn!("Weather fetch failed: {err}");
                    println!("{}", err.user_message());
                }
            }
            break;
        }
    }

    coordinator.shutdown();
    Ok(())
}

async fn track() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let (coordinator, mut events) = coordinator(&cfg)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_lat_lon(&line) {
                    Ok((lat, lon)) => {
                        let outcome = coordinator.on_position_updated(Position::new(lat, lon));
                        debug!("Position {lat},{lon}: {outcome:?}");
                    }
                    Err(err) => warn!("Skipping line '{}': {}", line.trim(), err),
                }
            }
            Some(event) = events.recv() => print_event(event),
        }
    }

    // The last update may still be waiting out its debounce or throttle.
    let settle = cfg.refresh.max_settle() + cfg.request_timeout() + SETTLE_MARGIN;
    drain_events(&mut events, settle).await;

    coordinator.shutdown();
    Ok(())
}

async fn drain_events(events: &mut UnboundedReceiver<CoordinatorEvent>, settle: Duration) {
    let deadline = tokio::time::Instant::now() + settle;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(event),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }
}

fn coordinator(
    cfg: &Config,
) -> anyhow::Result<(LocationCoordinator, UnboundedReceiver<CoordinatorEvent>)> {
    let weather: Arc<dyn WeatherProvider> = Arc::new(HttpWeatherProvider::from_config(cfg)?);
    Ok(LocationCoordinator::new(cfg.refresh.clone(), weather))
}

fn parse_lat_lon(value: &str) -> Result<(f64, f64), String> {
    let (lat, lon) =
        value.split_once(',').ok_or_else(|| format!("expected \"lat,lon\", got '{value}'"))?;

    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    // Also rejects NaN.
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinates out of range: {lat},{lon}"));
    }
    Ok((lat, lon))
}

fn print_candidate(index: usize, place: &PlaceCandidate) {
    let rating = place.rating.map(|r| format!(", rated {r:.1}")).unwrap_or_default();
    println!(
        "{index}. {} ({:.4}, {:.4}) [{} / {}{rating}]",
        place.display_name, place.latitude, place.longitude, place.source, place.zoom_class
    );
}

fn print_event(event: CoordinatorEvent) {
    match event {
        CoordinatorEvent::MoveCamera(viewport) => debug!(
            "Camera to {:.4}, {:.4}",
            viewport.center_latitude, viewport.center_longitude
        ),
        CoordinatorEvent::RefreshStarted(target) => {
            println!(
                "Refreshing {} ({:.4}, {:.4})...",
                target.display_name, target.latitude, target.longitude
            );
        }
        CoordinatorEvent::Weather { target, result } => match result {
            Ok(snapshot) => print_weather(&target, &snapshot),
            Err(err) => println!("{}: {}", target.display_name, err.user_message()),
        },
    }
}

fn print_weather(target: &RefreshTarget, snapshot: &WeatherSnapshot) {
    println!(
        "Weather for {} ({:.4}, {:.4})",
        target.display_name, target.latitude, target.longitude
    );

    let condition = snapshot.condition.as_deref().unwrap_or("n/a");
    println!("  Condition:   {condition}");
    println!("  Temperature: {:.1}°C", snapshot.temperature);
    print_optional("Feels like", snapshot.feels_like, "°C");
    print_optional("Humidity", snapshot.humidity, "%");
    print_optional("Wind", snapshot.wind_speed, " m/s");
    print_optional("Precipitation", snapshot.precipitation, " mm");
    print_optional("Cloud cover", snapshot.cloud_cover, "%");
    print_optional("UV index", snapshot.uv_index, "");
    print_optional("Pressure", snapshot.pressure, " hPa");

    if !snapshot.forecast.is_empty() {
        println!("  Forecast:    {} entries", snapshot.forecast.len());
    }
    println!("  Fetched at:  {}", snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

fn print_optional(label: &str, value: Option<f64>, unit: &str) {
    if let Some(value) = value {
        println!("  {:<12} {value:.1}{unit}", format!("{label}:"));
    }
}
