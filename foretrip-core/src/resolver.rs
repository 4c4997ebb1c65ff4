//! Free-text place search with provider failover.

use std::{
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    Config,
    error::LocateError,
    model::PlaceCandidate,
    provider::{LocalPlaces, PlaceProvider, ProviderId, providers_from_config},
};

/// Shorter queries resolve to nothing without touching any provider.
pub const MIN_QUERY_CHARS: usize = 2;

/// Consecutive provider failures, across calls, that switch on offline mode.
pub const OFFLINE_AFTER_FAILURES: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Report [`LocateError::NoResults`] instead of falling back to the
    /// built-in list when every network provider comes up empty.
    pub require_online: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub candidates: Vec<PlaceCandidate>,
    /// Provider that produced the candidates.
    pub source: ProviderId,
    /// Offline flag after this call.
    pub offline: bool,
}

/// Resolves queries against an ordered chain of providers.
///
/// Each network provider is tried in turn until one returns a non-empty
/// list. When the chain is exhausted the built-in list answers instead.
/// The resolver switches to offline mode, skipping the network on later
/// calls until [`PlaceResolver::set_offline`] clears it, once
/// [`OFFLINE_AFTER_FAILURES`] providers in a row have failed or a provider
/// answered with no places.
///
/// Starting a resolution aborts the one in flight; the aborted call returns
/// [`LocateError::Cancelled`].
#[derive(Debug)]
pub struct PlaceResolver {
    chain: Vec<Box<dyn PlaceProvider>>,
    local: LocalPlaces,
    timeout: Duration,
    offline: AtomicBool,
    consecutive_failures: AtomicU32,
    in_flight: Mutex<InFlight>,
}

impl PlaceResolver {
    pub fn new(chain: Vec<Box<dyn PlaceProvider>>, timeout: Duration) -> Self {
        Self {
            chain,
            local: LocalPlaces,
            timeout,
            offline: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(providers_from_config(config)?, config.request_timeout()))
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        if !offline {
            self.consecutive_failures.store(0, Ordering::SeqCst);
        }
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn resolve(&self, query: &str) -> Result<Resolution, LocateError> {
        self.resolve_with(query, ResolveOptions::default()).await
    }

    pub async fn resolve_with(
        &self,
        query: &str,
        options: ResolveOptions,
    ) -> Result<Resolution, LocateError> {
        let token = CancellationToken::new();
        let generation = {
            let mut in_flight = self.in_flight.lock();
            if let Some(previous) = in_flight.token.replace(token.clone()) {
                previous.cancel();
            }
            in_flight.generation += 1;
            in_flight.generation
        };

        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Resolution {
                candidates: Vec::new(),
                source: ProviderId::Local,
                offline: self.is_offline(),
            });
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(LocateError::Cancelled),
            outcome = self.run_chain(query, options, &token) => outcome,
        };

        // A newer call may have cancelled us while the chain was finishing.
        if token.is_cancelled() {
            debug!("Dropping superseded results for '{}'", query);
            return Err(LocateError::Cancelled);
        }

        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.generation == generation {
                in_flight.token = None;
            }
        }

        outcome
    }

    async fn run_chain(
        &self,
        query: &str,
        options: ResolveOptions,
        token: &CancellationToken,
    ) -> Result<Resolution, LocateError> {
        if self.is_offline() {
            debug!("Offline mode, searching built-in places for '{}'", query);
            return self.local_resolution(query).await;
        }

        let mut answered_empty = false;
        for provider in &self.chain {
            match self.search_one(provider.as_ref(), query).await {
                Ok(candidates) if !candidates.is_empty() => {
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    info!("{} returned {} places for '{}'", provider.id(), candidates.len(), query);
                    return Ok(Resolution {
                        candidates,
                        source: provider.id(),
                        offline: self.is_offline(),
                    });
                }
                Ok(_) => {
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    debug!("{} returned no places for '{}'", provider.id(), query);
                    answered_empty = true;
                }
                Err(err) if !err.is_recoverable() => return Err(err),
                Err(err) => {
                    self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
                    warn!("{} failed for '{}': {}", provider.id(), query, err);
                }
            }
        }

        if token.is_cancelled() {
            return Err(LocateError::Cancelled);
        }

        let failures = self.consecutive_failures.load(Ordering::SeqCst);
        if answered_empty || failures >= OFFLINE_AFTER_FAILURES {
            warn!("Online providers exhausted for '{}', switching to offline search", query);
            self.offline.store(true, Ordering::SeqCst);
        } else {
            warn!(
                "Online providers exhausted for '{}' ({} failure(s) in a row)",
                query, failures
            );
        }

        if options.require_online {
            return Err(LocateError::NoResults(query.to_string()));
        }

        self.local_resolution(query).await
    }

    async fn search_one(
        &self,
        provider: &dyn PlaceProvider,
        query: &str,
    ) -> Result<Vec<PlaceCandidate>, LocateError> {
        match tokio::time::timeout(self.timeout, provider.search(query)).await {
            Ok(result) => result,
            Err(_) => Err(LocateError::unavailable(
                provider.id(),
                format!("no response within {:?}", self.timeout),
            )),
        }
    }

    async fn local_resolution(&self, query: &str) -> Result<Resolution, LocateError> {
        let candidates = self.local.search(query).await?;
        Ok(Resolution { candidates, source: self.local.id(), offline: self.is_offline() })
    }
}

#[derive(Debug, Default)]
struct InFlight {
    generation: u64,
    token: Option<CancellationToken>,
}
