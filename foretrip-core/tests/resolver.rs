//! Place resolver fallback, offline mode and cancellation, driven by mock
//! providers under paused time.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use foretrip_core::{
    LocateError, PlaceCandidate, PlaceProvider, PlaceResolver, ProviderId, ResolveOptions,
    ZoomClass,
};

const TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Fail,
    Hang,
    Empty,
    Slow(Duration),
    Respond,
}

#[derive(Debug)]
struct MockProvider {
    id: ProviderId,
    behavior: Behavior,
    results: Vec<PlaceCandidate>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    fn new(id: ProviderId, behavior: Behavior) -> Self {
        Self { id, behavior, results: Vec::new(), calls: Arc::new(AtomicUsize::new(0)) }
    }

    fn returning(mut self, results: Vec<PlaceCandidate>) -> Self {
        self.results = results;
        self
    }

    fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl PlaceProvider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, LocateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Fail => Err(LocateError::unavailable(self.id, "status 503")),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.results_for(query))
            }
            Behavior::Respond => Ok(self.results_for(query)),
        }
    }
}

impl MockProvider {
    fn results_for(&self, query: &str) -> Vec<PlaceCandidate> {
        self.results
            .iter()
            .filter(|c| c.display_name.to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect()
    }
}

fn london_from(source: ProviderId) -> PlaceCandidate {
    let zoom = ZoomClass::from_osm(Some("city"), None);
    PlaceCandidate::new("London", 51.5074, -0.1278, zoom, source)
}

fn resolver(chain: Vec<MockProvider>) -> PlaceResolver {
    let chain: Vec<Box<dyn PlaceProvider>> =
        chain.into_iter().map(|p| Box::new(p) as Box<dyn PlaceProvider>).collect();
    PlaceResolver::new(chain, TIMEOUT)
}

#[tokio::test(start_paused = true)]
async fn primary_timeout_falls_back_to_secondary() {
    let primary = MockProvider::new(ProviderId::GooglePlaces, Behavior::Hang);
    let secondary = MockProvider::new(ProviderId::Nominatim, Behavior::Respond)
        .returning(vec![london_from(ProviderId::Nominatim)]);
    let resolver = resolver(vec![primary, secondary]);

    let resolution = resolver.resolve("Lon").await.expect("secondary succeeds");

    assert_eq!(resolution.candidates.len(), 1);
    assert_eq!(resolution.candidates[0].display_name, "London");
    assert_eq!(resolution.candidates[0].zoom_class, ZoomClass::Locality);
    assert_eq!(resolution.source, ProviderId::Nominatim);
    assert!(!resolution.offline);
    assert!(!resolver.is_offline());
}

#[tokio::test(start_paused = true)]
async fn primary_success_skips_secondary() {
    let primary = MockProvider::new(ProviderId::GooglePlaces, Behavior::Respond)
        .returning(vec![london_from(ProviderId::GooglePlaces)]);
    let secondary = MockProvider::new(ProviderId::Nominatim, Behavior::Respond);
    let secondary_calls = secondary.counter();
    let resolver = resolver(vec![primary, secondary]);

    let resolution = resolver.resolve("london").await.expect("primary succeeds");

    assert_eq!(resolution.source, ProviderId::GooglePlaces);
    assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn both_failing_switches_to_offline_list() {
    let primary = MockProvider::new(ProviderId::GooglePlaces, Behavior::Fail);
    let secondary = MockProvider::new(ProviderId::Nominatim, Behavior::Fail);
    let primary_calls = primary.counter();
    let secondary_calls = secondary.counter();
    let resolver = resolver(vec![primary, secondary]);

    let resolution = resolver.resolve("Zzzqx").await.expect("local list never fails");
    assert!(resolution.candidates.is_empty());
    assert_eq!(resolution.source, ProviderId::Local);
    assert!(resolution.offline);
    assert!(resolver.is_offline());

    let resolution = resolver.resolve("Tokyo").await.expect("local list never fails");
    assert_eq!(resolution.candidates.len(), 1);
    assert_eq!(resolution.candidates[0].display_name, "Tokyo, Japan");

    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_successes_move_down_the_chain() {
    let primary = MockProvider::new(ProviderId::GooglePlaces, Behavior::Empty);
    let secondary = MockProvider::new(ProviderId::Nominatim, Behavior::Empty);
    let resolver = resolver(vec![primary, secondary]);

    let resolution = resolver.resolve("paris").await.expect("local list answers");

    assert_eq!(resolution.source, ProviderId::Local);
    assert_eq!(resolution.candidates[0].display_name, "Paris, France");
    assert!(resolver.is_offline());
}

#[tokio::test(start_paused = true)]
async fn clearing_offline_goes_back_to_the_network() {
    let primary = MockProvider::new(ProviderId::Nominatim, Behavior::Respond)
        .returning(vec![london_from(ProviderId::Nominatim)]);
    let calls = primary.counter();
    let resolver = resolver(vec![primary]);

    resolver.set_offline(true);
    let offline = resolver.resolve("london").await.expect("local list answers");
    assert_eq!(offline.source, ProviderId::Local);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    resolver.set_offline(false);
    let online = resolver.resolve("london").await.expect("network answers");
    assert_eq!(online.source, ProviderId::Nominatim);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn require_online_reports_no_results() {
    let primary = MockProvider::new(ProviderId::GooglePlaces, Behavior::Fail);
    let resolver = resolver(vec![primary]);

    let err = resolver
        .resolve_with("london", ResolveOptions { require_online: true })
        .await
        .unwrap_err();

    assert!(matches!(err, LocateError::NoResults(q) if q == "london"));
    assert!(!resolver.is_offline());
}

#[tokio::test(start_paused = true)]
async fn single_provider_goes_offline_on_the_second_failure_in_a_row() {
    let nominatim = MockProvider::new(ProviderId::Nominatim, Behavior::Fail);
    let calls = nominatim.counter();
    let resolver = resolver(vec![nominatim]);

    let first = resolver.resolve("london").await.expect("local list answers");
    assert_eq!(first.source, ProviderId::Local);
    assert_eq!(first.candidates[0].display_name, "London, UK");
    assert!(!first.offline);
    assert!(!resolver.is_offline());

    let second = resolver.resolve("london").await.expect("local list answers");
    assert!(second.offline);
    assert!(resolver.is_offline());

    resolver.resolve("london").await.expect("local list answers");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn success_between_failures_keeps_the_resolver_online() {
    let flaky = MockProvider::new(ProviderId::GooglePlaces, Behavior::Fail);
    let backup = MockProvider::new(ProviderId::Nominatim, Behavior::Respond)
        .returning(vec![london_from(ProviderId::Nominatim)]);
    let resolver = resolver(vec![flaky, backup]);

    // Each call sees one failure followed by a success.
    for _ in 0..3 {
        let resolution = resolver.resolve("london").await.expect("backup answers");
        assert_eq!(resolution.source, ProviderId::Nominatim);
    }
    assert!(!resolver.is_offline());
}

#[tokio::test(start_paused = true)]
async fn short_queries_touch_no_provider() {
    let primary = MockProvider::new(ProviderId::GooglePlaces, Behavior::Respond);
    let calls = primary.counter();
    let resolver = resolver(vec![primary]);

    for query in ["", " ", "L", " L "] {
        let resolution = resolver.resolve(query).await.expect("short query is not an error");
        assert!(resolution.candidates.is_empty());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!resolver.is_offline());
}

#[tokio::test(start_paused = true)]
async fn newer_query_cancels_the_one_in_flight() {
    let paris =
        PlaceCandidate::new("Paris", 48.8566, 2.3522, ZoomClass::Locality, ProviderId::Nominatim);
    let primary = MockProvider::new(ProviderId::Nominatim, Behavior::Slow(Duration::from_secs(5)))
        .returning(vec![london_from(ProviderId::Nominatim), paris]);
    let resolver = resolver(vec![primary]);

    let first = resolver.resolve("lon");
    let second = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        resolver.resolve("par").await
    };

    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Err(LocateError::Cancelled)));
    let second = second.expect("latest query wins");
    assert_eq!(second.candidates.len(), 1);
    assert_eq!(second.candidates[0].display_name, "Paris");
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_deliver_only_the_last_query() {
    let primary = MockProvider::new(ProviderId::Nominatim, Behavior::Slow(Duration::from_secs(2)))
        .returning(vec![london_from(ProviderId::Nominatim)]);
    let resolver = Arc::new(resolver(vec![primary]));

    let mut handles = Vec::new();
    for query in ["lo", "lon", "lond", "londo", "london"] {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move { resolver.resolve(query).await }));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let mut delivered = Vec::new();
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(resolution) => delivered.push(resolution),
            Err(LocateError::Cancelled) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].candidates[0].display_name, "London");
    assert!(!resolver.is_offline());
}
