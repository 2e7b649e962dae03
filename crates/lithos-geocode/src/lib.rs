//! Forward geocoding of project locations via Nominatim.
//!
//! Lookups go through a pluggable cache that remembers misses as well as
//! hits, so a location that failed to resolve once does not hammer the
//! upstream on every request. Transient upstream trouble is retried with
//! exponential backoff.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info_span, warn};

pub const CRATE_NAME: &str = "lithos-geocode";

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "Lithos Mining Projects (contact@lithos.ai)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoding upstream returned status {status}")]
    Upstream { status: u16 },
    #[error("geocoding response body was malformed")]
    MalformedBody,
}

/// Cache seam for resolved locations. `get` distinguishes a cache miss
/// (`None`) from a cached unresolvable location (`Some(None)`).
#[async_trait]
pub trait GeocodeCache: Send + Sync {
    async fn get(&self, location: &str) -> Option<Option<Coordinates>>;
    async fn insert(&self, location: &str, coords: Option<Coordinates>);
}

#[derive(Debug)]
struct CacheEntry {
    coords: Option<Coordinates>,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    slots: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

/// FIFO-bounded, TTL-expiring in-memory cache. Updating a live key keeps
/// its eviction slot; only brand-new keys can push the oldest one out.
#[derive(Debug)]
pub struct BoundedCache {
    max_entries: usize,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl BoundedCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }
}

impl Default for BoundedCache {
    fn default() -> Self {
        Self::new(1024, Duration::from_secs(24 * 60 * 60))
    }
}

#[async_trait]
impl GeocodeCache for BoundedCache {
    async fn get(&self, location: &str) -> Option<Option<Coordinates>> {
        let mut state = self.state.lock().await;
        let expired = match state.slots.get(location) {
            Some(entry) => entry.stored_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            state.slots.remove(location);
            state.order.retain(|key| key != location);
            return None;
        }
        state.slots.get(location).map(|entry| entry.coords)
    }

    async fn insert(&self, location: &str, coords: Option<Coordinates>) {
        let mut state = self.state.lock().await;
        let entry = CacheEntry {
            coords,
            stored_at: Instant::now(),
        };

        if state.slots.insert(location.to_string(), entry).is_some() {
            return;
        }

        state.order.push_back(location.to_string());
        while state.slots.len() > self.max_entries {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.slots.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(20),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

fn coordinates_from_hits(hits: &[NominatimHit]) -> Result<Option<Coordinates>, GeocodeError> {
    let hit = match hits.first() {
        Some(hit) => hit,
        None => return Ok(None),
    };
    match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
        (Ok(lat), Ok(lng)) => Ok(Some(Coordinates { lat, lng })),
        _ => Err(GeocodeError::MalformedBody),
    }
}

pub struct Geocoder {
    client: reqwest::Client,
    endpoint: String,
    backoff: BackoffPolicy,
    cache: Box<dyn GeocodeCache>,
}

impl Geocoder {
    pub fn new(config: GeocoderConfig, cache: Box<dyn GeocodeCache>) -> anyhow::Result<Self> {
        // Nominatim's usage policy requires an identifying User-Agent.
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .context("building geocoding http client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            backoff: config.backoff,
            cache,
        })
    }

    /// Resolve a location, consulting the cache first. Both successful hits
    /// and definitive misses are cached; an upstream failure caches a miss
    /// so the next request within the TTL is served without a lookup.
    pub async fn resolve(&self, location: &str) -> Result<Option<Coordinates>, GeocodeError> {
        if let Some(cached) = self.cache.get(location).await {
            return Ok(cached);
        }

        match self.lookup(location).await {
            Ok(coords) => {
                self.cache.insert(location, coords).await;
                Ok(coords)
            }
            Err(err) => {
                self.cache.insert(location, None).await;
                Err(err)
            }
        }
    }

    async fn lookup(&self, location: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let span = info_span!("geocode_lookup", location);
        let _guard = span.enter();

        let mut last_request_error: Option<reqwest::Error> = None;

        for attempt in 0..=self.backoff.max_retries {
            let resp_result = self
                .client
                .get(&self.endpoint)
                .query(&[("q", location), ("format", "json"), ("limit", "1")])
                .send()
                .await;

            match resp_result {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let hits: Vec<NominatimHit> = resp.json().await.map_err(|err| {
                            warn!(location, error = %err, "geocoding response failed to decode");
                            GeocodeError::MalformedBody
                        })?;
                        return coordinates_from_hits(&hits);
                    }

                    let disposition = classify_status(status);
                    if disposition == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        warn!(location, status = status.as_u16(), attempt, "retrying geocoding lookup");
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        continue;
                    }

                    return Err(GeocodeError::Upstream {
                        status: status.as_u16(),
                    });
                }
                Err(err) => {
                    let disposition = classify_reqwest_error(&err);
                    if disposition == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        warn!(location, error = %err, attempt, "retrying geocoding lookup");
                        last_request_error = Some(err);
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        continue;
                    }
                    return Err(GeocodeError::Request(err));
                }
            }
        }

        Err(GeocodeError::Request(
            last_request_error.expect("retry loop should capture a request error"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_remembers_hits_and_misses_separately() {
        let cache = BoundedCache::new(8, Duration::from_secs(60));
        let perth = Coordinates { lat: -31.95, lng: 115.86 };

        cache.insert("Perth, Australia", Some(perth)).await;
        cache.insert("Atlantis", None).await;

        assert_eq!(cache.get("Perth, Australia").await, Some(Some(perth)));
        assert_eq!(cache.get("Atlantis").await, Some(None));
        assert_eq!(cache.get("Nowhere Else").await, None);
    }

    #[tokio::test]
    async fn cache_evicts_oldest_key_first() {
        let cache = BoundedCache::new(2, Duration::from_secs(60));
        let coords = Coordinates { lat: 1.0, lng: 2.0 };

        cache.insert("a", Some(coords)).await;
        cache.insert("b", Some(coords)).await;
        cache.insert("c", Some(coords)).await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(Some(coords)));
        assert_eq!(cache.get("c").await, Some(Some(coords)));
    }

    #[tokio::test]
    async fn updating_a_live_key_keeps_its_eviction_slot() {
        let cache = BoundedCache::new(3, Duration::from_secs(60));
        let coords = Coordinates { lat: 1.0, lng: 2.0 };
        let updated = Coordinates { lat: 9.0, lng: 9.0 };

        cache.insert("a", Some(coords)).await;
        cache.insert("b", Some(coords)).await;
        cache.insert("c", Some(coords)).await;
        cache.insert("a", Some(updated)).await;
        cache.insert("d", Some(coords)).await;

        // "a" stayed in the oldest slot, so it is the one pushed out.
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(Some(coords)));
        assert_eq!(cache.get("d").await, Some(Some(coords)));
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let cache = BoundedCache::new(8, Duration::ZERO);
        cache.insert("a", Some(Coordinates { lat: 1.0, lng: 2.0 })).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn zero_capacity_still_holds_one_entry() {
        let cache = BoundedCache::new(0, Duration::from_secs(60));
        let coords = Coordinates { lat: 1.0, lng: 2.0 };
        cache.insert("a", Some(coords)).await;
        assert_eq!(cache.get("a").await, Some(Some(coords)));
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            RetryDisposition::Retryable
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            RetryDisposition::Retryable
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            RetryDisposition::NonRetryable
        );
        assert_eq!(classify_status(StatusCode::OK), RetryDisposition::NonRetryable);
    }

    #[test]
    fn backoff_logic_is_exponential_and_capped() {
        let policy = BackoffPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(350));
    }

    #[test]
    fn first_hit_wins_and_parses_string_coordinates() {
        let hits = vec![
            NominatimHit { lat: "-26.58".to_string(), lon: "118.49".to_string() },
            NominatimHit { lat: "0".to_string(), lon: "0".to_string() },
        ];
        let coords = coordinates_from_hits(&hits).expect("parse").expect("present");
        assert_eq!(coords, Coordinates { lat: -26.58, lng: 118.49 });
    }

    #[test]
    fn empty_hit_list_is_a_definitive_miss() {
        assert_eq!(coordinates_from_hits(&[]).expect("parse"), None);
    }

    #[test]
    fn unparseable_coordinates_are_a_malformed_body() {
        let hits = vec![NominatimHit { lat: "north".to_string(), lon: "118.49".to_string() }];
        assert!(matches!(
            coordinates_from_hits(&hits),
            Err(GeocodeError::MalformedBody)
        ));
    }
}
