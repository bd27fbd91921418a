use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use crate::cache::{CacheKey, ResponseCache};
use crate::calendar::SeasonStart;
use crate::error::AccessError;
use crate::executor::RequestExecutor;
use crate::point_in_time::{ResolvedRequest, SourceDate};
use crate::request::{ApiRequest, Intent};

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    CacheHit,
    NetworkFresh,
}

/// Decoded payload plus the provenance and snapshot label that back it.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessResult<T> {
    pub payload: T,
    pub provenance: Provenance,
    pub source_date: SourceDate,
}

impl<T> AccessResult<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AccessResult<U> {
        AccessResult {
            payload: f(self.payload),
            provenance: self.provenance,
            source_date: self.source_date,
        }
    }

    pub const fn is_cache_hit(&self) -> bool {
        matches!(self.provenance, Provenance::CacheHit)
    }
}

/// Single entry point combining the response cache and the request executor.
#[derive(Debug, Clone)]
pub struct AccessLayer {
    cache: ResponseCache,
    executor: RequestExecutor,
    season_start: SeasonStart,
}

impl AccessLayer {
    pub fn new(cache: ResponseCache, executor: RequestExecutor) -> Self {
        Self {
            cache,
            executor,
            season_start: SeasonStart::default(),
        }
    }

    /// Season start used to date preseason snapshot labels.
    pub fn with_season_start(mut self, season_start: SeasonStart) -> Self {
        self.season_start = season_start;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Fetches `request` and decodes the JSON payload into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<AccessResult<T>, AccessError> {
        self.fetch_with(request, |body| serde_json::from_str(body))
            .await
    }

    /// Fetches `request` and returns the body text, checked to be JSON.
    pub async fn fetch_raw(&self, request: &ApiRequest) -> Result<AccessResult<String>, AccessError> {
        self.fetch_with(request, |body| {
            serde_json::from_str::<IgnoredAny>(body).map(|_| body.to_owned())
        })
        .await
    }

    /// Fetches a resolver output and re-checks its label against the event date.
    pub async fn fetch_resolved<T: DeserializeOwned>(
        &self,
        resolved: &ResolvedRequest,
    ) -> Result<AccessResult<T>, AccessError> {
        let result = self.fetch(&resolved.request).await?;
        resolved.verify(result.source_date)?;
        Ok(result)
    }

    async fn fetch_with<T>(
        &self,
        request: &ApiRequest,
        decode: impl Fn(&str) -> Result<T, serde_json::Error>,
    ) -> Result<AccessResult<T>, AccessError> {
        let source_date = SourceDate::for_request(request, self.season_start);
        if let Intent::PointInTime { event_date } = request.intent() {
            if !source_date.precedes(event_date) {
                return Err(AccessError::no_historical_source(
                    event_date,
                    format!("request '{request}' is not a historical snapshot; resolve it first"),
                ));
            }
        }

        let key = CacheKey::for_request(request);
        let mode = request.cache_mode();

        if mode.reads() {
            if let Some(entry) = self.cache.get(&key) {
                match decode(entry.payload()) {
                    Ok(payload) => {
                        debug!(request = %request, key = %key, "cache hit");
                        return Ok(AccessResult {
                            payload,
                            provenance: Provenance::CacheHit,
                            source_date,
                        });
                    }
                    Err(error) => {
                        debug!(request = %request, %error, "cached payload does not decode; refetching");
                    }
                }
            }
        }

        let raw = self.executor.execute(request).await?;
        let payload = decode(&raw.body).map_err(|source| AccessError::Decode {
            endpoint: request.endpoint(),
            source,
        })?;

        if mode.writes() {
            self.cache.put(&key, &raw.body, request.ttl());
        }

        Ok(AccessResult {
            payload,
            provenance: Provenance::NetworkFresh,
            source_date,
        })
    }
}
