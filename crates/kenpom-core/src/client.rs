use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::access::{AccessLayer, AccessResult};
use crate::cache::ResponseCache;
use crate::calendar::GameDate;
use crate::config::Settings;
use crate::error::AccessError;
use crate::executor::RequestExecutor;
use crate::http_client::{HttpAuth, HttpClient, ReqwestHttpClient};
use crate::models::{
    ArchiveRating, Conference, FanmatchGame, FourFactors, Height, MiscStats, PointDistribution,
    Rating, Team,
};
use crate::point_in_time::PointInTimeResolver;
use crate::request::{ApiRequest, Endpoint};
use crate::throttling::RateLimiter;

/// Typed facade over the access layer and the point-in-time resolver.
#[derive(Debug, Clone)]
pub struct KenPomClient {
    access: AccessLayer,
    resolver: PointInTimeResolver,
}

impl KenPomClient {
    /// Client using reqwest as transport.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_http(settings, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http(settings: &Settings, http: Arc<dyn HttpClient>) -> Self {
        let executor = RequestExecutor::new(
            http,
            RateLimiter::new(settings.rate_limit_rps, settings.rate_limit_burst),
            settings.base_url.clone(),
            HttpAuth::BearerToken(settings.api_key.clone()),
        )
        .with_retry(settings.retry_config())
        .with_timeout(settings.timeout);

        let cache = ResponseCache::new(settings.cache_dir.clone(), settings.cache_ttl);

        Self {
            access: AccessLayer::new(cache, executor).with_season_start(settings.season_start),
            resolver: PointInTimeResolver::new(settings.resolver_config()),
        }
    }

    pub fn from_parts(access: AccessLayer, resolver: PointInTimeResolver) -> Self {
        Self { access, resolver }
    }

    pub fn access(&self) -> &AccessLayer {
        &self.access
    }

    pub fn resolver(&self) -> &PointInTimeResolver {
        &self.resolver
    }

    /// Resolves `request` and fetches whichever snapshot the resolver picked.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<AccessResult<T>, AccessError> {
        let resolved = self.resolver.resolve(request)?;
        self.access.fetch_resolved(&resolved).await
    }

    pub async fn teams(&self, season: i32) -> Result<AccessResult<Vec<Team>>, AccessError> {
        self.fetch(&ApiRequest::teams(season)?).await
    }

    pub async fn conferences(
        &self,
        season: i32,
    ) -> Result<AccessResult<Vec<Conference>>, AccessError> {
        self.fetch(&ApiRequest::conferences(season)?).await
    }

    /// Current ratings. Never use these for games that have already been played.
    pub async fn ratings(&self, season: i32) -> Result<AccessResult<Vec<Rating>>, AccessError> {
        self.fetch(&ApiRequest::ratings(season)?).await
    }

    pub async fn archive(
        &self,
        date: GameDate,
    ) -> Result<AccessResult<Vec<ArchiveRating>>, AccessError> {
        self.fetch(&ApiRequest::archive_on(date)?).await
    }

    pub async fn archive_preseason(
        &self,
        season: i32,
    ) -> Result<AccessResult<Vec<ArchiveRating>>, AccessError> {
        self.fetch(&ApiRequest::archive_preseason(season)?).await
    }

    pub async fn fanmatch(
        &self,
        date: GameDate,
    ) -> Result<AccessResult<Vec<FanmatchGame>>, AccessError> {
        self.fetch(&ApiRequest::fanmatch(date)?).await
    }

    pub async fn four_factors(
        &self,
        season: i32,
    ) -> Result<AccessResult<Vec<FourFactors>>, AccessError> {
        self.fetch(&ApiRequest::for_season(Endpoint::FourFactors, season)?).await
    }

    pub async fn point_distribution(
        &self,
        season: i32,
    ) -> Result<AccessResult<Vec<PointDistribution>>, AccessError> {
        self.fetch(&ApiRequest::for_season(Endpoint::PointDistribution, season)?).await
    }

    pub async fn height(&self, season: i32) -> Result<AccessResult<Vec<Height>>, AccessError> {
        self.fetch(&ApiRequest::for_season(Endpoint::Height, season)?).await
    }

    pub async fn misc_stats(
        &self,
        season: i32,
    ) -> Result<AccessResult<Vec<MiscStats>>, AccessError> {
        self.fetch(&ApiRequest::for_season(Endpoint::MiscStats, season)?).await
    }

    /// Ratings as they stood before `event_date`, safe to join against that day's games.
    ///
    /// Besides the snapshot label, every dated row must itself predate the event.
    pub async fn ratings_as_of(
        &self,
        event_date: GameDate,
    ) -> Result<AccessResult<Vec<ArchiveRating>>, AccessError> {
        let request =
            ApiRequest::ratings_for_event_with(event_date, self.resolver.config().season_start)?;
        let result: AccessResult<Vec<ArchiveRating>> = self.fetch(&request).await?;

        let leaked = result
            .payload
            .iter()
            .filter(|row| !row.is_preseason())
            .find(|row| row.archive_date().map_or(true, |date| date >= event_date));
        if let Some(row) = leaked {
            warn!(
                event_date = %event_date,
                archive_date = %row.archive_date,
                team = %row.team_name,
                "archive row is not strictly before the event"
            );
            return Err(AccessError::no_historical_source(
                event_date,
                format!(
                    "row for '{}' is dated '{}'",
                    row.team_name, row.archive_date
                ),
            ));
        }

        Ok(result)
    }
}
