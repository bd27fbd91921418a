//! Point-in-time resolution of rating requests.
//!
//! Backtests must only see ratings that were published before the game they
//! describe. The resolver rewrites a request tagged with
//! [`Intent::PointInTime`] to the archive endpoint, dated the day before the
//! event (ratings for a date are final only after that date's games), or to
//! the season's preseason snapshot while the dated series has not yet
//! stabilized. When neither is possible it fails closed with
//! [`AccessError::NoValidHistoricalSource`]; it never falls back to live data.
//!
//! | Intent | Resolved endpoint | Source label |
//! |--------|-------------------|--------------|
//! | `Live` | unchanged | [`SourceDate::Live`] |
//! | `PointInTime(D)`, D inside stabilization window | `archive?preseason=true&y=S` | [`SourceDate::Preseason`] |
//! | `PointInTime(D)` otherwise | `archive?d=D-1` | [`SourceDate::AsOf`] |
//! | `Preseason(S)` | `archive?preseason=true&y=S` | [`SourceDate::Preseason`] |

use std::fmt::{Display, Formatter};

use tracing::info;

use crate::calendar::{GameDate, SeasonStart};
use crate::error::AccessError;
use crate::request::{ApiRequest, Endpoint, Intent, ParamValue};

/// Default number of days after season start before dated archives are trusted.
pub const DEFAULT_STABILIZATION_DAYS: u32 = 14;

/// First season for which the upstream publishes archived ratings.
pub const DEFAULT_EARLIEST_ARCHIVE_SEASON: i32 = 2002;

/// Which snapshot backed a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDate {
    /// Current upstream values.
    Live,
    /// Archived ratings as of the given date.
    AsOf(GameDate),
    /// Preseason ratings, published before `season_start`.
    Preseason { season: i32, season_start: GameDate },
}

impl SourceDate {
    /// Label implied by the shape of a request.
    pub fn for_request(request: &ApiRequest, season_start: SeasonStart) -> Self {
        if request.endpoint() != Endpoint::Archive {
            return Self::Live;
        }

        if let Some(date) = request.date_param("d") {
            return Self::AsOf(date);
        }

        let preseason = request.param("preseason") == Some(&ParamValue::Bool(true));
        match (preseason, request.int_param("y")) {
            (true, Some(season)) => {
                let season = i32::try_from(season).unwrap_or(i32::MAX);
                match season_start.first_day(season) {
                    Ok(season_start) => Self::Preseason {
                        season,
                        season_start,
                    },
                    Err(_) => Self::Live,
                }
            }
            _ => Self::Live,
        }
    }

    /// Latest date whose information may be reflected, or `None` for live data.
    pub fn effective_date(self) -> Option<GameDate> {
        match self {
            Self::Live => None,
            Self::AsOf(date) => Some(date),
            Self::Preseason { season_start, .. } => season_start.previous_day(),
        }
    }

    /// Whether this snapshot is strictly older than `event_date`.
    pub fn precedes(self, event_date: GameDate) -> bool {
        self.effective_date()
            .is_some_and(|effective| effective < event_date)
    }

    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

impl Display for SourceDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::AsOf(date) => write!(f, "{date}"),
            Self::Preseason { season, .. } => write!(f, "preseason-{season}"),
        }
    }
}

/// Tunables for point-in-time resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub stabilization_days: u32,
    pub season_start: SeasonStart,
    pub earliest_archive_season: i32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            stabilization_days: DEFAULT_STABILIZATION_DAYS,
            season_start: SeasonStart::default(),
            earliest_archive_season: DEFAULT_EARLIEST_ARCHIVE_SEASON,
        }
    }
}

/// Outcome of resolution: the request to send and the label its result must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub request: ApiRequest,
    pub source: SourceDate,
    /// Event date the result must precede; `None` for live and preseason intents.
    pub event_date: Option<GameDate>,
}

impl ResolvedRequest {
    /// Fails closed unless `source` is strictly older than the event date.
    pub fn verify(&self, source: SourceDate) -> Result<(), AccessError> {
        match self.event_date {
            Some(event_date) if !source.precedes(event_date) => {
                Err(AccessError::no_historical_source(
                    event_date,
                    format!("source '{source}' is not strictly before the event"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Chooses between live and archival sources so no result leaks future information.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointInTimeResolver {
    config: ResolverConfig,
}

impl PointInTimeResolver {
    pub const fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, request: &ApiRequest) -> Result<ResolvedRequest, AccessError> {
        self.resolve_at(request, GameDate::today())
    }

    /// Resolves `request` as if the current date were `today`.
    pub fn resolve_at(
        &self,
        request: &ApiRequest,
        today: GameDate,
    ) -> Result<ResolvedRequest, AccessError> {
        match request.intent() {
            Intent::Live => Ok(ResolvedRequest {
                request: request.clone(),
                source: SourceDate::for_request(request, self.config.season_start),
                event_date: None,
            }),
            Intent::Preseason { season } => {
                if !has_archive(request.endpoint()) {
                    return Err(AccessError::no_preseason_source(format!(
                        "endpoint '{}' has no preseason snapshot",
                        request.endpoint()
                    )));
                }
                self.preseason(request, season, None)
            }
            Intent::PointInTime { event_date } => {
                let resolved = self.point_in_time(request, event_date, today)?;
                resolved.verify(resolved.source)?;
                info!(
                    request = %request,
                    event_date = %event_date,
                    source = %resolved.source,
                    "resolved point-in-time request"
                );
                Ok(resolved)
            }
        }
    }

    fn point_in_time(
        &self,
        request: &ApiRequest,
        event_date: GameDate,
        today: GameDate,
    ) -> Result<ResolvedRequest, AccessError> {
        let fail = |reason: String| AccessError::no_historical_source(event_date, reason);

        if !has_archive(request.endpoint()) {
            return Err(fail(format!(
                "endpoint '{}' has no archival counterpart",
                request.endpoint()
            )));
        }

        let season = self.config.season_start.season_of(event_date);
        if season < self.config.earliest_archive_season {
            return Err(fail(format!(
                "season {season} predates the archive (first season {})",
                self.config.earliest_archive_season
            )));
        }

        let season_start = self
            .config
            .season_start
            .first_day(season)
            .map_err(|error| fail(error.to_string()))?;
        let stabilized_on = season_start
            .plus_days(i64::from(self.config.stabilization_days))
            .ok_or_else(|| fail(String::from("stabilization window overflows the calendar")))?;

        if season_start <= event_date && event_date < stabilized_on {
            return self.preseason(request, season, Some(event_date));
        }

        let as_of = event_date
            .previous_day()
            .ok_or_else(|| fail(String::from("no day precedes the event date")))?;
        if as_of >= today {
            return Err(fail(format!("archive for {as_of} is not published yet")));
        }

        let rewritten = carry_filters(
            request,
            ApiRequest::builder(Endpoint::Archive)
                .param("d", as_of)
                .point_in_time(event_date),
        )
        .build()?;

        Ok(ResolvedRequest {
            source: SourceDate::for_request(&rewritten, self.config.season_start),
            request: rewritten,
            event_date: Some(event_date),
        })
    }

    fn preseason(
        &self,
        request: &ApiRequest,
        season: i32,
        event_date: Option<GameDate>,
    ) -> Result<ResolvedRequest, AccessError> {
        let fail = |reason: String| match event_date {
            Some(event_date) => AccessError::no_historical_source(event_date, reason),
            None => AccessError::no_preseason_source(reason),
        };

        if season < self.config.earliest_archive_season {
            return Err(fail(format!(
                "no preseason archive for season {season} (first season {})",
                self.config.earliest_archive_season
            )));
        }
        if let Err(error) = self.config.season_start.first_day(season) {
            return Err(fail(format!("season {season} has no first day: {error}")));
        }

        let intent = match event_date {
            Some(event_date) => Intent::PointInTime { event_date },
            None => Intent::Preseason { season },
        };
        let rewritten = carry_filters(
            request,
            ApiRequest::builder(Endpoint::Archive)
                .param("preseason", true)
                .param("y", season)
                .intent(intent),
        )
        .build()?;

        Ok(ResolvedRequest {
            source: SourceDate::for_request(&rewritten, self.config.season_start),
            request: rewritten,
            event_date,
        })
    }
}

fn has_archive(endpoint: Endpoint) -> bool {
    matches!(endpoint, Endpoint::Ratings | Endpoint::Archive)
}

fn carry_filters(
    from: &ApiRequest,
    mut builder: crate::request::ApiRequestBuilder,
) -> crate::request::ApiRequestBuilder {
    for name in ["team_id", "c"] {
        if let Some(value) = from.param(name) {
            builder = builder.param(name, value.clone());
        }
    }
    if let Some(ttl) = from.ttl() {
        builder = builder.ttl(ttl);
    }
    builder.cache_mode(from.cache_mode())
}
