//! Request types for the upstream `api.php?endpoint=...` catalog.
//!
//! Every endpoint has a fixed set of recognized query parameters. Requests are
//! validated when they are built, so an [`ApiRequest`] that exists is always
//! well-formed for its endpoint.
//!
//! | Endpoint | Parameters | Required |
//! |----------|------------|----------|
//! | `teams` | `y`, `c` | `y` |
//! | `conferences` | `y` | `y` |
//! | `ratings` | `y`, `team_id`, `c` | `y` or `team_id` |
//! | `archive` | `d`, `preseason`, `y`, `team_id`, `c` | `d`, or `preseason=true` with `y` |
//! | `fanmatch` | `d` | `d` |
//! | `four-factors`, `pointdist`, `height`, `misc-stats` | `y`, `team_id`, `c` | `y` |

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheMode;
use crate::calendar::{GameDate, SeasonStart};
use crate::ValidationError;

/// Upstream endpoint identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    Teams,
    Conferences,
    Ratings,
    Archive,
    Fanmatch,
    FourFactors,
    #[serde(rename = "pointdist")]
    PointDistribution,
    Height,
    MiscStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Int,
    Str,
    Bool,
    Date,
}

impl ParamKind {
    const fn describe(self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Str => "a string",
            Self::Bool => "a boolean",
            Self::Date => "a YYYY-MM-DD date",
        }
    }
}

const SEASON_PARAMS: &[(&str, ParamKind)] = &[
    ("y", ParamKind::Int),
    ("team_id", ParamKind::Int),
    ("c", ParamKind::Str),
];

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Self::Teams,
        Self::Conferences,
        Self::Ratings,
        Self::Archive,
        Self::Fanmatch,
        Self::FourFactors,
        Self::PointDistribution,
        Self::Height,
        Self::MiscStats,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Conferences => "conferences",
            Self::Ratings => "ratings",
            Self::Archive => "archive",
            Self::Fanmatch => "fanmatch",
            Self::FourFactors => "four-factors",
            Self::PointDistribution => "pointdist",
            Self::Height => "height",
            Self::MiscStats => "misc-stats",
        }
    }

    fn recognized_params(self) -> &'static [(&'static str, ParamKind)] {
        match self {
            Self::Teams => &[("y", ParamKind::Int), ("c", ParamKind::Str)],
            Self::Conferences => &[("y", ParamKind::Int)],
            Self::Archive => &[
                ("d", ParamKind::Date),
                ("preseason", ParamKind::Bool),
                ("y", ParamKind::Int),
                ("team_id", ParamKind::Int),
                ("c", ParamKind::Str),
            ],
            Self::Fanmatch => &[("d", ParamKind::Date)],
            Self::Ratings
            | Self::FourFactors
            | Self::PointDistribution
            | Self::Height
            | Self::MiscStats => SEASON_PARAMS,
        }
    }

    fn check_required(self, params: &BTreeMap<&'static str, ParamValue>) -> Result<(), ValidationError> {
        let has = |name: &str| params.contains_key(name);
        let satisfied = match self {
            Self::Ratings => has("y") || has("team_id"),
            Self::Archive => {
                has("d") || (params.get("preseason") == Some(&ParamValue::Bool(true)) && has("y"))
            }
            Self::Fanmatch => has("d"),
            Self::Teams
            | Self::Conferences
            | Self::FourFactors
            | Self::PointDistribution
            | Self::Height
            | Self::MiscStats => has("y"),
        };

        if satisfied {
            return Ok(());
        }

        let requirement = match self {
            Self::Ratings => "at least one of 'y' or 'team_id'",
            Self::Archive => "'d' (YYYY-MM-DD), or 'preseason=true' together with 'y'",
            Self::Fanmatch => "'d' (YYYY-MM-DD)",
            _ => "'y' (season)",
        };
        Err(ValidationError::MissingParameter {
            endpoint: self,
            requirement,
        })
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.as_str() == value.trim())
            .ok_or_else(|| ValidationError::InvalidEndpoint {
                value: value.to_owned(),
            })
    }
}

/// Primitive query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::Bool(value) => f.write_str(if *value { "true" } else { "false" }),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<GameDate> for ParamValue {
    fn from(value: GameDate) -> Self {
        Self::Str(value.to_string())
    }
}

/// Why the caller wants the data, which decides how it may be sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Current values; no temporal guarantee.
    Live,
    /// Only information available strictly before `event_date`.
    PointInTime { event_date: GameDate },
    /// The preseason snapshot of `season`.
    Preseason { season: i32 },
}

/// Immutable, validated upstream request.
///
/// Equality and hashing consider only the endpoint and the normalized
/// parameters; intent, TTL override and cache mode are call options.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    endpoint: Endpoint,
    params: BTreeMap<&'static str, ParamValue>,
    intent: Intent,
    ttl: Option<Duration>,
    cache_mode: CacheMode,
}

impl ApiRequest {
    pub fn builder(endpoint: Endpoint) -> ApiRequestBuilder {
        ApiRequestBuilder {
            endpoint,
            params: Vec::new(),
            intent: Intent::Live,
            ttl: None,
            cache_mode: CacheMode::default(),
        }
    }

    pub fn teams(season: i32) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Teams).param("y", season).build()
    }

    pub fn conferences(season: i32) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Conferences).param("y", season).build()
    }

    pub fn ratings(season: i32) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Ratings).param("y", season).build()
    }

    /// Ratings as they stood before `event_date`; route through the resolver.
    pub fn ratings_for_event(event_date: GameDate) -> Result<Self, ValidationError> {
        Self::ratings_for_event_with(event_date, SeasonStart::default())
    }

    /// Same as [`Self::ratings_for_event`] for seasons beginning on `season_start`.
    pub fn ratings_for_event_with(
        event_date: GameDate,
        season_start: SeasonStart,
    ) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Ratings)
            .param("y", season_start.season_of(event_date))
            .point_in_time(event_date)
            .build()
    }

    /// Season-level statistics (`four-factors`, `pointdist`, `height`, `misc-stats`, ...).
    pub fn for_season(endpoint: Endpoint, season: i32) -> Result<Self, ValidationError> {
        Self::builder(endpoint).param("y", season).build()
    }

    pub fn archive_on(date: GameDate) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Archive).param("d", date).build()
    }

    pub fn archive_preseason(season: i32) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Archive)
            .param("preseason", true)
            .param("y", season)
            .preseason(season)
            .build()
    }

    pub fn fanmatch(date: GameDate) -> Result<Self, ValidationError> {
        Self::builder(Endpoint::Fanmatch).param("d", date).build()
    }

    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub const fn intent(&self) -> Intent {
        self.intent
    }

    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub const fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Parameters in name order.
    pub fn params(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> + '_ {
        self.params.iter().map(|(name, value)| (*name, value))
    }

    /// Query string pairs sent upstream, `endpoint` first.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 1);
        pairs.push((String::from("endpoint"), self.endpoint.as_str().to_owned()));
        pairs.extend(
            self.params
                .iter()
                .map(|(name, value)| ((*name).to_owned(), value.to_string())),
        );
        pairs
    }

    /// Stable text identity of the request: endpoint plus name-sorted,
    /// percent-encoded parameters. Distinct requests never share a canonical form.
    pub fn canonical(&self) -> String {
        // BTreeMap iteration is already name-sorted.
        let query = self
            .params
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(&value.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.endpoint.as_str(), query)
    }

    pub fn date_param(&self, name: &str) -> Option<GameDate> {
        match self.params.get(name) {
            Some(ParamValue::Str(value)) => GameDate::parse(value).ok(),
            _ => None,
        }
    }

    pub fn int_param(&self, name: &str) -> Option<i64> {
        match self.params.get(name) {
            Some(ParamValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }
}

impl PartialEq for ApiRequest {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint && self.params == other.params
    }
}

impl Eq for ApiRequest {}

impl Hash for ApiRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
        self.params.hash(state);
    }
}

impl Display for ApiRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Builder collecting parameters in any order; validation happens in [`Self::build`].
#[derive(Debug, Clone)]
pub struct ApiRequestBuilder {
    endpoint: Endpoint,
    params: Vec<(String, ParamValue)>,
    intent: Intent,
    ttl: Option<Duration>,
    cache_mode: CacheMode,
}

impl ApiRequestBuilder {
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn point_in_time(mut self, event_date: GameDate) -> Self {
        self.intent = Intent::PointInTime { event_date };
        self
    }

    pub fn preseason(mut self, season: i32) -> Self {
        self.intent = Intent::Preseason { season };
        self
    }

    pub fn intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn build(self) -> Result<ApiRequest, ValidationError> {
        let endpoint = self.endpoint;
        let recognized = endpoint.recognized_params();
        let mut params = BTreeMap::new();

        for (name, value) in self.params {
            let Some(&(key, kind)) = recognized.iter().find(|(key, _)| *key == name) else {
                return Err(ValidationError::UnknownParameter { endpoint, name });
            };

            let type_matches = match (kind, &value) {
                (ParamKind::Int, ParamValue::Int(_)) => true,
                (ParamKind::Bool, ParamValue::Bool(_)) => true,
                (ParamKind::Str, ParamValue::Str(text)) => !text.trim().is_empty(),
                (ParamKind::Date, ParamValue::Str(text)) => GameDate::parse(text).is_ok(),
                _ => false,
            };
            if !type_matches {
                return Err(ValidationError::InvalidParameterType {
                    endpoint,
                    name: key,
                    expected: kind.describe(),
                });
            }

            params.insert(key, value);
        }

        endpoint.check_required(&params)?;

        Ok(ApiRequest {
            endpoint,
            params,
            intent: self.intent,
            ttl: self.ttl,
            cache_mode: self.cache_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_parameters() {
        let result = ApiRequest::builder(Endpoint::Teams)
            .param("y", 2024)
            .param("season", 2024)
            .build();

        assert!(matches!(
            result,
            Err(ValidationError::UnknownParameter { endpoint: Endpoint::Teams, .. })
        ));
    }

    #[test]
    fn rejects_wrongly_typed_parameters() {
        let result = ApiRequest::builder(Endpoint::Ratings).param("y", "2024").build();
        assert!(matches!(
            result,
            Err(ValidationError::InvalidParameterType { name: "y", .. })
        ));

        let result = ApiRequest::builder(Endpoint::Fanmatch).param("d", "03/15/2024").build();
        assert!(matches!(
            result,
            Err(ValidationError::InvalidParameterType { name: "d", .. })
        ));
    }

    #[test]
    fn ratings_require_season_or_team() {
        let result = ApiRequest::builder(Endpoint::Ratings).param("c", "ACC").build();
        assert!(matches!(
            result,
            Err(ValidationError::MissingParameter { endpoint: Endpoint::Ratings, .. })
        ));

        assert!(ApiRequest::builder(Endpoint::Ratings)
            .param("team_id", 73)
            .build()
            .is_ok());
    }

    #[test]
    fn archive_requires_date_or_preseason_with_season() {
        assert!(ApiRequest::builder(Endpoint::Archive).param("y", 2024).build().is_err());
        assert!(ApiRequest::builder(Endpoint::Archive)
            .param("preseason", false)
            .param("y", 2024)
            .build()
            .is_err());
        assert!(ApiRequest::archive_preseason(2024).is_ok());
        assert!(ApiRequest::archive_on(GameDate::parse("2024-03-14").expect("valid")).is_ok());
    }

    #[test]
    fn equality_ignores_insertion_order_and_call_options() {
        let a = ApiRequest::builder(Endpoint::Ratings)
            .param("y", 2024)
            .param("c", "B10")
            .build()
            .expect("valid");
        let b = ApiRequest::builder(Endpoint::Ratings)
            .param("c", "B10")
            .param("y", 2024)
            .ttl(Duration::from_secs(5))
            .cache_mode(CacheMode::Bypass)
            .build()
            .expect("valid");

        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "ratings?c=B10&y=2024");
    }

    #[test]
    fn canonical_form_escapes_separators_in_values() {
        let smuggled = ApiRequest::builder(Endpoint::Ratings)
            .param("c", "A&team_id=1")
            .param("y", 2024)
            .build()
            .expect("valid");
        let separate = ApiRequest::builder(Endpoint::Ratings)
            .param("c", "A")
            .param("team_id", 1)
            .param("y", 2024)
            .build()
            .expect("valid");

        assert_ne!(smuggled, separate);
        assert_ne!(smuggled.canonical(), separate.canonical());
        assert_eq!(smuggled.canonical(), "ratings?c=A%26team_id%3D1&y=2024");
    }

    #[test]
    fn query_pairs_lead_with_endpoint() {
        let request = ApiRequest::archive_preseason(2025).expect("valid");
        let pairs = request.query_pairs();

        assert_eq!(pairs[0], (String::from("endpoint"), String::from("archive")));
        assert!(pairs.contains(&(String::from("preseason"), String::from("true"))));
        assert!(pairs.contains(&(String::from("y"), String::from("2025"))));
    }

    #[test]
    fn endpoint_names_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(endpoint.as_str().parse::<Endpoint>(), Ok(endpoint));
        }
        assert!("standings".parse::<Endpoint>().is_err());
    }
}
