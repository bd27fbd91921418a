use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Duration, Month, OffsetDateTime};

use crate::ValidationError;

/// Calendar date of a game or snapshot, rendered as `YYYY-MM-DD` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameDate(Date);

impl GameDate {
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };

        let trimmed = input.trim();
        let mut parts = trimmed.split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if year.len() != 4 || month.len() != 2 || day.len() != 2 {
            return Err(invalid());
        }

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;
        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    pub const fn year(self) -> i32 {
        self.0.year()
    }

    pub fn previous_day(self) -> Option<Self> {
        self.0.previous_day().map(Self)
    }

    pub fn plus_days(self, days: i64) -> Option<Self> {
        self.0.checked_add(Duration::days(days)).map(Self)
    }

    /// Season a date belongs to under the default `11-01` start: November and
    /// December roll into the next year's season. See [`SeasonStart::season_of`].
    pub fn season(self) -> i32 {
        SeasonStart::default().season_of(self)
    }

    fn month_day(self) -> (u8, u8) {
        (u8::from(self.0.month()), self.0.day())
    }
}

impl Display for GameDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl From<Date> for GameDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl Serialize for GameDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GameDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Month and day on which a season's games begin, e.g. `11-01`.
///
/// Seasons are named after the calendar year they end in. A start between
/// July and December opens the season in the prior calendar year; a start
/// between January and June opens it in the same year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonStart {
    month: u8,
    day: u8,
}

/// First month whose start dates belong to the prior calendar year.
const AUTUMN_FROM_MONTH: u8 = 7;

impl SeasonStart {
    pub fn new(month: u8, day: u8) -> Result<Self, ValidationError> {
        // Validated against a non-leap year: Feb 29 has no first day most seasons.
        GameDate::from_ymd(2001, month, day)?;
        Ok(Self { month, day })
    }

    pub const fn month(self) -> u8 {
        self.month
    }

    pub const fn day(self) -> u8 {
        self.day
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };
        let (month, day) = input.trim().split_once('-').ok_or_else(invalid)?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;
        Self::new(month, day).map_err(|_| invalid())
    }

    /// First day of `season`.
    pub fn first_day(self, season: i32) -> Result<GameDate, ValidationError> {
        let year = if self.opens_in_prior_year() {
            season - 1
        } else {
            season
        };
        GameDate::from_ymd(year, self.month, self.day)
    }

    /// Season that `date` belongs to; always satisfies `first_day(season) <= date`.
    pub fn season_of(self, date: GameDate) -> i32 {
        let started_this_year = date.month_day() >= (self.month, self.day);
        match (self.opens_in_prior_year(), started_this_year) {
            (true, true) => date.year() + 1,
            (true, false) | (false, true) => date.year(),
            (false, false) => date.year() - 1,
        }
    }

    const fn opens_in_prior_year(self) -> bool {
        self.month >= AUTUMN_FROM_MONTH
    }
}

impl Default for SeasonStart {
    fn default() -> Self {
        Self { month: 11, day: 1 }
    }
}
