//! Inputs for the final route-creation step.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartingLocation {
    Hq,
    Home,
}

impl std::fmt::Display for StartingLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartingLocation::Hq => write!(f, "hq"),
            StartingLocation::Home => write!(f, "home"),
        }
    }
}

impl std::str::FromStr for StartingLocation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hq" => Ok(StartingLocation::Hq),
            "home" => Ok(StartingLocation::Home),
            other => Err(CoreError::InvalidSchedule(format!(
                "unknown starting location '{other}' (expected 'hq' or 'home')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDriver {
    pub email: String,
    pub starting_location: StartingLocation,
}

/// A route start that has been checked to lie in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSchedule {
    date: NaiveDate,
    time: NaiveTime,
}

impl RouteSchedule {
    /// Parses `YYYY-MM-DD` and `HH:MM` and checks the result is after `now`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidSchedule`] if either part does not parse.
    /// - [`CoreError::ScheduleInPast`] if the start is at or before `now`.
    pub fn parse(date: &str, time: &str, now: NaiveDateTime) -> Result<Self, CoreError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| CoreError::InvalidSchedule(format!("date '{date}': {e}")))?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|e| CoreError::InvalidSchedule(format!("time '{time}': {e}")))?;

        let start = date.and_time(time);
        if start <= now {
            return Err(CoreError::ScheduleInPast(start.to_string()));
        }
        Ok(Self { date, time })
    }

    /// Date in the `route_date` wire format.
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Time in the `route_time` wire format.
    #[must_use]
    pub fn time_string(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}
