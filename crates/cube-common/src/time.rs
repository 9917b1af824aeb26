//! Time-step keys for the cube.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// One (year, month) acquisition slot of the cube.
///
/// Ordering is year first, then month, both as integers, which is the order
/// the assembler visits time steps in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeStep {
    pub year: i32,
    pub month: u32,
}

impl TimeStep {
    /// Create a time step, validating the month.
    pub fn new(year: i32, month: u32) -> Result<Self, ParseError> {
        if !(1..=12).contains(&month) {
            return Err(ParseError::InvalidTimeStep(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Time step containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Time step of a compact acquisition stamp such as `20190103T104431`
    /// or a bare `20190103`.
    pub fn from_acquisition_stamp(stamp: &str) -> Result<Self, ParseError> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S") {
            return Ok(Self::from_date(dt.date()));
        }
        NaiveDate::parse_from_str(stamp, "%Y%m%d")
            .map(Self::from_date)
            .map_err(|_| ParseError::InvalidTimeStep(stamp.to_string()))
    }

    /// Storage path component, e.g. `2019/01`.
    pub fn storage_path(&self) -> String {
        format!("{}/{:02}", self.year, self.month)
    }
}

/// Canonical key `YYYY-MM`.
impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for TimeStep {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| ParseError::InvalidTimeStep(s.to_string()))?;

        let year = year
            .trim()
            .parse::<i32>()
            .map_err(|_| ParseError::InvalidTimeStep(s.to_string()))?;
        let month = month
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidTimeStep(s.to_string()))?;

        Self::new(year, month)
    }
}

impl TryFrom<String> for TimeStep {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeStep> for String {
    fn from(step: TimeStep) -> Self {
        step.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_numeric() {
        let mut steps = vec![
            TimeStep::new(2020, 1).unwrap(),
            TimeStep::new(2019, 12).unwrap(),
            TimeStep::new(2019, 2).unwrap(),
            TimeStep::new(2019, 10).unwrap(),
        ];
        steps.sort();
        let keys: Vec<String> = steps.iter().map(|s| s.to_string()).collect();
        assert_eq!(keys, vec!["2019-02", "2019-10", "2019-12", "2020-01"]);
    }

    #[test]
    fn test_invalid_month() {
        assert!(TimeStep::new(2019, 0).is_err());
        assert!(TimeStep::new(2019, 13).is_err());
        assert!("2019-13".parse::<TimeStep>().is_err());
        assert!("2019".parse::<TimeStep>().is_err());
    }

    #[test]
    fn test_parse_and_storage_path() {
        let step: TimeStep = "2019-03".parse().unwrap();
        assert_eq!(step, TimeStep { year: 2019, month: 3 });
        assert_eq!(step.storage_path(), "2019/03");
    }

    #[test]
    fn test_from_acquisition_stamp() {
        let step = TimeStep::from_acquisition_stamp("20190103T104431").unwrap();
        assert_eq!(step, TimeStep { year: 2019, month: 1 });

        let step = TimeStep::from_acquisition_stamp("20211130").unwrap();
        assert_eq!(step, TimeStep { year: 2021, month: 11 });

        assert!(TimeStep::from_acquisition_stamp("B02").is_err());
    }
}
