//! Crawl data model: search input, airport directory and crawl results.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::normalize::{format_day, parse_day};
use crate::ValidationError;

/// Reference record for one airport, supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub city: String,
    pub airport_name: String,
    #[serde(default)]
    pub country: String,
}

impl Airport {
    /// Placeholder used when a code is not present in the directory.
    pub fn from_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            city: String::new(),
            airport_name: String::new(),
            country: String::new(),
        }
    }
}

/// Airports keyed by IATA code (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    by_code: HashMap<String, Airport>,
}

impl AirportDirectory {
    pub fn new(airports: impl IntoIterator<Item = Airport>) -> Self {
        let by_code = airports
            .into_iter()
            .map(|a| (a.code.trim().to_ascii_uppercase(), a))
            .collect();
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&Airport> {
        self.by_code.get(&code.trim().to_ascii_uppercase())
    }

    /// Directory record for `code`, or a code-only placeholder.
    pub fn resolve(&self, code: &str) -> Airport {
        self.get(code)
            .cloned()
            .unwrap_or_else(|| Airport::from_code(code))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripType {
    #[default]
    #[serde(rename = "oneway")]
    OneWay,
    #[serde(rename = "roundtrip")]
    RoundTrip,
}

/// A travel date as configured: the literal `today` or a concrete day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelDate {
    Today,
    On(NaiveDate),
}

impl TravelDate {
    /// Parse `today` or `DD/MM/YYYY`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().eq_ignore_ascii_case("today") {
            Ok(Self::Today)
        } else {
            parse_day(raw).map(Self::On)
        }
    }

    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Today => today,
            Self::On(date) => *date,
        }
    }
}

impl fmt::Display for TravelDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::On(date) => f.write_str(&format_day(*date)),
        }
    }
}

impl Serialize for TravelDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TravelDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TravelDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One search submitted to the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub departure_airport: String,
    pub arrival_airport: String,
    #[serde(default)]
    pub trip_type: TripType,
    pub departure_date: TravelDate,
    #[serde(default)]
    pub return_date: Option<TravelDate>,
    #[serde(default)]
    pub find_cheapest: bool,
}

impl SearchConfig {
    /// Check the search before any browser interaction happens.
    ///
    /// When `directory` is given, both airport codes must be present in it.
    pub fn validate(&self, directory: Option<&AirportDirectory>) -> Result<(), ValidationError> {
        let dep = self.departure_airport.trim();
        let arr = self.arrival_airport.trim();
        if dep.is_empty() {
            return Err(ValidationError::EmptyAirportCode("departure"));
        }
        if arr.is_empty() {
            return Err(ValidationError::EmptyAirportCode("arrival"));
        }
        if dep.eq_ignore_ascii_case(arr) {
            return Err(ValidationError::SameAirport(dep.to_ascii_uppercase()));
        }
        if let Some(dir) = directory {
            for code in [dep, arr] {
                if dir.get(code).is_none() {
                    return Err(ValidationError::UnknownAirport(code.to_string()));
                }
            }
        }
        if self.trip_type == TripType::RoundTrip {
            let ret = self.return_date.ok_or(ValidationError::MissingReturnDate)?;
            if let (TravelDate::On(d), TravelDate::On(r)) = (self.departure_date, ret) {
                if r < d {
                    return Err(ValidationError::ReturnBeforeDeparture {
                        dep: format_day(d),
                        ret: format_day(r),
                    });
                }
            }
        }
        Ok(())
    }

    /// The same search shifted `days` forward, for crawling the next period.
    ///
    /// `today` resolves a `today` departure; the result always carries a
    /// concrete departure date.
    pub fn next_period(&self, days: u32, today: NaiveDate) -> SearchConfig {
        let shift = |d: NaiveDate| d.checked_add_days(Days::new(days.into())).unwrap_or(d);
        let departure = self.departure_date.resolve(today);
        SearchConfig {
            departure_date: TravelDate::On(shift(departure)),
            return_date: self
                .return_date
                .map(|r| TravelDate::On(shift(r.resolve(today)))),
            ..self.clone()
        }
    }
}

/// One fare option read from the booking details panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    /// ISO `YYYY-MM-DD`.
    pub flight_date: String,
    pub departure_time: String,
    pub arrival_time: String,
    #[serde(default)]
    pub cabin_class: Option<String>,
    #[serde(default)]
    pub aircraft_type: Option<String>,
    /// Digits only, never empty or zero.
    pub price: String,
}

/// Everything collected for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCrawlResult {
    /// `DD/MM/YYYY`.
    pub date: String,
    pub prices: Vec<PriceRecord>,
    pub errors: Vec<String>,
    pub total_flights: usize,
}

impl DayCrawlResult {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    pub fn push_price(&mut self, record: PriceRecord) {
        self.prices.push(record);
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Distinct flight numbers among the collected prices.
    pub fn unique_flights(&self) -> usize {
        self.prices
            .iter()
            .map(|p| p.flight_number.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Freeze the day, fixing `total_flights`.
    pub fn finish(mut self) -> Self {
        self.total_flights = self.unique_flights();
        self
    }
}

/// Result of one successful crawl attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub total_days_crawled: usize,
    pub total_price_options: usize,
    /// Sum of each day's distinct flight count.
    pub total_unique_flights: usize,
    pub daily_results: Vec<DayCrawlResult>,
    #[serde(default)]
    pub advance_failures: Vec<String>,
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a day, finishing it first so its totals are consistent.
    pub fn push_day(&mut self, day: DayCrawlResult) {
        let day = day.finish();
        self.total_days_crawled += 1;
        self.total_price_options += day.prices.len();
        self.total_unique_flights += day.total_flights;
        self.daily_results.push(day);
    }
}
