//! Common types and utilities shared across farewatch crates.
//!
//! This crate defines the crawl data model, settings value types, price/date
//! normalization, and observability helpers used throughout the workspace.
//! It stays dependency‑minimal so that every crate can depend on it.
//!
//! # Overview
//!
//! - [`model`]: airports, [`SearchConfig`], per‑day and per‑crawl results
//! - [`settings`]: crawl, browser and logging settings with defaults
//! - [`normalize`]: price cleanup and `DD/MM/YYYY` calendar arithmetic
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ValidationError`]: errors raised before any browser interaction
//!
//! # Examples
//!
//! ```rust
//! use farewatch_common::{SearchConfig, TravelDate, TripType};
//!
//! let cfg = SearchConfig {
//!     departure_airport: "SGN".into(),
//!     arrival_airport: "HAN".into(),
//!     trip_type: TripType::OneWay,
//!     departure_date: TravelDate::parse("31/01/2025").unwrap(),
//!     return_date: None,
//!     find_cheapest: false,
//! };
//! assert!(cfg.validate(None).is_ok());
//! ```

pub mod model;
pub mod normalize;
pub mod observability;
pub mod settings;

pub use model::{
    Airport, AirportDirectory, CrawlSummary, DayCrawlResult, PriceRecord, SearchConfig,
    TravelDate, TripType,
};
pub use settings::{
    AdvanceFailurePolicy, BrowserSettings, CrawlSettings, DayHorizon, LoggingSettings,
    RetrySettings, Site, StealthProfile, Timings,
};

/// Errors raised while validating a search before the browser is touched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Departure and arrival resolve to the same airport.
    #[error("departure and arrival airport are both {0}")]
    SameAirport(String),

    /// An airport code was blank.
    #[error("{0} airport code is empty")]
    EmptyAirportCode(&'static str),

    /// The airport code is not present in the supplied directory.
    #[error("unknown airport code: {0}")]
    UnknownAirport(String),

    /// Round trips need a return date.
    #[error("round trip requires a return date")]
    MissingReturnDate,

    /// Return date precedes the departure date.
    #[error("return date {ret} is before departure date {dep}")]
    ReturnBeforeDeparture { dep: String, ret: String },

    /// A date string was not `DD/MM/YYYY` or `today`.
    #[error("invalid date '{0}', expected DD/MM/YYYY or 'today'")]
    InvalidDate(String),
}
