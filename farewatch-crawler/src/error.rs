use std::time::Duration;

use farewatch_common::ValidationError;
use farewatch_drivers::DriverError;

use crate::form::FormState;
use crate::orchestrator::AttemptPhase;

/// Error types raised by the crawl engine.
///
/// Day- and option-level kinds are recorded into the result `errors` lists
/// rather than propagated; the remaining kinds abort the current attempt.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    /// An element never became visible within its wait bound.
    #[error("element `{selector}` not found or not visible after {waited:?}")]
    ElementNotFound { selector: String, waited: Duration },

    /// Every click strategy was tried and none succeeded.
    #[error("could not activate `{selector}` after {tried} interaction strategies")]
    ClickFailed { selector: String, tried: usize },

    /// A form transition could not be completed.
    #[error("form step {step} failed: {reason}")]
    FormStepFailed { step: FormState, reason: String },

    /// No price indicator rendered for a day.
    #[error("no price indicators rendered for {date} within {waited:?}")]
    DayExtractionTimeout { date: String, waited: Duration },

    /// One price option could not be turned into a record.
    #[error("option {index}: {reason}")]
    OptionExtractionFailed { index: usize, reason: String },

    /// No pagination heuristic moved the page to the next day.
    #[error("could not advance past {date}: {reason}")]
    DayAdvanceFailed { date: String, reason: String },

    /// A fatal failure ended one crawl attempt.
    #[error("crawl attempt {attempt} failed after reaching {phase}: {source}")]
    WholeAttemptFailed {
        attempt: u32,
        phase: AttemptPhase,
        #[source]
        source: Box<CrawlError>,
    },

    #[error("invalid search: {0}")]
    Validation(#[from] ValidationError),

    #[error("browser driver: {0}")]
    Driver(#[from] DriverError),
}

impl CrawlError {
    /// Wrap a lower-level failure as a failed form transition.
    pub(crate) fn form(step: FormState, cause: impl std::fmt::Display) -> Self {
        CrawlError::FormStepFailed {
            step,
            reason: cause.to_string(),
        }
    }
}
