//! Settings value types shared by the config loader, drivers and crawler.
//!
//! Everything here has a default so that a configuration file only needs a
//! `search` block.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::last_day_of_month;
use crate::observability::LogFormat;

/// Which revision/locale of the booking site the crawl targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    #[default]
    VietjetVi,
    VietjetEn,
}

/// How many consecutive days one attempt walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DayHorizon {
    Fixed { days: u32 },
    EndOfMonth,
}

impl Default for DayHorizon {
    fn default() -> Self {
        Self::Fixed { days: 15 }
    }
}

impl DayHorizon {
    /// Number of days to crawl starting at `start` (inclusive). Never zero.
    pub fn days_from(&self, start: NaiveDate) -> u32 {
        match self {
            Self::Fixed { days } => (*days).max(1),
            Self::EndOfMonth => {
                let span = last_day_of_month(start) - start;
                u32::try_from(span.num_days()).unwrap_or(0) + 1
            }
        }
    }
}

/// What to do once the in-page date control cannot be advanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceFailurePolicy {
    /// Stop the day loop and return what was collected.
    #[default]
    EndEarly,
    /// Fail the attempt so the retry orchestrator restarts it.
    FailAttempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts made after the first one fails.
    pub max_retries: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay_ms: 5_000,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Waits and settle delays, all in milliseconds.
///
/// Settle delays absorb animation/render latency; nothing depends on their
/// exact length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub visible_timeout_ms: u64,
    pub price_wait_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub option_settle_ms: u64,
    pub submit_settle_ms: u64,
    pub day_advance_settle_ms: u64,
    pub step_delay_min_ms: u64,
    pub step_delay_max_ms: u64,
    pub typing_delay_min_ms: u64,
    pub typing_delay_max_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            visible_timeout_ms: 10_000,
            price_wait_timeout_ms: 20_000,
            navigation_timeout_ms: 30_000,
            poll_interval_ms: 250,
            option_settle_ms: 1_500,
            submit_settle_ms: 8_000,
            day_advance_settle_ms: 4_000,
            step_delay_min_ms: 400,
            step_delay_max_ms: 1_200,
            typing_delay_min_ms: 30,
            typing_delay_max_ms: 150,
        }
    }
}

impl Timings {
    /// No settle delays and short waits; for fakes and tests.
    pub fn instant() -> Self {
        Self {
            visible_timeout_ms: 50,
            price_wait_timeout_ms: 50,
            navigation_timeout_ms: 50,
            poll_interval_ms: 5,
            option_settle_ms: 0,
            submit_settle_ms: 0,
            day_advance_settle_ms: 0,
            step_delay_min_ms: 0,
            step_delay_max_ms: 0,
            typing_delay_min_ms: 0,
            typing_delay_max_ms: 0,
        }
    }

    pub fn visible_timeout(&self) -> Duration {
        Duration::from_millis(self.visible_timeout_ms)
    }

    pub fn price_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.price_wait_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn option_settle(&self) -> Duration {
        Duration::from_millis(self.option_settle_ms)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_millis(self.submit_settle_ms)
    }

    pub fn day_advance_settle(&self) -> Duration {
        Duration::from_millis(self.day_advance_settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub site: Site,
    /// Overrides the site's default landing page.
    pub base_url: Option<String>,
    pub horizon: DayHorizon,
    pub retry: RetrySettings,
    pub timings: Timings,
    pub advance_failure: AdvanceFailurePolicy,
    /// Passes over the pagination heuristics before an advance is failed.
    pub advance_attempts: u32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            site: Site::default(),
            base_url: None,
            horizon: DayHorizon::default(),
            retry: RetrySettings::default(),
            timings: Timings::default(),
            advance_failure: AdvanceFailurePolicy::default(),
            advance_attempts: 2,
        }
    }
}

/// Levels of stealth applied to the browser session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthProfile {
    Lightweight,
    #[default]
    Balanced,
    Maximum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthProfile,
    /// Where checkpoint screenshots land; `None` disables them.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            stealth: StealthProfile::default(),
            screenshot_dir: Some(PathBuf::from("screenshots")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub default_filter: String,
    pub emit_stderr: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
            emit_stderr: true,
        }
    }
}
