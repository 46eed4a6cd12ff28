//! Whole-attempt retry around form automation and the day loop.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use farewatch_common::{
    Airport, AirportDirectory, CrawlSettings, CrawlSummary, RetrySettings, SearchConfig,
};
use farewatch_drivers::PageSession;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CrawlError;
use crate::form::FormAutomation;
use crate::interaction::Interactor;
use crate::paginate::DayCrawler;
use crate::scripts::MARK_COOKIE_ACCEPT;
use crate::site::SiteAdapter;

/// Progress of one crawl attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Started,
    Navigated,
    CookiesHandled,
    FormSubmitted,
    DayLoopRunning,
    Completed,
    Failed,
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttemptPhase::Started => "started",
            AttemptPhase::Navigated => "navigated",
            AttemptPhase::CookiesHandled => "cookies-handled",
            AttemptPhase::FormSubmitted => "form-submitted",
            AttemptPhase::DayLoopRunning => "day-loop-running",
            AttemptPhase::Completed => "completed",
            AttemptPhase::Failed => "failed",
        })
    }
}

/// Points at which a screenshot is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    InitialLoad,
    CookiesHandled,
    Results,
    Failure { attempt: u32 },
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::InitialLoad => f.write_str("initial_load"),
            Checkpoint::CookiesHandled => f.write_str("cookies_handled"),
            Checkpoint::Results => f.write_str("results"),
            Checkpoint::Failure { attempt } => write!(f, "failure_attempt_{attempt}"),
        }
    }
}

/// Receives diagnostic screenshots. Failures are logged by the caller and
/// never fail a crawl.
#[async_trait]
pub trait ScreenshotSink: Send + Sync {
    async fn store(&self, checkpoint: Checkpoint, png: Vec<u8>) -> std::io::Result<()>;
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScreenshots;

#[async_trait]
impl ScreenshotSink for NoScreenshots {
    async fn store(&self, _checkpoint: Checkpoint, _png: Vec<u8>) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `attempt` up to `max_retries + 1` times, sleeping `delay` between
/// tries. Returns the first success or the last error.
pub async fn run_with_retry<T, F, Fut>(retry: &RetrySettings, mut attempt: F) -> Result<T, CrawlError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CrawlError>>,
{
    let total = retry.max_retries.saturating_add(1);
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) if n >= total => {
                error!(target: "crawl.retry", attempts = n, error = %e, "all crawl attempts failed");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    target: "crawl.retry",
                    attempt = n,
                    of = total,
                    delay = ?retry.delay(),
                    error = %e,
                    "crawl attempt failed, retrying"
                );
                sleep(retry.delay()).await;
                n += 1;
            }
        }
    }
}

/// The crawl entry point for one browser page.
pub struct FareCrawler<'a> {
    page: &'a dyn PageSession,
    site: SiteAdapter,
    settings: CrawlSettings,
    airports: AirportDirectory,
    screenshots: Box<dyn ScreenshotSink + 'a>,
}

impl<'a> FareCrawler<'a> {
    pub fn new(page: &'a dyn PageSession, settings: CrawlSettings) -> Self {
        Self {
            page,
            site: SiteAdapter::new(settings.site),
            settings,
            airports: AirportDirectory::default(),
            screenshots: Box::new(NoScreenshots),
        }
    }

    pub fn with_airports(mut self, airports: AirportDirectory) -> Self {
        self.airports = airports;
        self
    }

    pub fn with_screenshots(mut self, sink: impl ScreenshotSink + 'a) -> Self {
        self.screenshots = Box::new(sink);
        self
    }

    pub fn site(&self) -> SiteAdapter {
        self.site
    }

    /// Crawl `search` with `today` taken from the local clock.
    pub async fn run(&self, search: &SearchConfig) -> Result<CrawlSummary, CrawlError> {
        self.run_on(search, Local::now().date_naive()).await
    }

    /// Validate, then run retried attempts until one completes.
    pub async fn run_on(
        &self,
        search: &SearchConfig,
        today: NaiveDate,
    ) -> Result<CrawlSummary, CrawlError> {
        let directory = (!self.airports.is_empty()).then_some(&self.airports);
        search.validate(directory)?;

        let departure = self.airports.resolve(&search.departure_airport);
        let arrival = self.airports.resolve(&search.arrival_airport);
        let (departure, arrival) = (&departure, &arrival);

        run_with_retry(&self.settings.retry, move |attempt| {
            self.attempt(attempt, search, departure, arrival, today)
        })
        .await
    }

    async fn attempt(
        &self,
        attempt: u32,
        search: &SearchConfig,
        departure: &Airport,
        arrival: &Airport,
        today: NaiveDate,
    ) -> Result<CrawlSummary, CrawlError> {
        let run_id = Uuid::new_v4();
        info!(
            target: "crawl.retry",
            %run_id,
            attempt,
            route = %format!("{}-{}", departure.code, arrival.code),
            phase = %AttemptPhase::Started,
            "crawl attempt started"
        );

        let mut phase = AttemptPhase::Started;
        match self
            .drive(&mut phase, run_id, search, departure, arrival, today)
            .await
        {
            Ok(summary) => {
                info!(
                    target: "crawl.retry",
                    %run_id,
                    attempt,
                    phase = %AttemptPhase::Completed,
                    days = summary.total_days_crawled,
                    prices = summary.total_price_options,
                    "crawl attempt completed"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    target: "crawl.retry",
                    %run_id,
                    attempt,
                    reached = %phase,
                    phase = %AttemptPhase::Failed,
                    error = %e,
                    "crawl attempt failed"
                );
                self.capture(Checkpoint::Failure { attempt }).await;
                Err(CrawlError::WholeAttemptFailed {
                    attempt,
                    phase,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn drive(
        &self,
        phase: &mut AttemptPhase,
        run_id: Uuid,
        search: &SearchConfig,
        departure: &Airport,
        arrival: &Airport,
        today: NaiveDate,
    ) -> Result<CrawlSummary, CrawlError> {
        let timings = self.settings.timings;
        let ui = Interactor::new(self.page, timings, self.site.selectors().inner_marker);

        let url = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.site.landing_url());
        self.page.goto(url, timings.navigation_timeout()).await?;
        self.enter(phase, AttemptPhase::Navigated, run_id);
        self.capture(Checkpoint::InitialLoad).await;

        self.accept_cookies(&ui).await;
        self.enter(phase, AttemptPhase::CookiesHandled, run_id);
        self.capture(Checkpoint::CookiesHandled).await;

        FormAutomation::new(&ui, self.site)
            .fill_and_submit(search, departure, arrival, today)
            .await?;
        self.enter(phase, AttemptPhase::FormSubmitted, run_id);

        self.enter(phase, AttemptPhase::DayLoopRunning, run_id);
        let start = search.departure_date.resolve(today);
        let summary = DayCrawler::new(&ui, self.site, &self.settings)
            .crawl(start, &departure.code, &arrival.code)
            .await?;
        self.capture(Checkpoint::Results).await;
        Ok(summary)
    }

    fn enter(&self, phase: &mut AttemptPhase, next: AttemptPhase, run_id: Uuid) {
        *phase = next;
        info!(target: "crawl.retry", %run_id, phase = %next, "attempt phase reached");
    }

    /// Click the consent banner's accept control if there is one.
    async fn accept_cookies(&self, ui: &Interactor<'_>) {
        let selectors = self.site.selectors();
        let labels = self.site.labels();
        match ui
            .mark_by_text(
                &MARK_COOKIE_ACCEPT,
                None,
                selectors.cookie_controls,
                labels.cookie_accept,
            )
            .await
        {
            Ok(Some(button)) => match ui.click(&button).await {
                Ok(strategy) => debug!(target: "crawl.retry", %strategy, "cookie consent accepted"),
                Err(e) => warn!(target: "crawl.retry", error = %e, "could not dismiss cookie banner"),
            },
            Ok(None) => debug!(target: "crawl.retry", "no cookie banner"),
            Err(e) => warn!(target: "crawl.retry", error = %e, "cookie banner lookup failed"),
        }
    }

    async fn capture(&self, checkpoint: Checkpoint) {
        let png = match self.page.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!(target: "crawl.screenshot", %checkpoint, error = %e, "screenshot failed");
                return;
            }
        };
        if let Err(e) = self.screenshots.store(checkpoint, png).await {
            warn!(target: "crawl.screenshot", %checkpoint, error = %e, "could not store screenshot");
        }
    }
}
