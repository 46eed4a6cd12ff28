//! Multi-day loop over the results page date strip.

use std::fmt;

use chrono::NaiveDate;
use farewatch_common::normalize::{format_day, next_day};
use farewatch_common::{AdvanceFailurePolicy, CrawlSettings, CrawlSummary};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::CrawlError;
use crate::extract::{DayContext, Extractor};
use crate::interaction::Interactor;
use crate::scripts::{MARK_NEXT_DAY_ICON, MARK_NEXT_DAY_NEAR_STRIP, MARK_NEXT_DAY_SLIDER};
use crate::site::SiteAdapter;

/// Ways of locating the "next day" control, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceHeuristic {
    /// Icon button whose vector path matches the next-chevron signature.
    NextIcon,
    /// Any clickable carrying that icon, level with the date strip.
    IconNearDateStrip,
    /// Control adjacent to the date slider container.
    SliderAdjacent,
}

impl AdvanceHeuristic {
    pub const ALL: [AdvanceHeuristic; 3] = [
        AdvanceHeuristic::NextIcon,
        AdvanceHeuristic::IconNearDateStrip,
        AdvanceHeuristic::SliderAdjacent,
    ];
}

impl fmt::Display for AdvanceHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdvanceHeuristic::NextIcon => "next-icon",
            AdvanceHeuristic::IconNearDateStrip => "icon-near-date-strip",
            AdvanceHeuristic::SliderAdjacent => "slider-adjacent",
        })
    }
}

pub struct DayCrawler<'a> {
    ui: &'a Interactor<'a>,
    site: SiteAdapter,
    settings: &'a CrawlSettings,
}

impl<'a> DayCrawler<'a> {
    pub fn new(ui: &'a Interactor<'a>, site: SiteAdapter, settings: &'a CrawlSettings) -> Self {
        Self { ui, site, settings }
    }

    /// Crawl every day of the horizon starting at `start`.
    ///
    /// Day-level problems are recorded in the summary. A day-advance failure
    /// ends the loop early or fails the attempt, per
    /// [`AdvanceFailurePolicy`].
    pub async fn crawl(
        &self,
        start: NaiveDate,
        departure: &str,
        arrival: &str,
    ) -> Result<CrawlSummary, CrawlError> {
        let days = self.settings.horizon.days_from(start);
        let extractor = Extractor::new(self.ui, self.site);
        let mut summary = CrawlSummary::new();
        let mut date = format_day(start);

        info!(target: "crawl.day", start = %date, days, "day loop started");
        for n in 1..=days {
            let ctx = DayContext::new(&date, departure, arrival)?;
            info!(target: "crawl.day", date = %date, day = n, of = days, "crawling day");
            let day = extractor.crawl_day(&ctx).await;
            info!(
                target: "crawl.day",
                date = %date,
                prices = day.prices.len(),
                errors = day.errors.len(),
                "day finished"
            );
            summary.push_day(day);

            if n < days {
                if let Err(e) = self.advance(&date).await {
                    summary.advance_failures.push(e.to_string());
                    match self.settings.advance_failure {
                        AdvanceFailurePolicy::EndEarly => {
                            warn!(
                                target: "crawl.day",
                                date = %date,
                                crawled = summary.total_days_crawled,
                                error = %e,
                                "ending day loop early"
                            );
                            break;
                        }
                        AdvanceFailurePolicy::FailAttempt => return Err(e),
                    }
                }
            }
            date = next_day(&date)?;
        }

        info!(
            target: "crawl.day",
            days = summary.total_days_crawled,
            prices = summary.total_price_options,
            flights = summary.total_unique_flights,
            "day loop finished"
        );
        Ok(summary)
    }

    /// Move the page to the day after `date`, retrying the heuristic list
    /// up to `advance_attempts` times.
    pub async fn advance(&self, date: &str) -> Result<AdvanceHeuristic, CrawlError> {
        let rounds = self.settings.advance_attempts.max(1);
        let mut last_problem = String::from("no pagination control found");

        for round in 1..=rounds {
            for heuristic in AdvanceHeuristic::ALL {
                let selector = match self.locate(heuristic).await {
                    Ok(Some(selector)) => selector,
                    Ok(None) => {
                        debug!(target: "crawl.day", %heuristic, round, "no match");
                        continue;
                    }
                    Err(e) => {
                        debug!(target: "crawl.day", %heuristic, round, error = %e, "heuristic failed");
                        last_problem = e.to_string();
                        continue;
                    }
                };
                match self.ui.click(&selector).await {
                    Ok(_) => {
                        debug!(target: "crawl.day", %heuristic, from = %date, "advanced to next day");
                        self.ui.settle(self.ui.timings().day_advance_settle()).await;
                        return Ok(heuristic);
                    }
                    Err(e) => {
                        debug!(target: "crawl.day", %heuristic, round, error = %e, "next-day control not clickable");
                        last_problem = e.to_string();
                    }
                }
            }
            if round < rounds {
                self.ui.settle(self.ui.timings().poll_interval()).await;
            }
        }

        Err(CrawlError::DayAdvanceFailed {
            date: date.to_string(),
            reason: format!("{last_problem} after {rounds} round(s)"),
        })
    }

    async fn locate(&self, heuristic: AdvanceHeuristic) -> Result<Option<String>, CrawlError> {
        let selectors = self.site.selectors();
        let signature = self.site.next_icon_signature();
        match heuristic {
            AdvanceHeuristic::NextIcon => {
                self.ui
                    .eval(
                        &MARK_NEXT_DAY_ICON,
                        vec![json!(selectors.icon_buttons), json!(signature)],
                    )
                    .await
            }
            AdvanceHeuristic::IconNearDateStrip => {
                self.ui
                    .eval(
                        &MARK_NEXT_DAY_NEAR_STRIP,
                        vec![json!(selectors.date_strip), json!(signature)],
                    )
                    .await
            }
            AdvanceHeuristic::SliderAdjacent => {
                self.ui
                    .eval(&MARK_NEXT_DAY_SLIDER, vec![json!(selectors.date_slider)])
                    .await
            }
        }
    }
}
