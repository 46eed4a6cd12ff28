//! Booking form automation.
//!
//! The form is filled strictly in order:
//! `Idle -> TripTypeSet -> DepartureSelected -> ArrivalSelected -> DateSelected -> Submitted`.
//! Fatal step failures surface as [`CrawlError::FormStepFailed`]; the rest
//! are logged and the form keeps its defaults.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use farewatch_common::{Airport, SearchConfig, TravelDate, TripType};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::CrawlError;
use crate::interaction::Interactor;
use crate::scripts::{
    MARK_AIRPORT_CANDIDATE, MARK_CHEAPEST_TOGGLE, MARK_DAY_CELLS, MARK_SEARCH_BUTTON,
    MARK_TRIP_TYPE, READ_MONTH_HEADER,
};
use crate::site::SiteAdapter;

/// Upper bound on month-navigation clicks for one date selection.
pub const MAX_MONTH_STEPS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    TripTypeSet,
    DepartureSelected,
    ArrivalSelected,
    DateSelected,
    Submitted,
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormState::Idle => "idle",
            FormState::TripTypeSet => "trip-type-set",
            FormState::DepartureSelected => "departure-selected",
            FormState::ArrivalSelected => "arrival-selected",
            FormState::DateSelected => "date-selected",
            FormState::Submitted => "submitted",
        })
    }
}

/// Which way the calendar has to move to show the target month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStep {
    Next,
    Previous,
    Arrived,
}

/// Compare the displayed `(year, month)` with the target.
pub fn month_step(displayed: (i32, u32), target: (i32, u32)) -> MonthStep {
    let index = |(y, m): (i32, u32)| i64::from(y) * 12 + i64::from(m);
    match index(displayed).cmp(&index(target)) {
        std::cmp::Ordering::Less => MonthStep::Next,
        std::cmp::Ordering::Greater => MonthStep::Previous,
        std::cmp::Ordering::Equal => MonthStep::Arrived,
    }
}

#[derive(Debug, Default, Deserialize)]
struct DayCells {
    strict: Option<String>,
    loose: Option<String>,
}

/// Outcome of the bounded month-navigation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthNavigation {
    pub arrived: bool,
    pub steps: u32,
}

pub struct FormAutomation<'a> {
    ui: &'a Interactor<'a>,
    site: SiteAdapter,
    state: FormState,
}

impl<'a> FormAutomation<'a> {
    pub fn new(ui: &'a Interactor<'a>, site: SiteAdapter) -> Self {
        Self {
            ui,
            site,
            state: FormState::Idle,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    fn reach(&mut self, state: FormState) {
        self.state = state;
        info!(target: "crawl.form", state = %state, "form state reached");
    }

    /// Fill every form step in order and submit the search.
    pub async fn fill_and_submit(
        &mut self,
        search: &SearchConfig,
        departure: &Airport,
        arrival: &Airport,
        today: NaiveDate,
    ) -> Result<(), CrawlError> {
        self.set_trip_type(search.trip_type).await;
        self.reach(FormState::TripTypeSet);
        self.ui.pause().await;

        let selectors = self.site.selectors();
        let picked = self
            .select_airport(selectors.departure_input, departure)
            .await
            .map_err(|e| CrawlError::form(FormState::DepartureSelected, e))?;
        if !picked {
            return Err(CrawlError::form(
                FormState::DepartureSelected,
                format!("no suggestion matches departure airport {}", departure.code),
            ));
        }
        self.reach(FormState::DepartureSelected);
        self.ui.pause().await;

        let picked = self
            .select_airport(selectors.arrival_input, arrival)
            .await
            .map_err(|e| CrawlError::form(FormState::ArrivalSelected, e))?;
        if !picked {
            warn!(
                target: "crawl.form",
                airport = %arrival.code,
                "no suggestion matches arrival airport, keeping typed value"
            );
        }
        self.reach(FormState::ArrivalSelected);
        self.ui.pause().await;

        self.select_date(selectors.departure_date_trigger, search.departure_date, today)
            .await
            .map_err(|e| CrawlError::form(FormState::DateSelected, e))?;

        if search.trip_type == TripType::RoundTrip {
            if let Some(ret) = search.return_date {
                self.select_return_date(ret, today).await;
            }
        }
        self.reach(FormState::DateSelected);
        self.ui.pause().await;

        self.submit(search.find_cheapest)
            .await
            .map_err(|e| CrawlError::form(FormState::Submitted, e))?;
        self.reach(FormState::Submitted);
        Ok(())
    }

    /// Non-fatal: an unresolved control leaves the site's default mode.
    async fn set_trip_type(&self, trip_type: TripType) {
        let labels = self.site.labels();
        let needles = match trip_type {
            TripType::OneWay => labels.one_way,
            TripType::RoundTrip => labels.round_trip,
        };
        let outcome = match self
            .ui
            .mark_by_text(
                &MARK_TRIP_TYPE,
                None,
                self.site.selectors().trip_type_controls,
                needles,
            )
            .await
        {
            Ok(Some(selector)) => self.ui.click(&selector).await.map(|_| ()),
            Ok(None) => {
                warn!(target: "crawl.form", ?trip_type, "trip type control not found, keeping default");
                return;
            }
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            warn!(target: "crawl.form", ?trip_type, error = %e, "could not set trip type, keeping default");
        }
    }

    /// Type the code into the autocomplete input and click the first
    /// suggestion mentioning the code, city or airport name.
    ///
    /// `Ok(false)` means the panel never offered a matching entry.
    pub async fn select_airport(&self, input: &str, airport: &Airport) -> Result<bool, CrawlError> {
        self.ui.type_into(input, &airport.code, true).await?;

        let selectors = self.site.selectors();
        let needles: Vec<&str> = [
            airport.code.as_str(),
            airport.city.as_str(),
            airport.airport_name.as_str(),
        ]
        .into_iter()
        .filter(|n| !n.trim().is_empty())
        .collect();

        let timeout = self.ui.timings().visible_timeout();
        let deadline = Instant::now() + timeout;
        let candidate = loop {
            let found = self
                .ui
                .mark_by_text(
                    &MARK_AIRPORT_CANDIDATE,
                    Some(selectors.airport_panel),
                    selectors.airport_entry,
                    &needles,
                )
                .await?;
            if found.is_some() || Instant::now() >= deadline {
                break found;
            }
            sleep(self.ui.timings().poll_interval()).await;
        };

        let Some(candidate) = candidate else {
            debug!(target: "crawl.form", airport = %airport.code, ?timeout, "no matching suggestion");
            return Ok(false);
        };
        self.ui.click(&candidate).await?;
        debug!(target: "crawl.form", airport = %airport.code, "airport suggestion selected");
        Ok(true)
    }

    /// Open the calendar behind `trigger` and select `date`.
    pub async fn select_date(
        &self,
        trigger: &str,
        date: TravelDate,
        today: NaiveDate,
    ) -> Result<(), CrawlError> {
        let selectors = self.site.selectors();
        let timeout = self.ui.timings().visible_timeout();

        if !self.ui.is_visible(selectors.month_header).await {
            self.ui.click(trigger).await?;
        }
        self.ui.wait_visible(selectors.month_header, timeout).await?;

        let target = match date {
            TravelDate::Today => {
                self.ui.click(selectors.today_cell).await?;
                info!(target: "crawl.form", date = %today, "selected today");
                return Ok(());
            }
            TravelDate::On(target) => target,
        };

        let nav = self
            .navigate_to_month((target.year(), target.month()))
            .await?;
        if !nav.arrived {
            warn!(
                target: "crawl.form",
                %target,
                steps = nav.steps,
                "calendar did not reach target month, trying day cells anyway"
            );
        }

        let cells: DayCells = self
            .ui
            .eval(
                &MARK_DAY_CELLS,
                vec![
                    json!(selectors.day_cell),
                    json!(selectors.day_number),
                    json!(target.day()),
                    json!(selectors.passive_day_class),
                    json!(selectors.disabled_day_class),
                ],
            )
            .await?;
        let cell = match (cells.strict, cells.loose) {
            (Some(strict), _) => strict,
            (None, Some(loose)) => {
                debug!(target: "crawl.form", %target, "no selectable cell, using label match");
                loose
            }
            (None, None) => {
                return Err(CrawlError::ElementNotFound {
                    selector: format!("{} labelled {}", selectors.day_cell, target.day()),
                    waited: timeout,
                });
            }
        };
        self.ui.click(&cell).await?;
        info!(target: "crawl.form", %target, "date selected");
        Ok(())
    }

    /// Step the calendar towards `target`, at most [`MAX_MONTH_STEPS`] clicks.
    ///
    /// The header is read once more after the last click, so a target exactly
    /// [`MAX_MONTH_STEPS`] months away still counts as arrived.
    pub async fn navigate_to_month(&self, target: (i32, u32)) -> Result<MonthNavigation, CrawlError> {
        let selectors = self.site.selectors();
        let mut steps = 0;
        loop {
            let displayed = self.displayed_month().await?;
            let control = match month_step(displayed, target) {
                MonthStep::Arrived => return Ok(MonthNavigation { arrived: true, steps }),
                MonthStep::Next => selectors.next_month,
                MonthStep::Previous => selectors.prev_month,
            };
            if steps == MAX_MONTH_STEPS {
                return Ok(MonthNavigation {
                    arrived: false,
                    steps,
                });
            }
            debug!(target: "crawl.form", ?displayed, ?target, %control, "moving calendar");
            self.ui.click(control).await?;
            self.ui.settle(self.ui.timings().poll_interval()).await;
            steps += 1;
        }
    }

    /// Month shown by the calendar header. Falls back to the element's
    /// rendered text when no visible header is found in-page.
    async fn displayed_month(&self) -> Result<(i32, u32), CrawlError> {
        let selector = self.site.selectors().month_header;
        let header: Option<String> = self
            .ui
            .eval(&READ_MONTH_HEADER, vec![json!(selector)])
            .await?;
        let header = match header {
            Some(h) if !h.trim().is_empty() => h,
            _ => self.ui.page().read_text(selector).await?,
        };
        self.site
            .parse_month_header(&header)
            .ok_or_else(|| CrawlError::ElementNotFound {
                selector: selector.to_string(),
                waited: self.ui.timings().visible_timeout(),
            })
    }

    /// Non-fatal: only attempted when the page shows a return-date control.
    async fn select_return_date(&self, date: TravelDate, today: NaiveDate) {
        let trigger = self.site.selectors().return_date_trigger;
        match self.ui.element_state(trigger).await {
            Ok(state) if state.exists => {}
            _ => {
                debug!(target: "crawl.form", "no return date control on page");
                return;
            }
        }
        if let Err(e) = self.select_date(trigger, date, today).await {
            warn!(target: "crawl.form", %date, error = %e, "could not select return date");
        }
    }

    async fn submit(&self, find_cheapest: bool) -> Result<(), CrawlError> {
        let selectors = self.site.selectors();
        let labels = self.site.labels();

        if find_cheapest {
            match self
                .ui
                .mark_by_text(
                    &MARK_CHEAPEST_TOGGLE,
                    None,
                    selectors.option_toggles,
                    labels.cheapest_fare,
                )
                .await
            {
                Ok(Some(toggle)) => {
                    if let Err(e) = self.ui.click(&toggle).await {
                        warn!(target: "crawl.form", error = %e, "could not toggle cheapest fare");
                    }
                }
                Ok(None) => warn!(target: "crawl.form", "cheapest fare toggle not found"),
                Err(e) => warn!(target: "crawl.form", error = %e, "cheapest fare lookup failed"),
            }
        }

        let button = self
            .ui
            .mark_by_text(&MARK_SEARCH_BUTTON, None, selectors.search_controls, labels.search)
            .await?
            .ok_or_else(|| CrawlError::ElementNotFound {
                selector: selectors.search_controls.to_string(),
                waited: self.ui.timings().visible_timeout(),
            })?;
        self.ui.click(&button).await?;
        self.ui.settle(self.ui.timings().submit_settle()).await;
        Ok(())
    }
}
