//! Resilient click/type/wait primitives over a [`PageSession`].
//!
//! Clicks walk a fixed, ordered list of [`ClickStrategy`] values and stop at
//! the first that succeeds. Nothing here retries beyond that list; every
//! failure is handed back to the caller.

use std::fmt;
use std::time::Duration;

use farewatch_common::Timings;
use farewatch_drivers::browser::behavioral::BehavioralEngine;
use farewatch_drivers::{DriverError, PageScript, PageSession};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::CrawlError;
use crate::scripts::{
    CLICK_INNER_MARKER, DISPATCH_INPUT_EVENTS, ELEMENT_STATE, FORCE_CLICK, HOVER_THEN_CLICK,
};

/// One concrete way of activating an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    /// Native WebDriver click.
    Direct,
    /// In-page activation, ignoring anything occluding the element.
    Forced,
    /// Activate the element's inner marker (label span, icon, input).
    InnerMarker,
    /// Synthesize hover events, then activate.
    HoverThenActivate,
}

impl ClickStrategy {
    pub const ALL: [ClickStrategy; 4] = [
        ClickStrategy::Direct,
        ClickStrategy::Forced,
        ClickStrategy::InnerMarker,
        ClickStrategy::HoverThenActivate,
    ];
}

impl fmt::Display for ClickStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClickStrategy::Direct => "direct",
            ClickStrategy::Forced => "forced",
            ClickStrategy::InnerMarker => "inner-marker",
            ClickStrategy::HoverThenActivate => "hover-then-activate",
        })
    }
}

/// Per-call limits for [`Interactor::click_element`].
#[derive(Debug, Clone)]
pub struct ClickConstraints {
    pub visible_timeout: Duration,
    pub scroll_into_view: bool,
    pub strategies: Vec<ClickStrategy>,
    pub inner_marker: &'static str,
}

impl ClickConstraints {
    pub fn new(visible_timeout: Duration, inner_marker: &'static str) -> Self {
        Self {
            visible_timeout,
            scroll_into_view: true,
            strategies: ClickStrategy::ALL.to_vec(),
            inner_marker,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ElementState {
    pub exists: bool,
    pub visible: bool,
    pub in_viewport: bool,
}

/// Interaction primitives bound to one page.
pub struct Interactor<'a> {
    page: &'a dyn PageSession,
    timings: Timings,
    inner_marker: &'static str,
    behavior: BehavioralEngine,
}

impl<'a> Interactor<'a> {
    pub fn new(page: &'a dyn PageSession, timings: Timings, inner_marker: &'static str) -> Self {
        Self {
            page,
            timings,
            inner_marker,
            behavior: BehavioralEngine::new(),
        }
    }

    pub fn page(&self) -> &'a dyn PageSession {
        self.page
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn default_constraints(&self) -> ClickConstraints {
        ClickConstraints::new(self.timings.visible_timeout(), self.inner_marker)
    }

    /// Run a page script and decode its JSON result.
    pub async fn eval<T: DeserializeOwned>(
        &self,
        script: &PageScript,
        args: Vec<Value>,
    ) -> Result<T, CrawlError> {
        let value = self.page.evaluate(script, args).await?;
        serde_json::from_value(value).map_err(|e| {
            CrawlError::Driver(DriverError::Script {
                name: script.name,
                message: format!("unexpected result shape: {e}"),
            })
        })
    }

    /// Run one of the text-matching `mark_*` scripts and return the selector
    /// of the tagged element, if any.
    pub async fn mark_by_text(
        &self,
        script: &PageScript,
        scope: Option<&str>,
        candidates: &str,
        needles: &[&str],
    ) -> Result<Option<String>, CrawlError> {
        self.eval(script, vec![json!(scope), json!(candidates), json!(needles)])
            .await
    }

    pub async fn element_state(&self, selector: &str) -> Result<ElementState, CrawlError> {
        self.eval(&ELEMENT_STATE, vec![json!(selector)]).await
    }

    /// Poll until the element exists with a non-zero rendered size and no
    /// hidden ancestor.
    pub async fn wait_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementState, CrawlError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.element_state(selector).await {
                Ok(state) if state.visible => return Ok(state),
                Ok(_) => {}
                Err(e) => debug!(target: "browser.wait", %selector, error = %e, "visibility check failed"),
            }
            if Instant::now() >= deadline {
                return Err(CrawlError::ElementNotFound {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            sleep(self.timings.poll_interval()).await;
        }
    }

    /// Whether the element is visible right now, without waiting.
    pub async fn is_visible(&self, selector: &str) -> bool {
        matches!(self.element_state(selector).await, Ok(s) if s.visible)
    }

    /// Click with the default constraints.
    pub async fn click(&self, selector: &str) -> Result<ClickStrategy, CrawlError> {
        self.click_element(selector, &self.default_constraints()).await
    }

    /// Wait for visibility, scroll into view if needed, then try each
    /// strategy in order. Returns the strategy that worked.
    pub async fn click_element(
        &self,
        selector: &str,
        constraints: &ClickConstraints,
    ) -> Result<ClickStrategy, CrawlError> {
        let state = self
            .wait_visible(selector, constraints.visible_timeout)
            .await?;

        if constraints.scroll_into_view && !state.in_viewport {
            if let Err(e) = self.page.scroll_into_view(selector).await {
                debug!(target: "browser.click", %selector, error = %e, "scroll into view failed");
            }
        }

        for strategy in &constraints.strategies {
            match self.try_strategy(*strategy, selector, constraints).await {
                Ok(true) => {
                    debug!(target: "browser.click", %selector, %strategy, "element activated");
                    return Ok(*strategy);
                }
                Ok(false) => {
                    debug!(target: "browser.click", %selector, %strategy, "strategy not applicable");
                }
                Err(e) => {
                    debug!(target: "browser.click", %selector, %strategy, error = %e, "strategy failed");
                }
            }
        }

        warn!(target: "browser.click", %selector, "all click strategies failed");
        Err(CrawlError::ClickFailed {
            selector: selector.to_string(),
            tried: constraints.strategies.len(),
        })
    }

    async fn try_strategy(
        &self,
        strategy: ClickStrategy,
        selector: &str,
        constraints: &ClickConstraints,
    ) -> Result<bool, CrawlError> {
        match strategy {
            ClickStrategy::Direct => {
                self.page.click(selector).await?;
                Ok(true)
            }
            ClickStrategy::Forced => self.eval(&FORCE_CLICK, vec![json!(selector)]).await,
            ClickStrategy::InnerMarker => {
                self.eval(
                    &CLICK_INNER_MARKER,
                    vec![json!(selector), json!(constraints.inner_marker)],
                )
                .await
            }
            ClickStrategy::HoverThenActivate => {
                self.eval(&HOVER_THEN_CLICK, vec![json!(selector)]).await
            }
        }
    }

    /// Focus, optionally clear, type with inter-character delay, then fire
    /// input/change notifications.
    pub async fn type_into(&self, selector: &str, text: &str, clear: bool) -> Result<(), CrawlError> {
        self.click(selector).await?;
        if clear {
            self.page.clear(selector).await?;
        }
        self.behavior
            .type_text_human_like(
                self.page,
                selector,
                text,
                self.timings.typing_delay_min_ms,
                self.timings.typing_delay_max_ms,
            )
            .await?;
        let dispatched: bool = self
            .eval(&DISPATCH_INPUT_EVENTS, vec![json!(selector)])
            .await?;
        if !dispatched {
            debug!(target: "browser.type", %selector, "input element vanished before notification");
        }
        Ok(())
    }

    /// Lightly randomized pause between form steps.
    pub async fn pause(&self) {
        self.behavior
            .random_delay(self.timings.step_delay_min_ms, self.timings.step_delay_max_ms)
            .await;
    }

    /// Fixed settle delay.
    pub async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
