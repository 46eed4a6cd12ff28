//! Per-day price extraction from the results page.

use std::sync::LazyLock;

use farewatch_common::normalize::{is_priced, iso_day, normalize_price, parse_day};
use farewatch_common::{DayCrawlResult, PriceRecord, ValidationError};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::CrawlError;
use crate::interaction::Interactor;
use crate::scripts::{COUNT_PRICE_INDICATORS, MARK_PRICE_OPTIONS, READ_BOOKING_PANEL};
use crate::site::{Labels, SiteAdapter};

static FLIGHT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{2})\s?(\d{2,4})\b").expect("valid flight number regex")
});
static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})\s*[-–—]\s*(\d{1,2}):(\d{2})\b").expect("valid time regex")
});
static AIRCRAFT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(airbus|boeing|atr)\s*-?\s*([a-z]?\d{2,3}(?:-?[a-z0-9]{1,4})?)\b")
        .expect("valid aircraft regex")
});

/// One fare row found on the results page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceOption {
    pub selector: String,
    pub price_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PanelRow {
    pub label: String,
    pub value: String,
}

/// Snapshot of the booking details panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookingPanel {
    pub text: String,
    #[serde(default)]
    pub rows: Vec<PanelRow>,
}

/// Fixed fields shared by every record of one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayContext {
    /// `DD/MM/YYYY`, as tracked by the day loop.
    pub date: String,
    /// ISO form of `date`.
    pub flight_date: String,
    pub departure_airport: String,
    pub arrival_airport: String,
}

impl DayContext {
    pub fn new(date: &str, departure: &str, arrival: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            date: date.to_string(),
            flight_date: iso_day(parse_day(date)?),
            departure_airport: departure.to_string(),
            arrival_airport: arrival.to_string(),
        })
    }
}

/// Carrier code plus digits, e.g. `VJ 1198` -> `VJ1198`.
pub fn parse_flight_number(text: &str) -> Option<String> {
    FLIGHT_NUMBER
        .captures(text)
        .map(|c| format!("{}{}", &c[1], &c[2]))
}

/// First `HH:MM - HH:MM` range, zero-padded.
pub fn parse_time_range(text: &str) -> Option<(String, String)> {
    let c = TIME_RANGE.captures(text)?;
    let hm = |h: &str, m: &str| -> Option<String> {
        let h: u32 = h.parse().ok()?;
        let m: u32 = m.parse().ok()?;
        (h < 24 && m < 60).then(|| format!("{h:02}:{m:02}"))
    };
    Some((hm(&c[1], &c[2])?, hm(&c[3], &c[4])?))
}

/// Canonical name from `classes` for the first whole-word `pattern` hit.
///
/// `pattern` lists the classes longest-first so `SkyBoss Business` wins over
/// `SkyBoss`.
pub fn parse_cabin_class(text: &str, pattern: &Regex, classes: &[&str]) -> Option<String> {
    let found = pattern.find(text)?.as_str();
    classes
        .iter()
        .find(|c| c.to_lowercase() == found.to_lowercase())
        .map(|c| c.to_string())
}

/// Manufacturer and model, e.g. `Airbus A321`.
pub fn parse_aircraft(text: &str) -> Option<String> {
    let c = AIRCRAFT.captures(text)?;
    let maker = match c[1].to_ascii_lowercase().as_str() {
        "airbus" => "Airbus",
        "boeing" => "Boeing",
        _ => "ATR",
    };
    Some(format!("{maker} {}", c[2].to_ascii_uppercase()))
}

/// Total-price rows first, preferring a non-zero value; trip-price rows
/// otherwise. Returns the normalized amount.
pub fn resolve_price(rows: &[PanelRow], labels: &Labels) -> Option<String> {
    let priced = |headings: &[&str]| {
        rows.iter()
            .filter(|row| {
                let label = row.label.to_lowercase();
                headings.iter().any(|h| label.contains(&h.to_lowercase()))
            })
            .map(|row| normalize_price(&row.value))
            .find(|p| is_priced(p))
    };
    priced(labels.total_price).or_else(|| priced(labels.trip_price))
}

/// Turn a panel snapshot into a record, or explain why it cannot be used.
pub fn build_record(
    panel: &BookingPanel,
    ctx: &DayContext,
    site: &SiteAdapter,
) -> Result<PriceRecord, String> {
    let price = resolve_price(&panel.rows, site.labels())
        .ok_or_else(|| "booking panel shows no non-zero price".to_string())?;
    let flight_number = parse_flight_number(&panel.text)
        .ok_or_else(|| "no flight number in booking panel".to_string())?;
    let (departure_time, arrival_time) = parse_time_range(&panel.text).unwrap_or_default();

    Ok(PriceRecord {
        flight_number,
        departure_airport: ctx.departure_airport.clone(),
        arrival_airport: ctx.arrival_airport.clone(),
        flight_date: ctx.flight_date.clone(),
        departure_time,
        arrival_time,
        cabin_class: parse_cabin_class(&panel.text, site.cabin_class_pattern(), site.cabin_classes()),
        aircraft_type: parse_aircraft(&panel.text),
        price,
    })
}

/// Reads the fare options of the day currently shown.
pub struct Extractor<'a> {
    ui: &'a Interactor<'a>,
    site: SiteAdapter,
}

impl<'a> Extractor<'a> {
    pub fn new(ui: &'a Interactor<'a>, site: SiteAdapter) -> Self {
        Self { ui, site }
    }

    /// Poll until at least one currency label is rendered.
    pub async fn wait_for_prices(&self, date: &str) -> Result<u64, CrawlError> {
        let timeout = self.ui.timings().price_wait_timeout();
        let deadline = Instant::now() + timeout;
        let currency = self.site.labels().currency;
        loop {
            match self
                .ui
                .eval::<u64>(&COUNT_PRICE_INDICATORS, vec![json!(currency)])
                .await
            {
                Ok(n) if n > 0 => return Ok(n),
                Ok(_) => {}
                Err(e) => debug!(target: "crawl.day", %date, error = %e, "price indicator check failed"),
            }
            if Instant::now() >= deadline {
                return Err(CrawlError::DayExtractionTimeout {
                    date: date.to_string(),
                    waited: timeout,
                });
            }
            sleep(self.ui.timings().poll_interval()).await;
        }
    }

    /// Fare rows in document order.
    pub async fn list_options(&self) -> Result<Vec<PriceOption>, CrawlError> {
        self.ui
            .eval(
                &MARK_PRICE_OPTIONS,
                vec![json!(self.site.labels().currency)],
            )
            .await
    }

    /// Activate one option and read the booking panel it populates.
    pub async fn extract_option(
        &self,
        index: usize,
        option: &PriceOption,
        ctx: &DayContext,
    ) -> Result<PriceRecord, CrawlError> {
        let failed = |reason: String| CrawlError::OptionExtractionFailed { index, reason };

        self.ui
            .click(&option.selector)
            .await
            .map_err(|e| failed(e.to_string()))?;
        self.ui.settle(self.ui.timings().option_settle()).await;

        let panel: Option<BookingPanel> = self
            .ui
            .eval(
                &READ_BOOKING_PANEL,
                vec![json!(self.site.selectors().booking_panel)],
            )
            .await
            .map_err(|e| failed(e.to_string()))?;
        let panel = panel.ok_or_else(|| failed("booking panel not visible".to_string()))?;
        let record = build_record(&panel, ctx, &self.site).map_err(failed)?;

        let displayed = normalize_price(&option.price_text);
        if displayed != record.price {
            debug!(
                target: "crawl.day",
                index,
                displayed = %displayed,
                resolved = %record.price,
                "option price differs from booking total"
            );
        }
        Ok(record)
    }

    /// Collect every option of the day. Never fails: problems end up in
    /// the day's `errors`.
    pub async fn crawl_day(&self, ctx: &DayContext) -> DayCrawlResult {
        let mut day = DayCrawlResult::new(ctx.date.clone());

        if let Err(e) = self.wait_for_prices(&ctx.date).await {
            warn!(target: "crawl.day", date = %ctx.date, error = %e, "prices did not render");
            day.push_error(e.to_string());
            return day;
        }

        let options = match self.list_options().await {
            Ok(options) => options,
            Err(e) => {
                warn!(target: "crawl.day", date = %ctx.date, error = %e, "could not list price options");
                day.push_error(e.to_string());
                return day;
            }
        };
        if options.is_empty() {
            warn!(target: "crawl.day", date = %ctx.date, "prices rendered but no fare rows matched");
            day.push_error(format!("no price options recognised for {}", ctx.date));
            return day;
        }

        info!(target: "crawl.day", date = %ctx.date, options = options.len(), "extracting options");
        for (index, option) in options.iter().enumerate() {
            match self.extract_option(index, option, ctx).await {
                Ok(record) => day.push_price(record),
                Err(e) => {
                    warn!(target: "crawl.day", date = %ctx.date, error = %e, "option skipped");
                    day.push_error(e.to_string());
                }
            }
        }
        day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farewatch_common::Site;

    fn row(label: &str, value: &str) -> PanelRow {
        PanelRow {
            label: label.into(),
            value: value.into(),
        }
    }

    #[test]
    fn flight_numbers_drop_inner_space() {
        assert_eq!(parse_flight_number("Chuyến bay VJ 1198 SGN"), Some("VJ1198".into()));
        assert_eq!(parse_flight_number("VJ124 Eco"), Some("VJ124".into()));
        assert_eq!(parse_flight_number("1.290.000 VND"), None);
    }

    #[test]
    fn time_ranges_are_zero_padded() {
        assert_eq!(
            parse_time_range("6:05 - 08:15"),
            Some(("06:05".into(), "08:15".into()))
        );
        assert_eq!(
            parse_time_range("21:40–23:55"),
            Some(("21:40".into(), "23:55".into()))
        );
        assert_eq!(parse_time_range("25:00 - 26:00"), None);
    }

    #[test]
    fn longest_cabin_class_wins() {
        let site = SiteAdapter::new(Site::VietjetVi);
        let (pattern, classes) = (site.cabin_class_pattern(), site.cabin_classes());
        assert_eq!(
            parse_cabin_class("Hạng SkyBoss Business", pattern, classes),
            Some("SkyBoss Business".into())
        );
        assert_eq!(parse_cabin_class("DELUXE fare", pattern, classes), Some("Deluxe".into()));
        assert_eq!(parse_cabin_class("no class", pattern, classes), None);
    }

    #[test]
    fn cabin_class_needs_a_whole_word() {
        let site = SiteAdapter::new(Site::VietjetVi);
        let (pattern, classes) = (site.cabin_class_pattern(), site.cabin_classes());
        assert_eq!(parse_cabin_class("Economy seat", pattern, classes), None);
        assert_eq!(parse_cabin_class("Decor", pattern, classes), None);
        assert_eq!(parse_cabin_class("SkyBossPlus", pattern, classes), None);
        assert_eq!(
            parse_cabin_class("VJ120 06:00 - 08:10 eco Airbus A321", pattern, classes),
            Some("Eco".into())
        );
    }

    #[test]
    fn aircraft_names_are_canonical() {
        assert_eq!(parse_aircraft("Tàu bay: airbus a321neo"), Some("Airbus A321NEO".into()));
        assert_eq!(parse_aircraft("Boeing 737-8"), Some("Boeing 737-8".into()));
        assert_eq!(parse_aircraft("VJ124"), None);
    }

    #[test]
    fn total_price_prefers_non_zero_then_trip_price() {
        let labels = SiteAdapter::new(Site::VietjetVi).labels();
        let rows = vec![
            row("Tổng tiền", "0 VND"),
            row("Tổng cộng", "1.290.000 VND"),
        ];
        assert_eq!(resolve_price(&rows, labels), Some("1290000".into()));

        let rows = vec![row("Tổng tiền", "0 VND"), row("Giá vé", "990.000 VND")];
        assert_eq!(resolve_price(&rows, labels), Some("990000".into()));

        let rows = vec![row("Tổng tiền", "0 VND")];
        assert_eq!(resolve_price(&rows, labels), None);
    }

    #[test]
    fn zero_price_panels_are_rejected() {
        let site = SiteAdapter::new(Site::VietjetEn);
        let ctx = DayContext::new("31/01/2025", "SGN", "HAN").unwrap();
        let panel = BookingPanel {
            text: "VJ120 06:00 - 08:10 Eco Total amount 0 VND".into(),
            rows: vec![row("Total amount", "0 VND")],
        };
        assert!(build_record(&panel, &ctx, &site).is_err());

        let panel = BookingPanel {
            rows: vec![row("Total amount", "1,290,000 VND")],
            ..panel
        };
        let record = build_record(&panel, &ctx, &site).unwrap();
        assert_eq!(record.flight_number, "VJ120");
        assert_eq!(record.flight_date, "2025-01-31");
        assert_eq!(record.departure_time, "06:00");
        assert_eq!(record.cabin_class.as_deref(), Some("Eco"));
        assert_eq!(record.price, "1290000");
    }
}
