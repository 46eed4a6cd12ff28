#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use farewatch_common::observability::{init_logging, LogConfig};
use farewatch_common::{
    Airport, AirportDirectory, CrawlSettings, DayHorizon, RetrySettings, SearchConfig, Site,
    Timings, TravelDate, TripType,
};
use farewatch_crawler::{Checkpoint, ScreenshotSink};
use farewatch_drivers::{DriverError, PageScript, PageSession};
use serde_json::{json, Value};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "farewatch-tests",
            log_dir: Some(std::env::temp_dir().join("farewatch-tests")),
            emit_stderr: true,
            default_filter: "debug".into(),
            ..LogConfig::default()
        };
        init_logging(config).unwrap_or_default()
    });
}

pub const NEXT_MONTH: &str = ".rdrNextButton";
pub const PREV_MONTH: &str = ".rdrPprevButton";
pub const NEXT_DAY: &str = "[data-fw-mark=\"next-day-1\"]";
pub const NEXT_DAY_NEAR_STRIP: &str = "[data-fw-mark=\"next-day-strip-1\"]";
pub const NEXT_DAY_SLIDER: &str = "[data-fw-mark=\"next-day-slider-1\"]";
pub const MONTH_HEADER: &str = ".rdrMonthName, .rdrMonthAndYearPickers";

/// Everything the engine did to the page, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Goto(String),
    Click(String),
    Clear(String),
    Keys(String, String),
    Scroll(String),
    Script(&'static str),
    Text(String),
    Screenshot,
}

#[derive(Debug, Clone)]
pub struct FakeOption {
    pub price_text: String,
    /// `None` renders no booking panel for this option.
    pub panel: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDay {
    /// When false no price indicator ever renders.
    pub renders: bool,
    pub options: Vec<FakeOption>,
}

/// What the day-cell finder reports for the requested day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCellMatch {
    /// A selectable cell in the displayed month.
    Strict,
    /// Only a cell whose label matches, e.g. a passive or disabled one.
    LooseOnly,
    Missing,
}

#[derive(Debug)]
pub struct FakeState {
    pub calls: Vec<Call>,
    pub initial_month: (i32, u32),
    pub month: (i32, u32),
    pub days: Vec<FakeDay>,
    pub current_day: usize,
    pub selected_option: Option<usize>,
    /// Codes that have a matching autocomplete suggestion.
    pub suggestions: HashSet<String>,
    pub typed_code: String,
    pub cookie_banner: bool,
    pub search_button: bool,
    /// Which next-day heuristics find a control.
    pub next_day_control: bool,
    pub next_day_near_strip: bool,
    pub next_day_slider: bool,
    pub day_cells: DayCellMatch,
    /// The in-page header reader finds nothing; only the element text has it.
    pub header_text_only: bool,
    /// Selectors whose native click is intercepted.
    pub intercepted: HashSet<String>,
    /// Selectors no strategy can activate.
    pub inert: HashSet<String>,
    pub hidden: HashSet<String>,
    pub return_trigger: bool,
}

/// In-memory booking page answering page scripts by name.
pub struct FakeSite {
    state: Mutex<FakeState>,
}

impl FakeSite {
    pub fn new(days: Vec<FakeDay>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                initial_month: (2025, 1),
                month: (2025, 1),
                days,
                current_day: 0,
                selected_option: None,
                suggestions: ["SGN", "HAN", "DAD"].iter().map(|s| s.to_string()).collect(),
                typed_code: String::new(),
                cookie_banner: true,
                search_button: true,
                next_day_control: true,
                next_day_near_strip: false,
                next_day_slider: false,
                day_cells: DayCellMatch::Strict,
                header_text_only: false,
                intercepted: HashSet::new(),
                inert: HashSet::new(),
                hidden: HashSet::new(),
                return_trigger: false,
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Click(sel) => Some(sel),
                _ => None,
            })
            .collect()
    }

    pub fn gotos(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Goto(_)))
            .count()
    }

    /// Record an activation and apply its effect on the page.
    fn activate(state: &mut FakeState, selector: &str) {
        state.calls.push(Call::Click(selector.to_string()));
        if selector == NEXT_MONTH {
            state.month = shift_month(state.month, 1);
        } else if selector == PREV_MONTH {
            state.month = shift_month(state.month, -1);
        } else if [NEXT_DAY, NEXT_DAY_NEAR_STRIP, NEXT_DAY_SLIDER].contains(&selector) {
            state.current_day += 1;
            state.selected_option = None;
        } else if let Some(index) = selector.strip_prefix("option-") {
            state.selected_option = index.parse().ok();
        }
    }

    /// Short Vietnamese header, as the calendar renders it.
    fn month_header(state: &FakeState) -> String {
        let (year, month) = state.month;
        format!("thg {month} {year}")
    }

    fn answer(state: &mut FakeState, script: &PageScript, args: &[Value]) -> Value {
        let arg = |i: usize| args.get(i).and_then(Value::as_str).unwrap_or_default();
        match script.name {
            "element_state" => {
                let selector = arg(0);
                let exists = !state.hidden.contains(selector)
                    && (selector != "#returnDate1" || state.return_trigger);
                json!({ "exists": exists, "visible": exists, "in_viewport": exists })
            }
            "force_click" | "click_inner_marker" | "hover_then_click" => {
                let selector = arg(0);
                if state.inert.contains(selector) {
                    return json!(false);
                }
                Self::activate(state, selector);
                json!(true)
            }
            "dispatch_input_events" => json!(true),
            "mark_trip_type" => json!("[data-fw-mark=\"trip-1\"]"),
            "mark_cheapest_toggle" => json!("[data-fw-mark=\"cheapest-1\"]"),
            "mark_cookie_accept" => {
                if state.cookie_banner {
                    json!("[data-fw-mark=\"cookie-1\"]")
                } else {
                    Value::Null
                }
            }
            "mark_search_button" => {
                if state.search_button {
                    json!("[data-fw-mark=\"search-1\"]")
                } else {
                    Value::Null
                }
            }
            "mark_airport_candidate" => {
                if state.suggestions.contains(&state.typed_code) {
                    json!(format!("[data-fw-mark=\"airport-{}\"]", state.typed_code))
                } else {
                    Value::Null
                }
            }
            "read_month_header" if state.header_text_only => Value::Null,
            "read_month_header" => json!(Self::month_header(state)),
            "mark_day_cells" => {
                let day = args.get(2).and_then(Value::as_u64).unwrap_or_default();
                match state.day_cells {
                    DayCellMatch::Strict => {
                        json!({ "strict": format!("[data-fw-mark=\"day-{day}\"]"), "loose": null })
                    }
                    DayCellMatch::LooseOnly => {
                        json!({ "strict": null, "loose": format!("[data-fw-mark=\"day-loose-{day}\"]") })
                    }
                    DayCellMatch::Missing => json!({ "strict": null, "loose": null }),
                }
            }
            "count_price_indicators" => match state.days.get(state.current_day) {
                Some(day) if day.renders => json!(day.options.len().max(1)),
                _ => json!(0),
            },
            "mark_price_options" => {
                let options: Vec<Value> = state
                    .days
                    .get(state.current_day)
                    .map(|day| {
                        day.options
                            .iter()
                            .enumerate()
                            .map(|(i, o)| json!({ "selector": format!("option-{i}"), "price_text": o.price_text }))
                            .collect()
                    })
                    .unwrap_or_default();
                json!(options)
            }
            "read_booking_panel" => state
                .selected_option
                .and_then(|i| state.days.get(state.current_day)?.options.get(i)?.panel.clone())
                .unwrap_or(Value::Null),
            "mark_next_day_icon" if state.next_day_control => json!(NEXT_DAY),
            "mark_next_day_near_strip" if state.next_day_near_strip => json!(NEXT_DAY_NEAR_STRIP),
            "mark_next_day_slider" if state.next_day_slider => json!(NEXT_DAY_SLIDER),
            _ => Value::Null,
        }
    }
}

fn shift_month((year, month): (i32, u32), by: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + by;
    (index.div_euclid(12), (index.rem_euclid(12) + 1) as u32)
}

#[async_trait]
impl PageSession for FakeSite {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.state();
        state.calls.push(Call::Goto(url.to_string()));
        state.month = state.initial_month;
        state.current_day = 0;
        state.selected_option = None;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        if state.intercepted.contains(selector) || state.inert.contains(selector) {
            return Err(DriverError::Command(format!(
                "element click intercepted: {selector}"
            )));
        }
        Self::activate(&mut state, selector);
        Ok(())
    }

    async fn clear(&self, selector: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.calls.push(Call::Clear(selector.to_string()));
        state.typed_code.clear();
        Ok(())
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.calls.push(Call::Keys(selector.to_string(), text.to_string()));
        state.typed_code.push_str(text);
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError> {
        self.state().calls.push(Call::Scroll(selector.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &PageScript, args: Vec<Value>) -> Result<Value, DriverError> {
        let mut state = self.state();
        state.calls.push(Call::Script(script.name));
        Ok(Self::answer(&mut state, script, &args))
    }

    async fn read_text(&self, selector: &str) -> Result<String, DriverError> {
        let mut state = self.state();
        state.calls.push(Call::Text(selector.to_string()));
        if selector == MONTH_HEADER {
            Ok(Self::month_header(&state))
        } else {
            Ok(String::new())
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.state().calls.push(Call::Screenshot);
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

/// Sink remembering which checkpoints were captured.
#[derive(Clone, Default)]
pub struct RecordingSink {
    checkpoints: Arc<Mutex<Vec<Checkpoint>>>,
}

impl RecordingSink {
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints.lock().expect("sink poisoned").clone()
    }
}

#[async_trait]
impl ScreenshotSink for RecordingSink {
    async fn store(&self, checkpoint: Checkpoint, _png: Vec<u8>) -> std::io::Result<()> {
        self.checkpoints
            .lock()
            .expect("sink poisoned")
            .push(checkpoint);
        Ok(())
    }
}

pub fn panel(flight: &str, total: &str) -> Value {
    json!({
        "text": format!("Chuyến bay {flight} 06:00 - 08:10 Eco Airbus A321 Tổng tiền {total} VND"),
        "rows": [{ "label": "Tổng tiền", "value": format!("{total} VND") }],
    })
}

pub fn option(flight: &str, total: &str) -> FakeOption {
    FakeOption {
        price_text: format!("{total} VND"),
        panel: Some(panel(flight, total)),
    }
}

pub fn priced_day(flights: &[(&str, &str)]) -> FakeDay {
    FakeDay {
        renders: true,
        options: flights.iter().map(|(f, p)| option(f, p)).collect(),
    }
}

pub fn settings(days: u32, max_retries: u32) -> CrawlSettings {
    CrawlSettings {
        site: Site::VietjetVi,
        horizon: DayHorizon::Fixed { days },
        retry: RetrySettings {
            max_retries,
            delay_ms: 0,
        },
        timings: Timings::instant(),
        ..CrawlSettings::default()
    }
}

pub fn search(dep: &str, arr: &str, date: &str) -> SearchConfig {
    SearchConfig {
        departure_airport: dep.into(),
        arrival_airport: arr.into(),
        trip_type: TripType::OneWay,
        departure_date: TravelDate::parse(date).expect("valid test date"),
        return_date: None,
        find_cheapest: false,
    }
}

pub fn airports() -> AirportDirectory {
    AirportDirectory::new([
        Airport {
            code: "SGN".into(),
            city: "Hồ Chí Minh".into(),
            airport_name: "Tân Sơn Nhất".into(),
            country: "Việt Nam".into(),
        },
        Airport {
            code: "HAN".into(),
            city: "Hà Nội".into(),
            airport_name: "Nội Bài".into(),
            country: "Việt Nam".into(),
        },
        Airport {
            code: "PQC".into(),
            city: "Phú Quốc".into(),
            airport_name: "Phú Quốc".into(),
            country: "Việt Nam".into(),
        },
    ])
}
