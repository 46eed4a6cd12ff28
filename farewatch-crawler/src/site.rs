//! Site adapters: the markup-coupled knowledge of one booking page revision.
//!
//! The crawl core never hard-codes a selector or a label; it asks the
//! [`SiteAdapter`] for them. Selectors follow the booking page's
//! `react-date-range` calendar and MUI widgets and will need maintenance as
//! that markup evolves.

use std::sync::LazyLock;

use farewatch_common::Site;
use regex::Regex;

/// CSS selectors shared by every locale of the booking page.
#[derive(Debug)]
pub struct Selectors {
    pub cookie_controls: &'static str,
    pub trip_type_controls: &'static str,
    pub departure_input: &'static str,
    pub arrival_input: &'static str,
    pub airport_panel: &'static str,
    pub airport_entry: &'static str,
    pub departure_date_trigger: &'static str,
    pub return_date_trigger: &'static str,
    pub month_header: &'static str,
    pub next_month: &'static str,
    pub prev_month: &'static str,
    pub day_cell: &'static str,
    pub day_number: &'static str,
    pub today_cell: &'static str,
    pub passive_day_class: &'static str,
    pub disabled_day_class: &'static str,
    pub option_toggles: &'static str,
    pub search_controls: &'static str,
    pub booking_panel: &'static str,
    pub icon_buttons: &'static str,
    pub date_strip: &'static str,
    pub date_slider: &'static str,
    /// Sub-element targeted by the inner-marker click strategy.
    pub inner_marker: &'static str,
}

/// Locale-dependent visible text.
#[derive(Debug)]
pub struct Labels {
    pub one_way: &'static [&'static str],
    pub round_trip: &'static [&'static str],
    pub cookie_accept: &'static [&'static str],
    pub cheapest_fare: &'static [&'static str],
    pub search: &'static [&'static str],
    pub total_price: &'static [&'static str],
    pub trip_price: &'static [&'static str],
    pub currency: &'static str,
}

static SELECTORS: Selectors = Selectors {
    cookie_controls: "button, [role=\"button\"]",
    trip_type_controls: "label, [role=\"radio\"], [role=\"tab\"]",
    departure_input: "input#departurePlaceDesktop",
    arrival_input: "input#arrivalPlaceDesktop",
    airport_panel: "div[role=\"presentation\"] .MuiPaper-root, .MuiAutocomplete-popper",
    airport_entry: "[role=\"option\"], .MuiBox-root > div",
    departure_date_trigger: "#departureDate1",
    return_date_trigger: "#returnDate1",
    month_header: ".rdrMonthName, .rdrMonthAndYearPickers",
    next_month: ".rdrNextButton",
    prev_month: ".rdrPprevButton",
    day_cell: ".rdrDay",
    day_number: ".rdrDayNumber span",
    today_cell: ".rdrDayToday",
    passive_day_class: "rdrDayPassive",
    disabled_day_class: "rdrDayDisabled",
    option_toggles: "label, [role=\"checkbox\"], .MuiFormControlLabel-root",
    search_controls: "button, [role=\"button\"]",
    booking_panel: "[class*=\"booking-info\"], [class*=\"BookingInfo\"], aside .MuiPaper-root",
    icon_buttons: "button.MuiIconButton-root",
    date_strip: ".slick-list, [class*=\"date-slider\"]",
    date_slider: ".slick-slider, [class*=\"date-slider\"]",
    inner_marker: "span, svg, input",
};

static VI_LABELS: Labels = Labels {
    one_way: &["Một chiều"],
    round_trip: &["Khứ hồi"],
    cookie_accept: &["Đồng ý", "Chấp nhận"],
    cheapest_fare: &["Tìm vé rẻ nhất", "Vé rẻ nhất"],
    search: &["Tìm chuyến bay", "Tìm kiếm"],
    total_price: &["Tổng tiền", "Tổng cộng"],
    trip_price: &["Giá vé", "Giá chuyến"],
    currency: "VND",
};

static EN_LABELS: Labels = Labels {
    one_way: &["One-way", "One way"],
    round_trip: &["Return", "Round-trip", "Round trip"],
    cookie_accept: &["Accept", "Agree"],
    cheapest_fare: &["Find cheapest fare", "Cheapest"],
    search: &["Search flights", "Let's go", "Search"],
    total_price: &["Total amount", "Total"],
    trip_price: &["Trip price", "Fare"],
    currency: "VND",
};

/// Closed set of fare classes, longest names first so prefixes lose.
const CABIN_CLASSES: &[&str] = &["SkyBoss Business", "SkyBoss", "Business", "Deluxe", "Eco"];

/// Path prefix of the "next" chevron icon (`NavigateNext`).
const NEXT_ICON_SIGNATURE: &str = "M10 6 8.59 7.41";

const EN_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static VI_MONTH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)th(?:g|[aá]ng)\s*(\d{1,2})\D{0,4}(\d{4})").expect("valid month header regex")
});
static CABIN_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<String> = CABIN_CLASSES.iter().map(|c| regex::escape(c)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", names.join("|"))).expect("valid cabin class regex")
});
static NUMERIC_MONTH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[/.-]\s*(\d{4})\b").expect("valid month header regex")
});
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

/// DOM-shape heuristics for one page revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteAdapter {
    site: Site,
}

impl SiteAdapter {
    pub fn new(site: Site) -> Self {
        Self { site }
    }

    pub fn site(&self) -> Site {
        self.site
    }

    pub fn landing_url(&self) -> &'static str {
        match self.site {
            Site::VietjetVi => "https://www.vietjetair.com/vi",
            Site::VietjetEn => "https://www.vietjetair.com/en",
        }
    }

    pub fn selectors(&self) -> &'static Selectors {
        &SELECTORS
    }

    pub fn labels(&self) -> &'static Labels {
        match self.site {
            Site::VietjetVi => &VI_LABELS,
            Site::VietjetEn => &EN_LABELS,
        }
    }

    pub fn cabin_classes(&self) -> &'static [&'static str] {
        CABIN_CLASSES
    }

    /// Whole-word, case-insensitive match over [`Self::cabin_classes`].
    pub fn cabin_class_pattern(&self) -> &'static Regex {
        &CABIN_CLASS
    }

    pub fn next_icon_signature(&self) -> &'static str {
        NEXT_ICON_SIGNATURE
    }

    /// Parse the calendar header into `(year, month)`.
    pub fn parse_month_header(&self, header: &str) -> Option<(i32, u32)> {
        let header = header.trim();
        let parsed = match self.site {
            Site::VietjetVi => capture_pair(&VI_MONTH_HEADER, header),
            Site::VietjetEn => {
                let lower = header.to_lowercase();
                let month = EN_MONTHS
                    .iter()
                    .position(|m| lower.contains(m) || lower.contains(&m[..3]))
                    .and_then(|i| u32::try_from(i + 1).ok());
                let year = YEAR
                    .captures(header)
                    .and_then(|c| c[1].parse::<i32>().ok());
                month.zip(year).map(|(m, y)| (y, m))
            }
        };
        parsed
            .or_else(|| capture_pair(&NUMERIC_MONTH_HEADER, header))
            .filter(|(_, m)| (1..=12).contains(m))
    }
}

fn capture_pair(re: &Regex, text: &str) -> Option<(i32, u32)> {
    let caps = re.captures(text)?;
    let month = caps[1].parse::<u32>().ok()?;
    let year = caps[2].parse::<i32>().ok()?;
    Some((year, month))
}
