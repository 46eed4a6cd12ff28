mod support;

use chrono::NaiveDate;
use farewatch_common::{AdvanceFailurePolicy, Site, Timings, ValidationError};
use farewatch_crawler::extract::{DayContext, Extractor};
use farewatch_crawler::{
    AttemptPhase, Checkpoint, CrawlError, DayCrawler, FareCrawler, FormState, Interactor,
    SiteAdapter,
};
use support::*;

const INNER_MARKER: &str = "span, svg, input";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
}

#[tokio::test]
async fn unresolved_option_is_recorded_by_index() {
    init_test_tracing();
    let mut day = priced_day(&[("VJ120", "1.290.000"), ("VJ122", "990.000")]);
    day.options.insert(1, option("VJ121", "0"));
    let page = FakeSite::new(vec![day]);
    let ui = Interactor::new(&page, Timings::instant(), INNER_MARKER);
    let ctx = DayContext::new("31/01/2025", "SGN", "HAN").unwrap();

    let result = Extractor::new(&ui, SiteAdapter::new(Site::VietjetVi))
        .crawl_day(&ctx)
        .await
        .finish();

    assert_eq!(result.prices.len(), 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("option 1:"), "{}", result.errors[0]);
    assert_eq!(result.total_flights, 2);
    assert_eq!(result.prices[0].price, "1290000");
    assert_eq!(result.prices[1].flight_number, "VJ122");
    assert_eq!(result.prices[0].aircraft_type.as_deref(), Some("Airbus A321"));
}

#[tokio::test]
async fn missing_booking_panel_skips_only_that_option() {
    let mut day = priced_day(&[("VJ120", "1.290.000")]);
    day.options.push(FakeOption {
        price_text: "1.500.000 VND".into(),
        panel: None,
    });
    let page = FakeSite::new(vec![day]);
    let ui = Interactor::new(&page, Timings::instant(), INNER_MARKER);
    let ctx = DayContext::new("31/01/2025", "SGN", "HAN").unwrap();

    let result = Extractor::new(&ui, SiteAdapter::new(Site::VietjetVi))
        .crawl_day(&ctx)
        .await;

    assert_eq!(result.prices.len(), 1);
    assert_eq!(result.errors, vec!["option 1: booking panel not visible".to_string()]);
}

#[tokio::test]
async fn day_render_timeout_is_recorded_and_loop_continues() {
    init_test_tracing();
    let blank = FakeDay {
        renders: false,
        options: Vec::new(),
    };
    let page = FakeSite::new(vec![blank, priced_day(&[("VJ124", "1.100.000")])]);
    let settings = settings(2, 0);
    let ui = Interactor::new(&page, settings.timings, INNER_MARKER);
    let start = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

    let summary = DayCrawler::new(&ui, SiteAdapter::new(Site::VietjetVi), &settings)
        .crawl(start, "SGN", "HAN")
        .await
        .unwrap();

    assert_eq!(summary.total_days_crawled, 2);
    let first = &summary.daily_results[0];
    assert_eq!(first.date, "31/01/2025");
    assert_eq!(first.errors.len(), 1);
    assert!(first.prices.is_empty());
    assert!(first.errors[0].contains("no price indicators"));

    let second = &summary.daily_results[1];
    assert_eq!(second.date, "01/02/2025");
    assert_eq!(second.prices.len(), 1);
    assert_eq!(second.prices[0].flight_date, "2025-02-01");
    assert!(summary.advance_failures.is_empty());
}

#[tokio::test]
async fn stuck_date_strip_ends_loop_early_by_default() {
    let page = FakeSite::new(vec![
        priced_day(&[("VJ120", "1.290.000")]),
        priced_day(&[("VJ122", "990.000")]),
    ]);
    page.state().next_day_control = false;
    let settings = settings(3, 0);
    let ui = Interactor::new(&page, settings.timings, INNER_MARKER);
    let start = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

    let summary = DayCrawler::new(&ui, SiteAdapter::new(Site::VietjetVi), &settings)
        .crawl(start, "SGN", "HAN")
        .await
        .unwrap();

    assert_eq!(summary.total_days_crawled, 1);
    assert_eq!(summary.advance_failures.len(), 1);
    assert!(summary.advance_failures[0].contains("31/01/2025"));
}

#[tokio::test]
async fn stuck_date_strip_fails_attempt_when_configured() {
    let page = FakeSite::new(vec![priced_day(&[("VJ120", "1.290.000")])]);
    page.state().next_day_control = false;
    let mut settings = settings(3, 1);
    settings.advance_failure = AdvanceFailurePolicy::FailAttempt;

    let err = FareCrawler::new(&page, settings)
        .run_on(&search("SGN", "HAN", "31/01/2025"), today())
        .await
        .unwrap_err();

    assert_eq!(page.gotos(), 2);
    match err {
        CrawlError::WholeAttemptFailed {
            attempt,
            phase,
            source,
        } => {
            assert_eq!(attempt, 2);
            assert_eq!(phase, AttemptPhase::DayLoopRunning);
            assert!(matches!(*source, CrawlError::DayAdvanceFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn every_retry_renavigates_and_last_error_wins() {
    init_test_tracing();
    let page = FakeSite::new(vec![priced_day(&[("VJ120", "1.290.000")])]);
    page.state().search_button = false;
    let sink = RecordingSink::default();

    let err = FareCrawler::new(&page, settings(1, 2))
        .with_screenshots(sink.clone())
        .run_on(&search("SGN", "HAN", "31/01/2025"), today())
        .await
        .unwrap_err();

    assert_eq!(page.gotos(), 3);
    match err {
        CrawlError::WholeAttemptFailed {
            attempt,
            phase,
            source,
        } => {
            assert_eq!(attempt, 3);
            assert_eq!(phase, AttemptPhase::CookiesHandled);
            assert!(matches!(
                *source,
                CrawlError::FormStepFailed {
                    step: FormState::Submitted,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    let failures: Vec<_> = sink
        .checkpoints()
        .into_iter()
        .filter(|c| matches!(c, Checkpoint::Failure { .. }))
        .collect();
    assert_eq!(
        failures,
        vec![
            Checkpoint::Failure { attempt: 1 },
            Checkpoint::Failure { attempt: 2 },
            Checkpoint::Failure { attempt: 3 },
        ]
    );
}

#[tokio::test]
async fn same_airport_is_rejected_before_navigation() {
    let page = FakeSite::new(Vec::new());
    let err = FareCrawler::new(&page, settings(1, 3))
        .run_on(&search("SGN", "sgn", "31/01/2025"), today())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Validation(ValidationError::SameAirport(_))
    ));
    assert!(page.calls().is_empty());
}

#[tokio::test]
async fn unknown_airport_is_rejected_when_directory_is_configured() {
    let page = FakeSite::new(Vec::new());
    let err = FareCrawler::new(&page, settings(1, 0))
        .with_airports(airports())
        .run_on(&search("SGN", "DAD", "31/01/2025"), today())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Validation(ValidationError::UnknownAirport(code)) if code == "DAD"
    ));
    assert_eq!(page.gotos(), 0);
}

#[tokio::test]
async fn full_crawl_produces_summary_and_checkpoints() {
    init_test_tracing();
    let page = FakeSite::new(vec![
        priced_day(&[("VJ120", "1.290.000"), ("VJ120", "1.490.000"), ("VJ122", "990.000")]),
        priced_day(&[("VJ124", "1.100.000")]),
        priced_day(&[("VJ126", "1.000.000"), ("VJ128", "1.050.000")]),
    ]);
    let sink = RecordingSink::default();

    let summary = FareCrawler::new(&page, settings(3, 1))
        .with_airports(airports())
        .with_screenshots(sink.clone())
        .run_on(&search("SGN", "HAN", "31/01/2025"), today())
        .await
        .unwrap();

    assert_eq!(page.gotos(), 1);
    assert_eq!(summary.total_days_crawled, 3);
    assert_eq!(summary.total_price_options, 6);
    assert_eq!(summary.total_unique_flights, 2 + 1 + 2);
    let dates: Vec<_> = summary.daily_results.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(dates, ["31/01/2025", "01/02/2025", "02/02/2025"]);
    assert_eq!(summary.daily_results[2].prices[0].flight_date, "2025-02-02");
    assert!(summary.advance_failures.is_empty());
    assert_eq!(
        sink.checkpoints(),
        vec![
            Checkpoint::InitialLoad,
            Checkpoint::CookiesHandled,
            Checkpoint::Results
        ]
    );

    let clicks = page.clicks();
    assert!(clicks.contains(&"[data-fw-mark=\"cookie-1\"]".to_string()));
    assert!(clicks.contains(&"[data-fw-mark=\"airport-SGN\"]".to_string()));
    assert!(clicks.contains(&"[data-fw-mark=\"airport-HAN\"]".to_string()));
    assert!(clicks.contains(&"[data-fw-mark=\"day-31\"]".to_string()));
    assert_eq!(clicks.iter().filter(|c| c.as_str() == NEXT_DAY).count(), 2);
}

#[tokio::test]
async fn base_url_overrides_site_landing_page() {
    let page = FakeSite::new(vec![priced_day(&[("VJ120", "1.290.000")])]);
    let mut settings = settings(1, 0);
    settings.base_url = Some("http://localhost:8080/booking".into());

    FareCrawler::new(&page, settings)
        .run_on(&search("SGN", "HAN", "today"), today())
        .await
        .unwrap();

    assert_eq!(
        page.calls()[0],
        Call::Goto("http://localhost:8080/booking".into())
    );
    assert!(page.clicks().contains(&".rdrDayToday".to_string()));
}
