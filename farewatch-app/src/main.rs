use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use farewatch_common::observability::{LogConfig, init_logging};
use farewatch_common::{DayHorizon, SearchConfig};
use farewatch_config::{FarewatchConfig, FarewatchConfigLoader};
use farewatch_crawler::FareCrawler;
use farewatch_drivers::PageSession;
use farewatch_drivers::browser::driver::FarewatchDriver;
use sink::DirectorySink;
use tracing::{info, warn};
mod sink;

/// Crawl per-day fares from the booking site and print each summary as JSON.
#[derive(Parser, Debug)]
#[command(name = "farewatch", version)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, env = "FAREWATCH_CONFIG", default_value = "farewatch.yaml")]
    config: PathBuf,

    /// Consecutive periods to crawl, each starting where the last one ended.
    #[arg(long, default_value_t = 1)]
    periods: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg: FarewatchConfig = FarewatchConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let log_path = init_logging(LogConfig::from_settings("farewatch", &cfg.logging))?;
    info!(log = %log_path.display(), config = %cli.config.display(), "farewatch starting");

    // 2) Reject bad searches before a browser is started
    let airports = cfg.airport_directory();
    cfg.search
        .validate((!airports.is_empty()).then_some(&airports))?;

    // 3) One browser session for every period
    let driver = FarewatchDriver::connect(&cfg.browser).await?;
    let page = driver.page();
    let outcome = run_periods(&page, &cfg, cli.periods).await;

    if let Err(e) = driver.close().await {
        warn!(error = %e, "could not close browser session");
    }
    outcome
}

async fn run_periods(page: &dyn PageSession, cfg: &FarewatchConfig, periods: u32) -> Result<()> {
    let mut crawler = FareCrawler::new(page, cfg.crawl.clone()).with_airports(cfg.airport_directory());
    if let Some(dir) = &cfg.browser.screenshot_dir {
        crawler = crawler.with_screenshots(DirectorySink::new(dir));
    }

    let mut search = cfg.search.clone();
    for period in 1..=periods.max(1) {
        let today = Local::now().date_naive();
        info!(
            period,
            of = periods,
            departure = %search.departure_date,
            route = %format!("{}-{}", search.departure_airport, search.arrival_airport),
            "crawling period"
        );
        let summary = crawler.run_on(&search, today).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);

        search = search.next_period(period_days(cfg.crawl.horizon, &search, today), today);
    }
    Ok(())
}

/// Length of the period that starts at the search's departure date.
fn period_days(horizon: DayHorizon, search: &SearchConfig, today: NaiveDate) -> u32 {
    horizon.days_from(search.departure_date.resolve(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use farewatch_common::{TravelDate, TripType};

    fn search(date: &str) -> SearchConfig {
        SearchConfig {
            departure_airport: "SGN".into(),
            arrival_airport: "HAN".into(),
            trip_type: TripType::OneWay,
            departure_date: TravelDate::parse(date).unwrap(),
            return_date: None,
            find_cheapest: false,
        }
    }

    #[test]
    fn fixed_periods_chain_without_gaps() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let first = search("20/01/2025");
        let days = period_days(DayHorizon::Fixed { days: 15 }, &first, today);
        let second = first.next_period(days, today);
        assert_eq!(second.departure_date.to_string(), "04/02/2025");
    }

    #[test]
    fn month_periods_start_on_the_first() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let first = search("today");
        let days = period_days(DayHorizon::EndOfMonth, &first, today);
        assert_eq!(days, 22);
        let second = first.next_period(days, today);
        assert_eq!(second.departure_date.to_string(), "01/02/2025");
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["farewatch"]).unwrap();
        assert_eq!(cli.periods, 1);
        assert_eq!(cli.config, PathBuf::from("farewatch.yaml"));
    }
}
