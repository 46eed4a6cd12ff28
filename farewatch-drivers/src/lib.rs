//! Driver layer for browser automation.
//!
//! This crate exposes the narrow capability interface the crawl engine is
//! written against, plus its WebDriver implementation.
//!
//! - [`browser::session::PageSession`]: navigate/click/type/evaluate/screenshot seam
//! - [`browser::driver::FarewatchDriver`]: WebDriver client wrapper
//! - [`browser::page::WebDriverPage`]: `PageSession` backed by `fantoccini`
//! - [`browser::behavioral::BehavioralEngine`]: human‑like timings and typing
//! - [`browser::stealth`]: stealth launch arguments and JS evasions
pub mod browser;

pub use browser::session::{DriverError, PageScript, PageSession};
