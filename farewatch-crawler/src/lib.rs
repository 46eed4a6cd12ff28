//! Crawl engine for the airline booking page.
//!
//! The engine is written against [`farewatch_drivers::PageSession`] only, so
//! every layer can be exercised with an in-memory page.
//!
//! Layers, leaves first:
//!
//! - [`interaction`]: click/type/wait primitives with an ordered click
//!   fallback chain
//! - [`form`]: the booking form state machine
//! - [`extract`]: per-option booking panel reads and field parsing
//! - [`paginate`]: the multi-day loop and next-day heuristics
//! - [`orchestrator`]: whole-attempt retry, cookie consent and screenshots
//! - [`site`]: selectors and labels for each supported page variant
pub mod error;
pub mod extract;
pub mod form;
pub mod interaction;
pub mod orchestrator;
pub mod paginate;
pub mod scripts;
pub mod site;

pub use error::CrawlError;
pub use form::{FormAutomation, FormState};
pub use interaction::{ClickConstraints, ClickStrategy, Interactor};
pub use orchestrator::{
    run_with_retry, AttemptPhase, Checkpoint, FareCrawler, NoScreenshots, ScreenshotSink,
};
pub use paginate::{AdvanceHeuristic, DayCrawler};
pub use site::SiteAdapter;
