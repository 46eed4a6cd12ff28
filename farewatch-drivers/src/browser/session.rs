use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A named in-page script.
///
/// `source` is a WebDriver "execute script" body: positional arguments arrive
/// as `arguments[i]` and the value of its `return` statement is handed back as
/// JSON. The `name` identifies the script in logs, and lets test doubles answer
/// without a JavaScript engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageScript {
    pub name: &'static str,
    pub source: &'static str,
}

impl PageScript {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("no element matches `{0}`")]
    NoSuchElement(String),

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    #[error("webdriver command failed: {0}")]
    Command(String),

    #[error("page script `{name}` failed: {message}")]
    Script { name: &'static str, message: String },

    #[error("browser session setup failed: {0}")]
    Session(String),
}

/// Capabilities the crawl engine needs from a browser page.
///
/// Elements are addressed by CSS selector. Implementations must not retry on
/// their own; failures are reported to the caller as-is.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate and wait until the document reports it finished loading.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Native click on the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Clear the value of an input.
    async fn clear(&self, selector: &str) -> Result<(), DriverError>;

    /// Send keystrokes to an element.
    async fn send_keys(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Smooth-scroll the element to the middle of the viewport.
    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError>;

    /// Run a page script with JSON arguments.
    async fn evaluate(&self, script: &PageScript, args: Vec<Value>) -> Result<Value, DriverError>;

    /// Rendered (visible) text of an element.
    async fn read_text(&self, selector: &str) -> Result<String, DriverError>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
}
