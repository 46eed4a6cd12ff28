use crate::browser::{
    behavioral::BehavioralEngine,
    fingerprint::{UserAgentManager, UserAgentProfile},
    page::WebDriverPage,
    session::DriverError,
    stealth::build_stealth_arguments,
};
use fantoccini::{Client, ClientBuilder};
use farewatch_common::{BrowserSettings, StealthProfile};
use serde_json::json;
use tracing::info;
use webdriver::capabilities::Capabilities;

/// Thin wrapper around a `fantoccini` WebDriver client with stealth and
/// behavioral helpers. One driver owns one browser session.
pub struct FarewatchDriver {
    client: Client,
    stealth_profile: StealthProfile,
    user_profile: UserAgentProfile,
    behavioral_engine: BehavioralEngine,
}

impl FarewatchDriver {
    /// Connect to a running WebDriver service (Chromedriver by default at
    /// `http://localhost:9515`).
    pub async fn connect(settings: &BrowserSettings) -> Result<Self, DriverError> {
        let mut user_agent_manager = UserAgentManager::new();
        let user_profile = user_agent_manager.session_profile();
        let args = build_stealth_arguments(settings.stealth, &user_profile, settings.headless);

        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&settings.webdriver_url)
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;

        info!(
            target: "browser.session",
            webdriver = %settings.webdriver_url,
            headless = settings.headless,
            stealth = ?settings.stealth,
            "webdriver session opened"
        );

        Ok(Self {
            client,
            stealth_profile: settings.stealth,
            user_profile,
            behavioral_engine: BehavioralEngine::new(),
        })
    }

    /// A page handle over this session's single window.
    pub fn page(&self) -> WebDriverPage {
        WebDriverPage::new(
            self.client.clone(),
            self.stealth_profile,
            self.user_profile.clone(),
            self.behavioral_engine.clone(),
        )
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<(), DriverError> {
        self.client
            .close()
            .await
            .map_err(|e| DriverError::Command(e.to_string()))
    }
}
