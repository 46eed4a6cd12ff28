use crate::browser::{
    behavioral::BehavioralEngine,
    fingerprint::UserAgentProfile,
    session::{DriverError, PageScript, PageSession},
    stealth::{evasions_for, PLATFORM_OVERRIDE},
};
use async_trait::async_trait;
use fantoccini::{elements::Element, error::CmdError, Client, Locator};
use farewatch_common::StealthProfile;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

const READY_STATE: PageScript = PageScript::new("ready_state", "return document.readyState;");

const SCROLL_INTO_VIEW: PageScript = PageScript::new(
    "scroll_into_view",
    r#"
        const el = document.querySelector(arguments[0]);
        if (!el) return false;
        el.scrollIntoView({ behavior: 'smooth', block: 'center', inline: 'nearest' });
        return true;
    "#,
);

/// [`PageSession`] backed by a `fantoccini` WebDriver client.
pub struct WebDriverPage {
    pub(crate) client: Client,
    pub(crate) stealth_profile: StealthProfile,
    pub(crate) user_profile: UserAgentProfile,
    pub(crate) behavioral_engine: BehavioralEngine,
}

impl WebDriverPage {
    pub fn new(
        client: Client,
        stealth_profile: StealthProfile,
        user_profile: UserAgentProfile,
        behavioral_engine: BehavioralEngine,
    ) -> Self {
        Self {
            client,
            stealth_profile,
            user_profile,
            behavioral_engine,
        }
    }

    /// Apply stealth scripts and basic fingerprinting adjustments.
    async fn apply_stealth_and_fingerprint(&self) -> Result<(), DriverError> {
        for script in evasions_for(self.stealth_profile) {
            self.evaluate(script, vec![]).await?;
        }
        if self.stealth_profile == StealthProfile::Maximum {
            self.evaluate(&PLATFORM_OVERRIDE, vec![json!(self.user_profile.platform)])
                .await?;
        }
        Ok(())
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.evaluate(&READY_STATE, vec![]).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(timeout, "document load".into()));
            }
            sleep(Duration::from_millis(200)).await;
        }
    }

    async fn find(&self, selector: &str) -> Result<Element, DriverError> {
        self.client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| command_error(e, selector))
    }
}

fn command_error(err: CmdError, selector: &str) -> DriverError {
    if err.is_no_such_element() {
        DriverError::NoSuchElement(selector.to_string())
    } else {
        DriverError::Command(err.to_string())
    }
}

#[async_trait]
impl PageSession for WebDriverPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.behavioral_engine.random_delay(300, 1200).await;
        self.client
            .goto(url)
            .await
            .map_err(|e| DriverError::Command(e.to_string()))?;
        self.wait_for_load(timeout).await?;
        self.apply_stealth_and_fingerprint().await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(|e| command_error(e, selector))
    }

    async fn clear(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        element.clear().await.map_err(|e| command_error(e, selector))
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        element
            .send_keys(text)
            .await
            .map_err(|e| command_error(e, selector))
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError> {
        let found = self.evaluate(&SCROLL_INTO_VIEW, vec![json!(selector)]).await?;
        if found.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(DriverError::NoSuchElement(selector.to_string()))
        }
    }

    async fn evaluate(&self, script: &PageScript, args: Vec<Value>) -> Result<Value, DriverError> {
        debug!(target: "browser.script", script = script.name, "evaluating page script");
        self.client
            .execute(script.source, args)
            .await
            .map_err(|e| DriverError::Script {
                name: script.name,
                message: e.to_string(),
            })
    }

    async fn read_text(&self, selector: &str) -> Result<String, DriverError> {
        let element = self.find(selector).await?;
        element.text().await.map_err(|e| command_error(e, selector))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.client
            .screenshot()
            .await
            .map_err(|e| DriverError::Command(e.to_string()))
    }
}
