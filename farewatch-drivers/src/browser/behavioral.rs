use crate::browser::session::{DriverError, PageSession};
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Default)]
/// Produces human‑like delays and typing behavior to reduce automation signals.
pub struct BehavioralEngine {}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        let ms = if max <= min {
            min
        } else {
            OsRng.gen_range(min..=max)
        };
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Type the provided text one character at a time with small random
    /// delays between characters.
    pub async fn type_text_human_like(
        &self,
        page: &dyn PageSession,
        selector: &str,
        text: &str,
        min_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Result<(), DriverError> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            page.send_keys(selector, ch.encode_utf8(&mut buf)).await?;
            self.random_delay(min_delay_ms, max_delay_ms).await;
        }
        Ok(())
    }
}
