use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Snapshot of user agent, viewport, and locale characteristics.
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
    pub timezone: String,
}

#[derive(Debug, Clone)]
/// Maintains a small pool of plausible desktop fingerprint profiles.
///
/// The booking site is Vietnamese, so every profile claims a Vietnamese
/// locale and timezone alongside English.
pub struct UserAgentManager {
    desktop_profiles: Vec<UserAgentProfile>,
    current_session_profile: Option<UserAgentProfile>,
}

impl Default for UserAgentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentManager {
    /// Create a new manager with built‑in desktop profiles.
    pub fn new() -> Self {
        Self {
            desktop_profiles: vec![
                UserAgentProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1920, 1080),
                    platform: "Win32".to_string(),
                    languages: vec!["vi-VN".to_string(), "vi".to_string(), "en-US".to_string()],
                    timezone: "Asia/Ho_Chi_Minh".to_string(),
                },
                UserAgentProfile {
                    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1440, 900),
                    platform: "MacIntel".to_string(),
                    languages: vec!["vi-VN".to_string(), "en-US".to_string(), "en".to_string()],
                    timezone: "Asia/Ho_Chi_Minh".to_string(),
                },
            ],
            current_session_profile: None,
        }
    }

    /// Get (or lazily select) the profile used for the whole session.
    pub fn session_profile(&mut self) -> UserAgentProfile {
        if let Some(p) = &self.current_session_profile {
            return p.clone();
        }
        let picked = self
            .desktop_profiles
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| UserAgentManager::new().desktop_profiles.remove(0));
        self.current_session_profile = Some(picked.clone());
        picked
    }
}
