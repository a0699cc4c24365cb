use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_REPLY_DELAY_MS: u64 = 1_500;
pub const DEFAULT_OLDER_DELAY_MS: u64 = 800;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_OTP_DELAY_MS: u64 = 1_200;

/// Artificial latencies standing in for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub reply_delay_ms: u64,
    pub older_delay_ms: u64,
    pub search_debounce_ms: u64,
    pub otp_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            older_delay_ms: DEFAULT_OLDER_DELAY_MS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            otp_delay_ms: DEFAULT_OTP_DELAY_MS,
        }
    }
}

impl Timings {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn older_delay(&self) -> Duration {
        Duration::from_millis(self.older_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn otp_delay(&self) -> Duration {
        Duration::from_millis(self.otp_delay_ms)
    }
}
