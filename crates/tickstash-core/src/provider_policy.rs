use std::time::Duration;

use crate::config::ServiceConfig;

/// Request budget for the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    /// Calls admitted per `quota_window` before callers start waiting.
    pub quota_limit: u32,
    pub quota_window: Duration,
    /// Fixed pause after every completed call.
    pub pacing_delay: Duration,
    /// Timeout of each remote call.
    pub request_timeout: Duration,
}

impl ProviderPolicy {
    /// Free-tier friendly budget: one call every five seconds.
    pub fn alphavantage_default() -> Self {
        Self {
            quota_limit: 12,
            quota_window: Duration::from_secs(60),
            pacing_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Default budget with the delay and timeout taken from `config`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            pacing_delay: config.pacing_delay,
            request_timeout: config.request_timeout,
            ..Self::alphavantage_default()
        }
    }
}
