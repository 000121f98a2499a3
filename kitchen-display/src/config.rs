//! Display configuration

use std::time::Duration;

/// Full `ListOrders` poll, independent of push health
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Countdown redraw
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// How long a `completed` order may linger before the display deletes it
pub const DEFAULT_COMPLETED_GRACE: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one kitchen display
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Server base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Kitchen (restaurant) this display belongs to
    pub kitchen_id: i64,

    /// Stable id used to register with the broadcast hub
    pub subscriber_id: String,

    pub poll_interval: Duration,

    pub tick_interval: Duration,

    pub completed_grace: Duration,

    /// Per HTTP request timeout
    pub request_timeout: Duration,
}

impl DisplayConfig {
    /// Create a configuration with defaults and a random subscriber id
    pub fn new(base_url: impl Into<String>, kitchen_id: i64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            kitchen_id,
            subscriber_id: uuid::Uuid::new_v4().to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            completed_grace: DEFAULT_COMPLETED_GRACE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_subscriber_id(mut self, subscriber_id: impl Into<String>) -> Self {
        self.subscriber_id = subscriber_id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_completed_grace(mut self, grace: Duration) -> Self {
        self.completed_grace = grace;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// WebSocket URL of the kitchen push channel
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!(
            "{}/api/kitchens/{}/ws?subscriberId={}",
            base, self.kitchen_id, self.subscriber_id
        )
    }
}
