use std::time::Duration;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Longest time a `/poll-updates` request is held open
    pub poll_timeout: Duration,
    pub initial_amount: f64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            initial_amount: 100.0,
        }
    }
}
