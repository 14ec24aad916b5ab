use std::time::Duration;

const DEFAULT_STM32_PORT: u16 = 8080;
const DEFAULT_CH_PORT: u16 = 12345;
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/update";
const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 1_000;

/// Relay settings. Every field has a default and an `EVT_*` environment
/// override; unparseable overrides fall back to the default.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port for the combined STM32 / BMP180 feed.
    pub stm32_port: u16,
    /// Port for the motor channel JSON feed.
    pub ch_port: u16,
    /// Backend endpoint that receives merged updates.
    pub backend_url: String,
    /// Timeout for each forwarded request, connect included.
    pub forward_timeout: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let stm32_port = std::env::var("EVT_STM32_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STM32_PORT);
        let ch_port = std::env::var("EVT_CH_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CH_PORT);
        let backend_url =
            std::env::var("EVT_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        let timeout_ms = std::env::var("EVT_FORWARD_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FORWARD_TIMEOUT_MS);

        RelayConfig {
            stm32_port,
            ch_port,
            backend_url,
            forward_timeout: Duration::from_millis(timeout_ms),
        }
    }
}
