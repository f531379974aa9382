use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default listening port, overridable via the `PORT` environment variable
pub const DEFAULT_PORT: u16 = 3000;
/// Per-attempt request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum attempts per upstream request
pub const MAX_RETRIES: u32 = 3;
/// Base delay between attempts; grows linearly with the attempt number
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Runtime configuration for the service
///
/// Everything has a working default; only the listening port is read
/// from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Netscape-format cookie file, reloaded on every request
    pub cookies_file: PathBuf,
    /// Per-attempt timeout applied to every upstream request
    pub request_timeout: Duration,
    /// Maximum attempts per upstream request
    pub max_retries: u32,
    /// Base retry delay
    pub retry_delay: Duration,
    /// Base URL of the provider's listing API
    pub listing_api_base: String,
    /// Port the HTTP server listens on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cookies_file: PathBuf::from("cookies.txt"),
            request_timeout: REQUEST_TIMEOUT,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            listing_api_base: "https://www.1024tera.com".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Build a configuration from defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        config
    }
}
