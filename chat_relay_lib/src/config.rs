use std::{net::SocketAddr, path::PathBuf, time::Duration};

use chrono_tz::Tz;
use clap::Parser;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Runtime settings shared by the web server and the console client.
///
/// Every flag can also come from the environment (or a `.env` file), so a
/// deployment only needs `GEMINI_API_KEY` set.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Gemini chat relay with live Galway time and weather")]
pub struct RelayConfig {
    /// Credential for the generation service; chat endpoints fail without it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory holding index.html and the browser assets
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// IANA zone used for the live time fact
    #[arg(long, env = "LIVE_DATA_TIMEZONE", default_value = "Europe/Dublin")]
    pub timezone: String,

    #[arg(long, env = "LIVE_DATA_LATITUDE", default_value_t = 53.2707, allow_negative_numbers = true)]
    pub latitude: f64,

    #[arg(long, env = "LIVE_DATA_LONGITUDE", default_value_t = -9.0568, allow_negative_numbers = true)]
    pub longitude: f64,

    #[arg(long, env = "WEATHER_API_URL", default_value = OPEN_METEO_URL)]
    pub weather_url: String,

    #[arg(long, env = "WEATHER_TIMEOUT_SECS", default_value_t = 10)]
    pub weather_timeout_secs: u64,
}

impl RelayConfig {
    /// Read `.env` if present, then parse flags and environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn tz(&self) -> Result<Tz, anyhow::Error> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone '{}': {e}", self.timezone))
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {}:{}: {e}", self.host, self.port))
    }

    /// The credential, ignoring blank values.
    pub fn api_key(&self) -> Option<String> {
        self.gemini_api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flags() {
        let cfg = RelayConfig::try_parse_from([
            "relay",
            "--model",
            "gemini-2.0-flash",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--longitude",
            "-8.5",
        ])
        .unwrap();

        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert_eq!(cfg.longitude, -8.5);
        assert_eq!(cfg.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_timezone_parsing() {
        let cfg = RelayConfig::try_parse_from(["relay", "--timezone", "Europe/Dublin"]).unwrap();
        assert_eq!(cfg.tz().unwrap(), chrono_tz::Europe::Dublin);

        let cfg = RelayConfig::try_parse_from(["relay", "--timezone", "Mars/Olympus"]).unwrap();
        let err = cfg.tz().unwrap_err();
        assert!(err.to_string().contains("invalid timezone"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let cfg = RelayConfig::try_parse_from(["relay", "--gemini-api-key", "  "]).unwrap();
        assert_eq!(cfg.api_key(), None);

        let cfg = RelayConfig::try_parse_from(["relay", "--gemini-api-key", "k-123"]).unwrap();
        assert_eq!(cfg.api_key().as_deref(), Some("k-123"));
    }
}
