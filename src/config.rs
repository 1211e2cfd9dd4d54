use std::path::PathBuf;
use std::time::Duration;

/// Application configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub ocr: OcrConfig,
    pub analysis_delay: Duration,
    pub checkout: CheckoutConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub monthly_price_id: String,
    pub one_time_price_id: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("power_play.db"),
            ocr: OcrConfig {
                tesseract_bin: "tesseract".to_string(),
                language: "eng".to_string(),
            },
            analysis_delay: Duration::ZERO,
            checkout: CheckoutConfig {
                monthly_price_id: "price_YOUR_MONTHLY_PRICE_ID_HERE".to_string(),
                one_time_price_id: "price_YOUR_ONE_TIME_PRICE_ID_HERE".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
        }
    }
}

impl AppConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            db_path: lookup("POWER_PLAY_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            ocr: OcrConfig {
                tesseract_bin: lookup("POWER_PLAY_TESSERACT").unwrap_or(defaults.ocr.tesseract_bin),
                language: lookup("POWER_PLAY_OCR_LANG").unwrap_or(defaults.ocr.language),
            },
            analysis_delay: lookup("POWER_PLAY_ANALYSIS_DELAY_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.analysis_delay),
            checkout: CheckoutConfig {
                monthly_price_id: lookup("STRIPE_PRICE_ID_MONTHLY")
                    .unwrap_or(defaults.checkout.monthly_price_id),
                one_time_price_id: lookup("STRIPE_PRICE_ID_ONE_TIME")
                    .unwrap_or(defaults.checkout.one_time_price_id),
            },
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: lookup("SERVER_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.db_path, PathBuf::from("power_play.db"));
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.analysis_delay, Duration::ZERO);
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let env: HashMap<&str, &str> = [
            ("POWER_PLAY_DB", "/tmp/pp.db"),
            ("POWER_PLAY_ANALYSIS_DELAY_MS", "1500"),
            ("STRIPE_PRICE_ID_MONTHLY", "price_123"),
            ("SERVER_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.db_path, PathBuf::from("/tmp/pp.db"));
        assert_eq!(config.analysis_delay, Duration::from_millis(1500));
        assert_eq!(config.checkout.monthly_price_id, "price_123");
        assert_eq!(config.server.port, 3000);
    }
}
