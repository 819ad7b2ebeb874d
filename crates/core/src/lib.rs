pub mod analysis;
pub mod chart;
pub mod cse;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_CSE_BASE_URL: &str = "https://www.cse.lk/api/";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub cse_base_url: Option<String>,
        pub cse_timeout_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let cse_timeout_secs = match std::env::var("CSE_TIMEOUT_SECS") {
                Ok(s) if !s.trim().is_empty() => Some(
                    s.trim()
                        .parse::<u64>()
                        .with_context(|| format!("CSE_TIMEOUT_SECS must be an integer (got {s})"))?,
                ),
                _ => None,
            };

            Ok(Self {
                cse_base_url: std::env::var("CSE_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                cse_timeout_secs,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn cse_base_url(&self) -> &str {
            self.cse_base_url.as_deref().unwrap_or(DEFAULT_CSE_BASE_URL)
        }
    }

}
