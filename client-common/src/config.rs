use std::{path::Path, time::Duration};
use eyre::WrapErr;
use serde::Deserialize;
use url::Url;

use common::{consts, indication::Presenter, strength::StrengthPolicy};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub range_base_url: String,
    pub user_agent: String,
    pub add_padding: bool,
    pub request_timeout_ms: u64,
    pub check_delay_ms: u64,
    pub min_length: usize,
    pub min_distinct_chars: usize,
    pub critical_leak_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            range_base_url: consts::DEFAULT_RANGE_BASE_URL.to_owned(),
            user_agent: consts::DEFAULT_USER_AGENT.to_owned(),
            add_padding: true,
            request_timeout_ms: consts::DEFAULT_REQUEST_TIMEOUT_MS,
            check_delay_ms: consts::DEFAULT_CHECK_DELAY_MS,
            min_length: consts::DEFAULT_MIN_LENGTH,
            min_distinct_chars: consts::DEFAULT_MIN_DISTINCT_CHARS,
            critical_leak_threshold: consts::DEFAULT_CRITICAL_LEAK_THRESHOLD,
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let buf = tokio::fs::read_to_string(path).await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;

        Self::from_toml(&buf)
    }

    pub fn from_toml(s: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(s).wrap_err("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let url = Url::parse(&self.range_base_url).wrap_err("invalid 'range_base_url'")?;
        eyre::ensure!(matches!(url.scheme(), "http" | "https"), "'range_base_url' must be an http(s) URL");
        eyre::ensure!(url.query().is_none() && url.fragment().is_none(), "'range_base_url' can't have a query or a fragment");
        eyre::ensure!(self.min_length >= 1, "'min_length' must be at least 1");
        eyre::ensure!(self.request_timeout_ms > 0, "'request_timeout_ms' must be positive");
        Ok(())
    }

    pub fn strength_policy(&self) -> StrengthPolicy {
        StrengthPolicy {
            min_length: self.min_length,
            min_distinct: self.min_distinct_chars,
        }
    }

    pub fn presenter(&self) -> Presenter {
        Presenter { critical_leak_threshold: self.critical_leak_threshold }
    }

    pub fn check_delay(&self) -> Duration {
        Duration::from_millis(self.check_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
