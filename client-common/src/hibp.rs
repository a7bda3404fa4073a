use async_trait::async_trait;
use eyre::{WrapErr, eyre};
use reqwest::Method;
use tracing::{debug, warn};

use common::{
    Error,
    hash::{HashPrefix, PasswordDigest},
    range::{Exposure, count_leaks},
};

use crate::config::Config;

/// Anything that can hand out the `SUFFIX:COUNT` record set of a hash prefix.
///
/// Only the prefix is given out. Implementations make a single attempt and report
/// every failure as an error; they must never turn a failure into an empty record set.
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn get_range(&self, prefix: &HashPrefix) -> common::Result<String>;
}

/// Client for a Pwned Passwords style `GET {base}/{prefix}` range API.
#[derive(Clone, Debug)]
pub struct HibpClient {
    reqwest_client: reqwest::Client,
    base_url: String,
    add_padding: bool,
}

impl HibpClient {
    pub fn new(config: &Config) -> eyre::Result<Self> {
        config.validate()?;

        let reqwest_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .wrap_err("failed to build HTTP client")?;

        Ok(Self {
            reqwest_client,
            base_url: config.range_base_url.trim_end_matches('/').to_owned(),
            add_padding: config.add_padding,
        })
    }
}

#[async_trait]
impl RangeSource for HibpClient {
    async fn get_range(&self, prefix: &HashPrefix) -> common::Result<String> {
        let url = format!("{}/{}", self.base_url, prefix);

        let mut req = self.reqwest_client.request(Method::GET, &url);
        if self.add_padding {
            req = req.header("Add-Padding", "true");
        }

        // the URL carries the prefix, keep it out of the error
        let resp = req.send().await
            .map_err(|e| Error::NetworkFailure(eyre::Report::new(e.without_url()).wrap_err("range request failed")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::NetworkFailure(eyre!("range API responded with status code {}", status)));
        }

        resp.text().await
            .map_err(|e| Error::NetworkFailure(eyre::Report::new(e.without_url()).wrap_err("failed to read range response")))
    }
}

/// Looks `password` up through `source`. Never fails: anything that goes wrong is `Unknown`.
pub async fn check_exposure(source: &dyn RangeSource, password: &str) -> Exposure {
    let (prefix, suffix) = PasswordDigest::of(password).split();

    let res = match source.get_range(&prefix).await {
        Ok(records) => count_leaks(&records, &suffix),
        Err(e) => Err(e),
    };

    match &res {
        Ok(count) => debug!(count, "range lookup done"),
        Err(e) => warn!("unable to check the password for leaks: {:#}", e),
    }
    Exposure::from(res)
}
