use std::{collections::HashMap, time::Duration};
use async_trait::async_trait;

use common::hash::{HashPrefix, PasswordDigest};

use crate::hibp::RangeSource;

const RECORD_QUANTITY: u32 = 1009;

/// Offline stand-in for the range API.
///
/// Every prefix gets a small deterministic window (1 to 4 records) of a synthetic,
/// sorted corpus. Real passwords can be seeded with a count on top of that.
#[derive(Debug, Clone)]
pub struct MockedRangeSource {
    records: Vec<String>,
    seeded: HashMap<String, Vec<String>>, // prefix -> records
    latency: Duration,
}

impl Default for MockedRangeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockedRangeSource {
    pub fn new() -> Self {
        let mut records: Vec<String> = (0..RECORD_QUANTITY).map(|i| {
            let (_, suffix) = PasswordDigest::of(&(i * 397 + 124).to_string()).split();
            let count = PasswordDigest::of(&(i * 82 + 59).to_string()).as_str()
                .chars().next()
                .and_then(|c| c.to_digit(16))
                .unwrap_or(0) + 1;
            format!("{}:{}", suffix.as_str(), count)
        }).collect();
        records.sort();

        Self {
            records,
            seeded: HashMap::new(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_password(mut self, password: &str, count: u64) -> Self {
        let (prefix, suffix) = PasswordDigest::of(password).split();
        self.seeded.entry(prefix.as_str().to_owned())
            .or_default()
            .push(format!("{}:{}", suffix.as_str(), count));
        self
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn window(&self, prefix: &HashPrefix) -> &[String] {
        let num = prefix.value();
        let offset = ((num + 3234) % 54347 % (RECORD_QUANTITY * 9 / 11 + 1) + 1) as usize;
        let amount = ((num + 2832) % 71203 % 8235 % 4 + 1) as usize;
        self.records.get(offset..offset + amount).unwrap_or_default()
    }
}

#[async_trait]
impl RangeSource for MockedRangeSource {
    async fn get_range(&self, prefix: &HashPrefix) -> common::Result<String> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut records: Vec<&str> = self.window(prefix).iter().map(String::as_str).collect();
        if let Some(seeded) = self.seeded.get(prefix.as_str()) {
            records.extend(seeded.iter().map(String::as_str));
        }
        records.sort_unstable();

        Ok(records.join("\n"))
    }
}
