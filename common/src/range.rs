use serde::Serialize;

use crate::{Error, Result, hash::HashSuffix};

/// How many times a password shows up in the breach corpus, if we could tell.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    Count(u64),
    Unknown,
}

impl Exposure {
    pub fn is_clean(&self) -> bool {
        matches!(self, Exposure::Count(0))
    }
}

impl From<Result<u64>> for Exposure {
    fn from(res: Result<u64>) -> Self {
        match res {
            Ok(n) => Exposure::Count(n),
            Err(_) => Exposure::Unknown,
        }
    }
}

/// Scans a `SUFFIX:COUNT` record set for `suffix`.
///
/// Lines may end in `\n` or `\r\n`. The first record whose suffix matches exactly wins.
/// A record set without our suffix is a clean `Ok(0)`. A matching record with an
/// unreadable count is a `ParseFailure`, which is different from a count of `0`
/// (padded responses do contain such records).
pub fn count_leaks(records: &str, suffix: &HashSuffix) -> Result<u64> {
    for line in records.lines() {
        let line = line.trim_end_matches('\r');
        let (line_suffix, count) = match line.split_once(':') {
            Some((s, c)) => (s, Some(c)),
            None => (line, None),
        };

        if line_suffix != suffix.as_str() {
            continue;
        }

        return match count {
            Some(count) => parse_count(count),
            None => Err(Error::ParseFailure("matching record has no count field".to_owned())),
        };
    }
    Ok(0)
}

fn parse_count(field: &str) -> Result<u64> {
    let field = field.trim_matches(|c: char| c.is_ascii_whitespace());

    // `u64::from_str` would also take a leading '+'
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::ParseFailure(format!("count field {:?} is not a decimal number", field)));
    }

    field.parse::<u64>()
        .map_err(|e| Error::ParseFailure(format!("count field out of range: {}", e)))
}
