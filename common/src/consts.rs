pub const DIGEST_LENGTH: usize = 40; // uppercase hex of a SHA-1
pub const PREFIX_LENGTH: usize = 5; // what the range API expects
pub const SUFFIX_LENGTH: usize = DIGEST_LENGTH - PREFIX_LENGTH;

pub const DEFAULT_MIN_LENGTH: usize = 8;
pub const DEFAULT_MIN_DISTINCT_CHARS: usize = 5;
pub const DEFAULT_CRITICAL_LEAK_THRESHOLD: u64 = 5;
pub const DEFAULT_CHECK_DELAY_MS: u64 = 240;

pub const DEFAULT_RANGE_BASE_URL: &str = "https://api.pwnedpasswords.com/range";
pub const DEFAULT_USER_AGENT: &str = concat!("pwcheck/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const CONFIG_PATH: &str = "pwcheck.toml";
