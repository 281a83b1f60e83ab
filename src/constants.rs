//! Shared defaults for gateway access, pagination and verification.

/// Default public gateway.
pub const DEFAULT_GATEWAY_URL: &str = "https://arweave.net";

/// Environment variable overriding the configured gateway URL.
pub const GATEWAY_ENV_VAR: &str = "ARSCAN_GATEWAY";

/// Config file name looked up under the user config directory.
pub const CONFIG_FILE_NAME: &str = "arscan.toml";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Largest page the gateway will serve.
pub const MAX_PAGE_SIZE: usize = 100;

/// Attempts per metadata fetch or status poll (initial attempt included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// First retry delay in milliseconds.
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 250;

/// Upper bound for a single retry delay in milliseconds.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Minimum delay between two verification dispatches in milliseconds.
pub const DEFAULT_DISPATCH_DELAY_MS: u64 = 50;

/// Widest numeric range gap detection will lay out slot by slot.
pub const MAX_GAP_SPAN: u64 = 100_000;

/// Winston per AR.
pub const WINSTON_PER_AR: u128 = 1_000_000_000_000;
