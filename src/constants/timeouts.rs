/// Default interval between expired-mute sweeps (can be overridden via env var)
pub const DEFAULT_MUTE_SWEEP_INTERVAL_SECONDS: u64 = 30;

/// Capacity of the mute event broadcast channel
pub const MUTE_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Delay before the first sweep so the gateway cache can populate
pub const SWEEP_STARTUP_DELAY_SECONDS: u64 = 5;

/// Maximum number of active mutes shown by `/mutes`
pub const MUTES_LIST_LIMIT: usize = 25;
