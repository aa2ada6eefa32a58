/// Configuration for sweep pacing, bus retention, and store lock waits.
use std::time::Duration;

/// Configuration for the batch worker engine.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Concurrent probes per chunk (clamped to 1..=16)
    pub concurrency: usize,

    /// Fixed delay between chunks to bound outbound request rate
    pub pacing: Duration,

    /// Hard deadline for a single outbound probe
    pub probe_timeout: Duration,

    /// 2xx responses slower than this are classified as warnings
    pub slow_threshold: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            pacing: Duration::from_millis(250),
            probe_timeout: Duration::from_secs(10),
            slow_threshold: Duration::from_secs(3),
        }
    }
}

impl SweepConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-chunk concurrency
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the inter-chunk pacing delay
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the per-probe hard deadline
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Effective concurrency, clamped to the supported range.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, 16)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }
        if self.slow_threshold >= self.probe_timeout {
            return Err("slow_threshold must be below probe_timeout".to_string());
        }
        Ok(())
    }
}

/// Configuration for the event bus retention windows.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// TTL on the uniquely-keyed "just happened" marker
    pub message_ttl: Duration,

    /// Maximum entries retained per channel log
    pub log_cap: usize,

    /// TTL on the per-channel log itself
    pub log_ttl: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            message_ttl: Duration::from_secs(10),
            log_cap: 100,
            log_ttl: Duration::from_secs(3600),
        }
    }
}

impl BusConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-channel log capacity
    pub fn with_log_cap(mut self, cap: usize) -> Self {
        self.log_cap = cap;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.log_cap == 0 {
            return Err("log_cap must be greater than 0".to_string());
        }
        if self.message_ttl.is_zero() {
            return Err("message_ttl must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for the list store's row locking.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Bounded wait for a row lock before surfacing a conflict
    pub lock_wait: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounded lock wait
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_concurrency_clamped() {
        assert_eq!(SweepConfig::new().with_concurrency(64).effective_concurrency(), 16);
        assert_eq!(SweepConfig::new().with_concurrency(1).effective_concurrency(), 1);
    }

    #[test]
    fn test_sweep_validate_rejects_zero_concurrency() {
        let config = SweepConfig::new().with_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bus_defaults() {
        let config = BusConfig::default();
        assert_eq!(config.log_cap, 100);
        assert_eq!(config.message_ttl, Duration::from_secs(10));
        assert_eq!(config.log_ttl, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_default_lock_wait() {
        assert_eq!(StoreConfig::default().lock_wait, Duration::from_secs(5));
    }
}
