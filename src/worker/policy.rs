use std::time::Duration;

/// Backoff applied after consecutive unexpected faults.
///
/// The n-th fault in a row waits `base * 2^(n-1)`, never more than `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultPolicy {
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Stop the worker once this many faults happen in a row
    pub max_consecutive_faults: Option<u32>,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_secs(30),
            max_consecutive_faults: None,
        }
    }
}

impl FaultPolicy {
    /// No waiting and no limit
    pub fn immediate() -> Self {
        Self {
            backoff_base: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            max_consecutive_faults: None,
        }
    }

    pub fn delay(&self, streak: u32) -> Duration {
        if streak == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(streak - 1).unwrap_or(u32::MAX);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }

    pub fn exhausted(&self, streak: u32) -> bool {
        self.max_consecutive_faults
            .is_some_and(|max| streak >= max)
    }
}
