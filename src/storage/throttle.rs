// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Write cooldown for saved sequences.

use tracing::warn;

/// Default minimum time between two writes
pub const DEFAULT_COOLDOWN_MS: u64 = 10_000;

/// Rejects writes requested before the cooldown has elapsed.
///
/// The first request always passes. A rejected request is dropped, not
/// queued, and does not restart the cooldown.
#[derive(Debug, Clone)]
pub struct WriteThrottle {
    cooldown_ms: u64,
    last_write: Option<u64>,
}

impl WriteThrottle {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_write: None,
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Claim a write slot at `now`. Returns false if too soon.
    pub fn try_acquire(&mut self, now: u64) -> bool {
        if let Some(last) = self.last_write {
            let since = now.saturating_sub(last);
            if since < self.cooldown_ms {
                warn!(since_ms = since, cooldown_ms = self.cooldown_ms, "write too soon, dropped");
                return false;
            }
        }
        self.last_write = Some(now);
        true
    }
}

impl Default for WriteThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_passes() {
        let mut throttle = WriteThrottle::default();
        assert!(throttle.try_acquire(0));
    }

    #[test]
    fn test_write_two_seconds_later_is_dropped() {
        let mut throttle = WriteThrottle::new(10_000);
        assert!(throttle.try_acquire(5_000));
        assert!(!throttle.try_acquire(7_000));
    }

    #[test]
    fn test_write_eleven_seconds_later_passes() {
        let mut throttle = WriteThrottle::new(10_000);
        assert!(throttle.try_acquire(5_000));
        assert!(throttle.try_acquire(16_000));
    }

    #[test]
    fn test_rejected_write_does_not_restart_cooldown() {
        let mut throttle = WriteThrottle::new(10_000);
        assert!(throttle.try_acquire(0));
        assert!(!throttle.try_acquire(9_000));
        assert!(throttle.try_acquire(10_000));
    }
}
