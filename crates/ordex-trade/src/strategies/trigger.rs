//! Fire-once trigger shared by every strategy.

/// A trigger that fires at most once, with optional bounded retries.
///
/// `fire` claims the trigger; if the resulting action fails, `revert`
/// re-arms it for the next poll. With a retry budget, exhausting it
/// leaves the trigger permanently fired (inert), which is what bounds a
/// flaky venue to a finite number of attempts.
#[derive(Debug)]
pub struct TriggerOnce {
    fired: bool,
    failed_attempts: u32,
    max_attempts: Option<u32>,
}

impl TriggerOnce {
    /// Unbounded retries: the trigger keeps re-arming until one attempt
    /// succeeds.
    pub fn new() -> Self {
        Self {
            fired: false,
            failed_attempts: 0,
            max_attempts: None,
        }
    }

    /// At most `max_attempts` tries, then inert.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            fired: false,
            failed_attempts: 0,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    /// Claim the trigger. Returns false when already fired.
    pub fn fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }

    /// Report a failed attempt. Re-arms unless the budget is exhausted;
    /// returns whether the trigger is still willing to retry.
    pub fn revert(&mut self) -> bool {
        self.failed_attempts += 1;
        if let Some(max) = self.max_attempts {
            if self.failed_attempts >= max {
                // Stay fired: inert from now on.
                return false;
            }
        }
        self.fired = false;
        true
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }
}

impl Default for TriggerOnce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once() {
        let mut trigger = TriggerOnce::new();
        assert!(trigger.fire());
        assert!(!trigger.fire());
        assert!(trigger.is_fired());
    }

    #[test]
    fn test_revert_rearms_unbounded() {
        let mut trigger = TriggerOnce::new();
        for _ in 0..10 {
            assert!(trigger.fire());
            assert!(trigger.revert());
        }
        assert!(!trigger.is_fired());
    }

    #[test]
    fn test_bounded_retries_go_inert() {
        let mut trigger = TriggerOnce::with_max_attempts(3);
        assert!(trigger.fire());
        assert!(trigger.revert());
        assert!(trigger.fire());
        assert!(trigger.revert());
        assert!(trigger.fire());
        // Third failure exhausts the budget: permanently fired.
        assert!(!trigger.revert());
        assert!(trigger.is_fired());
        assert!(!trigger.fire());
    }
}
