use crate::error::ExecutionError;
use std::time::Duration;

/// Bounded-attempt retry policy with bounded exponential backoff.
///
/// No jitter: tests and incident timelines can predict the exact delay
/// sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Delay scheduled after the given failed attempt (1-based):
    /// `min(base * multiplier^(attempt-1), max)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Run `operation` under `policy`, sleeping between transient failures.
///
/// Non-transient errors and exhausted budgets propagate after
/// `on_giveup`; each scheduled retry reports through `on_retry` with the
/// 1-based failed attempt and the delay about to be slept.
pub fn run_with_retry<T>(
    policy: &RetryPolicy,
    sleep: impl Fn(Duration),
    mut on_retry: impl FnMut(&ExecutionError, u32, Duration),
    mut on_giveup: impl FnMut(&ExecutionError, u32),
    mut operation: impl FnMut() -> Result<T, ExecutionError>,
) -> Result<T, ExecutionError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts || !error.is_transient() {
                    on_giveup(&error, attempt);
                    return Err(error);
                }
                let delay = policy.delay_after(attempt);
                on_retry(&error, attempt, delay);
                sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorDetails;
    use std::cell::RefCell;

    fn transient() -> ExecutionError {
        ExecutionError::Deadlock(ErrorDetails::new("sqlite", "execute", "deadlock detected"))
    }

    fn permanent() -> ExecutionError {
        ExecutionError::Integrity(ErrorDetails::new("sqlite", "execute", "duplicate key"))
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.max_delay, Duration::from_secs(1));
        assert_eq!(policy.backoff_multiplier, 2.0);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy::new(10)
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350))
            .with_backoff_multiplier(2.0);

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert_eq!(policy.delay_after(4), Duration::from_millis(350));
    }

    #[test]
    fn transient_failures_retry_until_success() {
        let failures = RefCell::new(2u32);
        let slept = RefCell::new(Vec::new());
        let result = run_with_retry(
            &RetryPolicy::new(3).with_base_delay(Duration::from_millis(10)),
            |d| slept.borrow_mut().push(d),
            |_, _, _| {},
            |_, _| {},
            || {
                let mut remaining = failures.borrow_mut();
                if *remaining > 0 {
                    *remaining -= 1;
                    Err(transient())
                } else {
                    Ok(42)
                }
            },
        );

        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            *slept.borrow(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[test]
    fn non_transient_errors_never_retry() {
        let calls = RefCell::new(0u32);
        let giveups = RefCell::new(Vec::new());
        let result: Result<(), _> = run_with_retry(
            &RetryPolicy::new(5),
            |_| panic!("must not sleep for non-transient errors"),
            |_, _, _| panic!("must not schedule a retry"),
            |error, attempt| giveups.borrow_mut().push((error.kind_name(), attempt)),
            || {
                *calls.borrow_mut() += 1;
                Err(permanent())
            },
        );

        assert!(matches!(result, Err(ExecutionError::Integrity(_))));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(*giveups.borrow(), vec![("IntegrityConstraintError", 1)]);
    }

    #[test]
    fn transient_errors_exhaust_exactly_max_attempts() {
        let calls = RefCell::new(0u32);
        let result: Result<(), _> = run_with_retry(
            &RetryPolicy::new(3).with_base_delay(Duration::ZERO),
            |_| {},
            |_, _, _| {},
            |_, _| {},
            || {
                *calls.borrow_mut() += 1;
                Err(transient())
            },
        );

        assert!(matches!(result, Err(ExecutionError::Deadlock(_))));
        assert_eq!(*calls.borrow(), 3);
    }
}
