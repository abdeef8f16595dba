//! Deadline helpers for bounded solver and execution steps.

use std::time::{Duration, Instant};

/// `0` means unbounded.
pub(crate) fn timeout_duration(timeout_secs: u64) -> Option<Duration> {
    if timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(timeout_secs))
    }
}

pub(crate) fn deadline_from_timeout_secs(timeout_secs: u64) -> Option<Instant> {
    timeout_duration(timeout_secs).and_then(|t| Instant::now().checked_add(t))
}

/// Time left before `deadline`, `Some(ZERO)` once it has passed.
pub(crate) fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    let deadline = deadline?;
    Some(deadline.saturating_duration_since(Instant::now()))
}

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    matches!(remaining(deadline), Some(left) if left.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_unbounded() {
        assert!(timeout_duration(0).is_none());
        assert!(deadline_from_timeout_secs(0).is_none());
        assert!(remaining(None).is_none());
        assert!(!deadline_exceeded(None));
    }

    #[test]
    fn nonzero_timeout_yields_future_deadline() {
        assert_eq!(timeout_duration(30), Some(Duration::from_secs(30)));
        let deadline = deadline_from_timeout_secs(10);
        assert!(deadline.is_some_and(|d| d > Instant::now()));
        assert!(!deadline_exceeded(deadline));
    }

    #[test]
    fn past_deadline_has_nothing_left() {
        let past = Instant::now() - Duration::from_secs(1);
        assert_eq!(remaining(Some(past)), Some(Duration::ZERO));
        assert!(deadline_exceeded(Some(past)));
    }

    #[test]
    fn remaining_never_exceeds_budget() {
        let deadline = deadline_from_timeout_secs(60);
        let left = remaining(deadline).unwrap();
        assert!(left <= Duration::from_secs(60));
        assert!(left >= Duration::from_secs(59));
    }
}
