//! Exponential backoff with optional bounded jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate the delay before the retry following `attempt` (1-based).
///
/// The delay grows as `initial_ms * multiplier^(attempt-1)`, capped at
/// `max_ms`. With `jitter` enabled, up to 10% of the delay is added and the
/// result is re-capped, so the cap always holds.
pub fn calculate_backoff(
    attempt: u32,
    initial_ms: u64,
    multiplier: u32,
    max_ms: u64,
    jitter: bool,
) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponent = (multiplier as u64).saturating_pow(attempt - 1);
    let delay_ms = initial_ms.saturating_mul(exponent);
    let mut capped = delay_ms.min(max_ms);

    if jitter {
        let jitter_range = capped / 10;
        if jitter_range > 0 {
            let extra = rand::thread_rng().gen_range(0..jitter_range);
            capped = (capped + extra).min(max_ms);
        }
    }

    Duration::from_millis(capped)
}
