//! Tests for utility functions

use std::time::Duration;

use threadkit::util::{deadline_after, duration_to_micros, init_tracing, now_micros, until};

#[test]
fn test_clock_advances() {
    let before = now_micros();
    std::thread::sleep(Duration::from_millis(5));
    assert!(now_micros() - before >= 5_000);
}

#[test]
fn test_duration_conversion_saturates() {
    assert_eq!(duration_to_micros(Duration::from_millis(3)), 3_000);
    assert_eq!(duration_to_micros(Duration::MAX), u64::MAX);
}

#[test]
fn test_deadline_and_until_agree() {
    let now = now_micros();
    let deadline = deadline_after(now, Duration::from_millis(20));
    assert_eq!(until(now, deadline), Duration::from_millis(20));
    assert_eq!(until(deadline + 1, deadline), Duration::ZERO);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised");
}
