use crate::resilience::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn quick_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::client()
        .with_attempts(attempts)
        .with_backoff_unit(Duration::from_millis(10))
}

#[test]
fn test_policy_presets() {
    let server = RetryPolicy::server();
    assert_eq!(server.attempts, 2);
    assert_eq!(server.backoff_unit, Duration::from_millis(250));
    assert_eq!(server.timeout, Some(Duration::from_secs(15)));

    let client = RetryPolicy::client();
    assert_eq!(client.attempts, 2);
    assert_eq!(client.backoff_unit, Duration::from_millis(300));
    assert_eq!(client.timeout, None);

    assert_eq!(RetryPolicy::default(), client);
}

#[test]
fn test_backoff_is_linear() {
    let policy = RetryPolicy::server().with_attempts(3);
    assert_eq!(policy.backoff_for(1), Duration::from_millis(250));
    assert_eq!(policy.backoff_for(2), Duration::from_millis(500));

    // Sleeps before attempts 2 and 3 add up to 750ms
    let total: Duration = (1..policy.attempts).map(|a| policy.backoff_for(a)).sum();
    assert_eq!(total, Duration::from_millis(750));
}

#[test]
fn test_attempt_budget_never_below_one() {
    assert_eq!(RetryPolicy::client().with_attempts(0).attempts, 1);
}

#[tokio::test]
async fn test_first_attempt_success_skips_observer() {
    let calls = AtomicUsize::new(0);
    let seen = Mutex::new(Vec::new());
    let observer = |attempt: u32| seen.lock().expect("Failed to lock").push(attempt);

    let counter = &calls;
    let result = quick_policy(2)
        .run(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("done")
            },
            Some(&observer),
        )
        .await;

    assert_eq!(result.expect("Expected success"), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(seen.lock().expect("Failed to lock").is_empty());
}

#[tokio::test]
async fn test_retry_then_success() {
    let calls = AtomicUsize::new(0);
    let seen = Mutex::new(Vec::new());
    let observer = |attempt: u32| seen.lock().expect("Failed to lock").push(attempt);

    let counter = &calls;
    let result = quick_policy(2)
        .run(
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    Err("flaky".to_string())
                } else {
                    Ok(n)
                }
            },
            Some(&observer),
        )
        .await;

    assert_eq!(result.expect("Expected success on retry"), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().expect("Failed to lock"), vec![1]);
}

#[tokio::test]
async fn test_exhaustion_reports_last_error() {
    let calls = AtomicUsize::new(0);
    let seen = Mutex::new(Vec::new());
    let observer = |attempt: u32| seen.lock().expect("Failed to lock").push(attempt);

    let counter = &calls;
    let err = quick_policy(3)
        .run(
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(format!("failure {}", n))
            },
            Some(&observer),
        )
        .await
        .expect_err("Expected exhaustion");

    assert_eq!(err.attempts, 3);
    assert!(!err.timed_out);
    assert!(matches!(err.last, AttemptFailure::Failed(ref msg) if msg == "failure 3"));
    // Never called after the final attempt
    assert_eq!(*seen.lock().expect("Failed to lock"), vec![1, 2]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_backoff_delays_next_attempt() {
    let policy = RetryPolicy::client()
        .with_attempts(3)
        .with_backoff_unit(Duration::from_millis(20));

    let start = Instant::now();
    let _ = policy
        .run(|| async { Err::<(), _>("nope".to_string()) }, None)
        .await;

    // 20ms after attempt 1, 40ms after attempt 2
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_timeout_marks_sequence() {
    let calls = AtomicUsize::new(0);
    let policy = quick_policy(2).with_timeout(Duration::from_millis(20));

    let counter = &calls;
    let err = policy
        .run(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), String>(())
            },
            None,
        )
        .await
        .expect_err("Expected timeout");

    assert!(err.timed_out);
    assert_eq!(err.attempts, 2);
    assert!(matches!(err.last, AttemptFailure::TimedOut(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(err.to_string().contains("UPSTREAM_TIMEOUT"));
}

#[tokio::test]
async fn test_timeout_sticks_even_if_last_attempt_failed_fast() {
    let calls = AtomicUsize::new(0);
    let policy = quick_policy(2).with_timeout(Duration::from_millis(20));

    let counter = &calls;
    let err = policy
        .run(
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Err::<(), _>("refused".to_string())
            },
            None,
        )
        .await
        .expect_err("Expected failure");

    assert!(err.timed_out);
    assert!(matches!(err.last, AttemptFailure::Failed(_)));
}

#[tokio::test]
async fn test_with_timeout_passes_fast_results_through() {
    let value = with_timeout(Duration::from_secs(1), async { 42 })
        .await
        .expect("Should not time out");
    assert_eq!(value, 42);

    let elapsed = with_timeout(Duration::from_millis(10), tokio::time::sleep(Duration::from_secs(5)))
        .await
        .expect_err("Should time out");
    assert_eq!(elapsed, TimedOut(Duration::from_millis(10)));
    assert_eq!(elapsed.to_string(), "UPSTREAM_TIMEOUT after 10ms");
}

#[test]
fn test_cooldown_gate_window() {
    let mut gate = CooldownGate::default();
    assert_eq!(gate.window(), Duration::from_secs(2));

    let t0 = Instant::now();
    assert!(!gate.is_cooling_at(t0));
    assert!(gate.try_acquire_at(t0));

    let t1 = t0 + Duration::from_millis(1500);
    assert!(gate.is_cooling_at(t1));
    assert_eq!(gate.remaining_at(t1), Duration::from_millis(500));
    assert!(!gate.try_acquire_at(t1));

    // A refused submission does not extend the window
    let t2 = t0 + Duration::from_secs(2);
    assert!(!gate.is_cooling_at(t2));
    assert!(gate.try_acquire_at(t2));
    assert!(gate.is_cooling_at(t2 + Duration::from_secs(1)));
}

#[test]
fn test_cooldown_remaining_when_idle() {
    let gate = CooldownGate::new(Duration::from_millis(300));
    assert_eq!(gate.remaining_at(Instant::now()), Duration::ZERO);
}
