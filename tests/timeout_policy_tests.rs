// Unit tests for the processing-deadline policy.
//
// The policy is a pure function and is exercised directly, without any
// engine or session.

use std::time::Duration;
use voxsession::TimeoutPolicy;

#[test]
fn test_deadline_is_monotonic_in_audio_duration() {
    let policy = TimeoutPolicy::default();

    let samples = [0u64, 1, 50, 500, 3000, 10_000, 60_000, 600_000];
    for window in samples.windows(2) {
        let d1 = policy.deadline(Duration::from_millis(window[0]), false);
        let d2 = policy.deadline(Duration::from_millis(window[1]), false);
        assert!(
            d1 <= d2,
            "deadline({}) = {:?} > deadline({}) = {:?}",
            window[0],
            d1,
            window[1],
            d2
        );
    }
}

#[test]
fn test_deadline_has_floor_for_near_zero_audio() {
    let policy = TimeoutPolicy::default();

    assert!(policy.deadline(Duration::ZERO, false) >= policy.floor);
    assert!(policy.deadline(Duration::from_millis(1), false) >= policy.floor);
}

#[test]
fn test_deadline_scales_with_audio_duration() {
    let policy = TimeoutPolicy::default();

    let short = policy.deadline(Duration::from_millis(3000), false);
    let long = policy.deadline(Duration::from_millis(30_000), false);

    assert!(short >= policy.floor);
    assert!(long > short, "longer audio must get more processing time");
}

#[test]
fn test_parallel_backup_adds_fixed_slack() {
    let policy = TimeoutPolicy::default();

    for audio_ms in [0u64, 3000, 45_000] {
        let audio = Duration::from_millis(audio_ms);
        let plain = policy.deadline(audio, false);
        let raced = policy.deadline(audio, true);
        assert_eq!(raced, plain + policy.parallel_slack);
    }
}

#[test]
fn test_custom_policy_constants() {
    let policy = TimeoutPolicy {
        floor: Duration::from_millis(200),
        audio_scale: 0.5,
        parallel_slack: Duration::from_millis(300),
    };

    assert_eq!(
        policy.deadline(Duration::from_millis(1000), false),
        Duration::from_millis(700)
    );
    assert_eq!(
        policy.deadline(Duration::from_millis(1000), true),
        Duration::from_millis(1000)
    );
}

#[test]
fn test_negative_scale_is_clamped() {
    let policy = TimeoutPolicy {
        floor: Duration::from_secs(5),
        audio_scale: -1.0,
        parallel_slack: Duration::ZERO,
    };

    // A broken scale never shrinks the deadline below the floor.
    assert_eq!(
        policy.deadline(Duration::from_secs(10), false),
        Duration::from_secs(5)
    );
}
