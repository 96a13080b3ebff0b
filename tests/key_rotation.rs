//! Behavior tests for API key rotation.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::tempdir;
use tickstash_core::{FetchErrorKind, KeyRotator};

#[test]
fn when_pool_has_three_keys_five_calls_cycle_in_order() {
    // Given: A pool of K1, K2, K3
    let rotator = KeyRotator::from_keys(["K1", "K2", "K3"]);

    // When: Five credentials are drawn
    let drawn: Vec<String> = (0..5)
        .map(|_| rotator.next_credential().expect("key").expose().to_owned())
        .collect();

    // Then: Rotation wraps after the last key
    assert_eq!(drawn, vec!["K1", "K2", "K3", "K1", "K2"]);
}

#[test]
fn when_pool_has_n_keys_every_window_of_n_calls_covers_each_key_once() {
    // Given: A pool of seven keys
    let keys: Vec<String> = (1..=7).map(|n| format!("KEY-{n}")).collect();
    let rotator = KeyRotator::from_keys(keys.clone());

    // When: Three full cycles are drawn
    let drawn: Vec<String> = (0..keys.len() * 3)
        .map(|_| rotator.next_credential().expect("key").expose().to_owned())
        .collect();

    // Then: Each cycle is the pool in order
    for cycle in drawn.chunks(keys.len()) {
        assert_eq!(cycle, keys.as_slice());
    }
}

#[test]
fn when_keys_come_from_a_file_blank_lines_are_ignored() {
    // Given: A key file with blank and padded lines
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("api_keys.txt");
    fs::write(&path, "\nALPHA\n   \n  BRAVO  \n\n").expect("write keys");
    let rotator = KeyRotator::from_file(&path);

    // When: Three keys are drawn
    let drawn: Vec<String> = (0..3)
        .map(|_| rotator.next_credential().expect("key").expose().to_owned())
        .collect();

    // Then: Only the two real keys rotate, trimmed
    assert_eq!(drawn, vec!["ALPHA", "BRAVO", "ALPHA"]);
    assert_eq!(rotator.loaded_len(), Some(2));
}

#[test]
fn when_key_file_is_missing_system_reports_configuration_error() {
    // Given: A rotator pointing at a file that does not exist
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("missing.txt");
    let rotator = KeyRotator::from_file(&path);

    // When: A credential is requested
    let error = rotator.next_credential().expect_err("missing file");

    // Then: The failure is a configuration error naming the path
    assert_eq!(error.kind(), FetchErrorKind::Configuration);
    assert!(
        error.message().contains("missing.txt"),
        "message should name the file: {}",
        error.message()
    );
}

#[test]
fn when_key_file_appears_after_a_failed_load_next_call_succeeds() {
    // Given: A first call failed because the file did not exist yet
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("api_keys.txt");
    let rotator = KeyRotator::from_file(&path);
    assert!(rotator.next_credential().is_err());

    // When: The file is created and a credential is requested again
    fs::write(&path, "LATE-KEY\n").expect("write keys");
    let credential = rotator.next_credential().expect("retry load");

    // Then: The load is retried rather than cached as a failure
    assert_eq!(credential.expose(), "LATE-KEY");
}

#[test]
fn when_file_changes_after_load_pool_is_not_refreshed() {
    // Given: A rotator that already loaded its pool
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("api_keys.txt");
    fs::write(&path, "FIRST\n").expect("write keys");
    let rotator = KeyRotator::from_file(&path);
    assert_eq!(rotator.next_credential().expect("key").expose(), "FIRST");

    // When: The file is rewritten
    fs::write(&path, "SECOND\n").expect("rewrite keys");

    // Then: The in-memory pool is reused
    assert_eq!(rotator.next_credential().expect("key").expose(), "FIRST");
}

#[test]
fn when_threads_draw_concurrently_issuance_stays_balanced() {
    // Given: A shared pool of three keys
    let rotator = Arc::new(KeyRotator::from_keys(["K1", "K2", "K3"]));

    // When: Six threads draw fifty keys each
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let rotator = Arc::clone(&rotator);
            thread::spawn(move || {
                (0..50)
                    .map(|_| rotator.next_credential().expect("key").expose().to_owned())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for handle in handles {
        for key in handle.join().expect("thread") {
            *counts.entry(key).or_default() += 1;
        }
    }

    // Then: The serialized cursor hands out each key exactly 100 times
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|count| *count == 100), "{counts:?}");
}
