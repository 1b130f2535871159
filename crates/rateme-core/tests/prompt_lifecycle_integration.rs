//! Integration tests for the full launch -> prompt -> reset cycle.
//!
//! These run against the SQLite backend on a temporary file, reopening the
//! store where a real host would restart the process.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rateme_core::{
    Clock, Config, KeyValueStore, ManualClock, MemoryStore, PersistedState, RatePrompt, SqliteStore,
    Thresholds, DEFAULT_NAMESPACE,
};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
}

fn open_prompt(
    path: &Path,
    clock: &Arc<ManualClock>,
) -> RatePrompt<SqliteStore, Arc<ManualClock>> {
    let store = SqliteStore::open(path, DEFAULT_NAMESPACE).unwrap();
    RatePrompt::new(
        PersistedState::with_clock(store, clock.clone()),
        Thresholds::new(10, 5),
    )
}

#[test]
fn test_five_launches_trigger_then_reset() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("rateme.db");
    let clock = Arc::new(ManualClock::new(t0()));
    let prompt = open_prompt(&db, &clock);

    let first = prompt.on_application_start(true).unwrap().unwrap();
    assert_eq!(first.install_timestamp, Some(t0()));
    assert_eq!(first.launch_count, 1);
    assert!(!prompt.should_show_rate_dialog(10, 5).unwrap());

    for _ in 0..4 {
        prompt.on_application_start(true).unwrap();
    }
    assert_eq!(prompt.snapshot().unwrap().launch_count, 5);

    assert!(prompt.should_show_rate_dialog(10, 5).unwrap());
    let after = prompt.snapshot().unwrap();
    assert_eq!(after.launch_count, 0);
    assert!(after.install_timestamp.is_none());
    assert!(prompt
        .state()
        .store()
        .get_int("rta_launch_times")
        .unwrap()
        .is_none());
}

#[test]
fn test_counts_survive_process_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("rateme.db");
    let clock = Arc::new(ManualClock::new(t0()));

    for day in 0..3 {
        clock.set(t0() + Duration::days(day));
        let prompt = open_prompt(&db, &clock);
        prompt.on_application_start(true).unwrap();
        // Host re-enters the same session without a fresh start.
        prompt.on_application_start(false).unwrap();
    }

    let prompt = open_prompt(&db, &clock);
    let snapshot = prompt.snapshot().unwrap();
    assert_eq!(snapshot.launch_count, 3);
    assert_eq!(snapshot.install_timestamp, Some(t0()));
}

#[test]
fn test_install_age_triggers_across_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("rateme.db");
    let clock = Arc::new(ManualClock::new(t0()));

    {
        let prompt = open_prompt(&db, &clock);
        prompt.on_application_start(true).unwrap();
        assert!(!prompt.should_show_rate_dialog(10, 5).unwrap());
    }

    clock.advance(Duration::days(9));
    {
        let prompt = open_prompt(&db, &clock);
        prompt.on_application_start(true).unwrap();
        assert!(!prompt.should_show_rate_dialog(10, 5).unwrap());
    }

    clock.advance(Duration::days(1));
    let prompt = open_prompt(&db, &clock);
    prompt.on_application_start(true).unwrap();
    assert!(prompt.should_show_rate_dialog(10, 5).unwrap());

    // Next cycle starts from the next launch.
    clock.advance(Duration::hours(1));
    let prompt = open_prompt(&db, &clock);
    let snapshot = prompt.on_application_start(true).unwrap().unwrap();
    assert_eq!(snapshot.launch_count, 1);
    assert_eq!(snapshot.install_timestamp, Some(clock.now()));
}

#[test]
fn test_opt_out_is_sticky_across_clears_and_restarts() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("rateme.db");
    let clock = Arc::new(ManualClock::new(t0()));

    {
        let prompt = open_prompt(&db, &clock);
        prompt.on_application_start(true).unwrap();
        prompt.set_opt_out(true).unwrap();
        prompt.clear_launch_data().unwrap();
    }

    clock.advance(Duration::days(400));
    let prompt = open_prompt(&db, &clock);
    for _ in 0..50 {
        prompt.on_application_start(true).unwrap();
    }
    assert!(prompt.was_opted_out().unwrap());
    assert!(!prompt.should_show_rate_dialog(1, 1).unwrap());
    assert_eq!(prompt.snapshot().unwrap().launch_count, 50);
}

#[test]
fn test_full_wipe_exits_opted_out_state() {
    let clock = Arc::new(ManualClock::new(t0()));
    let prompt = RatePrompt::new(
        PersistedState::with_clock(MemoryStore::new(DEFAULT_NAMESPACE), clock.clone()),
        Thresholds::new(10, 2),
    );

    prompt.on_application_start(true).unwrap();
    prompt.set_opt_out(true).unwrap();
    prompt.state().store().wipe();

    let snapshot = prompt.snapshot().unwrap();
    assert!(snapshot.is_fresh());
    assert!(!snapshot.opted_out);

    prompt.on_application_start(true).unwrap();
    prompt.on_application_start(true).unwrap();
    assert!(prompt.should_show_rate_dialog(10, 2).unwrap());
}

#[test]
fn test_prompt_from_config_uses_configured_database() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    let db = dir.path().join("custom.db");

    let mut config = Config::default();
    config.set("store.database", db.to_str().unwrap()).unwrap();
    config.set("thresholds.min_launch_times", "2").unwrap();
    config.save_to(&config_path).unwrap();

    let config = Config::load_from(&config_path).unwrap();
    let prompt = RatePrompt::from_config(&config).unwrap();
    prompt.on_application_start(true).unwrap();
    prompt.on_application_start(true).unwrap();

    assert!(db.exists());
    assert!(prompt.should_show_with_defaults().unwrap());
}

