//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories for sessions, sets and records
//! - Seed helpers

use crate::models::{RaceRecord, Session, SessionWithSets, WorkoutSet};
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed the database with plain track sessions on consecutive days.
/// Returns the created session ids, most recent last.
pub async fn seed_sessions_on_days(pool: &SqlitePool, start: NaiveDate, count: usize) -> Vec<i64> {
  let mut ids = Vec::with_capacity(count);

  for i in 0..count {
    let date = start + chrono::Duration::days(i as i64);
    let result = sqlx::query(
      r#"
      INSERT INTO training_sessions (date, type, title, rpe)
      VALUES (?1, 'track', ?2, ?3)
      "#,
    )
    .bind(date)
    .bind(format!("Session {}", i + 1))
    .bind(5 + (i % 5) as i64)
    .execute(pool)
    .await
    .expect("Failed to insert test session");

    ids.push(result.last_insert_rowid());
  }

  ids
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Bare track session on a date (not persisted)
pub fn session_on(date: NaiveDate) -> Session {
  Session {
    id: 0,
    date,
    session_type: "track".to_string(),
    title: None,
    rpe: None,
    notes: None,
    created_at: None,
    updated_at: None,
  }
}

/// Race record with an optional date (not persisted)
pub fn race_record(distance_m: f64, time_s: f64, date: Option<NaiveDate>) -> RaceRecord {
  RaceRecord {
    id: 0,
    session_id: None,
    date,
    distance_m,
    time_s,
    is_personal_best: false,
    notes: None,
    created_at: None,
  }
}

fn sprint_set(sets: i64, distance_m: f64) -> WorkoutSet {
  WorkoutSet {
    id: 0,
    group_id: 0,
    session_id: 0,
    exercise_name: format!("{}m sprint", distance_m),
    category: "sprint".to_string(),
    sets: Some(sets),
    reps: None,
    weight_kg: None,
    distance_m: Some(distance_m),
    time_s: None,
    recovery_s: Some(180),
    notes: None,
    is_personal_best: false,
  }
}

/// Track session with one sprint set block (for load-model tests)
pub fn sprint_session(
  year: i32,
  month: u32,
  day: u32,
  rpe: Option<i64>,
  sets: i64,
  distance_m: f64,
) -> SessionWithSets {
  let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid test date");
  let mut session = session_on(date);
  session.rpe = rpe;

  SessionWithSets {
    session,
    sets: vec![sprint_set(sets, distance_m)],
  }
}

/// Gym session with a single lift set; never counts as sprint load
pub fn untyped_gym_session(year: i32, month: u32, day: u32) -> SessionWithSets {
  let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid test date");
  let mut session = session_on(date);
  session.session_type = "gym".to_string();
  session.rpe = Some(7);

  SessionWithSets {
    session,
    sets: vec![WorkoutSet {
      id: 0,
      group_id: 0,
      session_id: 0,
      exercise_name: "squat".to_string(),
      category: "lift".to_string(),
      sets: Some(5),
      reps: Some(3),
      weight_kg: Some(100.0),
      distance_m: None,
      time_s: None,
      recovery_s: None,
      notes: None,
      is_personal_best: false,
    }],
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN
       ('training_sessions', 'workout_groups', 'workout_sets',
        'race_records', 'strength_records', 'training_records', 'injury_history')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 7, "Expected all 7 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_sessions_consecutive_days() {
    let pool = setup_test_db().await;

    let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    let ids = seed_sessions_on_days(&pool, start, 4).await;
    assert_eq!(ids.len(), 4);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions")
      .fetch_one(&pool)
      .await
      .expect("Failed to count sessions");
    assert_eq!(count, 4);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_factories_produce_valid_shapes() {
    let entry = sprint_session(2026, 6, 1, Some(8), 5, 60.0);
    assert_eq!(entry.session.session_type, "track");
    assert_eq!(entry.sets[0].distance_m, Some(60.0));

    let gym = untyped_gym_session(2026, 6, 1);
    assert_eq!(gym.session.session_type, "gym");
    assert!(gym.sets[0].weight_kg.is_some());
  }
}
