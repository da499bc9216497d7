//! SQLite data access
//!
//! All reads and writes for sessions, workout groups/sets, performance
//! records and injuries. Bulk set inserts are chunked to respect batch
//! limits, guarded by a fixed commit ceiling, and fall back to sequential
//! per-row writes when a batch times out.

use crate::models::{
  BestsSnapshot, InjuryRecord, RaceRecord, Session, SessionType, SessionWithSets, StrengthRecord,
  TrainingRecord, WorkoutGroup, WorkoutSet,
};
use crate::normalize::NormalizedSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::time::timeout;

/// Maximum writes per batched transaction
const BATCH_LIMIT: usize = 450;
/// Ceiling for one batch commit (or one fallback write) before the
/// operation is reported as failed rather than retried forever
const COMMIT_TIMEOUT_SECS: u64 = 20;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Write timed out after {0}s")]
  Timeout(u64),

  #[error("Not found: {0}")]
  NotFound(String),
}

impl Serialize for StoreError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Session Tree Insert
/// ---------------------------------------------------------------------------

/// Validated, normalized write payload for one session
#[derive(Debug, Clone)]
pub struct SessionTree {
  pub date: NaiveDate,
  pub session_type: SessionType,
  pub title: Option<String>,
  pub rpe: Option<i64>,
  pub notes: Option<String>,
  pub groups: Vec<GroupTree>,
}

#[derive(Debug, Clone)]
pub struct GroupTree {
  pub name: String,
  pub order_index: i64,
  pub notes: Option<String>,
  pub sets: Vec<NormalizedSet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertedSession {
  pub session_id: i64,
  pub date: NaiveDate,
}

/// Insert a session with its groups and sets. The session and group rows go
/// in directly (there are few); set rows go through the chunked batch path.
pub async fn insert_session_tree(
  pool: &SqlitePool,
  tree: &SessionTree,
) -> Result<InsertedSession, StoreError> {
  let session_id = sqlx::query(
    r#"
    INSERT INTO training_sessions (date, type, title, rpe, notes)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
  )
  .bind(tree.date)
  .bind(tree.session_type.as_str())
  .bind(&tree.title)
  .bind(tree.rpe)
  .bind(&tree.notes)
  .execute(pool)
  .await?
  .last_insert_rowid();

  let mut set_rows: Vec<(i64, &NormalizedSet)> = Vec::new();
  for group in &tree.groups {
    let group_id = sqlx::query(
      r#"
      INSERT INTO workout_groups (session_id, name, order_index, notes)
      VALUES (?1, ?2, ?3, ?4)
      "#,
    )
    .bind(session_id)
    .bind(&group.name)
    .bind(group.order_index)
    .bind(&group.notes)
    .execute(pool)
    .await?
    .last_insert_rowid();

    for set in &group.sets {
      set_rows.push((group_id, set));
    }
  }

  insert_sets_chunked(pool, session_id, &set_rows).await?;

  Ok(InsertedSession {
    session_id,
    date: tree.date,
  })
}

/// Chunked batch insert with timeout and sequential fallback.
async fn insert_sets_chunked(
  pool: &SqlitePool,
  session_id: i64,
  rows: &[(i64, &NormalizedSet)],
) -> Result<(), StoreError> {
  for chunk in rows.chunks(BATCH_LIMIT) {
    println!("[store] Committing batch ({} writes)...", chunk.len());

    let batch = timeout(
      Duration::from_secs(COMMIT_TIMEOUT_SECS),
      insert_chunk_tx(pool, session_id, chunk),
    )
    .await;

    match batch {
      Ok(result) => result?,
      Err(_) => {
        eprintln!("[store] Batch commit timed out, falling back to single writes");
        for (group_id, set) in chunk {
          timeout(
            Duration::from_secs(COMMIT_TIMEOUT_SECS),
            insert_one_set(pool, session_id, *group_id, set),
          )
          .await
          .map_err(|_| StoreError::Timeout(COMMIT_TIMEOUT_SECS))??;
        }
      }
    }
  }
  Ok(())
}

async fn insert_chunk_tx(
  pool: &SqlitePool,
  session_id: i64,
  chunk: &[(i64, &NormalizedSet)],
) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;
  for (group_id, set) in chunk {
    bind_set_insert(session_id, *group_id, set)
      .execute(&mut *tx)
      .await?;
  }
  tx.commit().await?;
  Ok(())
}

async fn insert_one_set(
  pool: &SqlitePool,
  session_id: i64,
  group_id: i64,
  set: &NormalizedSet,
) -> Result<(), StoreError> {
  bind_set_insert(session_id, group_id, set).execute(pool).await?;
  Ok(())
}

fn bind_set_insert<'q>(
  session_id: i64,
  group_id: i64,
  set: &'q NormalizedSet,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
  sqlx::query(
    r#"
    INSERT INTO workout_sets
      (group_id, session_id, exercise_name, category, sets, reps,
       weight_kg, distance_m, time_s, recovery_s, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    "#,
  )
  .bind(group_id)
  .bind(session_id)
  .bind(&set.exercise_name)
  .bind(set.category.as_str())
  .bind(set.sets)
  .bind(set.reps)
  .bind(set.weight_kg)
  .bind(set.distance_m)
  .bind(set.time_s)
  .bind(set.recovery_s)
  .bind(&set.notes)
}

/// ---------------------------------------------------------------------------
/// Session Queries
/// ---------------------------------------------------------------------------

pub async fn list_sessions(
  pool: &SqlitePool,
  limit: i64,
  offset: i64,
) -> Result<Vec<Session>, StoreError> {
  let sessions = sqlx::query_as::<_, Session>(
    "SELECT * FROM training_sessions ORDER BY date DESC, id DESC LIMIT ?1 OFFSET ?2",
  )
  .bind(limit)
  .bind(offset)
  .fetch_all(pool)
  .await?;
  Ok(sessions)
}

/// Sessions in an inclusive date range, oldest first. Open bounds list
/// everything on that side.
pub async fn list_sessions_in_range(
  pool: &SqlitePool,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
) -> Result<Vec<Session>, StoreError> {
  let sessions = sqlx::query_as::<_, Session>(
    r#"
    SELECT * FROM training_sessions
    WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
    ORDER BY date ASC, id ASC
    "#,
  )
  .bind(start)
  .bind(end)
  .fetch_all(pool)
  .await?;
  Ok(sessions)
}

/// Sessions with their flattened sets, for the analytics modules.
pub async fn sessions_with_sets_in_range(
  pool: &SqlitePool,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
) -> Result<Vec<SessionWithSets>, StoreError> {
  let sessions = list_sessions_in_range(pool, start, end).await?;

  let mut entries = Vec::with_capacity(sessions.len());
  for session in sessions {
    let sets = sqlx::query_as::<_, WorkoutSet>(
      "SELECT * FROM workout_sets WHERE session_id = ?1 ORDER BY id",
    )
    .bind(session.id)
    .fetch_all(pool)
    .await?;
    entries.push(SessionWithSets { session, sets });
  }
  Ok(entries)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWithSets {
  pub group: WorkoutGroup,
  pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
  pub session: Session,
  pub groups: Vec<GroupWithSets>,
}

pub async fn session_detail(pool: &SqlitePool, session_id: i64) -> Result<SessionDetail, StoreError> {
  let session = sqlx::query_as::<_, Session>("SELECT * FROM training_sessions WHERE id = ?1")
    .bind(session_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("session {}", session_id)))?;

  let groups = sqlx::query_as::<_, WorkoutGroup>(
    "SELECT * FROM workout_groups WHERE session_id = ?1 ORDER BY order_index ASC, id ASC",
  )
  .bind(session_id)
  .fetch_all(pool)
  .await?;

  let mut detailed = Vec::with_capacity(groups.len());
  for group in groups {
    let sets = sqlx::query_as::<_, WorkoutSet>(
      "SELECT * FROM workout_sets WHERE group_id = ?1 ORDER BY id",
    )
    .bind(group.id)
    .fetch_all(pool)
    .await?;
    detailed.push(GroupWithSets { group, sets });
  }

  Ok(SessionDetail {
    session,
    groups: detailed,
  })
}

/// Most recent sessions with full detail, newest first (LLM context).
pub async fn recent_sessions_detailed(
  pool: &SqlitePool,
  limit: i64,
) -> Result<Vec<SessionDetail>, StoreError> {
  let ids: Vec<(i64,)> = sqlx::query_as(
    "SELECT id FROM training_sessions ORDER BY date DESC, id DESC LIMIT ?1",
  )
  .bind(limit)
  .fetch_all(pool)
  .await?;

  let mut details = Vec::with_capacity(ids.len());
  for (id,) in ids {
    details.push(session_detail(pool, id).await?);
  }
  Ok(details)
}

/// ---------------------------------------------------------------------------
/// Session Updates & Cascade Delete
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionPatch {
  pub title: Option<String>,
  pub session_type: Option<SessionType>,
  pub rpe: Option<i64>,
  pub notes: Option<String>,
}

pub async fn update_session_meta(
  pool: &SqlitePool,
  session_id: i64,
  patch: &SessionPatch,
) -> Result<Session, StoreError> {
  let affected = sqlx::query(
    r#"
    UPDATE training_sessions SET
      title = COALESCE(?1, title),
      type = COALESCE(?2, type),
      rpe = COALESCE(?3, rpe),
      notes = COALESCE(?4, notes),
      updated_at = datetime('now')
    WHERE id = ?5
    "#,
  )
  .bind(&patch.title)
  .bind(patch.session_type.map(|t| t.as_str()))
  .bind(patch.rpe)
  .bind(&patch.notes)
  .bind(session_id)
  .execute(pool)
  .await?
  .rows_affected();

  if affected == 0 {
    return Err(StoreError::NotFound(format!("session {}", session_id)));
  }

  let session = sqlx::query_as::<_, Session>("SELECT * FROM training_sessions WHERE id = ?1")
    .bind(session_id)
    .fetch_one(pool)
    .await?;
  Ok(session)
}

/// Field-level patch for one workout set; None leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct SetPatch {
  pub exercise_name: Option<String>,
  pub category: Option<crate::models::SetCategory>,
  pub sets: Option<i64>,
  pub reps: Option<i64>,
  pub weight_kg: Option<f64>,
  pub distance_m: Option<f64>,
  pub time_s: Option<f64>,
  pub recovery_s: Option<i64>,
  pub notes: Option<String>,
}

pub async fn update_workout_set(
  pool: &SqlitePool,
  set_id: i64,
  patch: &SetPatch,
) -> Result<WorkoutSet, StoreError> {
  let affected = sqlx::query(
    r#"
    UPDATE workout_sets SET
      exercise_name = COALESCE(?1, exercise_name),
      category = COALESCE(?2, category),
      sets = COALESCE(?3, sets),
      reps = COALESCE(?4, reps),
      weight_kg = COALESCE(?5, weight_kg),
      distance_m = COALESCE(?6, distance_m),
      time_s = COALESCE(?7, time_s),
      recovery_s = COALESCE(?8, recovery_s),
      notes = COALESCE(?9, notes)
    WHERE id = ?10
    "#,
  )
  .bind(&patch.exercise_name)
  .bind(patch.category.map(|c| c.as_str()))
  .bind(patch.sets)
  .bind(patch.reps)
  .bind(patch.weight_kg)
  .bind(patch.distance_m)
  .bind(patch.time_s)
  .bind(patch.recovery_s)
  .bind(&patch.notes)
  .bind(set_id)
  .execute(pool)
  .await?
  .rows_affected();

  if affected == 0 {
    return Err(StoreError::NotFound(format!("workout set {}", set_id)));
  }

  let set = sqlx::query_as::<_, WorkoutSet>("SELECT * FROM workout_sets WHERE id = ?1")
    .bind(set_id)
    .fetch_one(pool)
    .await?;
  Ok(set)
}

pub async fn update_workout_group(
  pool: &SqlitePool,
  group_id: i64,
  name: Option<String>,
  order_index: Option<i64>,
  notes: Option<String>,
) -> Result<WorkoutGroup, StoreError> {
  let affected = sqlx::query(
    r#"
    UPDATE workout_groups SET
      name = COALESCE(?1, name),
      order_index = COALESCE(?2, order_index),
      notes = COALESCE(?3, notes)
    WHERE id = ?4
    "#,
  )
  .bind(&name)
  .bind(order_index)
  .bind(&notes)
  .bind(group_id)
  .execute(pool)
  .await?
  .rows_affected();

  if affected == 0 {
    return Err(StoreError::NotFound(format!("workout group {}", group_id)));
  }

  let group = sqlx::query_as::<_, WorkoutGroup>("SELECT * FROM workout_groups WHERE id = ?1")
    .bind(group_id)
    .fetch_one(pool)
    .await?;
  Ok(group)
}

/// Delete a session, everything it owns, and every derived record that
/// references it: race/strength/training records by session_id, injuries by
/// cause_session_id.
pub async fn delete_session(pool: &SqlitePool, session_id: i64) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;

  sqlx::query("DELETE FROM workout_sets WHERE session_id = ?1")
    .bind(session_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM workout_groups WHERE session_id = ?1")
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

  let deleted = sqlx::query("DELETE FROM training_sessions WHERE id = ?1")
    .bind(session_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  if deleted == 0 {
    return Err(StoreError::NotFound(format!("session {}", session_id)));
  }

  for table in ["race_records", "strength_records", "training_records"] {
    let sql = format!("DELETE FROM {} WHERE session_id = ?1", table);
    sqlx::query(&sql).bind(session_id).execute(&mut *tx).await?;
  }
  sqlx::query("DELETE FROM injury_history WHERE cause_session_id = ?1")
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Record Queries
/// ---------------------------------------------------------------------------

pub async fn list_race_records(pool: &SqlitePool) -> Result<Vec<RaceRecord>, StoreError> {
  let records = sqlx::query_as::<_, RaceRecord>(
    "SELECT * FROM race_records ORDER BY date DESC, created_at DESC",
  )
  .fetch_all(pool)
  .await?;
  Ok(records)
}

pub async fn list_strength_records(pool: &SqlitePool) -> Result<Vec<StrengthRecord>, StoreError> {
  let records = sqlx::query_as::<_, StrengthRecord>(
    "SELECT * FROM strength_records ORDER BY exercise_name ASC, created_at DESC",
  )
  .fetch_all(pool)
  .await?;
  Ok(records)
}

pub async fn list_training_records(pool: &SqlitePool) -> Result<Vec<TrainingRecord>, StoreError> {
  let records = sqlx::query_as::<_, TrainingRecord>(
    "SELECT * FROM training_records ORDER BY exercise_name ASC, created_at DESC",
  )
  .fetch_all(pool)
  .await?;
  Ok(records)
}

/// All current `is_personal_best` holders, fetched once per operation.
pub async fn bests_snapshot(pool: &SqlitePool) -> Result<BestsSnapshot, StoreError> {
  let race = sqlx::query_as::<_, RaceRecord>(
    "SELECT * FROM race_records WHERE is_personal_best = 1 ORDER BY distance_m ASC",
  )
  .fetch_all(pool)
  .await?;

  let strength = sqlx::query_as::<_, StrengthRecord>(
    "SELECT * FROM strength_records WHERE is_personal_best = 1 ORDER BY exercise_name ASC",
  )
  .fetch_all(pool)
  .await?;

  let training = sqlx::query_as::<_, TrainingRecord>(
    "SELECT * FROM training_records WHERE is_personal_best = 1 ORDER BY exercise_name ASC",
  )
  .fetch_all(pool)
  .await?;

  Ok(BestsSnapshot {
    race,
    strength,
    training,
  })
}

/// ---------------------------------------------------------------------------
/// Injuries
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewInjury {
  pub injury_type: String,
  pub body_part: String,
  pub start_date: NaiveDate,
  pub end_date: Option<NaiveDate>,
  pub severity: String,
  pub cause_session_id: Option<i64>,
  pub notes: Option<String>,
}

pub async fn insert_injury(pool: &SqlitePool, new: &NewInjury) -> Result<i64, StoreError> {
  let id = sqlx::query(
    r#"
    INSERT INTO injury_history
      (injury_type, body_part, start_date, end_date, severity, cause_session_id, notes)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    "#,
  )
  .bind(&new.injury_type)
  .bind(&new.body_part)
  .bind(new.start_date)
  .bind(new.end_date)
  .bind(&new.severity)
  .bind(new.cause_session_id)
  .bind(&new.notes)
  .execute(pool)
  .await?
  .last_insert_rowid();
  Ok(id)
}

pub async fn list_injuries(pool: &SqlitePool) -> Result<Vec<InjuryRecord>, StoreError> {
  let injuries = sqlx::query_as::<_, InjuryRecord>(
    "SELECT id, injury_type, body_part, start_date, end_date, severity, cause_session_id, notes
     FROM injury_history ORDER BY start_date DESC",
  )
  .fetch_all(pool)
  .await?;
  Ok(injuries)
}

pub async fn active_injuries(pool: &SqlitePool) -> Result<Vec<InjuryRecord>, StoreError> {
  let injuries = sqlx::query_as::<_, InjuryRecord>(
    "SELECT id, injury_type, body_part, start_date, end_date, severity, cause_session_id, notes
     FROM injury_history WHERE end_date IS NULL ORDER BY start_date DESC",
  )
  .fetch_all(pool)
  .await?;
  Ok(injuries)
}

/// Resolve an injury by setting its end date.
pub async fn resolve_injury(
  pool: &SqlitePool,
  injury_id: i64,
  end_date: NaiveDate,
) -> Result<(), StoreError> {
  let affected = sqlx::query(
    "UPDATE injury_history SET end_date = ?1, updated_at = datetime('now') WHERE id = ?2",
  )
  .bind(end_date)
  .bind(injury_id)
  .execute(pool)
  .await?
  .rows_affected();

  if affected == 0 {
    return Err(StoreError::NotFound(format!("injury {}", injury_id)));
  }
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::SetCategory;
  use crate::test_utils::{setup_test_db, teardown_test_db};

  fn sprint_tree(date: NaiveDate) -> SessionTree {
    SessionTree {
      date,
      session_type: SessionType::Track,
      title: Some("Speed work".to_string()),
      rpe: Some(8),
      notes: None,
      groups: vec![GroupTree {
        name: "Sprints".to_string(),
        order_index: 1,
        notes: None,
        sets: vec![NormalizedSet {
          exercise_name: "60m sprint".to_string(),
          key: "60m sprint".to_string(),
          category: SetCategory::Sprint,
          sets: Some(5),
          reps: None,
          weight_kg: None,
          distance_m: Some(60.0),
          time_s: Some(7.4),
          recovery_s: Some(180),
          notes: None,
        }],
      }],
    }
  }

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[tokio::test]
  async fn test_insert_and_read_back_session_tree() {
    let pool = setup_test_db().await;

    let inserted = insert_session_tree(&pool, &sprint_tree(d(2026, 6, 1))).await.unwrap();
    let detail = session_detail(&pool, inserted.session_id).await.unwrap();

    assert_eq!(detail.session.date, d(2026, 6, 1));
    assert_eq!(detail.session.session_type, "track");
    assert_eq!(detail.groups.len(), 1);
    assert_eq!(detail.groups[0].sets.len(), 1);
    assert_eq!(detail.groups[0].sets[0].exercise_name, "60m sprint");
    assert_eq!(detail.groups[0].sets[0].distance_m, Some(60.0));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_range_query_bounds_inclusive() {
    let pool = setup_test_db().await;

    for day in [1, 5, 10] {
      insert_session_tree(&pool, &sprint_tree(d(2026, 6, day))).await.unwrap();
    }

    let all = list_sessions_in_range(&pool, None, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let bounded = list_sessions_in_range(&pool, Some(d(2026, 6, 5)), Some(d(2026, 6, 10)))
      .await
      .unwrap();
    assert_eq!(bounded.len(), 2);
    // Oldest first
    assert_eq!(bounded[0].date, d(2026, 6, 5));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_update_session_meta_coalesces() {
    let pool = setup_test_db().await;
    let inserted = insert_session_tree(&pool, &sprint_tree(d(2026, 6, 1))).await.unwrap();

    let patch = SessionPatch {
      rpe: Some(9),
      ..Default::default()
    };
    let updated = update_session_meta(&pool, inserted.session_id, &patch).await.unwrap();

    assert_eq!(updated.rpe, Some(9));
    // Untouched fields survive
    assert_eq!(updated.title.as_deref(), Some("Speed work"));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_update_workout_set_patches_fields() {
    let pool = setup_test_db().await;
    let inserted = insert_session_tree(&pool, &sprint_tree(d(2026, 6, 1))).await.unwrap();

    let detail = session_detail(&pool, inserted.session_id).await.unwrap();
    let set_id = detail.groups[0].sets[0].id;

    let patch = SetPatch {
      time_s: Some(7.25),
      notes: Some("hand timed".to_string()),
      ..Default::default()
    };
    let updated = update_workout_set(&pool, set_id, &patch).await.unwrap();

    assert_eq!(updated.time_s, Some(7.25));
    assert_eq!(updated.notes.as_deref(), Some("hand timed"));
    // Untouched columns survive
    assert_eq!(updated.distance_m, Some(60.0));
    assert_eq!(updated.exercise_name, "60m sprint");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_update_missing_set_not_found() {
    let pool = setup_test_db().await;
    let result = update_workout_set(&pool, 42, &SetPatch::default()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_session_cascades_to_derived_records() {
    let pool = setup_test_db().await;
    let inserted = insert_session_tree(&pool, &sprint_tree(d(2026, 6, 1))).await.unwrap();

    // Derived rows referencing the session
    crate::records::save_race_record(
      &pool,
      &crate::records::NewRaceRecord {
        session_id: Some(inserted.session_id),
        date: Some(d(2026, 6, 1)),
        distance_m: 100.0,
        time_s: 11.2,
        notes: None,
      },
    )
    .await
    .unwrap();
    insert_injury(
      &pool,
      &NewInjury {
        injury_type: "strain".to_string(),
        body_part: "hamstring".to_string(),
        start_date: d(2026, 6, 1),
        end_date: None,
        severity: "mild".to_string(),
        cause_session_id: Some(inserted.session_id),
        notes: None,
      },
    )
    .await
    .unwrap();

    delete_session(&pool, inserted.session_id).await.unwrap();

    let sets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_sets")
      .fetch_one(&pool)
      .await
      .unwrap();
    let races: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM race_records")
      .fetch_one(&pool)
      .await
      .unwrap();
    let injuries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM injury_history")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!((sets, races, injuries), (0, 0, 0));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_missing_session_not_found() {
    let pool = setup_test_db().await;
    let result = delete_session(&pool, 9999).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_resolve_injury_sets_end_date() {
    let pool = setup_test_db().await;

    let id = insert_injury(
      &pool,
      &NewInjury {
        injury_type: "pain".to_string(),
        body_part: "knee".to_string(),
        start_date: d(2026, 6, 1),
        end_date: None,
        severity: "mild".to_string(),
        cause_session_id: None,
        notes: None,
      },
    )
    .await
    .unwrap();

    assert_eq!(active_injuries(&pool).await.unwrap().len(), 1);

    resolve_injury(&pool, id, d(2026, 6, 15)).await.unwrap();
    assert!(active_injuries(&pool).await.unwrap().is_empty());

    let all = list_injuries(&pool).await.unwrap();
    assert_eq!(all[0].end_date, Some(d(2026, 6, 15)));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_bests_snapshot_only_current_holders() {
    let pool = setup_test_db().await;

    for t in [11.5, 11.2, 11.8] {
      crate::records::save_race_record(
        &pool,
        &crate::records::NewRaceRecord {
          session_id: None,
          date: Some(d(2026, 6, 1)),
          distance_m: 100.0,
          time_s: t,
          notes: None,
        },
      )
      .await
      .unwrap();
    }

    let snapshot = bests_snapshot(&pool).await.unwrap();
    assert_eq!(snapshot.race.len(), 1);
    assert!((snapshot.race[0].time_s - 11.2).abs() < 1e-9);

    teardown_test_db(pool).await;
  }
}
