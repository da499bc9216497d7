//! Personal-best ledger
//!
//! One invariant rules this module: for a given identity key (distance for
//! race records, canonical exercise name for strength/training records) at
//! most one row carries `is_personal_best = 1`, and that row holds the best
//! value under the category ordering.
//!
//! The decision itself is a pure function; persistence runs the decision
//! inside a transaction that demotes the previous holder with a
//! compare-and-swap, retried once with fresh data on conflict.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Ordering Rules
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestOrdering {
  /// Race and timed training performances: faster wins
  LowerIsBetter,
  /// Lifts, jump and throw distances: bigger wins
  HigherIsBetter,
}

/// Strict-improvement comparison. Ties are NOT a new best; the first-ever
/// value for a key always is.
pub fn is_new_best(ordering: BestOrdering, candidate: f64, current: Option<f64>) -> bool {
  match current {
    None => true,
    Some(best) => match ordering {
      BestOrdering::LowerIsBetter => candidate < best,
      BestOrdering::HigherIsBetter => candidate > best,
    },
  }
}

/// Ordering for a training record's performance unit
pub fn training_ordering(performance_unit: &str) -> BestOrdering {
  if performance_unit.eq_ignore_ascii_case("seconds") {
    BestOrdering::LowerIsBetter
  } else {
    BestOrdering::HigherIsBetter
  }
}

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
  /// Demoting the previous holder raced with a concurrent save and the
  /// bounded retry also lost
  #[error("PB ledger conflict for key '{key}'")]
  Conflict { key: String },

  /// The store failed; the ledger never guesses on a failed lookup
  #[error("Record store error: {0}")]
  Store(#[from] sqlx::Error),
}

impl Serialize for RecordError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Saved Outcome
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRecord {
  pub id: i64,
  pub is_personal_best: bool,
  /// Row id of the previous holder this save demoted, if any
  pub demoted_id: Option<i64>,
}

/// How many times a CAS miss is retried with fresh data before surfacing
/// a conflict to the caller.
const MAX_ATTEMPTS: u32 = 2;

/// ---------------------------------------------------------------------------
/// Race Records (key: distance_m, lower time wins)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewRaceRecord {
  pub session_id: Option<i64>,
  pub date: Option<NaiveDate>,
  pub distance_m: f64,
  pub time_s: f64,
  pub notes: Option<String>,
}

pub async fn save_race_record(
  pool: &SqlitePool,
  new: &NewRaceRecord,
) -> Result<SavedRecord, RecordError> {
  for attempt in 0..MAX_ATTEMPTS {
    let mut tx = pool.begin().await?;

    let current: Option<(i64, f64)> = sqlx::query_as(
      "SELECT id, time_s FROM race_records WHERE distance_m = ?1 AND is_personal_best = 1",
    )
    .bind(new.distance_m)
    .fetch_optional(&mut *tx)
    .await?;

    let is_best = is_new_best(
      BestOrdering::LowerIsBetter,
      new.time_s,
      current.as_ref().map(|(_, t)| *t),
    );

    let mut demoted_id = None;
    if is_best {
      if let Some((prev_id, _)) = current {
        if !demote(&mut tx, "race_records", prev_id).await? {
          // Someone else moved the pointer underneath us; re-read and retry
          tx.rollback().await?;
          if attempt + 1 < MAX_ATTEMPTS {
            continue;
          }
          return Err(RecordError::Conflict {
            key: format!("{}m", new.distance_m),
          });
        }
        demoted_id = Some(prev_id);
      }
    }

    let id = sqlx::query(
      r#"
      INSERT INTO race_records (session_id, date, distance_m, time_s, is_personal_best, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
    )
    .bind(new.session_id)
    .bind(new.date)
    .bind(new.distance_m)
    .bind(new.time_s)
    .bind(is_best)
    .bind(&new.notes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;
    return Ok(SavedRecord {
      id,
      is_personal_best: is_best,
      demoted_id,
    });
  }

  Err(RecordError::Conflict {
    key: format!("{}m", new.distance_m),
  })
}

/// ---------------------------------------------------------------------------
/// Strength Records (key: exercise name, higher weight wins)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewStrengthRecord {
  pub session_id: Option<i64>,
  pub date: Option<NaiveDate>,
  /// Canonical exercise key, see [`crate::normalize::canonical_exercise_name`]
  pub exercise_name: String,
  pub category: Option<String>,
  pub weight_kg: f64,
  pub reps: i64,
  pub notes: Option<String>,
}

pub async fn save_strength_record(
  pool: &SqlitePool,
  new: &NewStrengthRecord,
) -> Result<SavedRecord, RecordError> {
  for attempt in 0..MAX_ATTEMPTS {
    let mut tx = pool.begin().await?;

    let current: Option<(i64, f64)> = sqlx::query_as(
      "SELECT id, weight_kg FROM strength_records WHERE exercise_name = ?1 AND is_personal_best = 1",
    )
    .bind(&new.exercise_name)
    .fetch_optional(&mut *tx)
    .await?;

    let is_best = is_new_best(
      BestOrdering::HigherIsBetter,
      new.weight_kg,
      current.as_ref().map(|(_, w)| *w),
    );

    let mut demoted_id = None;
    if is_best {
      if let Some((prev_id, _)) = current {
        if !demote(&mut tx, "strength_records", prev_id).await? {
          tx.rollback().await?;
          if attempt + 1 < MAX_ATTEMPTS {
            continue;
          }
          return Err(RecordError::Conflict {
            key: new.exercise_name.clone(),
          });
        }
        demoted_id = Some(prev_id);
      }
    }

    let id = sqlx::query(
      r#"
      INSERT INTO strength_records
        (session_id, date, exercise_name, category, weight_kg, reps, is_personal_best, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      "#,
    )
    .bind(new.session_id)
    .bind(new.date)
    .bind(&new.exercise_name)
    .bind(&new.category)
    .bind(new.weight_kg)
    .bind(new.reps)
    .bind(is_best)
    .bind(&new.notes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;
    return Ok(SavedRecord {
      id,
      is_personal_best: is_best,
      demoted_id,
    });
  }

  Err(RecordError::Conflict {
    key: new.exercise_name.clone(),
  })
}

/// ---------------------------------------------------------------------------
/// Training Records (key: exercise name, ordering by performance unit)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewTrainingRecord {
  pub session_id: Option<i64>,
  pub date: Option<NaiveDate>,
  /// Canonical exercise key
  pub exercise_name: String,
  pub exercise_type: String,
  pub performance_value: f64,
  /// "seconds" improves downward, "meters" upward
  pub performance_unit: String,
  pub notes: Option<String>,
}

pub async fn save_training_record(
  pool: &SqlitePool,
  new: &NewTrainingRecord,
) -> Result<SavedRecord, RecordError> {
  let ordering = training_ordering(&new.performance_unit);

  for attempt in 0..MAX_ATTEMPTS {
    let mut tx = pool.begin().await?;

    let current: Option<(i64, f64)> = sqlx::query_as(
      r#"
      SELECT id, performance_value FROM training_records
      WHERE exercise_name = ?1 AND performance_unit = ?2 AND is_personal_best = 1
      "#,
    )
    .bind(&new.exercise_name)
    .bind(&new.performance_unit)
    .fetch_optional(&mut *tx)
    .await?;

    let is_best = is_new_best(
      ordering,
      new.performance_value,
      current.as_ref().map(|(_, v)| *v),
    );

    let mut demoted_id = None;
    if is_best {
      if let Some((prev_id, _)) = current {
        if !demote(&mut tx, "training_records", prev_id).await? {
          tx.rollback().await?;
          if attempt + 1 < MAX_ATTEMPTS {
            continue;
          }
          return Err(RecordError::Conflict {
            key: new.exercise_name.clone(),
          });
        }
        demoted_id = Some(prev_id);
      }
    }

    let id = sqlx::query(
      r#"
      INSERT INTO training_records
        (session_id, date, exercise_name, exercise_type, performance_value,
         performance_unit, is_personal_best, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      "#,
    )
    .bind(new.session_id)
    .bind(new.date)
    .bind(&new.exercise_name)
    .bind(&new.exercise_type)
    .bind(new.performance_value)
    .bind(&new.performance_unit)
    .bind(is_best)
    .bind(&new.notes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;
    return Ok(SavedRecord {
      id,
      is_personal_best: is_best,
      demoted_id,
    });
  }

  Err(RecordError::Conflict {
    key: new.exercise_name.clone(),
  })
}

/// Compare-and-swap demotion of the previous holder. Returns false when the
/// row was no longer flagged best, i.e. the read raced with another writer.
async fn demote(
  tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
  table: &str,
  prev_id: i64,
) -> Result<bool, sqlx::Error> {
  let sql = format!(
    "UPDATE {} SET is_personal_best = 0 WHERE id = ?1 AND is_personal_best = 1",
    table
  );
  let affected = sqlx::query(&sql).bind(prev_id).execute(&mut **tx).await?.rows_affected();
  Ok(affected == 1)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
