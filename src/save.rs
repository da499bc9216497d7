//! Session-save pipeline
//!
//! One direction, fixed order: validate -> snapshot bests -> anomaly scan ->
//! insert session trees -> PB ledger -> injuries. Validation failures reject
//! before any write. After a session row exists nothing rolls it back;
//! downstream failures land in the report as per-item outcomes so sibling
//! records still get their attempt.

use crate::anomaly::{self, AnomalyWarning};
use crate::models::{ClaimedBest, ParsedPayload, ParsedSession, SessionType};
use crate::normalize::{canonical_exercise_name, normalize_set, sanitize_metric};
use crate::records::{
  self, NewRaceRecord, NewStrengthRecord, NewTrainingRecord, RecordError,
};
use crate::store::{self, GroupTree, NewInjury, SessionTree, StoreError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Errors & Report
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
  /// Malformed candidate input; rejected before any write
  #[error("Validation failed: {0}")]
  Validation(String),

  /// The store failed before anything was persisted
  #[error("Store unavailable: {0}")]
  Store(#[from] StoreError),
}

impl Serialize for SaveError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
  Saved {
    category: String,
    key: String,
    id: i64,
    is_personal_best: bool,
  },
  /// The claim lacked the fields its category needs; nothing was written
  Skipped { category: String, reason: String },
  Failed {
    category: String,
    key: String,
    error: String,
  },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveReport {
  pub session_ids: Vec<i64>,
  pub warnings: Vec<AnomalyWarning>,
  pub records: Vec<RecordOutcome>,
  pub injuries_saved: usize,
  /// Per-step errors after the first session was persisted
  pub errors: Vec<String>,
}

impl SaveReport {
  pub fn is_partial(&self) -> bool {
    !self.errors.is_empty()
      || self
        .records
        .iter()
        .any(|r| matches!(r, RecordOutcome::Failed { .. }))
  }
}

/// ---------------------------------------------------------------------------
/// Validation
/// ---------------------------------------------------------------------------

struct ValidatedSession {
  date: NaiveDate,
  tree: SessionTree,
}

/// Parse and normalize every session up front; any malformed session
/// rejects the whole payload before a single write happens.
fn validate(payload: &ParsedPayload) -> Result<Vec<ValidatedSession>, SaveError> {
  if payload.sessions.is_empty() {
    return Err(SaveError::Validation("payload contains no sessions".to_string()));
  }

  payload
    .sessions
    .iter()
    .enumerate()
    .map(|(idx, parsed)| validate_session(idx, parsed))
    .collect()
}

fn validate_session(idx: usize, parsed: &ParsedSession) -> Result<ValidatedSession, SaveError> {
  let date = NaiveDate::parse_from_str(parsed.session.date.trim(), "%Y-%m-%d").map_err(|_| {
    SaveError::Validation(format!(
      "session {}: invalid or missing date '{}'",
      idx + 1,
      parsed.session.date
    ))
  })?;

  let session_type: SessionType = parsed.session.session_type.parse().map_err(|_| {
    SaveError::Validation(format!(
      "session {}: unknown type '{}'",
      idx + 1,
      parsed.session.session_type
    ))
  })?;

  // Out-of-range RPE is dropped, not fatal: capture the session, lose the
  // noise
  let rpe = parsed.session.rpe.filter(|r| (1..=10).contains(r));

  let groups = parsed
    .groups
    .iter()
    .map(|g| GroupTree {
      name: g.name.clone(),
      order_index: g.order_index,
      notes: g.notes.clone(),
      sets: g.sets.iter().map(normalize_set).collect(),
    })
    .collect();

  Ok(ValidatedSession {
    date,
    tree: SessionTree {
      date,
      session_type,
      title: parsed.session.title.clone(),
      rpe,
      notes: parsed.session.notes.clone(),
      groups,
    },
  })
}

/// ---------------------------------------------------------------------------
/// Pipeline
/// ---------------------------------------------------------------------------

/// Save a full parsed payload. PBs and injuries attach to the first session
/// (multi-day payloads report them once, against the day that set them).
pub async fn save_parsed_payload(
  pool: &SqlitePool,
  payload: &ParsedPayload,
) -> Result<SaveReport, SaveError> {
  let validated = validate(payload)?;

  // One snapshot serves the anomaly scan; the ledger re-reads inside its
  // own transaction
  let bests = store::bests_snapshot(pool).await?;
  let warnings = anomaly::detect(&payload.sessions, &bests);

  let mut report = SaveReport {
    warnings,
    ..Default::default()
  };

  let mut first_saved: Option<(i64, NaiveDate)> = None;

  for (idx, session) in validated.iter().enumerate() {
    match store::insert_session_tree(pool, &session.tree).await {
      Ok(inserted) => {
        report.session_ids.push(inserted.session_id);
        if first_saved.is_none() {
          first_saved = Some((inserted.session_id, session.date));

          save_claimed_bests(pool, payload, inserted.session_id, session.date, &mut report).await;
          save_injuries(pool, payload, inserted.session_id, session.date, &mut report).await;
        }
      }
      Err(e) => {
        if first_saved.is_none() {
          // Nothing persisted yet: surface as a whole-operation failure
          return Err(e.into());
        }
        report
          .errors
          .push(format!("session {}: {}", idx + 1, e));
        break;
      }
    }
  }

  Ok(report)
}

/// Run every claimed PB through the ledger. Failures abort only the record
/// they affect; siblings still get their attempt.
async fn save_claimed_bests(
  pool: &SqlitePool,
  payload: &ParsedPayload,
  session_id: i64,
  date: NaiveDate,
  report: &mut SaveReport,
) {
  for claim in &payload.personal_bests {
    let outcome = match claim {
      ClaimedBest::Race {
        distance_m,
        time_s,
        notes,
      } => {
        match (sanitize_metric(*distance_m), sanitize_metric(*time_s)) {
          (Some(distance), Some(time)) if distance > 0.0 && time > 0.0 => {
            let new = NewRaceRecord {
              session_id: Some(session_id),
              date: Some(date),
              distance_m: distance,
              time_s: time,
              notes: notes.clone(),
            };
            match records::save_race_record(pool, &new).await {
              Ok(saved) => RecordOutcome::Saved {
                category: "race".to_string(),
                key: format!("{}m", distance),
                id: saved.id,
                is_personal_best: saved.is_personal_best,
              },
              Err(e) => failed_outcome("race", format!("{}m", distance), e),
            }
          }
          _ => RecordOutcome::Skipped {
            category: "race".to_string(),
            reason: "missing distance or time".to_string(),
          },
        }
      }

      ClaimedBest::Strength {
        exercise_name,
        category,
        weight_kg,
        reps,
        notes,
      } => {
        let key = exercise_name
          .as_deref()
          .map(canonical_exercise_name)
          .filter(|k| !k.is_empty());
        match (key, sanitize_metric(*weight_kg)) {
          (Some(key), Some(weight)) if weight > 0.0 => {
            let new = NewStrengthRecord {
              session_id: Some(session_id),
              date: Some(date),
              exercise_name: key.clone(),
              category: category.clone(),
              weight_kg: weight,
              reps: reps.filter(|r| *r > 0).unwrap_or(1),
              notes: notes.clone(),
            };
            match records::save_strength_record(pool, &new).await {
              Ok(saved) => RecordOutcome::Saved {
                category: "strength".to_string(),
                key,
                id: saved.id,
                is_personal_best: saved.is_personal_best,
              },
              Err(e) => failed_outcome("strength", key, e),
            }
          }
          _ => RecordOutcome::Skipped {
            category: "strength".to_string(),
            reason: "missing exercise name or weight".to_string(),
          },
        }
      }

      ClaimedBest::Training {
        exercise_name,
        exercise_type,
        performance_value,
        performance_unit,
        notes,
      } => {
        let key = exercise_name
          .as_deref()
          .map(canonical_exercise_name)
          .filter(|k| !k.is_empty());
        match (key, sanitize_metric(*performance_value)) {
          (Some(key), Some(value)) if value > 0.0 => {
            let new = NewTrainingRecord {
              session_id: Some(session_id),
              date: Some(date),
              exercise_name: key.clone(),
              exercise_type: exercise_type.clone().unwrap_or_else(|| "sprint".to_string()),
              performance_value: value,
              performance_unit: performance_unit
                .clone()
                .unwrap_or_else(|| "seconds".to_string()),
              notes: notes.clone(),
            };
            match records::save_training_record(pool, &new).await {
              Ok(saved) => RecordOutcome::Saved {
                category: "training".to_string(),
                key,
                id: saved.id,
                is_personal_best: saved.is_personal_best,
              },
              Err(e) => failed_outcome("training", key, e),
            }
          }
          _ => RecordOutcome::Skipped {
            category: "training".to_string(),
            reason: "missing exercise name or value".to_string(),
          },
        }
      }
    };

    report.records.push(outcome);
  }
}

fn failed_outcome(category: &str, key: String, error: RecordError) -> RecordOutcome {
  RecordOutcome::Failed {
    category: category.to_string(),
    key,
    error: error.to_string(),
  }
}

async fn save_injuries(
  pool: &SqlitePool,
  payload: &ParsedPayload,
  session_id: i64,
  date: NaiveDate,
  report: &mut SaveReport,
) {
  for injury in &payload.injuries {
    let end_date = injury
      .end_date
      .as_deref()
      .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());

    let new = NewInjury {
      injury_type: injury.injury_type.clone(),
      body_part: injury.body_part.clone(),
      start_date: date,
      end_date,
      severity: injury.severity.clone(),
      cause_session_id: Some(session_id),
      notes: injury.notes.clone(),
    };

    match store::insert_injury(pool, &new).await {
      Ok(_) => report.injuries_saved += 1,
      Err(e) => report.errors.push(format!(
        "injury {} ({}): {}",
        injury.injury_type, injury.body_part, e
      )),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{ParsedGroup, ParsedSessionMeta, ParsedSet};
  use crate::test_utils::{setup_test_db, teardown_test_db};

  fn track_session(date: &str, sets: Vec<ParsedSet>) -> ParsedSession {
    ParsedSession {
      session: ParsedSessionMeta {
        date: date.to_string(),
        session_type: "track".to_string(),
        title: Some("Sprints".to_string()),
        rpe: Some(8),
        notes: None,
      },
      groups: vec![ParsedGroup {
        name: "Main block".to_string(),
        order_index: 1,
        sets,
        notes: None,
      }],
    }
  }

  fn sprint_set(distance_m: f64, time_s: f64) -> ParsedSet {
    ParsedSet {
      exercise_name: Some(format!("{}m sprint", distance_m)),
      category: Some("sprint".to_string()),
      sets: Some(1),
      reps: None,
      weight_kg: None,
      distance_m: Some(distance_m),
      time_s: Some(time_s),
      recovery_s: None,
      notes: None,
    }
  }

  fn payload(sessions: Vec<ParsedSession>, bests: Vec<ClaimedBest>) -> ParsedPayload {
    ParsedPayload {
      sessions,
      personal_bests: bests,
      injuries: vec![],
    }
  }

  #[tokio::test]
  async fn test_validation_rejects_before_any_write() {
    let pool = setup_test_db().await;

    let bad = payload(
      vec![track_session("not-a-date", vec![sprint_set(60.0, 7.4)])],
      vec![],
    );
    let result = save_parsed_payload(&pool, &bad).await;
    assert!(matches!(result, Err(SaveError::Validation(_))));

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(sessions, 0, "a rejected payload must leave no rows behind");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_unknown_session_type_rejected() {
    let pool = setup_test_db().await;

    let mut session = track_session("2026-06-01", vec![]);
    session.session.session_type = "swimming".to_string();
    let result = save_parsed_payload(&pool, &payload(vec![session], vec![])).await;
    assert!(matches!(result, Err(SaveError::Validation(_))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_save_with_race_pb_claim() {
    let pool = setup_test_db().await;

    let p = payload(
      vec![track_session("2026-06-01", vec![sprint_set(100.0, 10.45)])],
      vec![ClaimedBest::Race {
        distance_m: Some(100.0),
        time_s: Some(10.45),
        notes: None,
      }],
    );

    let report = save_parsed_payload(&pool, &p).await.unwrap();
    assert_eq!(report.session_ids.len(), 1);
    assert!(!report.is_partial());
    assert!(matches!(
      report.records[0],
      RecordOutcome::Saved { is_personal_best: true, .. }
    ));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_anomaly_warning_does_not_block_save() {
    let pool = setup_test_db().await;

    // 9.2s over 100m: flagged as impossible, still saved
    let p = payload(
      vec![track_session("2026-06-01", vec![sprint_set(100.0, 9.2)])],
      vec![ClaimedBest::Race {
        distance_m: Some(100.0),
        time_s: Some(9.2),
        notes: None,
      }],
    );

    let report = save_parsed_payload(&pool, &p).await.unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("9.58"));
    assert_eq!(report.session_ids.len(), 1);
    assert!(matches!(report.records[0], RecordOutcome::Saved { .. }));

    let saved_sets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_sets")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(saved_sets, 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_tie_across_payloads_is_not_pb() {
    let pool = setup_test_db().await;

    let claim = || {
      vec![ClaimedBest::Strength {
        exercise_name: Some("Squat".to_string()),
        category: Some("squat".to_string()),
        weight_kg: Some(120.0),
        reps: Some(1),
        notes: None,
      }]
    };

    let first = save_parsed_payload(
      &pool,
      &payload(vec![track_session("2026-06-01", vec![])], claim()),
    )
    .await
    .unwrap();
    assert!(matches!(
      first.records[0],
      RecordOutcome::Saved { is_personal_best: true, .. }
    ));

    let second = save_parsed_payload(
      &pool,
      &payload(vec![track_session("2026-06-02", vec![])], claim()),
    )
    .await
    .unwrap();
    assert!(matches!(
      second.records[0],
      RecordOutcome::Saved { is_personal_best: false, .. }
    ));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_incomplete_claim_skipped_not_failed() {
    let pool = setup_test_db().await;

    let p = payload(
      vec![track_session("2026-06-01", vec![])],
      vec![ClaimedBest::Race {
        distance_m: Some(100.0),
        time_s: None,
        notes: None,
      }],
    );

    let report = save_parsed_payload(&pool, &p).await.unwrap();
    assert!(matches!(report.records[0], RecordOutcome::Skipped { .. }));
    assert!(!report.is_partial());

    let races: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM race_records")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(races, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_injury_attaches_to_first_session() {
    let pool = setup_test_db().await;

    let p = ParsedPayload {
      sessions: vec![
        track_session("2026-06-01", vec![]),
        track_session("2026-06-02", vec![]),
      ],
      personal_bests: vec![],
      injuries: vec![crate::models::ReportedInjury {
        injury_type: "pain".to_string(),
        body_part: "knee".to_string(),
        severity: "mild".to_string(),
        end_date: None,
        notes: None,
      }],
    };

    let report = save_parsed_payload(&pool, &p).await.unwrap();
    assert_eq!(report.session_ids.len(), 2);
    assert_eq!(report.injuries_saved, 1);

    let injuries = crate::store::list_injuries(&pool).await.unwrap();
    assert_eq!(injuries.len(), 1);
    assert_eq!(injuries[0].cause_session_id, Some(report.session_ids[0]));
    assert_eq!(
      injuries[0].start_date,
      NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_out_of_range_rpe_dropped() {
    let pool = setup_test_db().await;

    let mut session = track_session("2026-06-01", vec![]);
    session.session.rpe = Some(14);
    let report = save_parsed_payload(&pool, &payload(vec![session], vec![]))
      .await
      .unwrap();

    let saved = crate::store::session_detail(&pool, report.session_ids[0])
      .await
      .unwrap();
    assert_eq!(saved.session.rpe, None);

    teardown_test_db(pool).await;
  }
}
