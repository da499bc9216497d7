use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Performance Records (one table per PB category)
/// ---------------------------------------------------------------------------

/// Race result over a fixed distance. Identity key: distance in meters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RaceRecord {
  pub id: i64,
  pub session_id: Option<i64>,
  pub date: Option<NaiveDate>,
  pub distance_m: f64,
  pub time_s: f64,
  pub is_personal_best: bool,
  pub notes: Option<String>,
  pub created_at: Option<String>,
}

/// Gym lift result. Identity key: canonical exercise name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StrengthRecord {
  pub id: i64,
  pub session_id: Option<i64>,
  pub date: Option<NaiveDate>,
  pub exercise_name: String,
  pub category: Option<String>,
  pub weight_kg: f64,
  pub reps: i64,
  pub is_personal_best: bool,
  pub notes: Option<String>,
  pub created_at: Option<String>,
}

/// Training performance (timed sprint, jump distance, drill).
/// Identity key: canonical exercise name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingRecord {
  pub id: i64,
  pub session_id: Option<i64>,
  pub date: Option<NaiveDate>,
  pub exercise_name: String,
  pub exercise_type: String,
  pub performance_value: f64,
  pub performance_unit: String,
  pub is_personal_best: bool,
  pub notes: Option<String>,
  pub created_at: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Injuries
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InjuryRecord {
  pub id: i64,
  pub injury_type: String,
  pub body_part: String,
  pub start_date: NaiveDate,
  pub end_date: Option<NaiveDate>,
  pub severity: String,
  pub cause_session_id: Option<i64>,
  pub notes: Option<String>,
}

impl InjuryRecord {
  pub fn is_active(&self) -> bool {
    self.end_date.is_none()
  }
}

/// ---------------------------------------------------------------------------
/// Current-Best Snapshot
/// ---------------------------------------------------------------------------

/// Current `is_personal_best` holders across all three record tables,
/// fetched once per operation and passed down explicitly. The anomaly
/// detector and the LLM context builder both read from this instead of
/// issuing their own queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestsSnapshot {
  pub race: Vec<RaceRecord>,
  pub strength: Vec<StrengthRecord>,
  pub training: Vec<TrainingRecord>,
}

impl BestsSnapshot {
  /// Current best lift for a canonical exercise name, if any
  pub fn strength_best(&self, exercise_key: &str) -> Option<&StrengthRecord> {
    self
      .strength
      .iter()
      .find(|r| r.exercise_name.eq_ignore_ascii_case(exercise_key))
  }
}
