use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Session Type
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
  Track,
  Gym,
  Road,
  Race,
  Other,
}

impl SessionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      SessionType::Track => "track",
      SessionType::Gym => "gym",
      SessionType::Road => "road",
      SessionType::Race => "race",
      SessionType::Other => "other",
    }
  }
}

impl std::fmt::Display for SessionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for SessionType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "track" | "test" => Ok(SessionType::Track),
      "gym" => Ok(SessionType::Gym),
      "road" => Ok(SessionType::Road),
      "race" => Ok(SessionType::Race),
      "other" => Ok(SessionType::Other),
      other => Err(format!("Unknown session type: {}", other)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Workout Set Category
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetCategory {
  Sprint,
  Jump,
  Lift,
  Endurance,
  Drill,
  Mobility,
  Other,
}

impl SetCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      SetCategory::Sprint => "sprint",
      SetCategory::Jump => "jump",
      SetCategory::Lift => "lift",
      SetCategory::Endurance => "endurance",
      SetCategory::Drill => "drill",
      SetCategory::Mobility => "mobility",
      SetCategory::Other => "other",
    }
  }

  /// Categories that count toward sprint training load
  pub fn is_sprint_like(&self) -> bool {
    matches!(self, SetCategory::Sprint | SetCategory::Jump)
  }
}

impl std::str::FromStr for SetCategory {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "sprint" => Ok(SetCategory::Sprint),
      "jump" => Ok(SetCategory::Jump),
      "lift" => Ok(SetCategory::Lift),
      "endurance" => Ok(SetCategory::Endurance),
      "drill" => Ok(SetCategory::Drill),
      "mobility" => Ok(SetCategory::Mobility),
      "other" => Ok(SetCategory::Other),
      other => Err(format!("Unknown set category: {}", other)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Persisted Rows
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
  pub id: i64,
  pub date: NaiveDate,
  #[sqlx(rename = "type")]
  pub session_type: String,
  pub title: Option<String>,
  pub rpe: Option<i64>,
  pub notes: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

impl Session {
  /// Parsed session type, falling back to `other` for unknown legacy values
  pub fn kind(&self) -> SessionType {
    self.session_type.parse().unwrap_or(SessionType::Other)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutGroup {
  pub id: i64,
  pub session_id: i64,
  pub name: String,
  pub order_index: i64,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutSet {
  pub id: i64,
  pub group_id: i64,
  pub session_id: i64,
  pub exercise_name: String,
  pub category: String,
  pub sets: Option<i64>,
  pub reps: Option<i64>,
  pub weight_kg: Option<f64>,
  pub distance_m: Option<f64>,
  pub time_s: Option<f64>,
  pub recovery_s: Option<i64>,
  pub notes: Option<String>,
  pub is_personal_best: bool,
}

impl WorkoutSet {
  pub fn kind(&self) -> SetCategory {
    self.category.parse().unwrap_or(SetCategory::Other)
  }
}

/// A session with every set it owns, flattened across groups. The query
/// layer produces this shape for the analytics modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWithSets {
  pub session: Session,
  pub sets: Vec<WorkoutSet>,
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
