//! Parsed session candidate - the structured document the external LLM
//! extraction step produces from free text. Everything is stringly/optional
//! here on purpose: validation happens in the save pipeline, not at the
//! deserialization boundary.

use serde::{Deserialize, Serialize};

/// Full extraction payload: one or more day sessions plus claimed PBs and
/// reported injuries for the whole text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPayload {
  #[serde(default)]
  pub sessions: Vec<ParsedSession>,

  #[serde(default, alias = "personalBests")]
  pub personal_bests: Vec<ClaimedBest>,

  #[serde(default)]
  pub injuries: Vec<ReportedInjury>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSession {
  pub session: ParsedSessionMeta,
  #[serde(default)]
  pub groups: Vec<ParsedGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSessionMeta {
  /// YYYY-MM-DD, validated before any write
  pub date: String,
  #[serde(rename = "type")]
  pub session_type: String,
  pub title: Option<String>,
  pub rpe: Option<i64>,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedGroup {
  pub name: String,
  #[serde(default)]
  pub order_index: i64,
  #[serde(default)]
  pub sets: Vec<ParsedSet>,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSet {
  pub exercise_name: Option<String>,
  pub category: Option<String>,
  pub sets: Option<i64>,
  pub reps: Option<i64>,
  pub weight_kg: Option<f64>,
  pub distance_m: Option<f64>,
  pub time_s: Option<f64>,
  pub recovery_s: Option<i64>,
  pub notes: Option<String>,
}

/// A personal best the extraction step claims was set in this text.
/// The PB ledger decides whether the claim survives against history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaimedBest {
  Race {
    distance_m: Option<f64>,
    time_s: Option<f64>,
    notes: Option<String>,
  },
  Strength {
    exercise_name: Option<String>,
    category: Option<String>,
    weight_kg: Option<f64>,
    reps: Option<i64>,
    notes: Option<String>,
  },
  Training {
    exercise_name: Option<String>,
    exercise_type: Option<String>,
    performance_value: Option<f64>,
    performance_unit: Option<String>,
    notes: Option<String>,
  },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedInjury {
  pub injury_type: String,
  pub body_part: String,
  #[serde(default = "default_severity")]
  pub severity: String,
  pub end_date: Option<String>,
  pub notes: Option<String>,
}

fn default_severity() -> String {
  "mild".to_string()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
