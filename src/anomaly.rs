//! Plausibility checks for parsed performances
//!
//! Warnings are advisory: the system prefers capturing the data plus a flag
//! over silently rejecting what the athlete wrote. Nothing here ever blocks
//! a save.

use crate::models::{BestsSnapshot, ParsedSession, SetCategory};
use crate::normalize::normalize_set;
use serde::{Deserialize, Serialize};

/// Men's outdoor world records for the distances athletes log here.
/// Anything faster than these did not happen on a training track.
const WORLD_RECORDS: [(f64, f64); 4] = [(60.0, 6.34), (100.0, 9.58), (200.0, 19.19), (400.0, 43.03)];

/// A lift this far above the athlete's own PB is probably a typo
const UNUSUAL_LOAD_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
  ImpossibleTime,
  UnusualLoad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyWarning {
  #[serde(rename = "type")]
  pub kind: WarningKind,
  pub field: String,
  pub value: f64,
  pub exercise: Option<String>,
  pub message: String,
}

/// Run all plausibility rules over a parsed candidate against the athlete's
/// current bests. The snapshot comes in explicitly; this function issues no
/// queries of its own.
pub fn detect(sessions: &[ParsedSession], bests: &BestsSnapshot) -> Vec<AnomalyWarning> {
  let mut warnings = Vec::new();

  for session in sessions {
    for group in &session.groups {
      for raw in &group.sets {
        let set = normalize_set(raw);

        if let (Some(distance), Some(time)) = (set.distance_m, set.time_s) {
          if let Some(record) = world_record_for(distance) {
            if time < record {
              warnings.push(AnomalyWarning {
                kind: WarningKind::ImpossibleTime,
                field: "time_s".to_string(),
                value: time,
                exercise: Some(set.exercise_name.clone()),
                message: format!(
                  "{}m in {}s looks impossible - the world record is ~{}s. \
                   Did you mean a shorter distance or {}s?",
                  distance,
                  time,
                  record,
                  time + 10.0
                ),
              });
            }
          }
        }

        if set.category == SetCategory::Lift {
          if let Some(weight) = set.weight_kg {
            if let Some(pb) = bests.strength_best(&set.key) {
              if weight > pb.weight_kg * UNUSUAL_LOAD_FACTOR {
                let jump_pct = ((weight / pb.weight_kg - 1.0) * 100.0).round();
                warnings.push(AnomalyWarning {
                  kind: WarningKind::UnusualLoad,
                  field: "weight_kg".to_string(),
                  value: weight,
                  exercise: Some(set.exercise_name.clone()),
                  message: format!(
                    "{} {}kg is +{}% over your PB ({}kg). Double-check the number.",
                    set.exercise_name, weight, jump_pct, pb.weight_kg
                  ),
                });
              }
            }
          }
        }
      }
    }
  }

  warnings
}

fn world_record_for(distance_m: f64) -> Option<f64> {
  WORLD_RECORDS
    .iter()
    .find(|(d, _)| (d - distance_m).abs() < 0.5)
    .map(|(_, record)| *record)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
