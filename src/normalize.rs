//! Normalization layer for raw performance data
//!
//! Everything downstream (PB ledger, load model, progression) compares
//! values under consistent keys and scales: meters, seconds, kilograms,
//! lowercase exercise keys. All functions here are pure and idempotent.

use crate::models::{ParsedSet, SetCategory};
use serde::{Deserialize, Serialize};

const LB_TO_KG: f64 = 0.453_592_37;

/// ---------------------------------------------------------------------------
/// Exercise Name Canonicalization
/// ---------------------------------------------------------------------------

/// Canonical lookup key for an exercise: lowercase, trimmed, parenthetical
/// annotations removed, internal whitespace collapsed.
///
/// "Squat (bilanciere)" and "  squat " both map to "squat".
pub fn canonical_exercise_name(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut depth = 0usize;

  for c in raw.chars() {
    match c {
      '(' => depth += 1,
      ')' => depth = depth.saturating_sub(1),
      _ if depth == 0 => out.extend(c.to_lowercase()),
      _ => {}
    }
  }

  out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ---------------------------------------------------------------------------
/// Numeric Sanitization
/// ---------------------------------------------------------------------------

/// Non-finite or negative numbers are treated as absent, never as zero:
/// a missing value must never silently become a comparison-losing zero.
pub fn sanitize_metric(value: Option<f64>) -> Option<f64> {
  value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Same rule for integer counts (sets, reps, recovery seconds)
pub fn sanitize_count(value: Option<i64>) -> Option<i64> {
  value.filter(|v| *v > 0)
}

/// ---------------------------------------------------------------------------
/// Unit Conversions
/// ---------------------------------------------------------------------------

/// Convert a distance to meters. Unknown units are treated as meters.
pub fn distance_to_meters(value: f64, unit: &str) -> Option<f64> {
  let meters = match unit.trim().to_lowercase().as_str() {
    "km" | "kilometers" | "kilometres" => value * 1000.0,
    _ => value,
  };
  sanitize_metric(Some(meters))
}

/// Convert a weight to kilograms. Unknown units are treated as kilograms.
pub fn weight_to_kg(value: f64, unit: &str) -> Option<f64> {
  let kg = match unit.trim().to_lowercase().as_str() {
    "lb" | "lbs" | "pounds" => value * LB_TO_KG,
    _ => value,
  };
  sanitize_metric(Some(kg))
}

/// Parse a clock-style time into seconds.
///
/// Accepts plain seconds ("12.55"), minute:second ("1:20", "1:20.5") and
/// the apostrophe form athletes write ("1'20").
pub fn time_to_seconds(raw: &str) -> Option<f64> {
  let cleaned = raw.trim().trim_end_matches(['s', '"']);
  if cleaned.is_empty() {
    return None;
  }

  let parts: Vec<&str> = cleaned.split([':', '\'']).collect();
  let seconds = match parts.as_slice() {
    [secs] => secs.parse::<f64>().ok()?,
    [mins, secs] => {
      let m = mins.parse::<f64>().ok()?;
      let s = if secs.is_empty() { 0.0 } else { secs.parse::<f64>().ok()? };
      m * 60.0 + s
    }
    _ => return None,
  };

  sanitize_metric(Some(seconds))
}

/// Parse a distance with an optional unit suffix: "60", "60m", "2.5km".
pub fn parse_distance(raw: &str) -> Option<f64> {
  let (value, unit) = split_value_unit(raw)?;
  distance_to_meters(value, unit)
}

/// Parse a weight with an optional unit suffix: "120", "120kg", "225lb".
pub fn parse_weight(raw: &str) -> Option<f64> {
  let (value, unit) = split_value_unit(raw)?;
  weight_to_kg(value, unit)
}

fn split_value_unit(raw: &str) -> Option<(f64, &str)> {
  let trimmed = raw.trim();
  let split_at = trimmed
    .find(|c: char| c.is_alphabetic())
    .unwrap_or(trimmed.len());
  let (number, unit) = trimmed.split_at(split_at);
  let value = number.trim().parse::<f64>().ok()?;
  Some((value, unit))
}

/// ---------------------------------------------------------------------------
/// Normalized Performance
/// ---------------------------------------------------------------------------

/// A workout set after unit/name normalization; the only shape the engine
/// modules accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSet {
  /// Display name, trimmed (falls back to "exercise" when missing)
  pub exercise_name: String,
  /// Canonical lookup key, see [`canonical_exercise_name`]
  pub key: String,
  pub category: SetCategory,
  pub sets: Option<i64>,
  pub reps: Option<i64>,
  pub weight_kg: Option<f64>,
  pub distance_m: Option<f64>,
  pub time_s: Option<f64>,
  pub recovery_s: Option<i64>,
  pub notes: Option<String>,
}

/// Normalize one parsed set. Pure; `normalize_set` applied to its own
/// output (re-wrapped) yields the same value.
pub fn normalize_set(raw: &ParsedSet) -> NormalizedSet {
  let display = raw
    .exercise_name
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .unwrap_or("exercise")
    .to_string();

  let category = raw
    .category
    .as_deref()
    .and_then(|c| c.parse::<SetCategory>().ok())
    .unwrap_or(SetCategory::Other);

  NormalizedSet {
    key: canonical_exercise_name(&display),
    exercise_name: display,
    category,
    sets: sanitize_count(raw.sets),
    reps: sanitize_count(raw.reps),
    weight_kg: sanitize_metric(raw.weight_kg),
    distance_m: sanitize_metric(raw.distance_m),
    time_s: sanitize_metric(raw.time_s),
    recovery_s: sanitize_count(raw.recovery_s),
    notes: raw.notes.clone(),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_canonical_name_strips_parentheticals() {
    assert_eq!(canonical_exercise_name("Squat (bilanciere)"), "squat");
    assert_eq!(canonical_exercise_name("  Panca   Piana "), "panca piana");
    assert_eq!(canonical_exercise_name("60m Sprint"), "60m sprint");
  }

  #[test]
  fn test_canonical_name_idempotent() {
    let once = canonical_exercise_name("Power Clean (from blocks)");
    assert_eq!(canonical_exercise_name(&once), once);
  }

  #[test]
  fn test_sanitize_rejects_negative_and_non_finite() {
    assert_eq!(sanitize_metric(Some(-3.0)), None);
    assert_eq!(sanitize_metric(Some(f64::NAN)), None);
    assert_eq!(sanitize_metric(Some(f64::INFINITY)), None);
    assert_eq!(sanitize_metric(Some(0.0)), Some(0.0));
    assert_eq!(sanitize_metric(Some(12.55)), Some(12.55));
    assert_eq!(sanitize_metric(None), None);
  }

  #[test]
  fn test_distance_conversion() {
    assert_eq!(distance_to_meters(2.5, "km"), Some(2500.0));
    assert_eq!(distance_to_meters(60.0, "m"), Some(60.0));
  }

  #[test]
  fn test_weight_conversion() {
    let kg = weight_to_kg(225.0, "lb").unwrap();
    assert!((kg - 102.058).abs() < 0.01);
    assert_eq!(weight_to_kg(100.0, "kg"), Some(100.0));
  }

  #[test]
  fn test_parse_with_unit_suffix() {
    assert_eq!(parse_distance("2.5km"), Some(2500.0));
    assert_eq!(parse_distance("60m"), Some(60.0));
    assert_eq!(parse_distance("60"), Some(60.0));
    assert_eq!(parse_distance("km"), None);

    assert_eq!(parse_weight("120kg"), Some(120.0));
    assert_eq!(parse_weight("120"), Some(120.0));
    let lb = parse_weight("225lb").unwrap();
    assert!((lb - 102.058).abs() < 0.01);
  }

  #[test]
  fn test_time_parsing() {
    assert_eq!(time_to_seconds("12.55"), Some(12.55));
    assert_eq!(time_to_seconds("1:20"), Some(80.0));
    assert_eq!(time_to_seconds("1'20"), Some(80.0));
    assert_eq!(time_to_seconds("1:20.5"), Some(80.5));
    assert_eq!(time_to_seconds("80s"), Some(80.0));
    assert_eq!(time_to_seconds("garbage"), None);
  }

  #[test]
  fn test_normalize_set_is_idempotent() {
    let raw = ParsedSet {
      exercise_name: Some("  Squat (pause)  ".to_string()),
      category: Some("lift".to_string()),
      sets: Some(5),
      reps: Some(3),
      weight_kg: Some(120.0),
      distance_m: Some(-1.0),
      time_s: None,
      recovery_s: Some(180),
      notes: None,
    };

    let once = normalize_set(&raw);
    // Re-wrap the normalized output as a parsed set and normalize again
    let rewrapped = ParsedSet {
      exercise_name: Some(once.exercise_name.clone()),
      category: Some(once.category.as_str().to_string()),
      sets: once.sets,
      reps: once.reps,
      weight_kg: once.weight_kg,
      distance_m: once.distance_m,
      time_s: once.time_s,
      recovery_s: once.recovery_s,
      notes: once.notes.clone(),
    };
    let twice = normalize_set(&rewrapped);

    assert_eq!(once.key, twice.key);
    assert_eq!(once.weight_kg, twice.weight_kg);
    assert_eq!(once.distance_m, twice.distance_m);
    assert_eq!(once.sets, twice.sets);
    // Negative distance became absent, not zero
    assert_eq!(once.distance_m, None);
  }

  #[test]
  fn test_normalize_missing_name_falls_back() {
    let raw = ParsedSet {
      exercise_name: None,
      category: None,
      sets: None,
      reps: None,
      weight_kg: None,
      distance_m: None,
      time_s: None,
      recovery_s: None,
      notes: None,
    };
    let norm = normalize_set(&raw);
    assert_eq!(norm.exercise_name, "exercise");
    assert_eq!(norm.category, SetCategory::Other);
  }
}
