//! Athlete context for the extraction prompt
//!
//! Gathers what the parser needs to interpret ambiguous text: current PBs,
//! recent session titles, active injuries and the athlete's habitual warmup
//! exercises. Formatted as a plain-text block prepended to the user prompt.

use crate::models::{BestsSnapshot, InjuryRecord};
use crate::store::{self, SessionDetail, StoreError};
use sqlx::SqlitePool;
use std::collections::HashMap;

const RECENT_SESSIONS: i64 = 10;
const TITLE_LINES: usize = 5;
const TOP_BESTS: usize = 5;
const TOP_WARMUP: usize = 3;

#[derive(Debug, Clone)]
pub struct AthleteContext {
  pub bests: BestsSnapshot,
  /// (date, title-or-type) of the most recent sessions, newest first
  pub recent_sessions: Vec<(String, String)>,
  pub active_injuries: Vec<InjuryRecord>,
  /// Most frequent exercises inside warmup-named groups
  pub common_warmup: Vec<String>,
}

/// Fetch everything in one pass over recent history.
pub async fn gather(pool: &SqlitePool) -> Result<AthleteContext, StoreError> {
  let bests = store::bests_snapshot(pool).await?;
  let recent = store::recent_sessions_detailed(pool, RECENT_SESSIONS).await?;
  let active_injuries = store::active_injuries(pool).await?;

  let recent_sessions = recent
    .iter()
    .take(TITLE_LINES)
    .map(|d| {
      let label = d
        .session
        .title
        .clone()
        .unwrap_or_else(|| d.session.session_type.clone());
      (d.session.date.to_string(), label)
    })
    .collect();

  Ok(AthleteContext {
    bests,
    recent_sessions,
    active_injuries,
    common_warmup: warmup_pattern(&recent),
  })
}

/// Most frequent exercise names inside groups named like a warmup.
fn warmup_pattern(sessions: &[SessionDetail]) -> Vec<String> {
  let mut frequency: HashMap<String, usize> = HashMap::new();

  for session in sessions {
    for group in &session.groups {
      if !group.group.name.to_lowercase().contains("warm") {
        continue;
      }
      for set in &group.sets {
        let name = set.exercise_name.to_lowercase();
        if !name.is_empty() {
          *frequency.entry(name).or_insert(0) += 1;
        }
      }
    }
  }

  let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
  ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  ranked.into_iter().take(TOP_WARMUP).map(|(name, _)| name).collect()
}

impl AthleteContext {
  /// Render the context block the extraction prompt consumes.
  pub fn format_for_prompt(&self) -> String {
    let mut lines = Vec::new();

    lines.push("=== ATHLETE CONTEXT (use this to interpret ambiguous data) ===".to_string());
    lines.push(String::new());

    if !self.bests.race.is_empty() {
      lines.push("CURRENT SPRINT PBs:".to_string());
      for pb in self.bests.race.iter().take(TOP_BESTS) {
        let date = pb.date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string());
        lines.push(format!("  - {}m: {}s (set on {})", pb.distance_m, pb.time_s, date));
      }
      lines.push(String::new());
    }

    if !self.bests.strength.is_empty() {
      lines.push("CURRENT STRENGTH PBs:".to_string());
      for pb in self.bests.strength.iter().take(TOP_BESTS) {
        let reps_info = if pb.reps > 1 {
          format!(" x{} reps", pb.reps)
        } else {
          String::new()
        };
        lines.push(format!("  - {}: {}kg{}", pb.exercise_name, pb.weight_kg, reps_info));
      }
      lines.push(String::new());
    }

    if !self.recent_sessions.is_empty() {
      lines.push(format!("RECENT SESSIONS (last {}):", self.recent_sessions.len()));
      for (date, label) in &self.recent_sessions {
        lines.push(format!("  - {}: {}", date, label));
      }
      lines.push(String::new());
    }

    if !self.active_injuries.is_empty() {
      lines.push("ACTIVE INJURIES (consider when interpreting high loads):".to_string());
      for injury in &self.active_injuries {
        lines.push(format!(
          "  - {}: {} ({}, since {})",
          injury.body_part, injury.injury_type, injury.severity, injury.start_date
        ));
      }
      lines.push(String::new());
    }

    if !self.common_warmup.is_empty() {
      lines.push("STANDARD WARMUP (if the text says \"usual warmup\"):".to_string());
      for exercise in &self.common_warmup {
        lines.push(format!("  - {}", exercise));
      }
      lines.push(String::new());
    }

    lines.push("=== END CONTEXT ===".to_string());
    lines.join("\n")
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
