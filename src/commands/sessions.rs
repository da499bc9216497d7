//! Tauri commands for capturing and browsing sessions

use crate::context;
use crate::db::AppState;
use crate::llm::{ExtractionClient, Usage};
use crate::models::{ParsedPayload, Session, SetCategory};
use crate::normalize::{parse_distance, parse_weight, time_to_seconds};
use crate::save::{self, SaveError, SaveReport};
use crate::store::{self, SessionDetail, SessionPatch, SetPatch};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tauri::State;

/// ---------------------------------------------------------------------------
/// Capture: free text -> parse -> save
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CaptureResult {
  pub report: SaveReport,
  pub payload: ParsedPayload,
  pub input_tokens: u32,
  pub output_tokens: u32,
}

/// Parse free workout text with the LLM and persist the result.
#[tauri::command]
pub async fn capture_workout_text(
  state: State<'_, Arc<AppState>>,
  text: String,
) -> Result<CaptureResult, String> {
  let client = ExtractionClient::from_env().map_err(|e| e.to_string())?;

  let athlete_context = context::gather(&state.db)
    .await
    .map_err(|e| e.to_string())?
    .format_for_prompt();

  let today = Utc::now().date_naive().to_string();
  let (payload, usage): (ParsedPayload, Usage) = client
    .parse_workout_text(&text, &athlete_context, &today)
    .await
    .map_err(|e| e.to_string())?;

  println!(
    "[capture] Parsed {} session(s), {} PB claim(s), {} injury report(s)",
    payload.sessions.len(),
    payload.personal_bests.len(),
    payload.injuries.len()
  );

  let report = save::save_parsed_payload(&state.db, &payload)
    .await
    .map_err(|e| e.to_string())?;

  Ok(CaptureResult {
    report,
    payload,
    input_tokens: usage.input_tokens,
    output_tokens: usage.output_tokens,
  })
}

/// Persist an already-parsed payload (re-submit after manual edits).
#[tauri::command]
pub async fn save_parsed_session(
  state: State<'_, Arc<AppState>>,
  payload: ParsedPayload,
) -> Result<SaveReport, SaveError> {
  save::save_parsed_payload(&state.db, &payload).await
}

/// ---------------------------------------------------------------------------
/// Browsing & Editing
/// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn get_session_detail(
  state: State<'_, Arc<AppState>>,
  session_id: i64,
) -> Result<SessionDetail, String> {
  store::session_detail(&state.db, session_id)
    .await
    .map_err(|e| e.to_string())
}

/// Sessions of one calendar month, grouped by date (calendar view).
#[tauri::command]
pub async fn get_sessions_for_month(
  state: State<'_, Arc<AppState>>,
  year: i32,
  month: u32,
) -> Result<BTreeMap<String, Vec<Session>>, String> {
  let start = NaiveDate::from_ymd_opt(year, month, 1)
    .ok_or_else(|| format!("Invalid month: {}-{}", year, month))?;
  let end = start
    .checked_add_months(chrono::Months::new(1))
    .and_then(|d| d.pred_opt())
    .ok_or_else(|| format!("Invalid month: {}-{}", year, month))?;

  let sessions = store::list_sessions_in_range(&state.db, Some(start), Some(end))
    .await
    .map_err(|e| e.to_string())?;

  let mut by_date: BTreeMap<String, Vec<Session>> = BTreeMap::new();
  for session in sessions {
    by_date.entry(session.date.to_string()).or_default().push(session);
  }
  Ok(by_date)
}

#[tauri::command]
pub async fn update_session(
  state: State<'_, Arc<AppState>>,
  session_id: i64,
  patch: SessionPatch,
) -> Result<Session, String> {
  store::update_session_meta(&state.db, session_id, &patch)
    .await
    .map_err(|e| e.to_string())
}

/// Edit one workout set. Measures arrive as the strings the athlete typed
/// ("1:20", "2.5km", "225lb") and go through the normalization layer before
/// they touch the row.
#[tauri::command]
#[allow(clippy::too_many_arguments)]
pub async fn update_workout_set(
  state: State<'_, Arc<AppState>>,
  set_id: i64,
  exercise_name: Option<String>,
  category: Option<String>,
  sets: Option<i64>,
  reps: Option<i64>,
  weight: Option<String>,
  distance: Option<String>,
  time: Option<String>,
  recovery_s: Option<i64>,
  notes: Option<String>,
) -> Result<crate::models::WorkoutSet, String> {
  let category = match category {
    Some(raw) => Some(raw.parse::<SetCategory>()?),
    None => None,
  };
  let weight_kg = match weight {
    Some(raw) => Some(parse_weight(&raw).ok_or_else(|| format!("Invalid weight: {}", raw))?),
    None => None,
  };
  let distance_m = match distance {
    Some(raw) => Some(parse_distance(&raw).ok_or_else(|| format!("Invalid distance: {}", raw))?),
    None => None,
  };
  let time_s = match time {
    Some(raw) => Some(time_to_seconds(&raw).ok_or_else(|| format!("Invalid time: {}", raw))?),
    None => None,
  };

  let patch = SetPatch {
    exercise_name,
    category,
    sets,
    reps,
    weight_kg,
    distance_m,
    time_s,
    recovery_s,
    notes,
  };

  store::update_workout_set(&state.db, set_id, &patch)
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn update_workout_group(
  state: State<'_, Arc<AppState>>,
  group_id: i64,
  name: Option<String>,
  order_index: Option<i64>,
  notes: Option<String>,
) -> Result<crate::models::WorkoutGroup, String> {
  store::update_workout_group(&state.db, group_id, name, order_index, notes)
    .await
    .map_err(|e| e.to_string())
}

/// Delete a session; cascades to groups, sets and derived records.
#[tauri::command]
pub async fn delete_session(
  state: State<'_, Arc<AppState>>,
  session_id: i64,
) -> Result<(), String> {
  store::delete_session(&state.db, session_id)
    .await
    .map_err(|e| e.to_string())
}
