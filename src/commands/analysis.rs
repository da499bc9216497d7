//! Tauri commands for the analytics dashboards

use crate::analysis::{
  self, DistanceProgression, KpiSummary, SprintIndices, TargetBand, VolumeTotals,
};
use crate::db::AppState;
use crate::load::{self, LoadModel};
use crate::models::{RaceRecord, Session};
use crate::store;
use chrono::Utc;
use std::sync::Arc;
use tauri::State;

/// ---------------------------------------------------------------------------
/// Dashboard Aggregates
/// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn get_kpi_summary(state: State<'_, Arc<AppState>>) -> Result<KpiSummary, String> {
  let sessions = store::list_sessions_in_range(&state.db, None, None)
    .await
    .map_err(|e| e.to_string())?;
  let bests = store::bests_snapshot(&state.db).await.map_err(|e| e.to_string())?;

  Ok(analysis::compute_kpis(&sessions, &bests))
}

/// Sprint load model over the full history. Returns the insufficient-data
/// marker below 7 distinct sprint days, never misleading numbers.
#[tauri::command]
pub async fn get_load_model(state: State<'_, Arc<AppState>>) -> Result<LoadModel, String> {
  let entries = store::sessions_with_sets_in_range(&state.db, None, None)
    .await
    .map_err(|e| e.to_string())?;

  Ok(load::compute(&entries))
}

#[tauri::command]
pub async fn get_progression(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<DistanceProgression>, String> {
  let records = store::list_race_records(&state.db).await.map_err(|e| e.to_string())?;
  Ok(analysis::compute_progression(&records, Utc::now().date_naive()))
}

#[tauri::command]
pub async fn get_sprint_indices(
  state: State<'_, Arc<AppState>>,
) -> Result<SprintIndices, String> {
  let records = store::list_race_records(&state.db).await.map_err(|e| e.to_string())?;
  Ok(analysis::compute_sprint_indices(&records))
}

#[tauri::command]
pub async fn get_target_bands(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<TargetBand>, String> {
  let records = store::list_race_records(&state.db).await.map_err(|e| e.to_string())?;
  Ok(analysis::compute_target_bands(&records, Utc::now().date_naive()))
}

#[tauri::command]
pub async fn get_volume_totals(
  state: State<'_, Arc<AppState>>,
) -> Result<VolumeTotals, String> {
  let entries = store::sessions_with_sets_in_range(&state.db, None, None)
    .await
    .map_err(|e| e.to_string())?;
  Ok(analysis::compute_volume(&entries))
}

/// ---------------------------------------------------------------------------
/// CSV Export
/// ---------------------------------------------------------------------------

/// Flat projection of sessions and race records for spreadsheet use.
#[tauri::command]
pub async fn export_csv(state: State<'_, Arc<AppState>>) -> Result<String, String> {
  let sessions = store::list_sessions_in_range(&state.db, None, None)
    .await
    .map_err(|e| e.to_string())?;
  let races = store::list_race_records(&state.db).await.map_err(|e| e.to_string())?;

  Ok(build_csv(&sessions, &races))
}

fn build_csv(sessions: &[Session], races: &[RaceRecord]) -> String {
  let mut out = String::from("kind,date,type_or_distance,title_or_time,rpe,is_personal_best,notes\n");

  for s in sessions {
    out.push_str(&format!(
      "session,{},{},{},{},,{}\n",
      s.date,
      csv_field(&s.session_type),
      csv_field(s.title.as_deref().unwrap_or("")),
      s.rpe.map(|r| r.to_string()).unwrap_or_default(),
      csv_field(s.notes.as_deref().unwrap_or(""))
    ));
  }

  for r in races {
    out.push_str(&format!(
      "race_record,{},{}m,{},,{},{}\n",
      r.date.map(|d| d.to_string()).unwrap_or_default(),
      r.distance_m,
      r.time_s,
      r.is_personal_best,
      csv_field(r.notes.as_deref().unwrap_or(""))
    ));
  }

  out
}

/// Quote a field when it contains separators or quotes.
fn csv_field(value: &str) -> String {
  if value.contains([',', '"', '\n']) {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
