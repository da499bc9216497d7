//! Tauri commands for personal bests and injuries

use crate::db::AppState;
use crate::models::{BestsSnapshot, InjuryRecord, RaceRecord, StrengthRecord, TrainingRecord};
use crate::store;
use chrono::NaiveDate;
use std::sync::Arc;
use tauri::State;

/// Current PB holders across all three categories.
#[tauri::command]
pub async fn get_personal_bests(
  state: State<'_, Arc<AppState>>,
) -> Result<BestsSnapshot, String> {
  store::bests_snapshot(&state.db).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_race_records(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<RaceRecord>, String> {
  store::list_race_records(&state.db).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_strength_records(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<StrengthRecord>, String> {
  store::list_strength_records(&state.db).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_training_records(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<TrainingRecord>, String> {
  store::list_training_records(&state.db).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_injuries(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<InjuryRecord>, String> {
  store::list_injuries(&state.db).await.map_err(|e| e.to_string())
}

/// Mark an injury as resolved on the given date (YYYY-MM-DD).
#[tauri::command]
pub async fn resolve_injury(
  state: State<'_, Arc<AppState>>,
  injury_id: i64,
  end_date: String,
) -> Result<(), String> {
  let date = NaiveDate::parse_from_str(end_date.trim(), "%Y-%m-%d")
    .map_err(|_| format!("Invalid end date: {}", end_date))?;
  store::resolve_injury(&state.db, injury_id, date)
    .await
    .map_err(|e| e.to_string())
}
