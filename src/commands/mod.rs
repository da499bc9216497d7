pub mod analysis;
pub mod records;
pub mod sessions;

use crate::db::AppState;
use crate::models::Session;
use crate::store;
use std::sync::Arc;
use tauri::State;

#[tauri::command]
pub async fn get_sessions(
  state: State<'_, Arc<AppState>>,
  limit: Option<i64>,
  offset: Option<i64>,
) -> Result<Vec<Session>, String> {
  store::list_sessions(&state.db, limit.unwrap_or(50), offset.unwrap_or(0))
    .await
    .map_err(|e| e.to_string())
}
