mod analysis;
mod anomaly;
mod commands;
mod context;
mod db;
mod llm;
mod load;
mod models;
mod normalize;
mod records;
mod save;
mod store;

#[cfg(test)]
mod test_utils;

use db::AppState;
use std::sync::Arc;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  tauri::Builder::default()
    .plugin(tauri_plugin_opener::init())
    .setup(|app| {
      // Initialize database
      let app_handle = app.handle().clone();
      tauri::async_runtime::block_on(async move {
        match db::initialize_db(&app_handle).await {
          Ok(pool) => {
            let state = Arc::new(AppState { db: pool });
            app_handle.manage(state);
            println!("Database ready");
          }
          Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
          }
        }
      });
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      commands::get_sessions,
      // Capture and session commands
      commands::sessions::capture_workout_text,
      commands::sessions::save_parsed_session,
      commands::sessions::get_session_detail,
      commands::sessions::get_sessions_for_month,
      commands::sessions::update_session,
      commands::sessions::update_workout_set,
      commands::sessions::update_workout_group,
      commands::sessions::delete_session,
      // Record and injury commands
      commands::records::get_personal_bests,
      commands::records::get_race_records,
      commands::records::get_strength_records,
      commands::records::get_training_records,
      commands::records::get_injuries,
      commands::records::resolve_injury,
      // Analytics commands
      commands::analysis::get_kpi_summary,
      commands::analysis::get_load_model,
      commands::analysis::get_progression,
      commands::analysis::get_sprint_indices,
      commands::analysis::get_target_bands,
      commands::analysis::get_volume_totals,
      commands::analysis::export_csv,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}
