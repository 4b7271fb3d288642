pub mod commands;
pub mod error;
pub mod research;
pub mod state;
pub mod types;

use std::sync::Arc;

use state::AppState;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .setup(|app| {
            let state = Arc::new(AppState::new());
            log::info!("Research webhook endpoint: {}", state.webhook.endpoint());
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::submit_research,
            commands::get_session,
            commands::clear_results,
            commands::set_active_view,
            commands::get_submission_history,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
