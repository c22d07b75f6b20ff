use axum::{extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::settings::{save_settings, UserSettings};
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Json<UserSettings> {
    Json(state.settings.read().await.clone())
}

/// PUT /api/v1/settings
/// Replaces the whole document. Invalid values are rejected and nothing is written.
pub async fn handle_put_settings(
    State(state): State<AppState>,
    Json(body): Json<UserSettings>,
) -> Result<Json<UserSettings>, AppError> {
    let errors = body.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join("; ")));
    }

    let mut current = state.settings.write().await;
    save_settings(&state.config.settings_path, &body).await?;
    *current = body.clone();
    info!("Settings updated");
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    #[tokio::test]
    async fn test_put_persists_and_updates_state() {
        let mut state = test_state().await;
        let dir = tempfile::tempdir().unwrap();
        state.config.settings_path = dir.path().join("settings.json");

        let body = UserSettings {
            name: "Riley".to_string(),
            match_threshold: 55.0,
            ..UserSettings::default()
        };
        handle_put_settings(State(state.clone()), Json(body.clone()))
            .await
            .unwrap();

        let Json(current) = handle_get_settings(State(state.clone())).await;
        assert_eq!(current, body);
        let on_disk = crate::settings::load_settings(&state.config.settings_path)
            .await
            .unwrap();
        assert_eq!(on_disk, body);
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let state = test_state().await;
        let body = UserSettings {
            max_jobs: 0,
            ..UserSettings::default()
        };
        let err = handle_put_settings(State(state.clone()), Json(body))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let Json(current) = handle_get_settings(State(state)).await;
        assert_eq!(current, UserSettings::default());
    }
}
