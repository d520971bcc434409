use axum::{extract::State, response::Html, Json};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::resume::Resume;
use crate::state::AppState;

#[derive(Serialize)]
pub struct LocalesResponse {
    pub locales: Vec<String>,
    pub default_locale: String,
}

/// POST /api/v1/render
/// Body: a JSON Resume document. Returns the rendered, minified HTML page.
pub async fn handle_render(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Html<String>, AppError> {
    if !body.is_object() {
        return Err(AppError::Validation(
            "Request body must be a JSON Resume object".to_string(),
        ));
    }
    let resume: Resume = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid resume document: {e}")))?;

    let html = state.renderer.render(resume).await?;
    Ok(Html(html))
}

/// GET /api/v1/locales
pub async fn handle_locales(State(state): State<AppState>) -> Json<LocalesResponse> {
    Json(LocalesResponse {
        locales: state.catalog.locales().map(str::to_string).collect(),
        default_locale: state.config.default_locale.clone(),
    })
}
