// HTTP request handlers
use crate::application::series_cache::CacheStats;
use crate::domain::error::AnnotationError;
use crate::domain::region::{NewRegion, Region};
use crate::domain::rules::{ColorRule, RuleInput};
use crate::domain::selection::TimeSelection;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AnnotationError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnnotationError::InvalidGeometry(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnnotationError::RegionNotFound(_) | AnnotationError::RuleNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AnnotationError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Deserialize)]
pub struct ColorUpdate {
    pub color: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_regions(State(state): State<AppState>) -> Json<Vec<Region>> {
    Json(state.annotation_service.regions())
}

pub async fn get_region(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Region>, AnnotationError> {
    state
        .annotation_service
        .region(&id)
        .map(Json)
        .ok_or(AnnotationError::RegionNotFound(id))
}

/// Draw-complete event
pub async fn create_region(
    State(state): State<AppState>,
    Json(input): Json<NewRegion>,
) -> Result<(StatusCode, Json<Region>), AnnotationError> {
    let region = state.annotation_service.add_region(input)?;
    state.trigger_refresh();
    Ok((StatusCode::CREATED, Json(region)))
}

/// Draw-delete event
pub async fn delete_region(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AnnotationError> {
    state.annotation_service.remove_region(&id)?;
    state.trigger_refresh();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_regions(State(state): State<AppState>) -> StatusCode {
    state.annotation_service.clear_regions();
    state.trigger_refresh();
    StatusCode::NO_CONTENT
}

pub async fn get_selection(State(state): State<AppState>) -> Json<TimeSelection> {
    Json(state.annotation_service.selection())
}

pub async fn put_selection(
    State(state): State<AppState>,
    Json(selection): Json<TimeSelection>,
) -> Json<TimeSelection> {
    state.annotation_service.set_selection(selection.clone());
    state.trigger_refresh();
    Json(selection)
}

pub async fn get_rules(State(state): State<AppState>) -> Json<Vec<ColorRule>> {
    Json(state.annotation_service.rules())
}

/// Replace the rule set; comparison-shaped rules are stored as buckets
pub async fn put_rules(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<RuleInput>>,
) -> Json<Vec<ColorRule>> {
    let rules: Vec<ColorRule> = inputs.into_iter().map(ColorRule::from).collect();
    state.annotation_service.set_rules(rules.clone());
    state.trigger_refresh();
    Json(rules)
}

pub async fn patch_rule(
    Path(index): Path<usize>,
    State(state): State<AppState>,
    Json(update): Json<ColorUpdate>,
) -> Result<StatusCode, AnnotationError> {
    state.annotation_service.set_rule_color(index, update.color)?;
    state.trigger_refresh();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.annotation_service.cache_stats())
}
