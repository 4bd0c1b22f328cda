//! HTTP request handlers
//!
//! REST endpoints for session lifecycle control. Handlers stay thin:
//! parse, delegate to the orchestrator, map errors to status codes.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::session::commands::{SessionSnapshot, SetOverrides};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Preselected template reference; omit to list and select instead
    pub template_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectTemplateRequest {
    pub template_ref: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateInfo>,
}

#[derive(Debug, Serialize)]
pub struct TemplateInfo {
    pub template_ref: String,
    pub title: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteSetRequest {
    /// Omit to record the cursor's current set; give a slot index to
    /// backfill that slot instead
    pub slot_index: Option<usize>,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f32>,
    /// "warmup" | "normal" | "drop" | "failure"
    pub set_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetAddressRequest {
    pub slot_index: usize,
    pub set_number: u32,
}

#[derive(Debug, Deserialize)]
pub struct EditSetRequest {
    pub slot_index: usize,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f32>,
    pub set_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub slot_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct AddExerciseRequest {
    pub exercise_ref: String,
    pub planned_sets: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SubstituteExerciseRequest {
    pub slot_index: usize,
    pub exercise_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveExerciseRequest {
    pub slot_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct MoveExerciseRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteWorkoutRequest {
    /// Complete even if no sets were recorded
    #[serde(default)]
    pub force: bool,
}

// ============================================================================
// Error mapping
// ============================================================================

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::NotFound(_) | Error::TemplateNotFound(_) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) | Error::Reference(_) => StatusCode::BAD_REQUEST,
        Error::Resolution(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn parse_overrides(
    reps: Option<u32>,
    weight_kg: Option<f64>,
    rpe: Option<f32>,
    set_type: Option<String>,
) -> Result<SetOverrides, ApiError> {
    let set_type = set_type
        .map(|s| {
            setlog_common::record::SetType::from_str(&s)
                .map_err(|e| error_response(Error::BadRequest(e)))
        })
        .transpose()?;
    Ok(SetOverrides {
        reps,
        weight_kg,
        rpe,
        set_type,
    })
}

// ============================================================================
// Health and status
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "setlog-core".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        phase: ctx.orchestrator.phase_name().await.to_string(),
        detail: ctx.orchestrator.phase_detail().await,
    })
}

// ============================================================================
// Setup
// ============================================================================

pub async fn start_session(
    State(ctx): State<AppContext>,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .start_session(req.template_ref.as_deref())
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn available_templates(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<TemplateListResponse>> {
    let templates = ctx
        .orchestrator
        .available_templates()
        .await
        .map_err(error_response)?
        .into_iter()
        .map(|t| TemplateInfo {
            template_ref: t.reference.to_string(),
            title: t.title,
        })
        .collect();
    Ok(Json(TemplateListResponse { templates }))
}

pub async fn select_template(
    State(ctx): State<AppContext>,
    Json(req): Json<SelectTemplateRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .select_template(&req.template_ref)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn retry_setup(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.retry_setup().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn confirm_setup(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.confirm_setup().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn begin_session(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.begin_session().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Set recording
// ============================================================================

pub async fn complete_set(
    State(ctx): State<AppContext>,
    Json(req): Json<CompleteSetRequest>,
) -> ApiResult<StatusCode> {
    let overrides = parse_overrides(req.reps, req.weight_kg, req.rpe, req.set_type)?;
    ctx.orchestrator
        .complete_set(req.slot_index, overrides)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn uncomplete_set(
    State(ctx): State<AppContext>,
    Json(req): Json<SetAddressRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .uncomplete_set(req.slot_index, req.set_number)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn edit_set(
    State(ctx): State<AppContext>,
    Json(req): Json<EditSetRequest>,
) -> ApiResult<StatusCode> {
    let overrides = parse_overrides(req.reps, req.weight_kg, req.rpe, req.set_type)?;
    ctx.orchestrator
        .edit_set(req.slot_index, req.set_number, overrides)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn add_extra_set(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.add_extra_set().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Rest and navigation
// ============================================================================

pub async fn skip_rest(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.skip_rest().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn next_exercise(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.next_exercise().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn previous_exercise(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .previous_exercise()
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn jump_to_exercise(
    State(ctx): State<AppContext>,
    Json(req): Json<JumpRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .jump_to_exercise(req.slot_index)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Exercise list edits
// ============================================================================

pub async fn add_exercise(
    State(ctx): State<AppContext>,
    Json(req): Json<AddExerciseRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .add_exercise(&req.exercise_ref, req.planned_sets)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn substitute_exercise(
    State(ctx): State<AppContext>,
    Json(req): Json<SubstituteExerciseRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .substitute_exercise(req.slot_index, &req.exercise_ref)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn remove_exercise(
    State(ctx): State<AppContext>,
    Json(req): Json<RemoveExerciseRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .remove_exercise(req.slot_index)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn move_exercise(
    State(ctx): State<AppContext>,
    Json(req): Json<MoveExerciseRequest>,
) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .move_exercise(req.from, req.to)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Lifecycle
// ============================================================================

pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.pause().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn resume(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.resume().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn complete_workout(
    State(ctx): State<AppContext>,
    body: Option<Json<CompleteWorkoutRequest>>,
) -> ApiResult<StatusCode> {
    let force = body.map(|Json(req)| req.force).unwrap_or(false);
    ctx.orchestrator
        .complete_workout(force)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn cancel(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.cancel().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn retry_publish(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator.retry_publish().await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

pub async fn dismiss_publish_error(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.orchestrator
        .dismiss_publish_error()
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Reads
// ============================================================================

pub async fn snapshot(State(ctx): State<AppContext>) -> ApiResult<Json<SessionSnapshot>> {
    let snap = ctx.orchestrator.snapshot().await.map_err(error_response)?;
    Ok(Json(snap))
}

/// List the configured user's templates straight from the resolver,
/// independent of any setup in progress
pub async fn list_templates(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<TemplateListResponse>> {
    let templates = ctx
        .resolver
        .list_by_author(&ctx.user_identity)
        .await
        .map_err(error_response)?
        .into_iter()
        .map(|t| TemplateInfo {
            template_ref: t.reference.to_string(),
            title: t.title,
        })
        .collect();
    Ok(Json(TemplateListResponse { templates }))
}
