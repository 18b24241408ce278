//! HTTP request handlers

use super::types::{
    CheckRequest, ConfirmRequest, DeleteResponse, DraftResponse, ErrorResponse, ExportResponse,
    LabResponse, MessageRequest, NotesRequest, OptionRequest, ParamRequest, ParamSchema,
    ParamSchemaResponse, PresetListResponse, PresetRequest, VariantResponse,
};
use super::AppState;
use crate::guide::{export_draft, TransitionError};
use crate::lab::{self, LabError, ParamKey, SavedPreset, Variant, VariantParams, JUDGMENT_CHECKS};
use crate::runtime::{GuideSnapshot, SessionEntry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Guide sessions
        .route("/api/guide/sessions", post(create_session))
        .route("/api/guide/sessions/:id", get(get_session))
        .route("/api/guide/sessions/:id/message", post(send_message))
        .route("/api/guide/sessions/:id/option", post(pick_option))
        .route("/api/guide/sessions/:id/multi/toggle", post(toggle_option))
        .route("/api/guide/sessions/:id/multi/confirm", post(confirm_selection))
        .route("/api/guide/sessions/:id/back", post(go_back))
        .route("/api/guide/sessions/:id/reset", post(reset_session))
        .route("/api/guide/sessions/:id/delete", post(delete_session))
        // Draft
        .route("/api/guide/sessions/:id/draft", get(get_draft))
        .route("/api/guide/sessions/:id/export", post(export_session_draft))
        // Comparison lab
        .route("/api/lab/:id", get(get_lab))
        .route("/api/lab/:id/open", post(open_lab))
        .route("/api/lab/:id/close", post(close_lab))
        .route("/api/lab/:id/run", post(run_lab))
        .route("/api/lab/:id/variants", post(add_variant))
        .route("/api/lab/:id/variants/:vid/params", post(update_param))
        .route("/api/lab/:id/variants/:vid/checks", post(toggle_check))
        .route("/api/lab/:id/variants/:vid/notes", post(set_notes))
        .route("/api/lab/:id/variants/:vid/presets/save", post(save_preset))
        .route("/api/lab/:id/variants/:vid/presets/apply", post(apply_preset))
        .route("/api/params", get(param_schema))
        // Presets
        .route("/api/presets", get(list_presets))
        .route("/api/presets/:name/delete", post(delete_preset))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn session(state: &AppState, id: &str) -> Result<Arc<SessionEntry>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

/// Finish a guide command: an open lab runs once the session turns ready
async fn settled(entry: &SessionEntry, snapshot: GuideSnapshot) -> Json<GuideSnapshot> {
    if let Some(run) = entry.sync_lab().await {
        tracing::info!(
            session_id = %snapshot.session_id,
            updated = run.updated.len(),
            failed = run.failed.len(),
            "Open lab ran on ready session"
        );
    }
    Json(snapshot)
}

// ============================================================
// Guide
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<GuideSnapshot> {
    let entry = state.sessions.create().await;
    Json(entry.guide.snapshot())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    Ok(Json(entry.guide.snapshot()))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    let snapshot = entry.guide.submit_text(req.text).await?;
    Ok(settled(&entry, snapshot).await)
}

async fn pick_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OptionRequest>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    let snapshot = entry.guide.submit_option(req.turn_id, req.option_id).await?;
    Ok(settled(&entry, snapshot).await)
}

async fn toggle_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OptionRequest>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    let snapshot = entry.guide.toggle_option(req.turn_id, req.option_id).await?;
    Ok(settled(&entry, snapshot).await)
}

async fn confirm_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    let snapshot = entry.guide.confirm_selection(req.turn_id).await?;
    Ok(settled(&entry, snapshot).await)
}

async fn go_back(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    let snapshot = entry.guide.go_back().await?;
    Ok(settled(&entry, snapshot).await)
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GuideSnapshot>, AppError> {
    let entry = session(&state, &id).await?;
    let snapshot = entry.guide.reset().await?;
    Ok(settled(&entry, snapshot).await)
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(DeleteResponse { removed: 1 }))
}

// ============================================================
// Draft
// ============================================================

async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, AppError> {
    let entry = session(&state, &id).await?;
    let draft = entry.guide.draft();
    let markdown = draft.to_markdown();
    Ok(Json(DraftResponse { draft, markdown }))
}

async fn export_session_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExportResponse>, AppError> {
    let entry = session(&state, &id).await?;
    let draft = entry.guide.draft();
    let (json_path, md_path) = export_draft(&draft, &state.config.output_dir)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ExportResponse {
        json_path: json_path.display().to_string(),
        markdown_path: md_path.display().to_string(),
    }))
}

// ============================================================
// Comparison Lab
// ============================================================

fn lab_view(entry: &SessionEntry) -> LabResponse {
    LabResponse {
        open: entry.lab.is_open(),
        ready: entry.guide.lab_context().is_some(),
        variants: entry.lab.variants(),
        run: None,
    }
}

fn variant_view(entry: &SessionEntry, variant_id: &str) -> Result<Variant, AppError> {
    entry
        .lab
        .variants()
        .into_iter()
        .find(|variant| variant.id == variant_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown variant: {variant_id}")))
}

async fn param_schema() -> Json<ParamSchemaResponse> {
    let defaults = VariantParams::default();
    let params = ParamKey::ALL
        .into_iter()
        .map(|key| ParamSchema {
            key: key.key(),
            label: key.label(),
            info: key.info(),
            options: key.options(),
            default: defaults.get(key),
        })
        .collect();
    Json(ParamSchemaResponse {
        params,
        checks: &JUDGMENT_CHECKS,
    })
}

async fn get_lab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LabResponse>, AppError> {
    let entry = session(&state, &id).await?;
    Ok(Json(lab_view(&entry)))
}

async fn open_lab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LabResponse>, AppError> {
    let entry = session(&state, &id).await?;
    let run = entry.lab.open(entry.guide.lab_context()).await;
    Ok(Json(LabResponse {
        run,
        ..lab_view(&entry)
    }))
}

async fn close_lab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LabResponse>, AppError> {
    let entry = session(&state, &id).await?;
    entry.lab.close();
    Ok(Json(lab_view(&entry)))
}

async fn run_lab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LabResponse>, AppError> {
    let entry = session(&state, &id).await?;
    let run = entry.lab.run_all(entry.guide.lab_context()).await?;
    Ok(Json(LabResponse {
        run: Some(run),
        ..lab_view(&entry)
    }))
}

async fn add_variant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Variant>, AppError> {
    let entry = session(&state, &id).await?;
    Ok(Json(entry.lab.add_variant(entry.guide.lab_context()).await))
}

async fn update_param(
    State(state): State<AppState>,
    Path((id, vid)): Path<(String, String)>,
    Json(req): Json<ParamRequest>,
) -> Result<Json<VariantResponse>, AppError> {
    let entry = session(&state, &id).await?;
    let outcome = entry
        .lab
        .update_param(&vid, &req.key, &req.value, entry.guide.lab_context())
        .await?;
    Ok(Json(VariantResponse {
        variant: variant_view(&entry, &vid)?,
        outcome,
    }))
}

async fn toggle_check(
    State(state): State<AppState>,
    Path((id, vid)): Path<(String, String)>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<Variant>, AppError> {
    let entry = session(&state, &id).await?;
    Ok(Json(entry.lab.toggle_check(&vid, &req.label)?))
}

async fn set_notes(
    State(state): State<AppState>,
    Path((id, vid)): Path<(String, String)>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<Variant>, AppError> {
    let entry = session(&state, &id).await?;
    Ok(Json(entry.lab.set_notes(&vid, &req.notes)?))
}

async fn save_preset(
    State(state): State<AppState>,
    Path((id, vid)): Path<(String, String)>,
    Json(req): Json<PresetRequest>,
) -> Result<Json<SavedPreset>, AppError> {
    let entry = session(&state, &id).await?;
    Ok(Json(entry.lab.save_preset(&vid, &req.name).await?))
}

async fn apply_preset(
    State(state): State<AppState>,
    Path((id, vid)): Path<(String, String)>,
    Json(req): Json<PresetRequest>,
) -> Result<Json<VariantResponse>, AppError> {
    let entry = session(&state, &id).await?;
    let outcome = entry
        .lab
        .apply_preset(&vid, &req.name, entry.guide.lab_context())
        .await?;
    Ok(Json(VariantResponse {
        variant: variant_view(&entry, &vid)?,
        outcome,
    }))
}

// ============================================================
// Presets
// ============================================================

async fn list_presets(State(state): State<AppState>) -> Result<Json<PresetListResponse>, AppError> {
    let presets = state
        .sessions
        .presets()
        .read_all()
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(PresetListResponse { presets }))
}

async fn delete_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let removed = lab::delete_preset(state.sessions.presets().as_ref(), &name).await?;
    Ok(Json(DeleteResponse { removed }))
}

async fn get_version() -> &'static str {
    concat!("blueprint-guide ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        let message = e.to_string();
        match e {
            TransitionError::UnknownTurn(_) => AppError::NotFound(message),
            TransitionError::Busy | TransitionError::SessionNotReady => AppError::Conflict(message),
            e if e.is_validation() => AppError::BadRequest(message),
            _ => AppError::Internal(message),
        }
    }
}

impl From<LabError> for AppError {
    fn from(e: LabError) -> Self {
        let message = e.to_string();
        match e {
            LabError::UnknownVariant(_) | LabError::PresetNotFound(_) => AppError::NotFound(message),
            LabError::SessionNotReady | LabError::ServiceUnavailable => AppError::Conflict(message),
            LabError::InvalidParam(_) | LabError::UnknownCheck(_) | LabError::EmptyPresetName => {
                AppError::BadRequest(message)
            }
            LabError::Store(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
