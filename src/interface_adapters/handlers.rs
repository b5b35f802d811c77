use crate::domain::{BodySpec, ConstraintSpec, SimError};
use crate::interface_adapters::http::{ApiError, error_response};
use crate::interface_adapters::protocol::{
    AddBodyResponse, AddConstraintResponse, BodySpecDto, ConstraintSpecDto, ControlResponse,
    GravityRequest, GravityResponse, LoadPresetResponse, RemoveBodyResponse, StatusResponse,
    TemplateDto, template_catalog,
};
use crate::interface_adapters::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::info;

#[derive(Debug, serde::Serialize)]
pub struct TemplateCatalogResponse {
    templates: Vec<TemplateDto>,
}

pub async fn reset(State(state): State<AppState>) -> Result<Json<ControlResponse>, ApiError> {
    let loop_state = state.session.reset().await.map_err(error_response)?;
    Ok(Json(ControlResponse {
        status: "success",
        message: "Simulation reset",
        state: loop_state.as_str(),
    }))
}

pub async fn pause(State(state): State<AppState>) -> Result<Json<ControlResponse>, ApiError> {
    let loop_state = state.session.pause().await.map_err(error_response)?;
    Ok(Json(ControlResponse {
        status: "success",
        message: "Simulation paused",
        state: loop_state.as_str(),
    }))
}

pub async fn resume(State(state): State<AppState>) -> Result<Json<ControlResponse>, ApiError> {
    let loop_state = state.session.resume().await.map_err(error_response)?;
    Ok(Json(ControlResponse {
        status: "success",
        message: "Simulation resumed",
        state: loop_state.as_str(),
    }))
}

pub async fn set_gravity(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GravityResponse>, ApiError> {
    let request: GravityRequest = parse_body(&body)?;
    let gravity = state
        .session
        .set_gravity(request.gravity)
        .await
        .map_err(error_response)?;
    Ok(Json(GravityResponse {
        status: "success",
        gravity,
    }))
}

pub async fn add_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AddBodyResponse>, ApiError> {
    let dto: BodySpecDto = parse_body(&body)?;
    let spec = BodySpec::try_from(dto).map_err(error_response)?;
    let body_id = state.session.add_body(spec).await.map_err(error_response)?;
    Ok(Json(AddBodyResponse {
        status: "success",
        body_id,
    }))
}

pub async fn remove_body(
    State(state): State<AppState>,
    Path(body_id): Path<String>,
) -> Result<Json<RemoveBodyResponse>, ApiError> {
    let removed_constraints = state
        .session
        .remove_body(body_id.clone())
        .await
        .map_err(error_response)?;
    Ok(Json(RemoveBodyResponse {
        status: "success",
        message: format!("Body {body_id} removed"),
        removed_constraints,
    }))
}

pub async fn add_constraint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AddConstraintResponse>, ApiError> {
    let dto: ConstraintSpecDto = parse_body(&body)?;
    let spec = ConstraintSpec::try_from(dto).map_err(error_response)?;
    let constraint_id = state
        .session
        .add_constraint(spec)
        .await
        .map_err(error_response)?;
    Ok(Json(AddConstraintResponse {
        status: "success",
        constraint_id,
    }))
}

// The body is optional; an empty body loads the template with its defaults.
pub async fn load_preset(
    State(state): State<AppState>,
    Path(preset_name): Path<String>,
    body: Bytes,
) -> Result<Json<LoadPresetResponse>, ApiError> {
    let params: Map<String, Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        parse_body(&body)?
    };

    let report = state
        .session
        .load_template(preset_name, params)
        .await
        .map_err(error_response)?;
    info!(
        template = report.template.name(),
        bodies = report.bodies.len(),
        constraints = report.constraints.len(),
        "preset loaded over http"
    );

    Ok(Json(LoadPresetResponse {
        status: "success",
        message: format!("Loaded {} preset", report.template.name()),
        body_ids: report.bodies,
        constraint_ids: report.constraints,
    }))
}

pub async fn templates() -> Json<TemplateCatalogResponse> {
    Json(TemplateCatalogResponse {
        templates: template_catalog(),
    })
}

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.session.status().await.map_err(error_response)?;
    Ok(Json(StatusResponse::from(status)))
}

// Malformed JSON bodies are parameter errors, reported with the shared schema.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| error_response(SimError::invalid("body", e.to_string())))
}
