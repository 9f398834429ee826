//! Axum route handlers for the skill-editing surface.
//!
//! # Routes
//!
//! - `GET    /health`                  — liveness probe
//! - `GET    /api/skills?role=`        — list descriptors, optional role filter
//! - `GET    /api/skills/:name`        — full skill record
//! - `POST   /api/skills`              — register a new skill
//! - `PUT    /api/skills/:name`        — patch a non-verified skill
//! - `DELETE /api/skills/:name`        — remove a non-verified skill
//! - `POST   /api/skills/validate`     — dry-run validation with warnings
//! - `POST   /api/skills/:name/test`   — run a skill with supplied raw params
//!
//! Registry errors map onto HTTP statuses: `DuplicateName` 409,
//! `InvalidDefinition` 422, `Protected` 403, `NotFound` 404.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::error::RegistryError;
use crate::params::{self, ParamMap};
use crate::sandbox::Sandbox;
use crate::skill::{Skill, SkillPatch, SkillRegistry, SkillRole};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SkillRegistry>,
    pub sandbox: Arc<Sandbox>,
}

impl AppState {
    pub fn new(registry: Arc<SkillRegistry>, sandbox: Arc<Sandbox>) -> Self {
        Self { registry, sandbox }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/skills", get(list_handler).post(create_handler))
        .route(
            "/api/skills/:name",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/api/skills/validate", post(validate_handler))
        .route("/api/skills/:name/test", post(test_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);

fn registry_error(err: RegistryError) -> ApiError {
    let status = match &err {
        RegistryError::DuplicateName { .. } => StatusCode::CONFLICT,
        RegistryError::InvalidDefinition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::Protected { .. } => StatusCode::FORBIDDEN,
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "metareason",
        "version": crate::VERSION,
    }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    role: Option<SkillRole>,
}

/// GET /api/skills
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    Json(state.registry.list(query.role))
}

/// GET /api/skills/:name
async fn get_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Skill>, ApiError> {
    state
        .registry
        .get(&name)
        .map(Json)
        .ok_or_else(|| registry_error(RegistryError::NotFound { name }))
}

/// POST /api/skills
async fn create_handler(
    State(state): State<AppState>,
    Json(mut skill): Json<Skill>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // The editing surface can never mint built-ins.
    skill.verified = false;
    let name = skill.name.clone();
    state.registry.register(skill).map_err(registry_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "registered": name }))))
}

/// PUT /api/skills/:name
async fn update_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(patch): Json<SkillPatch>,
) -> Result<Json<Skill>, ApiError> {
    state
        .registry
        .update(&name, &patch)
        .map(Json)
        .map_err(registry_error)
}

/// DELETE /api/skills/:name
async fn delete_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.registry.remove(&name).map_err(registry_error)?;
    Ok(Json(json!({ "removed": name })))
}

/// POST /api/skills/validate — dry run, returns errors *and* warnings.
async fn validate_handler(State(state): State<AppState>, Json(skill): Json<Skill>) -> Json<Value> {
    match state.registry.validate(&skill) {
        Ok(report) => Json(json!({
            "valid": true,
            "errors": [],
            "warnings": report.warnings,
        })),
        Err(RegistryError::InvalidDefinition { errors }) => Json(json!({
            "valid": false,
            "errors": errors,
            "warnings": [],
        })),
        Err(other) => Json(json!({
            "valid": false,
            "errors": [other.to_string()],
            "warnings": [],
        })),
    }
}

#[derive(Debug, Deserialize, Default)]
struct TestRequest {
    /// Raw textual parameter values, coerced against the declared schema
    /// before the run.
    #[serde(default)]
    params: BTreeMap<String, String>,
}

/// POST /api/skills/:name/test
async fn test_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<TestRequest>,
) -> Result<Json<Value>, ApiError> {
    let skill = state
        .registry
        .get(&name)
        .ok_or_else(|| registry_error(RegistryError::NotFound { name: name.clone() }))?;

    let mut coerced = ParamMap::new();
    for spec in &skill.parameters {
        match request.params.get(&spec.name) {
            Some(raw) => {
                let value = params::coerce(&spec.name, spec.kind, raw).map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": e.to_string() })),
                    )
                })?;
                coerced.insert(spec.name.clone(), value);
            }
            None if spec.required => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": format!("required parameter '{}' not supplied", spec.name)
                    })),
                ));
            }
            None => {}
        }
    }

    let result = state.sandbox.run(&skill, &coerced);
    Ok(Json(json!({
        "skill": name,
        "ok": result.is_ok(),
        "logs": result.logs,
        "error": result.error.map(|e| e.to_string()),
    })))
}
