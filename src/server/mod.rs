//! Skill-editing HTTP surface.
//!
//! Exposes the registry's contract (list/get/create/update/delete plus
//! validate and test) so an external editor frontend can manage skills.
//!
//! # Endpoints
//!
//! - `GET  /health`      — liveness probe
//! - `/api/skills/...`   — registry operations (see [`routes`])

pub mod routes;

pub use routes::{app_router, AppState};
