//! Skill-editing HTTP server binary.
//!
//! Seeds the built-in skills, loads persisted records, and serves the
//! editing surface an external frontend talks to.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `METAREASON_SKILLS_DIR` — persisted skill records (default: skills_data)
//! - `RUST_LOG` — tracing filter (default: "info,metareason=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin editor-server
//! ```

use std::sync::Arc;

use anyhow::Context;

use metareason::config::AppConfig;
use metareason::sandbox::Sandbox;
use metareason::server::{app_router, AppState};
use metareason::skill::SkillRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,metareason=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();
    let bind_addr = format!("0.0.0.0:{}", config.port);

    let sandbox = Arc::new(Sandbox::new());
    let registry = Arc::new(SkillRegistry::with_store(
        Arc::clone(&sandbox),
        &config.skills_dir,
    ));
    let issues = registry
        .init()
        .context("seeding built-ins and loading the skill store")?;
    for issue in &issues {
        tracing::warn!("skipped record {}: {}", issue.file.display(), issue.message);
    }
    tracing::info!(
        skills = registry.len(),
        skipped = issues.len(),
        store = %config.skills_dir.display(),
        "registry ready"
    );

    let app = app_router(AppState::new(registry, sandbox));

    tracing::info!("editor server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                — liveness probe");
    tracing::info!("  GET    /api/skills            — list skills");
    tracing::info!("  POST   /api/skills            — register a skill");
    tracing::info!("  PUT    /api/skills/:name      — update a skill");
    tracing::info!("  DELETE /api/skills/:name      — remove a skill");
    tracing::info!("  POST   /api/skills/:name/test — sandbox a skill");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
