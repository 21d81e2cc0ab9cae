//! HTTP API
//!
//! Read-only listing and territory endpoints, the FAQ, and student alert
//! management. All handlers share [`AppState`]; library errors become JSON
//! `{code, detail}` bodies with a 4xx/5xx status.

mod accommodations;
mod content;
mod error;
mod extract;
mod students;
mod territories;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::listing::ListingService;
use crate::search::TerritoryIndex;
use crate::storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub listings: ListingService,
    /// Built once at startup; reloading territories needs a restart
    pub territories: Arc<TerritoryIndex>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(db: Database, config: Config) -> Result<Self> {
        info!("Building territory index...");
        let territories = TerritoryIndex::new(
            db.list_academies().await?,
            db.list_departments(None).await?,
            db.list_cities(None).await?,
        );

        Ok(Self {
            listings: ListingService::new(db.clone(), config.page_size),
            db,
            territories: Arc::new(territories),
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    schema_version: i32,
}

async fn health(State(state): State<AppState>) -> Result<Json<Health>> {
    state.db.health_check().await?;
    let status = state.db.migration_status().await?;
    Ok(Json(Health {
        status: "ok",
        schema_version: status.current_version,
    }))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(state.config.cors_max_age_secs));

    let api = Router::new()
        .route("/health", get(health))
        .route("/territories/search", get(territories::search_territories))
        .route("/territories/academies", get(territories::list_academies))
        .route(
            "/territories/academies/:id/departments",
            get(territories::academy_departments),
        )
        .route(
            "/territories/departments/:id/cities",
            get(territories::department_cities),
        )
        .route("/territories/cities/:slug", get(territories::get_city))
        .route("/accommodations", get(accommodations::list_accommodations))
        .route("/accommodations/prices", get(accommodations::accommodation_prices))
        .route("/accommodations/:slug", get(accommodations::get_accommodation))
        .route("/faq", get(content::list_faq))
        .route("/students", post(students::create_student))
        .route(
            "/students/:id/alerts",
            get(students::list_alerts).post(students::create_alert),
        )
        .route("/students/:id/alerts/:alert_id", delete(students::delete_alert));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}

/// Serves the API until Ctrl+C or SIGTERM
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.bind.clone();
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
