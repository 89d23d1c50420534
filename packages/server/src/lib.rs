#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the geopark tuban dashboard.
//!
//! Every dashboard report is its own JSON endpoint under `/stats/api`, and
//! the map layer lives under `/map/api`. A failing report returns its own
//! 500 without affecting the others. Payloads are memoized in a shared
//! [`TtlCache`] owned by the [`ReportService`].

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use geopark_analytics::{ReportConfig, ReportService};
use geopark_cache::TtlCache;
use geopark_database::{SqliteStore, db};

/// Shared application state.
pub struct AppState {
    /// Cached report access over the ledger store.
    pub service: ReportService,
}

/// Runtime settings read from the environment at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Ledger database file (`DATABASE_PATH`).
    pub database_path: PathBuf,
    /// Cache lifetimes (`STATS_CACHE_TTL`, `MAP_CACHE_TTL`).
    pub report: ReportConfig,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_path: db::db_path_from_env(),
            report: ReportConfig::from_env(),
        }
    }
}

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").route("/health", web::get().to(handlers::health)))
        .service(
            web::scope("/stats/api")
                .route("/overview", web::get().to(handlers::overview))
                .route("/problem_types", web::get().to(handlers::problem_types))
                .route("/func_zones", web::get().to(handlers::func_zones))
                .route("/rectify_progress", web::get().to(handlers::rectify_progress))
                .route("/impact_analysis", web::get().to(handlers::impact_analysis))
                .route("/monthly_trend", web::get().to(handlers::monthly_trend))
                .route("/park_ranking", web::get().to(handlers::park_ranking))
                .route("/overdue_list", web::get().to(handlers::overdue_list)),
        )
        .service(
            web::scope("/map/api")
                .route("/tubans", web::get().to(handlers::map_tubans))
                .route("/stats", web::get().to(handlers::map_stats))
                .route("/filter_options", web::get().to(handlers::filter_options)),
        );
}

/// Starts the geopark tuban API server.
///
/// Opens the ledger database, builds the report service and starts the
/// Actix-Web HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the ledger database cannot be opened.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::from_env();

    log::info!("Opening ledger database...");
    let store = SqliteStore::open(&config.database_path)
        .await
        .expect("Failed to open ledger database");

    log::info!(
        "Report cache TTLs: stats {}s, map {}s",
        config.report.stats_cache_ttl,
        config.report.map_cache_ttl
    );

    let state = web::Data::new(AppState {
        service: ReportService::new(Arc::new(store), Arc::new(TtlCache::new()), config.report),
    });

    let ServerConfig {
        bind_addr, port, ..
    } = config;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
