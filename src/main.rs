mod config;
mod db;
mod dtos;
mod error;
mod extract;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::{db::DBClient, memory::MemoryDb, Store};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    auth_service::AuthService,
    job_service::JobService,
    messaging_service::MessagingService,
    storage_service::{LocalBlobStore, StorageService},
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<dyn Store>,
    pub job_service: Arc<JobService>,
    pub messaging_service: Arc<MessagingService>,
    pub storage_service: Arc<StorageService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(db_client: Arc<dyn Store>, config: Config) -> Self {
        let job_service = Arc::new(JobService::new(db_client.clone()));
        let messaging_service = Arc::new(MessagingService::new(db_client.clone()));
        let storage_service = Arc::new(StorageService::new(
            Arc::new(LocalBlobStore::new(&config.storage_dir)),
            db_client.clone(),
            config.public_base_url.clone(),
            config.max_upload_bytes,
        ));
        let auth_service = Arc::new(AuthService::new(
            db_client.clone(),
            config.jwt_secret.clone(),
            config.jwt_maxage,
        ));

        Self {
            env: config,
            db_client,
            job_service,
            messaging_service,
            storage_service,
            auth_service,
        }
    }
}

async fn connect_store(config: &Config) -> Arc<dyn Store> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using the in-memory store. Data is lost on restart");
        return Arc::new(MemoryDb::new());
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);
    if let Err(err) = db_client.run_migrations().await {
        tracing::error!("🔥 Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    Arc::new(db_client)
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("🔥 Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(
            config
                .log_level
                .parse::<LevelFilter>()
                .unwrap_or(LevelFilter::DEBUG),
        )
        .init();

    let db_client = connect_store(&config).await;

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Could not bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("server stopped: {}", err);
    }
}
