mod auth;
mod config;
mod db;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use config::{AppConfig, StoreBackend};
use db::dynamodb_repository::DynamoDbRepository;
use routes::{UploadLimits, configure_routes};
use shared::{Classifier, MemoryRecordStore, RecordStore, StandInClassifier};
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store: Arc<dyn RecordStore> = match &config.store {
        StoreBackend::Memory => {
            log::warn!("Using in-memory record store; predictions are lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
        StoreBackend::DynamoDb { predictions_table } => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            log::info!("Using DynamoDB table '{}' for predictions", predictions_table);
            Arc::new(DynamoDbRepository::new(
                DynamoDbClient::new(&aws_config),
                predictions_table.clone(),
            ))
        }
    };

    let classifier: Arc<dyn Classifier> = Arc::new(StandInClassifier::seeded(rand::random()));
    let jwt_service = JwtService::new(&config.jwt_secret);
    let auth_middleware = AuthMiddleware::new(jwt_service);
    let limits = UploadLimits {
        max_image_bytes: config.max_image_bytes,
    };
    let frontend_dir = config.frontend_dir.clone();
    let bind_address = config.bind_address();

    log::info!("Serving frontend from {}", frontend_dir);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(auth_middleware.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::from(classifier.clone()))
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::new(limits))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
