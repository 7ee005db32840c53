// src/main.rs

use std::io;
use std::sync::Arc;
use std::time::Instant;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use taskboard::app_state::AppState;
use taskboard::auth::Authentication;
use taskboard::chat_server::ChatServer;
use taskboard::config::Config;
use taskboard::store::{MemoryStore, MongoStore, Store};

fn build_cors(config: &Config) -> Cors {
    let cors = match (&config.frontend_url, config.is_production()) {
        (Some(origin), true) => Cors::default().allowed_origin(origin),
        _ => Cors::default().allow_any_origin(),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::AUTHORIZATION,
        ])
        .supports_credentials()
        .max_age(3600)
}

async fn open_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    let Some(uri) = &config.mongo_uri else {
        warn!("MONGO_URI not set, using the in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    };
    let mongo = MongoStore::init(uri, &config.database_name)
        .await
        .map_err(|e| io::Error::other(format!("MongoDB init failed: {}", e)))?;
    if config.migrate_legacy_chat {
        match mongo.migrate_legacy_messages().await {
            Ok(count) => info!("Legacy chat migration finished, {} messages converted", count),
            Err(e) => error!("Legacy chat migration failed: {}", e),
        }
    }
    Ok(Arc::new(mongo))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::other(e.to_string())
    })?;
    let store = open_store(&config).await?;
    let chat_server = ChatServer::new().start();
    let started_at = Instant::now();

    info!("Server running at http://{}", config.bind_addr);
    if let Some(origin) = &config.frontend_url {
        info!("Allowed CORS Origin: {}", origin);
    }

    let state = AppState {
        chat_server,
        store: store.clone(),
        config: config.clone(),
        started_at,
    };

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Authentication::new(&state.config.jwt_secret))
            .wrap(build_cors(&state.config))
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(taskboard::configure)
    })
    .bind(&config.bind_addr)?
    .run();

    let result = server.await;
    store.shutdown().await;
    result
}
