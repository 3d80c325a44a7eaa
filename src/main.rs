use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use actix_web::middleware::Logger;
use actix_web::http::header;
use env_logger::Env;
use stashdrive::backend::{Backend, ClientFactory, HttpBackend, MemoryBackend};
use stashdrive::cache::ViewCache;
use stashdrive::config::{BackendMode, Config};
use stashdrive::routes;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Init logger to show info by default, but can be overridden by RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::load();

    let backend: Arc<dyn Backend> = match cfg.backend.mode {
        BackendMode::Http => Arc::new(HttpBackend::new(cfg.backend.clone())),
        BackendMode::Memory => {
            log::warn!("in-memory backend selected; nothing survives a restart");
            Arc::new(MemoryBackend::new())
        }
    };
    let factory = ClientFactory::new(backend, cfg.backend.clone());
    let cache = web::Data::new(ViewCache::new());

    log::info!("Starting server at {}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        let cors = Cors::permissive() // change later
            .allowed_methods(vec!["GET", "POST", "PATCH", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(cfg.clone()))
            .app_data(web::Data::new(factory.clone()))
            .app_data(cache.clone())
            .configure(routes::configure)
    })
    .bind(listen_addr)?
    .run()
    .await
}
