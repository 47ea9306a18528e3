use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use pdf_tools_gateway::{routes, DocumentConverter, GatewayConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GatewayConfig::from_env();
    let (host, port) = config.bind_address();

    log::info!("🦀 Starting PDF Tools Gateway");
    log::info!("📍 Listening on {}:{}", host, port);
    log::info!("📦 Upload limit: {} bytes", config.max_upload_bytes);
    log::info!("⏱️  Engine timeout: {}s", config.engine_timeout_secs);
    log::debug!("Engine binaries: {:?}", config.binaries);

    let converter = web::Data::new(DocumentConverter::new(config));

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(converter.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
