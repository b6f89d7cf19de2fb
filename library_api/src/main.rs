use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use library_api::app_config::{config_app, json_config, query_config};
use library_api::book_service::{BookService, BookServiceImpl};
use library_api::books_repository::{
    BookRepository, InMemoryBookRepository, PostgresBooksRepository,
    PostgresBooksRepositoryConfig,
};
use library_api::settings::Settings;
use library_api::telemetry::init_telemetry;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_telemetry(&settings.telemetry)?;

    let books_repository: Arc<dyn BookRepository> = if settings.database.use_in_memory {
        tracing::info!("Using in memory book repository");
        Arc::new(InMemoryBookRepository::default())
    } else {
        Arc::new(
            PostgresBooksRepository::init(PostgresBooksRepositoryConfig {
                hostname: settings.database.host.clone(),
                username: settings.database.username.clone(),
                password: settings.database.password.clone(),
            })
            .await
            .context("Failed to init postgres")?,
        )
    };
    let book_service: Arc<dyn BookService> = Arc::new(BookServiceImpl::new(books_repository));

    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(book_service.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await?;

    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}
