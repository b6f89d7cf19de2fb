use actix_web::error::InternalError;
use actix_web::HttpResponse;
use paperclip::actix::web;

use crate::api::ApiErrors;
use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api").service(
                web::scope("/books")
                    .service(
                        web::resource("")
                            .route(web::get().to(handlers::find_books))
                            .route(web::post().to(handlers::create_book)),
                    )
                    .service(
                        web::resource("/{book_id}")
                            .route(web::get().to(handlers::get_book))
                            .route(web::put().to(handlers::update_book))
                            .route(web::delete().to(handlers::delete_book)),
                    ),
            ),
        );
}

/// Unreadable request bodies are answered with the same error payload as validation failures
pub fn json_config() -> actix_web::web::JsonConfig {
    actix_web::web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiErrors::single(err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

/// Unparsable query strings get the same error payload
pub fn query_config() -> actix_web::web::QueryConfig {
    actix_web::web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiErrors::single(err.to_string()));
        InternalError::from_response(err, response).into()
    })
}
