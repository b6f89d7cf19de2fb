use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    ApiErrors, BookDto, BookId, FindBooksQuery, PageEnvelope, Pageable, DEFAULT_PAGE_SIZE,
};
use crate::book::{Book, BookFilter, PageRequest};
use crate::book_service::{BookService, BookServiceError};

/// Maps service failures that reach the endpoint to a response
fn error_response(operation: &str, err: BookServiceError) -> HttpResponse {
    match err {
        BookServiceError::DuplicateIsbn => {
            HttpResponse::BadRequest().json(ApiErrors::single(err.to_string()))
        }
        BookServiceError::InvalidArgument(message) => {
            HttpResponse::BadRequest().json(ApiErrors::single(message))
        }
        BookServiceError::NotFound(_) => HttpResponse::NotFound().finish(),
        BookServiceError::Repository(err) => {
            tracing::error!("{} failed {}", operation, err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Resolves the stored book or produces the response to return instead
async fn find_existing(
    book_service: &Arc<dyn BookService>,
    operation: &str,
    book_id: BookId,
) -> Result<Book, HttpResponse> {
    match book_service.get_by_id(book_id).await {
        Ok(Some(book)) => Ok(book),
        Ok(None) => Err(HttpResponse::NotFound().finish()),
        Err(err) => Err(error_response(operation, err)),
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn create_book(
    book_service: Data<Arc<dyn BookService>>,
    dto: web::Json<BookDto>,
) -> Result<HttpResponse, Error> {
    let dto = dto.into_inner();
    let errors = dto.validate();
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiErrors::from(errors)));
    }

    // the id is always assigned by the store
    let book = Book::from(BookDto { id: None, ..dto });

    Ok(match book_service.save(book).await {
        Ok(saved) => {
            let location = saved.id.map(|id| format!("/api/books/{}", id));
            let mut response = HttpResponse::Created();
            if let Some(location) = location {
                response.append_header((LOCATION, location));
            }
            response.json(BookDto::from(saved))
        }
        Err(err) => error_response("Create book", err),
    })
}

#[api_v2_operation]
pub async fn get_book(
    book_service: Data<Arc<dyn BookService>>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match find_existing(&book_service, "Get book", book_id.into_inner()).await {
            Ok(book) => HttpResponse::Ok().json(BookDto::from(book)),
            Err(response) => response,
        },
    )
}

#[api_v2_operation]
pub async fn update_book(
    book_service: Data<Arc<dyn BookService>>,
    book_id: web::Path<BookId>,
    dto: web::Json<BookDto>,
) -> Result<HttpResponse, Error> {
    let mut book = match find_existing(&book_service, "Update book", book_id.into_inner()).await {
        Ok(book) => book,
        Err(response) => return Ok(response),
    };

    let dto = dto.into_inner();
    let errors = dto.validate_for_update();
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiErrors::from(errors)));
    }

    // id and isbn stay as stored
    book.title = dto.title;
    book.author = dto.author;

    Ok(match book_service.update(book).await {
        Ok(updated) => HttpResponse::Ok().json(BookDto::from(updated)),
        Err(err) => error_response("Update book", err),
    })
}

#[api_v2_operation]
pub async fn delete_book(
    book_service: Data<Arc<dyn BookService>>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book = match find_existing(&book_service, "Delete book", book_id.into_inner()).await {
        Ok(book) => book,
        Err(response) => return Ok(response),
    };

    Ok(match book_service.delete(Some(&book)).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => error_response("Delete book", err),
    })
}

#[api_v2_operation]
pub async fn find_books(
    book_service: Data<Arc<dyn BookService>>,
    query: web::Query<FindBooksQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let page_request = PageRequest::new(
        query.page.unwrap_or_default(),
        query.size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let filter = BookFilter {
        title: query.title,
        author: query.author,
    };

    Ok(match book_service.find(filter, page_request).await {
        Ok(page) => HttpResponse::Ok().json(PageEnvelope {
            content: page.items.into_iter().map(BookDto::from).collect(),
            total_elements: page.total,
            pageable: Pageable {
                page_number: page_request.page,
                page_size: page_request.size,
            },
        }),
        Err(err) => error_response("Find books", err),
    })
}
