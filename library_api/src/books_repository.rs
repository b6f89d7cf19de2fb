pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::BookId;
use crate::book::{Book, BookFilter, BookPage, PageRequest};

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Book with isbn {0} already exists")]
    DuplicateIsbn(String),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Returns true if any stored book has exactly this isbn
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, BookRepositoryError>;
    /// Retrieves the book, `None` if there is no book with this id
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookRepositoryError>;
    /// Inserts the book when it has no id yet, otherwise overwrites the stored row.
    /// Returns the persisted state with the id filled in.
    async fn save(&self, book: Book) -> Result<Book, BookRepositoryError>;
    /// Removes the book, fails with NotFound if nothing was removed
    async fn delete(&self, book_id: BookId) -> Result<(), BookRepositoryError>;
    /// Returns requested page of books matching the filter, ordered by id
    async fn find_filtered(
        &self,
        filter: &BookFilter,
        page_request: PageRequest,
    ) -> Result<BookPage, BookRepositoryError>;
}
