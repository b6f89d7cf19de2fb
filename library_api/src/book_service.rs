use std::sync::Arc;

use crate::api::BookId;
use crate::book::{Book, BookFilter, BookPage, PageRequest};
use crate::books_repository::{BookRepository, BookRepositoryError};

pub const DUPLICATED_ISBN_MESSAGE: &str = "Isbn já cadastrado";

#[derive(thiserror::Error, Debug)]
pub enum BookServiceError {
    #[error("{}", DUPLICATED_ISBN_MESSAGE)]
    DuplicateIsbn,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Repository failure {0}")]
    Repository(BookRepositoryError),
}

impl From<BookRepositoryError> for BookServiceError {
    fn from(err: BookRepositoryError) -> Self {
        match err {
            BookRepositoryError::DuplicateIsbn(_) => BookServiceError::DuplicateIsbn,
            BookRepositoryError::NotFound(book_id) => BookServiceError::NotFound(book_id),
            other => BookServiceError::Repository(other),
        }
    }
}

#[async_trait::async_trait]
pub trait BookService: Send + Sync {
    /// Persists a new book, fails with DuplicateIsbn if the isbn is already taken
    async fn save(&self, book: Book) -> Result<Book, BookServiceError>;
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookServiceError>;
    /// Overwrites the whole stored book, the caller has to fill in unchanged fields
    async fn update(&self, book: Book) -> Result<Book, BookServiceError>;
    async fn delete(&self, book: Option<&Book>) -> Result<(), BookServiceError>;
    async fn find(
        &self,
        filter: BookFilter,
        page_request: PageRequest,
    ) -> Result<BookPage, BookServiceError>;
}

pub struct BookServiceImpl {
    books_repository: Arc<dyn BookRepository>,
}

impl BookServiceImpl {
    pub fn new(books_repository: Arc<dyn BookRepository>) -> Self {
        Self { books_repository }
    }
}

fn require_id(book: Option<&Book>) -> Result<BookId, BookServiceError> {
    book.and_then(|book| book.id)
        .ok_or_else(|| BookServiceError::InvalidArgument("Book id cant be null".to_string()))
}

#[async_trait::async_trait]
impl BookService for BookServiceImpl {
    #[tracing::instrument(skip(self), fields(isbn = %book.isbn))]
    async fn save(&self, book: Book) -> Result<Book, BookServiceError> {
        if self.books_repository.exists_by_isbn(&book.isbn).await? {
            return Err(BookServiceError::DuplicateIsbn);
        }
        // The store rejects the duplicate as well if another save won the race
        Ok(self.books_repository.save(book).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookServiceError> {
        Ok(self.books_repository.find_by_id(book_id).await?)
    }

    #[tracing::instrument(skip(self), fields(id = ?book.id))]
    async fn update(&self, book: Book) -> Result<Book, BookServiceError> {
        require_id(Some(&book))?;
        Ok(self.books_repository.save(book).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, book: Option<&Book>) -> Result<(), BookServiceError> {
        let book_id = require_id(book)?;
        Ok(self.books_repository.delete(book_id).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn find(
        &self,
        filter: BookFilter,
        page_request: PageRequest,
    ) -> Result<BookPage, BookServiceError> {
        if page_request.size == 0 {
            return Err(BookServiceError::InvalidArgument(
                "Page size must not be less than one".to_string(),
            ));
        }
        if i64::try_from(page_request.offset()).is_err() {
            return Err(BookServiceError::InvalidArgument(
                "Requested page is out of range".to_string(),
            ));
        }
        Ok(self
            .books_repository
            .find_filtered(&filter.normalized(), page_request)
            .await?)
    }
}
