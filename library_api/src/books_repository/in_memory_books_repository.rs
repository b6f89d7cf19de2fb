use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::api::BookId;
use crate::book::{Book, BookFilter, BookPage, PageRequest};
use crate::books_repository::{BookRepository, BookRepositoryError};

pub struct InMemoryBookRepository {
    book_sequence_generator: AtomicI32,
    books: parking_lot::RwLock<BTreeMap<BookId, Book>>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            // ids start from 1 like a SERIAL column
            book_sequence_generator: AtomicI32::new(1),
            books: Default::default(),
        }
    }
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, BookRepositoryError> {
        Ok(self.books.read().values().any(|book| book.isbn == isbn))
    }

    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookRepositoryError> {
        Ok(self.books.read().get(&book_id).cloned())
    }

    async fn save(&self, mut book: Book) -> Result<Book, BookRepositoryError> {
        // Uniqueness check and write happen under the same lock
        let mut locked_books = self.books.write();

        if locked_books
            .values()
            .any(|stored| stored.isbn == book.isbn && stored.id != book.id)
        {
            return Err(BookRepositoryError::DuplicateIsbn(book.isbn));
        }

        match book.id {
            None => {
                let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
                book.id = Some(id);
                locked_books.insert(id, book.clone());
                Ok(book)
            }
            Some(id) => match locked_books.get_mut(&id) {
                Some(stored) => {
                    *stored = book.clone();
                    Ok(book)
                }
                None => Err(BookRepositoryError::NotFound(id)),
            },
        }
    }

    async fn delete(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        self.books
            .write()
            .remove(&book_id)
            .map(|_| ())
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn find_filtered(
        &self,
        filter: &BookFilter,
        page_request: PageRequest,
    ) -> Result<BookPage, BookRepositoryError> {
        let locked_books = self.books.read();
        let matching: Vec<&Book> = locked_books
            .values()
            .filter(|book| filter.matches(book))
            .collect();

        let items = matching
            .iter()
            .skip(page_request.offset() as usize)
            .take(page_request.size as usize)
            .map(|&book| book.clone())
            .collect();

        Ok(BookPage {
            items,
            total: matching.len() as u64,
        })
    }
}
