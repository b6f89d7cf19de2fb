use crate::api::{BookDto, BookId, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// Book record as held by the store, `id` is `None` until the book is persisted
pub struct Book {
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl From<BookDto> for Book {
    fn from(dto: BookDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            author: dto.author,
            isbn: dto.isbn,
        }
    }
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// Partially filled example used to search books.
/// Every present, non-empty field has to be a case-insensitive substring of the stored value.
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
}

impl BookFilter {
    /// Drops fields that are present but empty, as they impose no constraint
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.filter(|value| !value.is_empty()),
            author: self.author.filter(|value| !value.is_empty()),
        }
    }

    pub fn matches(&self, book: &Book) -> bool {
        contains_ignore_case(&book.title, self.title.as_deref())
            && contains_ignore_case(&book.author, self.author.as_deref())
    }
}

fn contains_ignore_case(value: &str, pattern: Option<&str>) -> bool {
    match pattern {
        None | Some("") => true,
        Some(pattern) => value.to_lowercase().contains(&pattern.to_lowercase()),
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PageRequest {
    /// Zero based page index
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BookPage {
    pub items: Vec<Book>,
    /// Number of all matching books, not only the ones on this page
    pub total: u64,
}
