use anyhow::Context;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::BookId;
use crate::book::{Book, BookFilter, BookPage, PageRequest};
use crate::books_repository::{BookRepository, BookRepositoryError};

pub struct PostgresBooksRepository {
    client: Client,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Connecting to postgres at {}", config.hostname);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id              SERIAL PRIMARY KEY,
            title           TEXT NOT NULL,
            author          TEXT NOT NULL,
            isbn            TEXT NOT NULL UNIQUE
            )
        ",
            )
            .await
            .context("Failed to setup books table")?;
        Ok(Self { client })
    }
}

fn book_from_row(row: &Row) -> Result<Book, tokio_postgres::Error> {
    Ok(Book {
        id: Some(row.try_get("id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
    })
}

/// Builds an ILIKE pattern matching `value` anywhere, with LIKE wildcards in `value` escaped
fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT EXISTS (SELECT 1 FROM books WHERE isbn = ($1))")
            .await?;

        let row = self.client.query_one(&stmt, &[&isbn]).await?;
        Ok(row.try_get(0)?)
    }

    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, title, author, isbn FROM books WHERE id = ($1)")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;

        Ok(rows.first().map(book_from_row).transpose()?)
    }

    async fn save(&self, book: Book) -> Result<Book, BookRepositoryError> {
        let rows = match book.id {
            None => {
                let stmt: Statement = self
                    .client
                    .prepare(
                        "INSERT INTO books (title, author, isbn) VALUES ($1, $2, $3) \
                         RETURNING id, title, author, isbn",
                    )
                    .await?;
                self.client
                    .query(&stmt, &[&book.title, &book.author, &book.isbn])
                    .await
            }
            Some(book_id) => {
                let stmt: Statement = self
                    .client
                    .prepare(
                        "UPDATE books SET title = ($1), author = ($2), isbn = ($3) WHERE id = ($4) \
                         RETURNING id, title, author, isbn",
                    )
                    .await?;
                self.client
                    .query(&stmt, &[&book.title, &book.author, &book.isbn, &book_id])
                    .await
            }
        };

        let rows = match rows {
            Ok(rows) => rows,
            Err(err) if is_unique_violation(&err) => {
                return Err(BookRepositoryError::DuplicateIsbn(book.isbn))
            }
            Err(err) => return Err(err.into()),
        };

        match (rows.first(), book.id) {
            (Some(row), _) => Ok(book_from_row(row)?),
            (None, Some(book_id)) => Err(BookRepositoryError::NotFound(book_id)),
            (None, None) => Err(BookRepositoryError::Other("Id not returned".to_string())),
        }
    }

    async fn delete(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM books WHERE id = ($1)")
            .await?;

        let deleted = self.client.execute(&stmt, &[&book_id]).await?;
        if deleted == 0 {
            Err(BookRepositoryError::NotFound(book_id))
        } else {
            Ok(())
        }
    }

    async fn find_filtered(
        &self,
        filter: &BookFilter,
        page_request: PageRequest,
    ) -> Result<BookPage, BookRepositoryError> {
        const PREDICATE: &str = "(($1)::TEXT IS NULL OR title ILIKE ($1)) \
                                 AND (($2)::TEXT IS NULL OR author ILIKE ($2))";

        let filter = filter.clone().normalized();
        let title_pattern = filter.title.as_deref().map(contains_pattern);
        let author_pattern = filter.author.as_deref().map(contains_pattern);

        let count_stmt: Statement = self
            .client
            .prepare(&format!("SELECT COUNT(*) FROM books WHERE {}", PREDICATE))
            .await?;
        let total: i64 = self
            .client
            .query_one(&count_stmt, &[&title_pattern, &author_pattern])
            .await?
            .try_get(0)?;

        let page_stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT id, title, author, isbn FROM books WHERE {} \
                 ORDER BY id LIMIT ($3) OFFSET ($4)",
                PREDICATE
            ))
            .await?;
        let limit = i64::from(page_request.size);
        let offset = i64::try_from(page_request.offset()).map_err(|_| {
            BookRepositoryError::Other(format!(
                "Offset {} out of range",
                page_request.offset()
            ))
        })?;
        let rows = self
            .client
            .query(
                &page_stmt,
                &[&title_pattern, &author_pattern, &limit, &offset],
            )
            .await?;

        let items = rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BookPage {
            items,
            total: total as u64,
        })
    }
}

#[cfg(test)]
mod postgres_book_repository_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use super::contains_pattern;
    use crate::book::{Book, BookFilter, PageRequest};
    use crate::books_repository::{BookRepository, BookRepositoryError};

    async fn start_postgres_container_and_init_repo() -> (
        ContainerAsync<GenericImage>,
        crate::books_repository::PostgresBooksRepository,
    ) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = crate::books_repository::PostgresBooksRepository::init(
                crate::books_repository::PostgresBooksRepositoryConfig {
                    hostname: "127.0.0.1".to_string(),
                    username: "postgres".to_string(),
                    password: "postgres".to_string(),
                },
            )
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn new_book(title: &str, author: &str, isbn: &str) -> Book {
        Book {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
        }
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("abc"), "%abc%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests save, find_by_id, exists_by_isbn, update and delete
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_save_get_update_and_delete() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        assert_eq!(repo.find_by_id(20000).await.unwrap(), None);
        assert!(!repo.exists_by_isbn("123").await.unwrap());

        let saved = repo
            .save(new_book("As aventuras", "Janaina", "123"))
            .await
            .expect("Failed to save book");
        let id = saved.id.expect("Id not assigned");
        assert!(repo.exists_by_isbn("123").await.unwrap());

        let found = repo
            .find_by_id(id)
            .await
            .expect("Failed to find book")
            .expect("Book not found");
        assert_eq!(found, saved);

        let duplicated = repo.save(new_book("Other", "Other", "123")).await;
        assert!(matches!(
            duplicated,
            Err(BookRepositoryError::DuplicateIsbn(..))
        ));

        let updated = repo
            .save(Book {
                title: "Changed".to_string(),
                ..found.clone()
            })
            .await
            .expect("Failed to update book");
        assert_eq!(updated.title, "Changed");
        assert_eq!(repo.find_by_id(id).await.unwrap(), Some(updated));

        let missing = repo
            .save(Book {
                id: Some(20000),
                ..new_book("x", "y", "z")
            })
            .await;
        assert!(matches!(missing, Err(BookRepositoryError::NotFound(20000))));

        repo.delete(id).await.expect("Failed to delete book");
        assert_eq!(repo.find_by_id(id).await.unwrap(), None);
        assert!(matches!(
            repo.delete(id).await,
            Err(BookRepositoryError::NotFound(..))
        ));
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests filtering with paging and total count
    async fn test_find_filtered() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        for (title, author, isbn) in [
            ("Maravilha", "Janaina", "1"),
            ("A maravilha do mar", "janaina silva", "2"),
            ("Maravilha", "Pedro", "3"),
            ("As aventuras", "Janaina", "4"),
            ("MARAVILHAS", "JANAINA", "5"),
            ("100% Maravilha", "Janaina", "6"),
        ] {
            repo.save(new_book(title, author, isbn)).await.unwrap();
        }

        let filter = BookFilter {
            title: Some("Maravilha".to_string()),
            author: Some("Janaina".to_string()),
        };
        let page = repo
            .find_filtered(&filter, PageRequest::new(0, 2))
            .await
            .expect("Failed to find");
        assert_eq!(page.total, 4);
        let isbns: Vec<_> = page.items.iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns, vec!["1", "2"]);

        let percent = BookFilter {
            title: Some("0%".to_string()),
            author: Some("".to_string()),
        };
        let page = repo
            .find_filtered(&percent, PageRequest::default())
            .await
            .expect("Failed to find");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].isbn, "6");

        let page = repo
            .find_filtered(&BookFilter::default(), PageRequest::new(1, 4))
            .await
            .expect("Failed to find");
        assert_eq!(page.total, 6);
        assert_eq!(page.items.len(), 2);
    }
}
