use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{ApiErrors, BookDto, BookId, PageEnvelope};

pub struct LibraryApiClient {
    url: String,
    client: ClientWithMiddleware,
    /// Used for non-idempotent calls, a retried create would come back as a duplicated isbn
    client_without_retry: ClientWithMiddleware,
}

impl LibraryApiClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest_client.clone())
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        let client_without_retry = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
            client_without_retry,
        })
    }

    /// Calls POST /api/books endpoint
    /// Returns the created book, or the error messages if the book was rejected
    /// Sent once without retries, on a transport failure the book may or may not have been created
    pub async fn create_book(&self, book: &BookDto) -> anyhow::Result<Result<BookDto, ApiErrors>> {
        let response = self
            .client_without_retry
            .post(format!("{}/api/books", self.url))
            .json(book)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            Ok(Err(response.json().await?))
        } else if response.status().is_success() {
            Ok(Ok(response.json().await?))
        } else {
            bail!("Failed to create book {}", response.status())
        }
    }

    /// Calls GET /api/books/{book_id} endpoint
    /// Returns None if the book is not in the catalog
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<BookDto>> {
        let response = self
            .client
            .get(format!("{}/api/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to get book {}", response.status())
        }
    }

    /// Calls PUT /api/books/{book_id} endpoint, only title and author of `book` are applied
    /// Returns None if the book is not in the catalog
    pub async fn update_book(
        &self,
        book_id: BookId,
        book: &BookDto,
    ) -> anyhow::Result<Option<BookDto>> {
        let response = self
            .client
            .put(format!("{}/api/books/{}", self.url, book_id))
            .json(book)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: ApiErrors = response.json().await.unwrap_or_default();
            bail!("Failed to update book {:?}", error.errors)
        }
    }

    /// Calls DELETE /api/books/{book_id} endpoint
    /// Returns true if deleted and false if there was no such book
    pub async fn delete_book(&self, book_id: BookId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            bail!("Failed to delete book {}", response.status())
        }
    }

    /// Calls GET /api/books endpoint with the given filter and page
    pub async fn find_books(
        &self,
        title: Option<&str>,
        author: Option<&str>,
        page: u32,
        size: u32,
    ) -> anyhow::Result<PageEnvelope> {
        let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(title) = title {
            query.push(("title", title.to_string()));
        }
        if let Some(author) = author {
            query.push(("author", author.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/books", self.url))
            .query(&query)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: ApiErrors = response.json().await.unwrap_or_default();
            bail!("Failed to find books {:?}", error.errors)
        }
    }
}
